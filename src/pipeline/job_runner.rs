// ジョブ単位: ラスタ画像は単画像パイプライン、PDFは2フェーズワークフローへ振り分ける

use std::path::{Path, PathBuf};

use crate::analysis::Grade;
use crate::config::job::Phase;
use crate::error::EnhanceError;
use crate::pdf::workflow::{PdfWorkflow, StageKey};
use crate::pipeline::image_job;
use crate::pipeline::report::{ImageReport, REPORT_FILE, StagingReport};

/// Configuration for a single job.
pub struct JobConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Per-document staging directory (originals, candidates, report.json).
    pub staging_dir: PathBuf,
    pub jpeg_quality: u8,
    pub phase: Phase,
    pub selection: Vec<StageKey>,
}

/// What a finished job produced.
pub enum JobOutput {
    Image {
        grade_before: Grade,
        grade_after: Grade,
    },
    Staged {
        images: usize,
        report_path: PathBuf,
    },
    Committed {
        substituted: usize,
    },
}

/// Result of processing a single job.
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub output: JobOutput,
}

/// Run a single job. PDF inputs go through the substitution workflow,
/// anything else is treated as a standalone raster image.
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let is_pdf = config
        .input_path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        run_pdf_job(config)
    } else {
        run_image_job(config)
    }
}

fn run_image_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let img = image::open(&config.input_path)?;
    let processed = image_job::process(&img)?;

    processed.enhanced.save(&config.output_path)?;

    let report = ImageReport {
        input: config.input_path.display().to_string(),
        output: config.output_path.display().to_string(),
        metrics_before: processed.metrics_before,
        metrics_after: processed.metrics_after,
        ratio_before: processed.ratio_before,
        ratio_after: processed.ratio_after,
        grade_before: processed.grade_before,
        grade_after: processed.grade_after,
    };
    report.save(config.output_path.with_extension("json"))?;

    Ok(JobResult {
        input_path: config.input_path.clone(),
        output_path: config.output_path.clone(),
        output: JobOutput::Image {
            grade_before: processed.grade_before,
            grade_after: processed.grade_after,
        },
    })
}

fn run_pdf_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let mut workflow = PdfWorkflow::open(&config.input_path, config.jpeg_quality)?;

    match config.phase {
        Phase::Auto => {
            workflow.stage()?;
            let all_keys: Vec<StageKey> = workflow.staged().iter().map(|p| p.key).collect();
            let substituted = workflow.commit(&all_keys)?;
            workflow.save(&config.output_path)?;
            Ok(JobResult {
                input_path: config.input_path.clone(),
                output_path: config.output_path.clone(),
                output: JobOutput::Committed { substituted },
            })
        }
        Phase::Stage => {
            workflow.stage()?;
            let report_path = export_staging(&workflow, config)?;
            Ok(JobResult {
                input_path: config.input_path.clone(),
                output_path: config.output_path.clone(),
                output: JobOutput::Staged {
                    images: workflow.staged().len(),
                    report_path,
                },
            })
        }
        Phase::Commit => {
            if config.selection.is_empty() {
                return Err(EnhanceError::config(
                    "commit phase requires a non-empty select list",
                ));
            }

            // ステージングは決定的なので、再ステージした候補はPhase 1の
            // バイト列と一致するはずである。report.jsonのダイジェストで検証する。
            let report_path = config.staging_dir.join(REPORT_FILE);
            if !report_path.exists() {
                return Err(EnhanceError::workflow(format!(
                    "no staging report at {}; run a stage job first",
                    report_path.display()
                )));
            }
            let report = StagingReport::load(&report_path)?;

            workflow.stage()?;
            verify_digests(&workflow, &report, &config.selection)?;

            let substituted = workflow.commit(&config.selection)?;
            workflow.save(&config.output_path)?;
            Ok(JobResult {
                input_path: config.input_path.clone(),
                output_path: config.output_path.clone(),
                output: JobOutput::Committed { substituted },
            })
        }
    }
}

/// 原本/候補PNGとreport.jsonをステージングディレクトリへ書き出す。
fn export_staging(workflow: &PdfWorkflow, config: &JobConfig) -> crate::error::Result<PathBuf> {
    std::fs::create_dir_all(&config.staging_dir)?;

    let mut report = StagingReport::new(config.input_path.display().to_string());

    for pair in workflow.staged() {
        let original_file = format!(
            "page{}_img{}_original.png",
            pair.key.page_index, pair.key.image_index
        );
        let candidate_file = format!(
            "page{}_img{}_enhanced.png",
            pair.key.page_index, pair.key.image_index
        );
        pair.original.save(config.staging_dir.join(&original_file))?;
        pair.candidate
            .save(config.staging_dir.join(&candidate_file))?;
        report.push(pair, original_file, candidate_file);
    }

    let report_path = config.staging_dir.join(REPORT_FILE);
    report.save(&report_path)?;
    tracing::info!(report = %report_path.display(), images = report.entries.len(), "staging exported");
    Ok(report_path)
}

/// 選択キーごとに、レビュー時のダイジェストと再ステージ結果が一致するか検証する。
fn verify_digests(
    workflow: &PdfWorkflow,
    report: &StagingReport,
    selection: &[StageKey],
) -> crate::error::Result<()> {
    for key in selection {
        let reviewed = report.digest_for(&key.to_string()).ok_or_else(|| {
            EnhanceError::staging_key_mismatch(format!(
                "key {key} was not part of the staged review"
            ))
        })?;

        // commit()が未知キーを分類するため、再ステージで見つからない場合はそちらに任せる
        if let Some(pair) = workflow.staged().iter().find(|p| p.key == *key)
            && pair.digest != reviewed
        {
            return Err(EnhanceError::workflow(format!(
                "candidate digest mismatch for key {key}; document changed since staging"
            )));
        }
    }
    Ok(())
}

/// Derive the default output path: the input file name with the configured
/// prefix, in the input's directory.
pub fn default_output_path(input: &Path, prefix: &str) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{prefix}{file_name}"))
}
