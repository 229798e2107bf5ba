use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pdf_enhance::config;
use pdf_enhance::config::job::JobFile;
use pdf_enhance::config::merged::MergedConfig;
use pdf_enhance::pipeline::job_runner::{JobConfig, JobOutput, default_output_path};
use pdf_enhance::pipeline::orchestrator::run_all_jobs;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdf_enhance <jobs.yaml>...");
        eprintln!("  Enhance raster images and PDF-embedded images per job specifications.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_enhance {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // Collect job configs from all job files.
    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Read and parse the job YAML file.
        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for job in &job_file.jobs {
            let merged = MergedConfig::new(&settings, job);

            let input_path = resolve_path(&job_dir, &job.input);
            let output_path = match &job.output {
                Some(o) => resolve_path(&job_dir, o),
                None => default_output_path(&input_path, &merged.output_prefix),
            };

            let selection = match job.resolve_selection() {
                Ok(keys) => keys,
                Err(e) => {
                    eprintln!("ERROR: {e}");
                    return ExitCode::FAILURE;
                }
            };

            // Each document stages into its own subdirectory.
            let stem = input_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let staging_root = if merged.staging_dir.is_absolute() {
                merged.staging_dir.clone()
            } else {
                job_dir.join(&merged.staging_dir)
            };

            job_configs.push(JobConfig {
                input_path,
                output_path,
                staging_dir: staging_root.join(stem),
                jpeg_quality: merged.jpeg_quality,
                phase: merged.phase,
                selection,
            });
        }
    }

    // Run all jobs through the pipeline.
    let results = run_all_jobs(&job_configs);

    let mut has_error = false;
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(job_result) => match &job_result.output {
                JobOutput::Image {
                    grade_before,
                    grade_after,
                } => {
                    eprintln!(
                        "OK: {} -> {} (grade {} -> {})",
                        job_result.input_path.display(),
                        job_result.output_path.display(),
                        grade_before,
                        grade_after
                    );
                }
                JobOutput::Staged {
                    images,
                    report_path,
                } => {
                    eprintln!(
                        "OK: {} staged {} images -> {}",
                        job_result.input_path.display(),
                        images,
                        report_path.display()
                    );
                }
                JobOutput::Committed { substituted } => {
                    eprintln!(
                        "OK: {} -> {} ({} images substituted)",
                        job_result.input_path.display(),
                        job_result.output_path.display(),
                        substituted
                    );
                }
            },
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    job_configs[i].input_path.display(),
                    job_configs[i].output_path.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
