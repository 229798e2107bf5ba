use std::path::Path;

use image::{DynamicImage, GrayImage};
use lopdf::{Document, Object, Stream, dictionary};

use pdf_enhance::config::job::Phase;
use pdf_enhance::error::EnhanceError;
use pdf_enhance::pdf::workflow::StageKey;
use pdf_enhance::pipeline::job_runner::{JobConfig, JobOutput, run_job};
use pdf_enhance::pipeline::orchestrator::run_all_jobs;
use pdf_enhance::pipeline::report::StagingReport;

fn make_image_stream(width: u32, height: u32, color: [u8; 3]) -> Stream {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let pixel_count = (width as usize) * (height as usize);
    let mut raw = Vec::with_capacity(pixel_count * 3);
    for _ in 0..pixel_count {
        raw.extend_from_slice(&color);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).expect("compress");
    let compressed = encoder.finish().expect("finish");

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Stream::new(dict, compressed)
}

fn write_test_pdf(path: &Path, pages: &[Vec<[u8; 3]>]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for page_images in pages {
        let mut xobject_dict = lopdf::Dictionary::new();
        let mut content = String::new();
        for (i, color) in page_images.iter().enumerate() {
            let img_id = doc.add_object(Object::Stream(make_image_stream(16, 16, *color)));
            xobject_dict.set(format!("Im{i}").into_bytes(), Object::Reference(img_id));
            content.push_str(&format!("q 16 0 0 16 0 0 cm /Im{i} Do Q "));
        }

        let resources_id = doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobject_dict),
        });
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            content.into_bytes(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(100),
                Object::Integer(100),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save test pdf");
}

fn image_job_config(input: &Path, output: &Path, staging: &Path) -> JobConfig {
    JobConfig {
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        staging_dir: staging.to_path_buf(),
        jpeg_quality: 85,
        phase: Phase::Auto,
        selection: Vec::new(),
    }
}

#[test]
fn test_raster_image_job() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("photo.png");
    let output = dir.path().join("processed_photo.png");

    let mut gray = GrayImage::new(40, 40);
    for (x, y, p) in gray.enumerate_pixels_mut() {
        p.0[0] = 100 + ((x + y) % 40) as u8;
    }
    DynamicImage::ImageLuma8(gray).save(&input).expect("write input");

    let config = image_job_config(&input, &output, dir.path());
    let result = run_job(&config).expect("run job");

    assert!(output.exists(), "enhanced image must be written");
    assert!(
        output.with_extension("json").exists(),
        "metrics sidecar must be written"
    );
    assert!(matches!(result.output, JobOutput::Image { .. }));

    // The sidecar parses back into a report.
    let sidecar = std::fs::read_to_string(output.with_extension("json")).expect("read sidecar");
    let parsed: serde_json::Value = serde_json::from_str(&sidecar).expect("parse sidecar");
    assert!(parsed.get("metrics_before").is_some());
    assert!(parsed.get("grade_after").is_some());
}

#[test]
fn test_pdf_auto_job_substitutes_everything() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("scan.pdf");
    let output = dir.path().join("processed_scan.pdf");
    write_test_pdf(&input, &[vec![[140, 140, 140]], vec![[30, 60, 90]]]);

    let config = JobConfig {
        input_path: input.clone(),
        output_path: output.clone(),
        staging_dir: dir.path().join(".staging").join("scan"),
        jpeg_quality: 85,
        phase: Phase::Auto,
        selection: Vec::new(),
    };
    let result = run_job(&config).expect("run job");

    assert!(output.exists());
    match result.output {
        JobOutput::Committed { substituted } => assert_eq!(substituted, 2),
        _ => panic!("expected a committed result"),
    }
}

#[test]
fn test_pdf_stage_then_commit_jobs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("doc.pdf");
    let output = dir.path().join("processed_doc.pdf");
    let staging = dir.path().join(".staging").join("doc");
    write_test_pdf(&input, &[vec![[120, 120, 120], [10, 220, 10]]]);

    // Phase 1: stage for review.
    let stage_config = JobConfig {
        input_path: input.clone(),
        output_path: output.clone(),
        staging_dir: staging.clone(),
        jpeg_quality: 85,
        phase: Phase::Stage,
        selection: Vec::new(),
    };
    let result = run_job(&stage_config).expect("stage job");
    match result.output {
        JobOutput::Staged {
            images,
            report_path,
        } => {
            assert_eq!(images, 2);
            assert!(report_path.exists());
        }
        _ => panic!("expected a staged result"),
    }

    assert!(staging.join("page0_img0_original.png").exists());
    assert!(staging.join("page0_img0_enhanced.png").exists());
    assert!(staging.join("page0_img1_original.png").exists());
    assert!(staging.join("page0_img1_enhanced.png").exists());

    let report = StagingReport::load(staging.join("report.json")).expect("load report");
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].key, "0:0");
    assert_eq!(report.entries[1].key, "0:1");

    // Phase 2: the operator approved only the second image.
    let commit_config = JobConfig {
        input_path: input.clone(),
        output_path: output.clone(),
        staging_dir: staging.clone(),
        jpeg_quality: 85,
        phase: Phase::Commit,
        selection: vec![StageKey {
            page_index: 0,
            image_index: 1,
        }],
    };
    let result = run_job(&commit_config).expect("commit job");
    match result.output {
        JobOutput::Committed { substituted } => assert_eq!(substituted, 1),
        _ => panic!("expected a committed result"),
    }
    assert!(output.exists());
}

#[test]
fn test_commit_without_staging_report_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("doc.pdf");
    write_test_pdf(&input, &[vec![[120, 120, 120]]]);

    let config = JobConfig {
        input_path: input.clone(),
        output_path: dir.path().join("out.pdf"),
        staging_dir: dir.path().join(".staging").join("doc"),
        jpeg_quality: 85,
        phase: Phase::Commit,
        selection: vec![StageKey {
            page_index: 0,
            image_index: 0,
        }],
    };
    let result = run_job(&config);
    assert!(matches!(result, Err(EnhanceError::WorkflowError(_))));
}

#[test]
fn test_commit_with_empty_selection_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("doc.pdf");
    write_test_pdf(&input, &[vec![[120, 120, 120]]]);

    let config = JobConfig {
        input_path: input.clone(),
        output_path: dir.path().join("out.pdf"),
        staging_dir: dir.path().join(".staging").join("doc"),
        jpeg_quality: 85,
        phase: Phase::Commit,
        selection: Vec::new(),
    };
    let result = run_job(&config);
    assert!(matches!(result, Err(EnhanceError::ConfigError(_))));
}

#[test]
fn test_one_job_failure_does_not_stop_others() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good_input = dir.path().join("ok.pdf");
    write_test_pdf(&good_input, &[vec![[90, 90, 90]]]);

    let jobs = vec![
        JobConfig {
            input_path: dir.path().join("missing.pdf"),
            output_path: dir.path().join("missing_out.pdf"),
            staging_dir: dir.path().join(".staging").join("missing"),
            jpeg_quality: 85,
            phase: Phase::Auto,
            selection: Vec::new(),
        },
        JobConfig {
            input_path: good_input,
            output_path: dir.path().join("ok_out.pdf"),
            staging_dir: dir.path().join(".staging").join("ok"),
            jpeg_quality: 85,
            phase: Phase::Auto,
            selection: Vec::new(),
        },
    ];

    let results = run_all_jobs(&jobs);
    assert_eq!(results.len(), 2);
    assert!(results[0].is_err());
    assert!(results[1].is_ok());
}
