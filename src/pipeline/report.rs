//! JSON artifacts handed to the review presentation layer.
//!
//! The staging report is the bridge across the Phase 1 / Phase 2 request
//! boundary: it records the stage keys, exported image files and candidate
//! digests so a later commit run can verify that restaging reproduced the
//! exact bytes the operator reviewed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{Grade, QualityMetrics};
use crate::pdf::workflow::StagedPair;

pub const REPORT_FILE: &str = "report.json";

/// One staged original/candidate pair as presented for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingEntry {
    pub key: String,
    pub page_index: u32,
    pub image_index: u32,
    pub xobject_name: String,
    pub original_file: String,
    pub candidate_file: String,
    pub original_metrics: QualityMetrics,
    pub candidate_metrics: QualityMetrics,
    pub original_ratio: f64,
    pub candidate_ratio: f64,
    pub original_grade: Grade,
    pub candidate_grade: Grade,
    pub digest: String,
}

/// Full Phase 1 output for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingReport {
    pub document: String,
    pub entries: Vec<StagingEntry>,
}

impl StagingReport {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, pair: &StagedPair, original_file: String, candidate_file: String) {
        self.entries.push(StagingEntry {
            key: pair.key.to_string(),
            page_index: pair.key.page_index,
            image_index: pair.key.image_index,
            xobject_name: pair.xobject_name.clone(),
            original_file,
            candidate_file,
            original_metrics: pair.original_metrics,
            candidate_metrics: pair.candidate_metrics,
            original_ratio: pair.original_ratio,
            candidate_ratio: pair.candidate_ratio,
            original_grade: pair.original_grade,
            candidate_grade: pair.candidate_grade,
            digest: pair.digest.clone(),
        });
    }

    pub fn save(&self, path: impl AsRef<Path>) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Digest recorded for a stage key, if the key was staged.
    pub fn digest_for(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.digest.as_str())
    }
}

/// Metrics sidecar written next to a processed standalone image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReport {
    pub input: String,
    pub output: String,
    pub metrics_before: QualityMetrics,
    pub metrics_after: QualityMetrics,
    pub ratio_before: f64,
    pub ratio_after: f64,
    pub grade_before: Grade,
    pub grade_after: Grade,
}

impl ImageReport {
    pub fn save(&self, path: impl AsRef<Path>) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_roundtrip() {
        let mut report = StagingReport::new("scan.pdf");
        report.entries.push(StagingEntry {
            key: "0:0".to_string(),
            page_index: 0,
            image_index: 0,
            xobject_name: "Im1".to_string(),
            original_file: "page0_img0_original.png".to_string(),
            candidate_file: "page0_img0_enhanced.png".to_string(),
            original_metrics: QualityMetrics {
                brightness: 100.0,
                contrast: 10.0,
                sharpness: 5.0,
            },
            candidate_metrics: QualityMetrics {
                brightness: 110.0,
                contrast: 20.0,
                sharpness: 6.0,
            },
            original_ratio: 2.5,
            candidate_ratio: 5.0,
            original_grade: Grade::Fail,
            candidate_grade: Grade::Aa,
            digest: "ab".repeat(32),
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(REPORT_FILE);
        report.save(&path).expect("save");
        let loaded = StagingReport::load(&path).expect("load");
        assert_eq!(loaded.document, "scan.pdf");
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.digest_for("0:0"), Some("ab".repeat(32).as_str()));
        assert_eq!(loaded.digest_for("1:0"), None);
    }
}
