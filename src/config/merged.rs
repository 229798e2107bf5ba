use std::path::PathBuf;

use super::job::{Job, Phase};
use super::settings::Settings;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub output_prefix: String,
    pub staging_dir: PathBuf,
    pub jpeg_quality: u8,
    pub phase: Phase,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        MergedConfig {
            output_prefix: settings.output_prefix.clone(),
            staging_dir: settings.staging_dir.clone(),
            jpeg_quality: job.jpeg_quality.unwrap_or(settings.jpeg_quality),
            phase: job.phase.unwrap_or(Phase::Auto),
        }
    }
}
