use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 出力ファイル名に付ける接頭辞。
    pub output_prefix: String,
    /// ステージング成果物(原本/候補PNGとreport.json)の出力先。
    pub staging_dir: PathBuf,
    /// 候補再エンコード時のJPEG品質 (1-100)。
    pub jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output_prefix: "processed_".to_string(),
            staging_dir: PathBuf::from(".staging"),
            jpeg_quality: 85,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::EnhanceError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
