use serde::Deserialize;

use crate::pdf::workflow::StageKey;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// PDFジョブの実行フェーズ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// ステージして全候補を即コミットする（レビューなし）。
    Auto,
    /// ステージのみ: レビュー用成果物を書き出して終了する。
    Stage,
    /// selectで指定されたキーのみコミットする。
    Commit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: String,
    pub output: Option<String>,
    pub phase: Option<Phase>,
    /// commitフェーズで置換するステージングキー ("page:image")。
    pub select: Option<Vec<String>>,
    pub jpeg_quality: Option<u8>,
}

impl Job {
    /// select のキー文字列を解析して返す。重複は除去し昇順に揃える。
    pub fn resolve_selection(&self) -> crate::error::Result<Vec<StageKey>> {
        let raw = self.select.as_deref().unwrap_or(&[]);
        let mut keys = Vec::with_capacity(raw.len());
        for s in raw {
            keys.push(s.parse::<StageKey>()?);
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
