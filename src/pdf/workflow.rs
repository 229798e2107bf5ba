//! PDF画像置換の2フェーズワークフロー。
//!
//! Phase 1 (stage): 全ページの画像XObjectを文書順に取り出し、計測 → 強調 →
//! 再計測して StagedPair として保持する。Phase 2 (commit): 承認された
//! キー集合の候補ストリームだけを文書に書き戻す。状態遷移は
//! `Created → Staged → Committed` または `Created → Staged → Failed` のみ。
//!
//! コミットは全キーの解決が成功した場合にのみ書き込みを行う（解決失敗時は
//! 文書を一切変更しない）。

use std::path::Path;
use std::str::FromStr;

use image::DynamicImage;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::analysis::{Grade, QualityMetrics, contrast_ratio};
use crate::enhance;
use crate::error::EnhanceError;
use crate::pdf::image_xobject::{
    self, EncodedImage, decode_image_stream, encode_to_filter, read_image_meta,
};
use crate::pdf::reader::{ImageXObjectRef, PdfReader};

/// ステージングキー。文書内の1つの埋め込み画像を一意に識別する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageKey {
    pub page_index: u32,
    pub image_index: u32,
}

impl std::fmt::Display for StageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_index, self.image_index)
    }
}

impl FromStr for StageKey {
    type Err = EnhanceError;

    /// `"page:image"` 形式（どちらも0始まり）をパースする。
    fn from_str(s: &str) -> crate::error::Result<Self> {
        let (page, image) = s
            .split_once(':')
            .ok_or_else(|| EnhanceError::config(format!("invalid stage key: '{s}'")))?;
        let page_index = page
            .trim()
            .parse()
            .map_err(|_| EnhanceError::config(format!("invalid page index in key: '{s}'")))?;
        let image_index = image
            .trim()
            .parse()
            .map_err(|_| EnhanceError::config(format!("invalid image index in key: '{s}'")))?;
        Ok(StageKey {
            page_index,
            image_index,
        })
    }
}

/// レビュー用に保持される原本/候補のペア。
#[derive(Debug, Clone)]
pub struct StagedPair {
    pub key: StageKey,
    pub xobject_name: String,
    pub object_id: lopdf::ObjectId,
    pub original: DynamicImage,
    pub candidate: DynamicImage,
    pub original_metrics: QualityMetrics,
    pub candidate_metrics: QualityMetrics,
    pub original_ratio: f64,
    pub candidate_ratio: f64,
    pub original_grade: Grade,
    pub candidate_grade: Grade,
    /// コミット時に書き込まれる確定済みバイト列。
    pub encoded: EncodedImage,
    /// encoded.data の SHA-256 (hex)。フェーズ境界の往復検証に使う。
    pub digest: String,
}

/// ワークフロー状態。終端状態からの再ステージングはできない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Created,
    Staged,
    Committed,
    Failed,
}

/// 1つの文書を排他的に所有する置換ワークフロー。
pub struct PdfWorkflow {
    reader: PdfReader,
    state: WorkflowState,
    staged: Vec<StagedPair>,
    jpeg_quality: u8,
}

impl PdfWorkflow {
    /// PDFファイルを開いてワークフローを作成する。
    pub fn open(path: impl AsRef<Path>, jpeg_quality: u8) -> crate::error::Result<Self> {
        Ok(Self::new(PdfReader::open(path)?, jpeg_quality))
    }

    /// メモリ上のPDFバイト列からワークフローを作成する。
    pub fn from_bytes(bytes: &[u8], jpeg_quality: u8) -> crate::error::Result<Self> {
        Ok(Self::new(PdfReader::from_bytes(bytes)?, jpeg_quality))
    }

    fn new(reader: PdfReader, jpeg_quality: u8) -> Self {
        Self {
            reader,
            state: WorkflowState::Created,
            staged: Vec::new(),
            jpeg_quality,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn page_count(&self) -> u32 {
        self.reader.page_count()
    }

    pub fn staged(&self) -> &[StagedPair] {
        &self.staged
    }

    /// Phase 1: 全埋め込み画像を (page_index, image_index) 昇順でステージする。
    ///
    /// 画像単位の処理はrayonで並列化するが、出力順序は文書の列挙順を保つ。
    pub fn stage(&mut self) -> crate::error::Result<&[StagedPair]> {
        if self.state != WorkflowState::Created {
            return Err(EnhanceError::workflow(format!(
                "stage() requires Created state, current: {:?}",
                self.state
            )));
        }

        // 逐次で参照を解決してから並列で画像処理する
        let mut refs: Vec<(StageKey, ImageXObjectRef)> = Vec::new();
        let page_count = self.reader.page_count();
        for page_num in 1..=page_count {
            let page_refs = self.reader.page_image_xobjects(page_num)?;
            for (image_index, r) in page_refs.into_iter().enumerate() {
                let key = StageKey {
                    page_index: page_num - 1,
                    image_index: image_index as u32,
                };
                refs.push((key, r));
            }
        }

        tracing::info!(pages = page_count, images = refs.len(), "staging document");

        let jpeg_quality = self.jpeg_quality;
        let staged: crate::error::Result<Vec<StagedPair>> = refs
            .into_par_iter()
            .map(|(key, r)| stage_one(key, r, jpeg_quality))
            .collect();

        match staged {
            Ok(pairs) => {
                self.staged = pairs;
                self.state = WorkflowState::Staged;
                Ok(&self.staged)
            }
            Err(e) => {
                self.state = WorkflowState::Failed;
                Err(e)
            }
        }
    }

    /// Phase 2: 承認されたキー集合の候補を文書に書き戻す。
    ///
    /// 全キーの解決に成功した場合のみ書き込む。解決に失敗した場合は文書を
    /// 変更せず Failed に遷移する。戻り値は置換した画像数。
    pub fn commit(&mut self, selection: &[StageKey]) -> crate::error::Result<usize> {
        if self.state != WorkflowState::Staged {
            return Err(EnhanceError::workflow(format!(
                "commit() requires Staged state, current: {:?}",
                self.state
            )));
        }

        let resolved: crate::error::Result<Vec<&StagedPair>> = selection
            .iter()
            .map(|key| self.resolve_key(key))
            .collect();

        let resolved = match resolved {
            Ok(pairs) => pairs,
            Err(e) => {
                self.state = WorkflowState::Failed;
                return Err(e);
            }
        };

        let replacements: Vec<(lopdf::ObjectId, lopdf::Stream)> = resolved
            .iter()
            .map(|pair| {
                let stream = image_xobject::replacement_stream(
                    find_stream(&self.reader, pair.object_id),
                    &pair.encoded,
                    pair.candidate.width(),
                    pair.candidate.height(),
                );
                (pair.object_id, stream)
            })
            .collect();

        let count = replacements.len();
        let doc = self.reader.document_mut();
        for (id, stream) in replacements {
            doc.objects.insert(id, lopdf::Object::Stream(stream));
        }

        tracing::info!(substituted = count, "commit complete");
        self.state = WorkflowState::Committed;
        Ok(count)
    }

    /// 選択キーをStagedPairに解決する。
    ///
    /// - ページが文書範囲外: StagingKeyMismatch
    /// - ページは存在するが画像がステージされていない: NoEmbeddedImage
    /// - 画像indexだけが範囲外: StagingKeyMismatch
    fn resolve_key(&self, key: &StageKey) -> crate::error::Result<&StagedPair> {
        if key.page_index >= self.reader.page_count() {
            return Err(EnhanceError::staging_key_mismatch(format!(
                "page index {} out of range (document has {} pages)",
                key.page_index,
                self.reader.page_count()
            )));
        }

        let page_pairs: Vec<&StagedPair> = self
            .staged
            .iter()
            .filter(|p| p.key.page_index == key.page_index)
            .collect();

        if page_pairs.is_empty() {
            return Err(EnhanceError::no_embedded_image(format!(
                "page {} has no embedded image to replace",
                key.page_index
            )));
        }

        page_pairs
            .into_iter()
            .find(|p| p.key.image_index == key.image_index)
            .ok_or_else(|| {
                EnhanceError::staging_key_mismatch(format!(
                    "no staged image {} on page {}",
                    key.image_index, key.page_index
                ))
            })
    }

    /// コミット済み文書を保存する。
    pub fn save(&mut self, path: impl AsRef<Path>) -> crate::error::Result<()> {
        self.reader
            .document_mut()
            .save(path)
            .map_err(|e| EnhanceError::pdf_write(e.to_string()))?;
        Ok(())
    }

    /// コミット済み文書をバイト列として出力する。
    pub fn save_to_bytes(&mut self) -> crate::error::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader
            .document_mut()
            .save_to(&mut buf)
            .map_err(|e| EnhanceError::pdf_write(e.to_string()))?;
        Ok(buf)
    }
}

fn find_stream(reader: &PdfReader, id: lopdf::ObjectId) -> &lopdf::Stream {
    // ステージング時にObjectIdを解決済みなので、ここでの失敗は起こらない。
    match reader.document().get_object(id) {
        Ok(lopdf::Object::Stream(s)) => s,
        _ => unreachable!("staged object id must reference a stream"),
    }
}

/// 1画像のステージング処理: デコード → 計測 → 強調 → 再計測 → 再エンコード。
fn stage_one(
    key: StageKey,
    r: ImageXObjectRef,
    jpeg_quality: u8,
) -> crate::error::Result<StagedPair> {
    let meta = read_image_meta(&r.stream)?;
    let original = decode_image_stream(&r.stream, &meta)?;

    let original_metrics = QualityMetrics::measure(&original)?;
    let original_ratio = contrast_ratio(&original)?;

    let candidate = enhance::enhance(&original)?;

    let candidate_metrics = QualityMetrics::measure(&candidate)?;
    let candidate_ratio = contrast_ratio(&candidate)?;

    let encoded = encode_to_filter(&candidate, &meta, jpeg_quality)?;
    let digest = hex::encode(Sha256::digest(&encoded.data));

    tracing::debug!(
        key = %key,
        name = %r.name,
        ratio_before = original_ratio,
        ratio_after = candidate_ratio,
        "staged image"
    );

    Ok(StagedPair {
        key,
        xobject_name: r.name,
        object_id: r.id,
        original_grade: Grade::from_ratio(original_ratio),
        candidate_grade: Grade::from_ratio(candidate_ratio),
        original,
        candidate,
        original_metrics,
        candidate_metrics,
        original_ratio,
        candidate_ratio,
        encoded,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_key_parse_and_display() {
        let key: StageKey = "3:1".parse().expect("parse");
        assert_eq!(
            key,
            StageKey {
                page_index: 3,
                image_index: 1
            }
        );
        assert_eq!(key.to_string(), "3:1");
    }

    #[test]
    fn test_stage_key_parse_errors() {
        assert!("".parse::<StageKey>().is_err());
        assert!("3".parse::<StageKey>().is_err());
        assert!("a:b".parse::<StageKey>().is_err());
        assert!("1:".parse::<StageKey>().is_err());
    }
}
