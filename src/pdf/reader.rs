use std::path::Path;

use lopdf::{Document, Object};

/// ページ内の画像XObjectへの参照。
///
/// ステージング時に解決したObjectIdを保持し、コミット時の再列挙を避ける。
#[derive(Debug, Clone)]
pub struct ImageXObjectRef {
    pub name: String,
    pub id: lopdf::ObjectId,
    pub stream: lopdf::Stream,
}

pub struct PdfReader {
    doc: Document,
}

impl PdfReader {
    /// PDFファイルを開いてPdfReaderを作成する。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let doc = Document::load(path)?;
        Ok(Self { doc })
    }

    /// メモリ上のPDFバイト列からPdfReaderを作成する。
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self { doc })
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// 内部のlopdf Documentへの可変参照を返す。
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// 指定ページ(1-indexed)の画像XObjectをリソース辞書の列挙順で返す。
    ///
    /// 返す順序は観測可能な契約であり、ステージングキーの image_index は
    /// この順序に対して振られる。Reference経由でないStream値は置換対象の
    /// ObjectIdを持たないためスキップする。
    pub fn page_image_xobjects(
        &self,
        page_num: u32,
    ) -> crate::error::Result<Vec<ImageXObjectRef>> {
        let page_id = self.get_page_id(page_num)?;
        let (resource_dict, resource_ids) = self.doc.get_page_resources(page_id)?;

        let mut refs: Vec<ImageXObjectRef> = Vec::new();

        if let Some(dict) = resource_dict {
            self.collect_image_refs_from_dict(dict, &mut refs)?;
        }
        for res_id in resource_ids {
            let dict = self.doc.get_dictionary(res_id)?;
            self.collect_image_refs_from_dict(dict, &mut refs)?;
        }

        Ok(refs)
    }

    /// リソース辞書のXObjectエントリからSubtype=Imageのストリーム参照を
    /// 列挙順のまま収集する。
    fn collect_image_refs_from_dict(
        &self,
        dict: &lopdf::Dictionary,
        refs: &mut Vec<ImageXObjectRef>,
    ) -> crate::error::Result<()> {
        let xobject_entry = match dict.get(b"XObject") {
            Ok(entry) => entry,
            Err(_) => return Ok(()), // XObjectエントリがない場合は何もしない
        };

        let xobject_dict = match xobject_entry {
            Object::Dictionary(d) => d,
            Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_dict)?,
            _ => return Ok(()),
        };

        for (name_bytes, value) in xobject_dict.iter() {
            let name = String::from_utf8_lossy(name_bytes).into_owned();

            let id = match value {
                Object::Reference(id) => *id,
                Object::Stream(_) => {
                    tracing::warn!(name, "inline image XObject cannot be substituted, skipping");
                    continue;
                }
                _ => continue,
            };

            let stream = self.doc.get_object(id).and_then(Object::as_stream)?;

            if let Ok(subtype) = stream.dict.get(b"Subtype").and_then(Object::as_name)
                && subtype == b"Image"
                && !refs.iter().any(|r| r.id == id)
            {
                refs.push(ImageXObjectRef {
                    name,
                    id,
                    stream: stream.clone(),
                });
            }
        }

        Ok(())
    }

    /// ページ番号(1-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_num: u32) -> crate::error::Result<lopdf::ObjectId> {
        let pages = self.doc.get_pages();
        pages.get(&page_num).copied().ok_or_else(|| {
            crate::error::EnhanceError::pdf_read(format!("page {} not found", page_num))
        })
    }
}
