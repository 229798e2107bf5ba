// 画像XObjectのデコード/再エンコード

use std::io::{Cursor, Read};

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::Object;

use crate::error::EnhanceError;

/// 画像XObjectのメタデータ
#[derive(Debug, Clone)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: String,
    pub filter: Option<String>,
}

/// 再エンコード済み候補画像データ
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    /// 空文字列は非圧縮(Filterなし)を表す。
    pub filter: String,
    pub color_space: String,
    pub bits_per_component: u8,
}

/// 画像XObjectのストリームから画像メタデータを読み取る。
pub fn read_image_meta(stream: &lopdf::Stream) -> crate::error::Result<ImageMeta> {
    let dict = &stream.dict;

    let width = dict_get_u32(dict, b"Width")?;
    let height = dict_get_u32(dict, b"Height")?;
    // BitsPerComponent: missing keyの場合のみデフォルト8、型エラーは伝播
    let bits_per_component = match dict.get(b"BitsPerComponent") {
        Ok(_) => dict_get_u32(dict, b"BitsPerComponent")? as u8,
        Err(_) => 8,
    };

    let color_space = match dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).to_string(),
        _ => "DeviceRGB".to_string(),
    };

    let filter = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).to_string()),
        Ok(Object::Array(arr)) => {
            // フィルタ連鎖: 最初のフィルタを取得
            arr.first().and_then(|obj| {
                if let Object::Name(name) = obj {
                    Some(String::from_utf8_lossy(name).to_string())
                } else {
                    None
                }
            })
        }
        _ => None,
    };

    Ok(ImageMeta {
        width,
        height,
        bits_per_component,
        color_space,
        filter,
    })
}

/// 辞書からu32値を取得するヘルパー（負の値はエラー）
fn dict_get_u32(dict: &lopdf::Dictionary, key: &[u8]) -> crate::error::Result<u32> {
    match dict.get(key) {
        Ok(Object::Integer(i)) => {
            let val = *i;
            if val < 0 || val > u32::MAX as i64 {
                Err(EnhanceError::pdf_read(format!(
                    "Value out of u32 range for {:?}: {}",
                    String::from_utf8_lossy(key),
                    val
                )))
            } else {
                Ok(val as u32)
            }
        }
        Ok(Object::Real(f)) => {
            let val = *f;
            if val < 0.0 || val > u32::MAX as f32 {
                Err(EnhanceError::pdf_read(format!(
                    "Value out of u32 range for {:?}: {}",
                    String::from_utf8_lossy(key),
                    val
                )))
            } else {
                Ok(val as u32)
            }
        }
        Ok(other) => Err(EnhanceError::pdf_read(format!(
            "Expected integer for {:?}, got {:?}",
            String::from_utf8_lossy(key),
            other
        ))),
        Err(_) => Err(EnhanceError::pdf_read(format!(
            "Missing required key: {:?}",
            String::from_utf8_lossy(key),
        ))),
    }
}

/// 画像XObjectのストリームデータをデコードしてDynamicImageに変換する。
///
/// 対応フィルタ:
/// - DCTDecode (JPEG)
/// - FlateDecode (raw pixels + zlib)
/// - 非圧縮 (raw pixels)
pub fn decode_image_stream(
    stream: &lopdf::Stream,
    meta: &ImageMeta,
) -> crate::error::Result<DynamicImage> {
    let raw = &stream.content;

    match meta.filter.as_deref() {
        Some("DCTDecode") => decode_jpeg(raw),
        Some("FlateDecode") => decode_flate(raw, meta),
        None => decode_raw(raw, meta),
        Some(other) => Err(EnhanceError::image_codec(format!(
            "Unsupported image filter: {}",
            other
        ))),
    }
}

/// JPEGデータをデコード
fn decode_jpeg(data: &[u8]) -> crate::error::Result<DynamicImage> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| EnhanceError::image_codec(format!("JPEG decode error: {}", e)))?;
    reader
        .decode()
        .map_err(|e| EnhanceError::image_codec(format!("JPEG decode error: {}", e)))
}

/// FlateDecode (zlib) で圧縮されたraw pixelデータをデコード
fn decode_flate(data: &[u8], meta: &ImageMeta) -> crate::error::Result<DynamicImage> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| EnhanceError::image_codec(format!("FlateDecode error: {}", e)))?;
    decode_raw(&decompressed, meta)
}

/// Raw pixelデータからDynamicImageを構築
fn decode_raw(data: &[u8], meta: &ImageMeta) -> crate::error::Result<DynamicImage> {
    let w = meta.width;
    let h = meta.height;

    match (meta.color_space.as_str(), meta.bits_per_component) {
        ("DeviceRGB", 8) => {
            let expected = (w as usize) * (h as usize) * 3;
            if data.len() < expected {
                return Err(EnhanceError::image_codec(format!(
                    "RGB data too short: expected {}, got {}",
                    expected,
                    data.len()
                )));
            }
            let img = RgbImage::from_raw(w, h, data[..expected].to_vec()).ok_or_else(|| {
                EnhanceError::image_codec("Failed to create RGB image from raw data")
            })?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        ("DeviceGray", 8) => {
            let expected = (w as usize) * (h as usize);
            if data.len() < expected {
                return Err(EnhanceError::image_codec(format!(
                    "Gray data too short: expected {}, got {}",
                    expected,
                    data.len()
                )));
            }
            let img = GrayImage::from_raw(w, h, data[..expected].to_vec()).ok_or_else(|| {
                EnhanceError::image_codec("Failed to create Gray image from raw data")
            })?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        (cs, bpc) => Err(EnhanceError::image_codec(format!(
            "Unsupported color space / BPC combination: {} / {}",
            cs, bpc
        ))),
    }
}

/// 画像を元のフィルタ形式に合わせて再エンコードする。
///
/// 元がDCTDecodeならJPEG、FlateDecodeならzlib圧縮raw、Filterなしなら
/// 非圧縮rawで返す。候補ストリームのバイト列はここで確定し、以後
/// コミットまで変更されない。
pub fn encode_to_filter(
    img: &DynamicImage,
    meta: &ImageMeta,
    jpeg_quality: u8,
) -> crate::error::Result<EncodedImage> {
    let is_gray = !img.color().has_color();
    let color_space = if is_gray { "DeviceGray" } else { "DeviceRGB" };

    let (data, filter) = match meta.filter.as_deref() {
        Some("DCTDecode") => {
            let data = if is_gray {
                encode_gray_to_jpeg(&img.to_luma8(), jpeg_quality)?
            } else {
                encode_rgb_to_jpeg(&img.to_rgb8(), jpeg_quality)?
            };
            (data, "DCTDecode".to_string())
        }
        Some("FlateDecode") => {
            let raw = if is_gray {
                img.to_luma8().into_raw()
            } else {
                img.to_rgb8().into_raw()
            };
            (flate_encode(&raw)?, "FlateDecode".to_string())
        }
        None => {
            // 元が非圧縮の場合はそのまま非圧縮で返す
            let raw = if is_gray {
                img.to_luma8().into_raw()
            } else {
                img.to_rgb8().into_raw()
            };
            (raw, String::new())
        }
        Some(other) => {
            return Err(EnhanceError::image_codec(format!(
                "Cannot re-encode unsupported filter: {}",
                other
            )));
        }
    };

    Ok(EncodedImage {
        data,
        filter,
        color_space: color_space.to_string(),
        bits_per_component: 8,
    })
}

/// 置換用の画像XObjectストリームを構築する。
///
/// 元ストリームの辞書を引き継ぎ、寸法・色空間・フィルタを候補に合わせて
/// 上書きする。DecodeParmsは再エンコードで無効になるため取り除く。
pub fn replacement_stream(
    original: &lopdf::Stream,
    encoded: &EncodedImage,
    width: u32,
    height: u32,
) -> lopdf::Stream {
    let mut dict = original.dict.clone();
    dict.set("Width", width as i64);
    dict.set("Height", height as i64);
    dict.set("ColorSpace", Object::Name(encoded.color_space.clone().into_bytes()));
    dict.set("BitsPerComponent", encoded.bits_per_component as i64);
    dict.remove(b"DecodeParms");
    dict.remove(b"Decode");
    if encoded.filter.is_empty() {
        dict.remove(b"Filter");
    } else {
        dict.set("Filter", Object::Name(encoded.filter.clone().into_bytes()));
    }

    lopdf::Stream::new(dict, encoded.data.clone())
}

/// Encode an already-converted RGB image to JPEG bytes.
pub fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    check_quality(quality)?;
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

/// Encode a grayscale image to JPEG bytes.
pub fn encode_gray_to_jpeg(gray: &GrayImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    check_quality(quality)?;
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    gray.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

fn check_quality(quality: u8) -> crate::error::Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(EnhanceError::image_codec(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }
    Ok(())
}

/// zlibで圧縮
pub fn flate_encode(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| EnhanceError::image_codec(format!("Flate encode error: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| EnhanceError::image_codec(format!("Flate encode error: {}", e)))
}
