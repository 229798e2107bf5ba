//! Contrast-limited local enhancement on the lightness channel.
//!
//! Colour images are decomposed to CIELAB, CLAHE runs on L only and the
//! chroma planes are carried over untouched, so no colour shifts are
//! introduced. Grayscale images get CLAHE on the single plane directly.

pub mod clahe;

use image::{DynamicImage, GrayImage, RgbImage};

use crate::color;
use crate::error::EnhanceError;

/// Enhance one image buffer. Deterministic; output has the same dimensions
/// and channel count as the input.
///
/// Only 8-bit buffers are supported; anything else fails with
/// `EnhancementFailure`.
pub fn enhance(image: &DynamicImage) -> crate::error::Result<DynamicImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EnhanceError::invalid_image(format!(
            "zero-dimension buffer: {}x{}",
            image.width(),
            image.height()
        )));
    }

    match image {
        DynamicImage::ImageLuma8(gray) => {
            Ok(DynamicImage::ImageLuma8(clahe::apply_clahe(gray)?))
        }
        DynamicImage::ImageLumaA8(gray_alpha) => {
            let (w, h) = gray_alpha.dimensions();
            let mut plane = GrayImage::new(w, h);
            for (x, y, p) in gray_alpha.enumerate_pixels() {
                plane.put_pixel(x, y, image::Luma([p.0[0]]));
            }
            let enhanced = clahe::apply_clahe(&plane)?;
            let mut out = gray_alpha.clone();
            for (x, y, p) in out.enumerate_pixels_mut() {
                p.0[0] = enhanced.get_pixel(x, y).0[0];
            }
            Ok(DynamicImage::ImageLumaA8(out))
        }
        DynamicImage::ImageRgb8(rgb) => Ok(DynamicImage::ImageRgb8(enhance_rgb(rgb)?)),
        DynamicImage::ImageRgba8(rgba) => {
            let rgb = DynamicImage::ImageRgba8(rgba.clone()).to_rgb8();
            let enhanced = enhance_rgb(&rgb)?;
            let mut out = rgba.clone();
            for (x, y, p) in out.enumerate_pixels_mut() {
                let e = enhanced.get_pixel(x, y);
                p.0[0] = e.0[0];
                p.0[1] = e.0[1];
                p.0[2] = e.0[2];
            }
            Ok(DynamicImage::ImageRgba8(out))
        }
        other => Err(EnhanceError::enhancement(format!(
            "unsupported buffer format: {:?}",
            other.color()
        ))),
    }
}

/// CLAHE on the CIELAB lightness plane of an RGB image.
fn enhance_rgb(rgb: &RgbImage) -> crate::error::Result<RgbImage> {
    let (w, h) = rgb.dimensions();

    let mut l_plane = GrayImage::new(w, h);
    let mut a_plane = vec![0u8; (w * h) as usize];
    let mut b_plane = vec![0u8; (w * h) as usize];

    for (x, y, p) in rgb.enumerate_pixels() {
        let [l, a, b] = color::rgb_to_lab(p.0[0], p.0[1], p.0[2]);
        l_plane.put_pixel(x, y, image::Luma([l]));
        let idx = (y * w + x) as usize;
        a_plane[idx] = a;
        b_plane[idx] = b;
    }

    let l_enhanced = clahe::apply_clahe(&l_plane)?;

    let mut out = RgbImage::new(w, h);
    for (x, y, p) in out.enumerate_pixels_mut() {
        let idx = (y * w + x) as usize;
        let l = l_enhanced.get_pixel(x, y).0[0];
        let [r, g, b] = color::lab_to_rgb(l, a_plane[idx], b_plane[idx]);
        *p = image::Rgb([r, g, b]);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, Rgba, RgbaImage};

    #[test]
    fn test_preserves_dimensions_and_channels() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([120, 60, 60])));
        let out = enhance(&rgb).expect("enhance rgb");
        assert_eq!(out.dimensions(), (40, 30));
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(17, 23, image::Luma([99])));
        let out = enhance(&gray).expect("enhance gray");
        assert_eq!(out.dimensions(), (17, 23));
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_alpha_untouched() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([80, 80, 80, 42])));
        let out = enhance(&rgba).expect("enhance rgba");
        let out = out.to_rgba8();
        for p in out.pixels() {
            assert_eq!(p.0[3], 42);
        }
    }

    #[test]
    fn test_rejects_zero_dimension() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        assert!(matches!(enhance(&img), Err(EnhanceError::InvalidImage(_))));
    }

    #[test]
    fn test_rejects_16bit_buffers() {
        let img = DynamicImage::ImageLuma16(image::ImageBuffer::new(8, 8));
        assert!(matches!(
            enhance(&img),
            Err(EnhanceError::EnhancementFailure(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let mut rgb = RgbImage::new(32, 32);
        for (x, y, p) in rgb.enumerate_pixels_mut() {
            *p = Rgb([(x * 7) as u8, (y * 5) as u8, 128]);
        }
        let img = DynamicImage::ImageRgb8(rgb);
        let a = enhance(&img).expect("first run");
        let b = enhance(&img).expect("second run");
        assert_eq!(a.to_rgb8().as_raw(), b.to_rgb8().as_raw());
    }
}
