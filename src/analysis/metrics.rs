//! Objective quality metrics over a decoded image buffer.
//!
//! All functions are pure and total for non-empty buffers; zero-dimension
//! input is rejected with `InvalidImage`.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::error::EnhanceError;

/// Immutable metric record for one image snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub brightness: f64,
    pub contrast: f64,
    pub sharpness: f64,
}

impl QualityMetrics {
    /// Compute all three metrics in one pass over the image.
    pub fn measure(image: &DynamicImage) -> crate::error::Result<Self> {
        Ok(QualityMetrics {
            brightness: brightness(image)?,
            contrast: contrast(image)?,
            sharpness: sharpness(image)?,
        })
    }
}

fn check_dimensions(image: &DynamicImage) -> crate::error::Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EnhanceError::invalid_image(format!(
            "zero-dimension buffer: {}x{}",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Mean of the HSV value channel, range [0, 255].
pub fn brightness(image: &DynamicImage) -> crate::error::Result<f64> {
    check_dimensions(image)?;
    let rgb = image.to_rgb8();
    let sum: f64 = rgb
        .pixels()
        .map(|p| color::hsv_value(p.0[0], p.0[1], p.0[2]) as f64)
        .sum();
    Ok(sum / (rgb.width() as f64 * rgb.height() as f64))
}

/// Population standard deviation of the CIELAB lightness channel
/// (8-bit scaled).
pub fn contrast(image: &DynamicImage) -> crate::error::Result<f64> {
    check_dimensions(image)?;
    let rgb = image.to_rgb8();
    let n = rgb.width() as f64 * rgb.height() as f64;

    let lightness: Vec<f64> = rgb
        .pixels()
        .map(|p| color::rgb_to_lab(p.0[0], p.0[1], p.0[2])[0] as f64)
        .collect();

    let mean = lightness.iter().sum::<f64>() / n;
    let var = lightness.iter().map(|l| (l - mean) * (l - mean)).sum::<f64>() / n;
    Ok(var.sqrt())
}

/// Variance of a discrete 4-neighbour Laplacian over the luminance plane.
///
/// Borders are handled by edge replication so a flat image yields exactly 0.
pub fn sharpness(image: &DynamicImage) -> crate::error::Result<f64> {
    check_dimensions(image)?;
    let gray = image.to_luma8();
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    let n = (w * h) as f64;

    let at = |x: i64, y: i64| -> f64 {
        let x = x.clamp(0, w - 1) as u32;
        let y = y.clamp(0, h - 1) as u32;
        gray.get_pixel(x, y).0[0] as f64
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let v = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += v;
            sum_sq += v * v;
        }
    }

    let mean = sum / n;
    Ok(sum_sq / n - mean * mean)
}

/// `(max_luma + 0.05) / (min_luma + 0.05)` over all pixels.
///
/// A perfectly flat image yields exactly 1.0.
pub fn contrast_ratio(image: &DynamicImage) -> crate::error::Result<f64> {
    check_dimensions(image)?;
    let gray = image.to_luma8();

    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for p in gray.pixels() {
        min = min.min(p.0[0]);
        max = max.max(p.0[0]);
    }

    let ratio = (max as f64 + 0.05) / (min as f64 + 0.05);
    tracing::debug!(min, max, ratio, "contrast ratio");
    Ok(ratio)
}
