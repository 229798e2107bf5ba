//! Single-image pipeline: measure, enhance, re-measure, classify.

use image::DynamicImage;

use crate::analysis::{Grade, QualityMetrics, contrast_ratio};
use crate::enhance;

/// Result of processing one standalone raster image.
pub struct ProcessedImage {
    pub enhanced: DynamicImage,
    pub metrics_before: QualityMetrics,
    pub metrics_after: QualityMetrics,
    pub ratio_before: f64,
    pub ratio_after: f64,
    pub grade_before: Grade,
    pub grade_after: Grade,
}

/// Run the full measurement/enhancement pass over one image.
///
/// Fail-fast: any metric or enhancement failure propagates unchanged, no
/// partial result is produced.
pub fn process(image: &DynamicImage) -> crate::error::Result<ProcessedImage> {
    let metrics_before = QualityMetrics::measure(image)?;
    let ratio_before = contrast_ratio(image)?;
    let grade_before = Grade::from_ratio(ratio_before);

    let enhanced = enhance::enhance(image)?;

    let metrics_after = QualityMetrics::measure(&enhanced)?;
    let ratio_after = contrast_ratio(&enhanced)?;
    let grade_after = Grade::from_ratio(ratio_after);

    tracing::debug!(
        ratio_before,
        ratio_after,
        %grade_before,
        %grade_after,
        "processed image"
    );

    Ok(ProcessedImage {
        enhanced,
        metrics_before,
        metrics_after,
        ratio_before,
        ratio_after,
        grade_before,
        grade_after,
    })
}
