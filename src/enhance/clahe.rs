//! Contrast-limited adaptive histogram equalization over one 8-bit plane.
//!
//! Per-tile histograms are clipped at the limit, the excess is redistributed
//! evenly, and the resulting per-tile lookup tables are blended bilinearly
//! per pixel so tile seams stay invisible.

use image::GrayImage;

use crate::error::EnhanceError;

/// Fixed clip limit. Policy constant, not configurable.
pub const CLIP_LIMIT: f64 = 2.0;

/// Fixed tile grid (8x8). Policy constant, not configurable.
pub const TILE_GRID: u32 = 8;

const HIST_BINS: usize = 256;

/// Equalization lookup table for one tile.
type TileLut = [u8; HIST_BINS];

/// Apply CLAHE to a single 8-bit plane.
///
/// The grid shrinks below 8x8 only when the plane itself has fewer than
/// 8 rows or columns.
pub fn apply_clahe(plane: &GrayImage) -> crate::error::Result<GrayImage> {
    let (w, h) = plane.dimensions();
    if w == 0 || h == 0 {
        return Err(EnhanceError::invalid_image(format!(
            "zero-dimension plane: {w}x{h}"
        )));
    }

    let tiles_x = TILE_GRID.min(w) as usize;
    let tiles_y = TILE_GRID.min(h) as usize;

    let luts = build_tile_luts(plane, tiles_x, tiles_y);

    // Bilinear blend between the four nearest tile LUTs.
    let tile_w = w as f64 / tiles_x as f64;
    let tile_h = h as f64 / tiles_y as f64;

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let ty = (y as f64 + 0.5) / tile_h - 0.5;
        let ty0 = ty.floor().clamp(0.0, (tiles_y - 1) as f64) as usize;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wy = (ty - ty0 as f64).clamp(0.0, 1.0);

        for x in 0..w {
            let tx = (x as f64 + 0.5) / tile_w - 0.5;
            let tx0 = tx.floor().clamp(0.0, (tiles_x - 1) as f64) as usize;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let wx = (tx - tx0 as f64).clamp(0.0, 1.0);

            let v = plane.get_pixel(x, y).0[0] as usize;
            let top = luts[ty0 * tiles_x + tx0][v] as f64 * (1.0 - wx)
                + luts[ty0 * tiles_x + tx1][v] as f64 * wx;
            let bottom = luts[ty1 * tiles_x + tx0][v] as f64 * (1.0 - wx)
                + luts[ty1 * tiles_x + tx1][v] as f64 * wx;
            let blended = top * (1.0 - wy) + bottom * wy;

            out.put_pixel(x, y, image::Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }

    Ok(out)
}

/// Build one clipped-equalization LUT per tile.
fn build_tile_luts(plane: &GrayImage, tiles_x: usize, tiles_y: usize) -> Vec<TileLut> {
    let (w, h) = plane.dimensions();
    let mut luts = Vec::with_capacity(tiles_x * tiles_y);

    for ty in 0..tiles_y {
        let y0 = (ty as u64 * h as u64 / tiles_y as u64) as u32;
        let y1 = ((ty as u64 + 1) * h as u64 / tiles_y as u64) as u32;

        for tx in 0..tiles_x {
            let x0 = (tx as u64 * w as u64 / tiles_x as u64) as u32;
            let x1 = ((tx as u64 + 1) * w as u64 / tiles_x as u64) as u32;

            let mut hist = [0u64; HIST_BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[plane.get_pixel(x, y).0[0] as usize] += 1;
                }
            }

            let tile_area = ((x1 - x0) as u64) * ((y1 - y0) as u64);
            luts.push(equalize_clipped(&mut hist, tile_area));
        }
    }

    luts
}

/// Clip a tile histogram, redistribute the excess, and fold the CDF into a
/// 0..255 lookup table.
fn equalize_clipped(hist: &mut [u64; HIST_BINS], tile_area: u64) -> TileLut {
    if tile_area == 0 {
        // Degenerate tile (plane narrower than the grid): identity mapping.
        let mut lut = [0u8; HIST_BINS];
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return lut;
    }

    let clip = ((CLIP_LIMIT * tile_area as f64 / HIST_BINS as f64) as u64).max(1);

    let mut excess = 0u64;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    // Even redistribution; the remainder is spread at a fixed stride so it
    // does not pile up at the low end of the histogram.
    let per_bin = excess / HIST_BINS as u64;
    let mut remainder = excess % HIST_BINS as u64;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if remainder > 0 {
        let step = (HIST_BINS as u64 / remainder).max(1) as usize;
        let mut i = 0;
        while i < HIST_BINS && remainder > 0 {
            hist[i] += 1;
            remainder -= 1;
            i += step;
        }
    }

    let scale = 255.0 / tile_area as f64;
    let mut lut = [0u8; HIST_BINS];
    let mut cumulative = 0u64;
    for (i, entry) in lut.iter_mut().enumerate() {
        cumulative += hist[i];
        *entry = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_dimensions() {
        let plane = GrayImage::from_pixel(100, 60, image::Luma([90]));
        let out = apply_clahe(&plane).expect("clahe");
        assert_eq!(out.dimensions(), (100, 60));
    }

    #[test]
    fn test_rejects_empty_plane() {
        let plane = GrayImage::new(0, 0);
        assert!(matches!(
            apply_clahe(&plane),
            Err(EnhanceError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_tiny_plane_does_not_panic() {
        let plane = GrayImage::from_pixel(3, 2, image::Luma([50]));
        let out = apply_clahe(&plane).expect("clahe on tiny plane");
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn test_stretches_low_contrast_ramp() {
        // A narrow ramp around mid-gray should spread out.
        let mut plane = GrayImage::new(64, 64);
        for (x, _, p) in plane.enumerate_pixels_mut() {
            p.0[0] = 118 + (x % 20) as u8;
        }
        let out = apply_clahe(&plane).expect("clahe");

        let range = |img: &GrayImage| {
            let (mut lo, mut hi) = (u8::MAX, u8::MIN);
            for p in img.pixels() {
                lo = lo.min(p.0[0]);
                hi = hi.max(p.0[0]);
            }
            hi - lo
        };
        assert!(range(&out) > range(&plane));
    }

    #[test]
    fn test_clip_limit_bounds_amplification() {
        // Near-uniform plane with a single dark pixel: clipping keeps the
        // bulk of the plane from being pushed to the extremes.
        let mut plane = GrayImage::from_pixel(64, 64, image::Luma([200]));
        plane.put_pixel(0, 0, image::Luma([10]));
        let out = apply_clahe(&plane).expect("clahe");

        let mut bulk = 0u64;
        let mut sum = 0u64;
        for p in out.pixels() {
            bulk += 1;
            sum += p.0[0] as u64;
        }
        let mean = sum as f64 / bulk as f64;
        // Without the clip limit the uniform value would map to ~255.
        assert!(mean < 250.0, "mean {mean} suggests unbounded amplification");
    }
}
