//! sRGB <-> CIELAB conversion, HSV value and luma helpers.
//!
//! 8-bit scaling follows the OpenCV convention: L is stored as L* * 255/100,
//! a and b are offset by +128. All conversions assume D65 white.

const XN: f64 = 0.950456;
const ZN: f64 = 1.088754;

/// sRGB gamma expansion to linear light.
fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear light back to 8-bit sRGB.
fn linear_to_srgb(c: f64) -> u8 {
    let c = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f64) -> f64 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    let t3 = t * t * t;
    if t3 > 0.008856 {
        t3
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

/// Convert one sRGB pixel to 8-bit scaled CIELAB `[l, a, b]`.
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rl, gl, bl) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));

    let x = (0.412453 * rl + 0.357580 * gl + 0.180423 * bl) / XN;
    let y = 0.212671 * rl + 0.715160 * gl + 0.072169 * bl;
    let z = (0.019334 * rl + 0.119193 * gl + 0.950227 * bl) / ZN;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (bb + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Convert one 8-bit scaled CIELAB pixel back to sRGB `[r, g, b]`.
pub fn lab_to_rgb(l: u8, a: u8, b: u8) -> [u8; 3] {
    let l = l as f64 * 100.0 / 255.0;
    let a = a as f64 - 128.0;
    let b = b as f64 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = lab_f_inv(fx) * XN;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * ZN;

    let rl = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let gl = -0.969256 * x + 1.875992 * y + 0.041556 * z;
    let bl = 0.055648 * x - 0.204043 * y + 1.057311 * z;

    [
        linear_to_srgb(rl.clamp(0.0, 1.0)),
        linear_to_srgb(gl.clamp(0.0, 1.0)),
        linear_to_srgb(bl.clamp(0.0, 1.0)),
    ]
}

/// HSV value channel of one sRGB pixel (the max component).
pub fn hsv_value(r: u8, g: u8, b: u8) -> u8 {
    r.max(g).max(b)
}

/// BT.601 luma of one sRGB pixel.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64)
        .round()
        .clamp(0.0, 255.0) as u8
}
