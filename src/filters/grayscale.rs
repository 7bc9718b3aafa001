//! Grayscale conversion.
//!
//! Uses ITU-R BT.601 luma coefficients on the 0-255 scale. Input is a flat
//! RGBA byte buffer as handed over by the host; output is a float plane
//! shaped (height, width).

use ndarray::Array2;

use crate::error::{SketchError, SketchResult};

/// ITU-R BT.601 luma coefficients
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Check that `len` bytes hold exactly `width * height` RGBA pixels.
pub fn check_rgba_len(len: usize, width: usize, height: usize) -> SketchResult<()> {
    if width == 0 || height == 0 {
        return Err(SketchError::invalid_input(format!(
            "image dimensions must be positive, got {width}x{height}"
        )));
    }
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| SketchError::invalid_input("image dimensions overflow"))?;
    if len != expected {
        return Err(SketchError::invalid_input(format!(
            "expected {expected} RGBA bytes for {width}x{height}, got {len}"
        )));
    }
    Ok(())
}

/// Convert an RGBA u8 buffer to a luminance plane (0.0-255.0).
///
/// Alpha is ignored.
///
/// # Arguments
/// * `rgba` - Flat RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
pub fn rgba_to_luminance(rgba: &[u8], width: usize, height: usize) -> SketchResult<Array2<f32>> {
    check_rgba_len(rgba.len(), width, height)?;

    let gray = Array2::from_shape_fn((height, width), |(y, x)| {
        let idx = (y * width + x) * 4;
        let r = rgba[idx] as f32;
        let g = rgba[idx + 1] as f32;
        let b = rgba[idx + 2] as f32;
        LUMA_R * r + LUMA_G * g + LUMA_B * b
    });

    Ok(gray)
}

/// Convert a float plane to RGBA bytes with R=G=B=value and alpha 255.
///
/// Values are rounded and clamped to 0-255.
pub fn luminance_to_rgba(plane: &Array2<f32>) -> Vec<u8> {
    let mut out = Vec::with_capacity(plane.len() * 4);
    for &v in plane.iter() {
        let g = to_u8(v);
        out.extend_from_slice(&[g, g, g, 255]);
    }
    out
}

/// Round and clamp a 0-255 float to a byte.
#[inline]
pub fn to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}
