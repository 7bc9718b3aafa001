//! Core utilities shared by multiple filters.
//!
//! - Clamped neighborhood addressing
//! - Integral image (summed-area table) and box means
//! - Plane normalization

use ndarray::{Array2, Zip};

/// Offset `pos` by `delta` and clamp the result to `0..len`.
#[inline]
pub fn clamp_offset(pos: usize, delta: isize, len: usize) -> usize {
    (pos as isize + delta).clamp(0, len as isize - 1) as usize
}

/// Build a summed-area table with a zero top row and left column.
///
/// `table[[y + 1, x + 1]]` holds the sum of `plane[0..=y, 0..=x]`.
/// Accumulates in f64 so large planes keep their precision.
pub fn integral_image(plane: &Array2<f32>) -> Array2<f64> {
    let (height, width) = plane.dim();
    let mut table = Array2::<f64>::zeros((height + 1, width + 1));

    for y in 0..height {
        let mut row_sum = 0.0f64;
        for x in 0..width {
            row_sum += plane[[y, x]] as f64;
            table[[y + 1, x + 1]] = table[[y, x + 1]] + row_sum;
        }
    }

    table
}

/// Mean over a (2 * radius + 1)^2 window, truncated at the image border.
///
/// Uses an integral image for O(1) per pixel complexity.
pub fn box_mean(plane: &Array2<f32>, radius: usize) -> Array2<f32> {
    let (height, width) = plane.dim();
    let table = integral_image(plane);
    let mut result = Array2::<f32>::zeros((height, width));

    Zip::indexed(&mut result).par_for_each(|(y, x), out| {
        let y0 = y.saturating_sub(radius);
        let x0 = x.saturating_sub(radius);
        let y1 = (y + radius + 1).min(height);
        let x1 = (x + radius + 1).min(width);

        let sum = table[[y1, x1]] - table[[y0, x1]] - table[[y1, x0]] + table[[y0, x0]];
        let count = ((y1 - y0) * (x1 - x0)) as f64;
        *out = (sum / count) as f32;
    });

    result
}

/// Divide a non-negative plane by its maximum so values fall in 0.0-1.0.
///
/// An all-zero plane stays all zero.
pub fn normalize_by_max(plane: &Array2<f32>) -> Array2<f32> {
    let max = plane.iter().cloned().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Array2::zeros(plane.raw_dim());
    }
    plane.mapv(|v| (v / max).clamp(0.0, 1.0))
}
