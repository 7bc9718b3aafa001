//! Line Integral Convolution.
//!
//! For every pixel a streamline is traced forward and backward through the
//! direction field with unit Euler steps. Noise is sampled at each visited
//! pixel and box-filtered, which smears the speckle into strokes that
//! follow the field.

use std::ops::Range;

use ndarray::{s, Array2, ArrayViewMut2, Zip};

use crate::direction::DirectionField;

/// Convolve the whole noise plane along the field.
///
/// # Arguments
/// * `noise` - Noise plane (0.0 or 255.0 per pixel)
/// * `field` - Direction field of the same shape
/// * `kernel_length` - Total streamline length in pixels; each direction
///   takes `kernel_length / 2` steps
pub fn convolve(noise: &Array2<f32>, field: &DirectionField, kernel_length: usize) -> Array2<f32> {
    let (height, _) = noise.dim();
    let mut output = Array2::<f32>::zeros(noise.raw_dim());
    convolve_rows(noise, field, kernel_length, 0..height, output.view_mut());
    output
}

/// Convolve rows `rows` of the image into `out`, whose first row
/// corresponds to `rows.start`.
pub fn convolve_rows(
    noise: &Array2<f32>,
    field: &DirectionField,
    kernel_length: usize,
    rows: Range<usize>,
    out: ArrayViewMut2<f32>,
) {
    let half_steps = kernel_length / 2;
    let weight = 1.0 / kernel_length.max(1) as f32;
    let row0 = rows.start;

    Zip::indexed(out).par_for_each(|(r, x), o| {
        *o = convolve_pixel(noise, field, x, row0 + r, half_steps, weight);
    });
}

/// Convolve one band of rows in place inside a full-size output plane.
pub fn convolve_band(
    noise: &Array2<f32>,
    field: &DirectionField,
    kernel_length: usize,
    rows: Range<usize>,
    output: &mut Array2<f32>,
) {
    let band = output.slice_mut(s![rows.clone(), ..]);
    convolve_rows(noise, field, kernel_length, rows, band);
}

fn convolve_pixel(
    noise: &Array2<f32>,
    field: &DirectionField,
    x: usize,
    y: usize,
    half_steps: usize,
    weight: f32,
) -> f32 {
    let (height, width) = noise.dim();
    let mut sum = 0.0f32;
    let mut total = 0.0f32;

    for sign in [1.0f32, -1.0] {
        let (sx, sy) = field.at(x, y);
        let mut prev = (sx * sign, sy * sign);
        let mut px = x as f32;
        let mut py = y as f32;
        let (mut ix, mut iy) = (x, y);

        for _ in 0..half_steps {
            let (mut dx, mut dy) = field.at(ix, iy);
            // Keep orientation fields from folding back on themselves
            if dx * prev.0 + dy * prev.1 < 0.0 {
                dx = -dx;
                dy = -dy;
            }

            px += dx;
            py += dy;
            let rx = px.round();
            let ry = py.round();
            if !(rx >= 0.0 && ry >= 0.0 && rx < width as f32 && ry < height as f32) {
                break;
            }
            ix = rx as usize;
            iy = ry as usize;

            sum += noise[[iy, ix]] * weight;
            total += weight;
            prev = (dx, dy);
        }
    }

    if total > 0.0 {
        sum / total
    } else {
        noise[[y, x]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::noise::tone_noise;

    fn stripes(width: usize, height: usize) -> Array2<f32> {
        // Vertical stripes: 255 on even columns
        Array2::from_shape_fn((height, width), |(_, x)| if x % 2 == 0 { 255.0 } else { 0.0 })
    }

    #[test]
    fn test_kernel_length_one_returns_noise() {
        let gray = Array2::from_shape_fn((9, 7), |(y, x)| (x * 20 + y * 9) as f32);
        let noise = tone_noise(&gray, 1.0, 1);
        let field = DirectionField::uniform(7, 9, 0.7);
        assert_eq!(convolve(&noise, &field, 1), noise);
    }

    #[test]
    fn test_smears_along_field() {
        // Vertical strokes along vertical stripes keep the stripes
        let noise = stripes(8, 8);
        let field = DirectionField::uniform(8, 8, std::f32::consts::FRAC_PI_2);
        let out = convolve(&noise, &field, 6);
        assert!((out[[4, 2]] - 255.0).abs() < 1e-3);
        assert_eq!(out[[4, 3]], 0.0);
    }

    #[test]
    fn test_averages_across_field() {
        // Horizontal strokes across vertical stripes blur them to grey
        let noise = stripes(16, 4);
        let field = DirectionField::uniform(16, 4, 0.0);
        let out = convolve(&noise, &field, 4);
        // Two samples each side: x-2, x-1, x+1, x+2 -> two white, two black
        assert!((out[[1, 8]] - 127.5).abs() < 1e-3);
    }

    #[test]
    fn test_stops_at_border() {
        // At the left border with horizontal field only forward samples exist
        let noise = Array2::from_shape_fn((1, 5), |(_, x)| x as f32 * 10.0);
        let field = DirectionField::uniform(5, 1, 0.0);
        let out = convolve(&noise, &field, 4);
        // Forward samples at x=1, x=2; backward leaves the image at once
        assert!((out[[0, 0]] - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_output_within_noise_range() {
        let gray = Array2::from_shape_fn((20, 20), |(y, x)| ((x * y) % 256) as f32);
        let noise = tone_noise(&gray, 1.0, 1);
        let field = DirectionField::from_angles(20, 20, |x, y| (x + y) as f32 * 0.3);
        let out = convolve(&noise, &field, 10);
        assert!(out.iter().all(|&v| (0.0..=255.001).contains(&v)));
    }

    #[test]
    fn test_bands_match_full_convolution() {
        let gray = Array2::from_shape_fn((13, 11), |(y, x)| ((x * 31 + y * 17) % 256) as f32);
        let noise = tone_noise(&gray, 1.0, 1);
        let field = DirectionField::from_angles(11, 13, |x, y| (x as f32 - y as f32) * 0.2);
        let full = convolve(&noise, &field, 8);

        let mut banded = Array2::<f32>::zeros((13, 11));
        for start in (0..13).step_by(4) {
            convolve_band(&noise, &field, 8, start..(start + 4).min(13), &mut banded);
        }
        assert_eq!(full, banded);
    }
}
