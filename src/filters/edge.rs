//! Sobel edge detection on a luminance plane.
//!
//! Borders use clamped sampling, so a step at the image edge still
//! produces a response on both sides of the step.

use ndarray::{Array2, Zip};

use super::core::clamp_offset;

const KERNEL_H: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const KERNEL_V: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Horizontal and vertical Sobel responses at (x, y).
#[inline]
pub fn sobel_at(gray: &Array2<f32>, x: usize, y: usize) -> (f32, f32) {
    let (height, width) = gray.dim();
    let mut gx = 0.0f32;
    let mut gy = 0.0f32;

    for ky in 0..3 {
        let py = clamp_offset(y, ky as isize - 1, height);
        for kx in 0..3 {
            let px = clamp_offset(x, kx as isize - 1, width);
            let lum = gray[[py, px]];
            gx += lum * KERNEL_H[ky][kx];
            gy += lum * KERNEL_V[ky][kx];
        }
    }

    (gx, gy)
}

/// Sobel gradient magnitude.
///
/// # Arguments
/// * `gray` - Luminance plane (0.0-255.0)
///
/// # Returns
/// Non-negative magnitude plane, unnormalized (a full black/white step
/// gives 1020)
pub fn sobel_magnitude(gray: &Array2<f32>) -> Array2<f32> {
    let mut output = Array2::<f32>::zeros(gray.raw_dim());

    Zip::indexed(&mut output).par_for_each(|(y, x), out| {
        let (gx, gy) = sobel_at(gray, x, y);
        *out = (gx * gx + gy * gy).sqrt();
    });

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sobel_flat_is_zero() {
        let gray = Array2::from_elem((5, 5), 128.0f32);
        assert!(sobel_magnitude(&gray).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sobel_detects_vertical_edge() {
        // Left half black, right half white
        let gray = Array2::from_shape_fn((5, 6), |(_, x)| if x < 3 { 0.0 } else { 255.0 });
        let mag = sobel_magnitude(&gray);

        assert!((mag[[2, 2]] - 1020.0).abs() < 1e-3);
        assert!((mag[[2, 3]] - 1020.0).abs() < 1e-3);
        assert_eq!(mag[[2, 0]], 0.0);
        assert_eq!(mag[[2, 5]], 0.0);
    }

    #[test]
    fn test_sobel_two_column_image() {
        let gray = Array2::from_shape_fn((4, 2), |(_, x)| if x == 0 { 0.0 } else { 255.0 });
        let mag = sobel_magnitude(&gray);
        assert!(mag.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_sobel_orientation() {
        // Horizontal edge: only the vertical kernel responds
        let gray = Array2::from_shape_fn((6, 5), |(y, _)| if y < 3 { 0.0 } else { 100.0 });
        let (gx, gy) = sobel_at(&gray, 2, 2);
        assert_eq!(gx, 0.0);
        assert!(gy > 0.0);
    }
}
