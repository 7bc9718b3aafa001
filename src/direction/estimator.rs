//! Local stroke-direction estimation from a gradient window.
//!
//! Central-difference gradients inside the window are accumulated into a
//! structure tensor. Its dominant orientation is the direction of steepest
//! tone change; strokes run perpendicular to it, along the contours.

use std::f32::consts::FRAC_PI_2;

use ndarray::Array2;

use crate::filters::core::clamp_offset;

pub struct GradientWindowEstimator {
    /// Window side length in pixels
    pub window: usize,
    /// Minimum RMS gradient magnitude for a confident estimate
    pub threshold: f32,
}

impl GradientWindowEstimator {
    pub fn new(window: usize, threshold: f32) -> Self {
        GradientWindowEstimator {
            window: window.max(1),
            threshold,
        }
    }

    /// Stroke angle (radians) at (cx, cy), or `None` when the window is
    /// too flat to carry a direction.
    pub fn estimate(&self, gray: &Array2<f32>, cx: usize, cy: usize) -> Option<f32> {
        let (height, width) = gray.dim();
        let half = (self.window / 2) as isize;

        let mut jxx = 0.0f64;
        let mut jyy = 0.0f64;
        let mut jxy = 0.0f64;
        let mut n = 0usize;

        for dy in -half..=half {
            let y = cy as isize + dy;
            if y < 0 || y >= height as isize {
                continue;
            }
            let y = y as usize;
            for dx in -half..=half {
                let x = cx as isize + dx;
                if x < 0 || x >= width as isize {
                    continue;
                }
                let x = x as usize;

                let gx = (gray[[y, clamp_offset(x, 1, width)]] - gray[[y, clamp_offset(x, -1, width)]]) as f64 * 0.5;
                let gy = (gray[[clamp_offset(y, 1, height), x]] - gray[[clamp_offset(y, -1, height), x]]) as f64 * 0.5;

                jxx += gx * gx;
                jyy += gy * gy;
                jxy += gx * gy;
                n += 1;
            }
        }

        if n == 0 {
            return None;
        }

        let rms = ((jxx + jyy) / n as f64).sqrt();
        // Also rejects NaN thresholds
        if !(rms > self.threshold as f64) {
            return None;
        }

        let gradient_angle = 0.5 * (2.0 * jxy).atan2(jxx - jyy);
        Some(gradient_angle as f32 + FRAC_PI_2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_window_has_no_direction() {
        let gray = Array2::from_elem((16, 16), 90.0f32);
        let est = GradientWindowEstimator::new(9, 1.0);
        assert_eq!(est.estimate(&gray, 8, 8), None);
    }

    #[test]
    fn test_vertical_edge_gives_vertical_strokes() {
        let gray = Array2::from_shape_fn((16, 16), |(_, x)| if x < 8 { 0.0 } else { 255.0 });
        let est = GradientWindowEstimator::new(9, 1.0);
        let angle = est.estimate(&gray, 8, 8).unwrap();
        assert!((angle - FRAC_PI_2).abs() < 1e-4, "angle = {}", angle);
    }

    #[test]
    fn test_horizontal_ramp_gives_horizontal_strokes() {
        let gray = Array2::from_shape_fn((16, 16), |(y, _)| y as f32 * 10.0);
        let est = GradientWindowEstimator::new(5, 1.0);
        let angle = est.estimate(&gray, 8, 8).unwrap();
        // Gradient points along y, strokes along x (angle 0 or pi)
        assert!(angle.sin().abs() < 1e-4, "angle = {}", angle);
    }

    #[test]
    fn test_threshold_rejects_weak_gradient() {
        let gray = Array2::from_shape_fn((16, 16), |(_, x)| x as f32 * 0.5);
        assert!(GradientWindowEstimator::new(5, 1.0).estimate(&gray, 8, 8).is_none());
        assert!(GradientWindowEstimator::new(5, 0.1).estimate(&gray, 8, 8).is_some());
    }
}
