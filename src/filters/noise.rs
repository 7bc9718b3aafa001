//! Tone-matched binary noise.
//!
//! Every pixel is either 0 or 255. Dark input pixels turn black more often
//! than light ones, so the noise density follows the image tone. The
//! generator is a stateless position hash, so identical input and
//! configuration always give identical noise regardless of evaluation order.

use ndarray::{Array2, Zip};

// ============================================================================
// Position hash (deterministic, not cryptographic)
// ============================================================================

/// Hash a seed to a uniform value in [0, 1).
///
/// Classic `fract(sin(seed) * 43758.5453)`. Evaluated in f64 so large
/// seeds keep their low bits.
#[inline]
pub fn hash01(seed: f64) -> f64 {
    let v = seed.sin() * 43758.5453;
    let r = v - v.floor();
    // fract of a tiny negative number can round up to exactly 1.0
    if r >= 1.0 {
        0.0
    } else {
        r
    }
}

/// Seed of the noise cell containing pixel (x, y).
///
/// `scale` coarsens the coordinates: all pixels inside one
/// `scale x scale` cell share a seed, which makes the speckle blockier.
#[inline]
pub fn cell_seed(x: usize, y: usize, width: usize, scale: usize) -> f64 {
    let scale = scale.max(1);
    let cx = x / scale;
    let cy = y / scale;
    let cols = width.div_ceil(scale);
    let cell = cy * cols + cx;
    cx as f64 * 12.9898 + cy as f64 * 78.233 + cell as f64 * 0.618_034
}

// ============================================================================
// Tone-matched noise
// ============================================================================

/// Generate binary noise whose density follows the grayscale tone.
///
/// The black threshold is `brightness * (1 - I / 255)`; a pixel is white
/// when its hash value reaches the threshold.
///
/// # Arguments
/// * `gray` - Luminance plane (0.0-255.0)
/// * `brightness` - Threshold scale; higher values give darker output
/// * `noise_scale` - Cell size in pixels (1 = per-pixel speckle)
///
/// # Returns
/// Plane of the same shape with values exactly 0.0 or 255.0
pub fn tone_noise(gray: &Array2<f32>, brightness: f32, noise_scale: usize) -> Array2<f32> {
    let (_, width) = gray.dim();
    let mut noise = Array2::<f32>::zeros(gray.raw_dim());

    Zip::indexed(&mut noise)
        .and(gray)
        .par_for_each(|(y, x), out, &tone| {
            let threshold = brightness as f64 * (1.0 - tone.clamp(0.0, 255.0) as f64 / 255.0);
            let value = hash01(cell_seed(x, y, width, noise_scale));
            *out = if value >= threshold { 255.0 } else { 0.0 };
        });

    noise
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_range() {
        for i in 0..10_000 {
            let v = hash01(i as f64 * 0.37 - 500.0);
            assert!((0.0..1.0).contains(&v), "hash out of range: {}", v);
        }
    }

    #[test]
    fn test_noise_is_binary() {
        let gray = Array2::from_shape_fn((16, 16), |(y, x)| ((x * 16 + y) % 256) as f32);
        let noise = tone_noise(&gray, 1.0, 1);
        assert!(noise.iter().all(|&v| v == 0.0 || v == 255.0));
    }

    #[test]
    fn test_noise_matches_seed_formula() {
        // 4x4 uniform mid-gray
        let gray = Array2::from_elem((4, 4), 128.0f32);
        let noise = tone_noise(&gray, 1.0, 1);
        let threshold = 1.0 - 128.0 / 255.0;
        for y in 0..4 {
            for x in 0..4 {
                let expected = if hash01(cell_seed(x, y, 4, 1)) >= threshold { 255.0 } else { 0.0 };
                assert_eq!(noise[[y, x]], expected, "mismatch at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_white_and_black_extremes() {
        let white = Array2::from_elem((8, 8), 255.0f32);
        assert!(tone_noise(&white, 1.0, 1).iter().all(|&v| v == 255.0));

        // Zero brightness means a zero threshold everywhere
        let black = Array2::from_elem((8, 8), 0.0f32);
        assert!(tone_noise(&black, 0.0, 1).iter().all(|&v| v == 255.0));
    }

    #[test]
    fn test_darker_tone_gives_more_black() {
        let dark = Array2::from_elem((32, 32), 40.0f32);
        let light = Array2::from_elem((32, 32), 220.0f32);
        let count_black = |n: &Array2<f32>| n.iter().filter(|&&v| v == 0.0).count();
        assert!(count_black(&tone_noise(&dark, 1.0, 1)) > count_black(&tone_noise(&light, 1.0, 1)));
    }

    #[test]
    fn test_noise_scale_makes_blocks() {
        let gray = Array2::from_elem((8, 8), 128.0f32);
        let noise = tone_noise(&gray, 1.0, 4);
        for y in 0..8 {
            for x in 0..8 {
                let anchor = noise[[y / 4 * 4, x / 4 * 4]];
                assert_eq!(noise[[y, x]], anchor);
            }
        }
    }

    #[test]
    fn test_noise_is_deterministic() {
        let gray = Array2::from_shape_fn((20, 13), |(y, x)| (x * 7 + y * 11) as f32);
        assert_eq!(tone_noise(&gray, 0.8, 2), tone_noise(&gray, 0.8, 2));
    }
}
