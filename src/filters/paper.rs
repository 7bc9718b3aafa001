//! Synthetic paper grain.
//!
//! Three octaves of value noise (hashed lattice, bilinear interpolation)
//! are mixed into a plane centered near 128. The compositor subtracts the
//! deviation from 128, so fine grain brightens and darkens the drawing
//! slightly.

use ndarray::{Array2, Zip};

use super::noise::hash01;

/// (cell size in pixels, weight, seed offset) per octave. Weights sum to 1.
const OCTAVES: [(f32, f32, f64); 3] = [(2.0, 0.5, 17.0), (8.0, 0.3, 131.0), (32.0, 0.2, 977.0)];

/// Peak-to-peak amplitude of the grain around the center value.
const GRAIN_RANGE: f32 = 80.0;

pub const PAPER_CENTER: f32 = 128.0;

#[inline]
fn lattice(ix: i64, iy: i64, offset: f64) -> f32 {
    hash01(ix as f64 * 127.1 + iy as f64 * 311.7 + offset) as f32
}

/// Bilinearly interpolated value noise in [0, 1).
fn value_noise(x: f32, y: f32, cell: f32, offset: f64) -> f32 {
    let fx = x / cell;
    let fy = y / cell;
    let ix = fx.floor() as i64;
    let iy = fy.floor() as i64;
    let tx = fx - ix as f32;
    let ty = fy - iy as f32;

    let v00 = lattice(ix, iy, offset);
    let v10 = lattice(ix + 1, iy, offset);
    let v01 = lattice(ix, iy + 1, offset);
    let v11 = lattice(ix + 1, iy + 1, offset);

    let top = v00 + (v10 - v00) * tx;
    let bottom = v01 + (v11 - v01) * tx;
    top + (bottom - top) * ty
}

/// Generate the paper grain plane.
///
/// # Returns
/// Plane shaped (height, width) with values in roughly 88-168
pub fn paper_texture(width: usize, height: usize) -> Array2<f32> {
    let mut paper = Array2::<f32>::zeros((height, width));

    Zip::indexed(&mut paper).par_for_each(|(y, x), out| {
        let mut v = 0.0f32;
        for &(cell, weight, offset) in OCTAVES.iter() {
            v += weight * value_noise(x as f32, y as f32, cell, offset);
        }
        *out = PAPER_CENTER + (v - 0.5) * GRAIN_RANGE;
    });

    paper
}
