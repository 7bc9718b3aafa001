//! Compositing of the convolved strokes with edges, region boundaries and
//! paper grain.
//!
//! Order of application:
//! 1. Edge darkening (`fixed` or `adaptive`)
//! 2. Region boundary darkening
//! 3. Paper grain, then clamp to 0-255
//!
//! The crosshatch mode blends two finished passes with
//! [`blend_crosshatch`].

use ndarray::{Array2, Zip};

use crate::config::EdgeMode;
use crate::filters::core::{box_mean, normalize_by_max};
use crate::filters::paper::PAPER_CENTER;

/// Fraction of tone removed on region boundaries.
pub const BOUNDARY_DARKEN: f32 = 0.3;

/// Radius of the window used to measure local flatness in adaptive mode.
pub const FLATNESS_RADIUS: usize = 3;

/// Terms layered over the LIC result.
pub struct Layers<'a> {
    pub edges: &'a Array2<f32>,
    pub edge_strength: f32,
    pub edge_mode: EdgeMode,
    /// Present only when segmentation and boundary drawing are enabled
    pub boundaries: Option<&'a Array2<bool>>,
    pub paper: &'a Array2<f32>,
    pub paper_strength: f32,
}

/// Combine the LIC result with all layers.
///
/// # Returns
/// Plane clamped to 0.0-255.0. With zero edge and paper strength and no
/// boundaries this is the LIC result itself (clamped).
pub fn composite(lic: &Array2<f32>, layers: &Layers) -> Array2<f32> {
    let mut result = lic.clone();

    apply_edges(&mut result, layers.edges, layers.edge_strength, layers.edge_mode);
    if let Some(boundaries) = layers.boundaries {
        darken_boundaries(&mut result, boundaries);
    }
    apply_paper(&mut result, layers.paper, layers.paper_strength);

    result.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 255.0) });
    result
}

/// Subtract normalized edge magnitude scaled by `strength`.
///
/// In adaptive mode the strength is multiplied by `1 + flatness`, where
/// flatness is one minus the mean normalized edge magnitude around the
/// pixel. Flat areas therefore get up to twice the darkening of busy ones.
pub fn apply_edges(result: &mut Array2<f32>, edges: &Array2<f32>, strength: f32, mode: EdgeMode) {
    let strength = strength.max(0.0);
    if strength == 0.0 {
        return;
    }

    let normalized = normalize_by_max(edges);
    match mode {
        EdgeMode::Fixed => {
            Zip::from(result).and(&normalized).par_for_each(|r, &e| {
                *r -= strength * e * 255.0;
            });
        }
        EdgeMode::Adaptive => {
            let activity = box_mean(&normalized, FLATNESS_RADIUS);
            Zip::from(result)
                .and(&normalized)
                .and(&activity)
                .par_for_each(|r, &e, &a| {
                    let flatness = (1.0 - a).clamp(0.0, 1.0);
                    *r -= strength * (1.0 + flatness) * e * 255.0;
                });
        }
    }
}

pub fn darken_boundaries(result: &mut Array2<f32>, boundaries: &Array2<bool>) {
    Zip::from(result).and(boundaries).par_for_each(|r, &b| {
        if b {
            *r *= 1.0 - BOUNDARY_DARKEN;
        }
    });
}

/// `result -= (paper - 128) * strength`
pub fn apply_paper(result: &mut Array2<f32>, paper: &Array2<f32>, strength: f32) {
    let strength = strength.max(0.0);
    if strength == 0.0 {
        return;
    }
    Zip::from(result).and(paper).par_for_each(|r, &p| {
        *r -= (p - PAPER_CENTER) * strength;
    });
}

/// Blend a hatch pass over a base pass.
///
/// The multiplicative share grows with the darkness of the base, so dark
/// areas pick up the crossing strokes while light areas pass through
/// almost unchanged.
pub fn blend_crosshatch(base: &Array2<f32>, hatch: &Array2<f32>) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros(base.raw_dim());
    Zip::from(&mut out)
        .and(base)
        .and(hatch)
        .par_for_each(|o, &b, &h| {
            let b = b.clamp(0.0, 255.0);
            let h = h.clamp(0.0, 255.0);
            let darkness = 1.0 - b / 255.0;
            let multiplied = b * h / 255.0;
            *o = b * (1.0 - darkness) + multiplied * darkness;
        });
    out
}
