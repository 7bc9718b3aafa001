//! Stroke-direction fields.
//!
//! A [`DirectionField`] holds one unit vector per pixel. Each
//! [`StrokeDirection`] mode maps to a [`DirectionStrategy`] that produces
//! the raw field; [`build_field`] runs the strategy and the 5x5 smoothing
//! pass that every mode shares.

pub mod estimator;
pub mod smoothing;

use std::f32::consts::{FRAC_PI_4, PI};

use ndarray::{Array2, Zip};
use tracing::debug;

use crate::config::{SketchConfig, StrokeDirection};
use crate::filters::noise::hash01;
use crate::segmentation::Segmentation;
use estimator::GradientWindowEstimator;
pub use smoothing::smooth_field;

/// Spacing of texture-estimation sample points, in pixels.
pub const SAMPLE_STEP: usize = 4;

/// Stroke angle used where the texture carries no direction and no
/// segmentation is available.
pub const DEFAULT_ANGLE: f32 = FRAC_PI_4;

/// Per-pixel direction vectors, two planes shaped (height, width).
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionField {
    pub x: Array2<f32>,
    pub y: Array2<f32>,
}

impl DirectionField {
    pub fn zeros(width: usize, height: usize) -> Self {
        DirectionField {
            x: Array2::zeros((height, width)),
            y: Array2::zeros((height, width)),
        }
    }

    /// Field of unit vectors at `angle(x, y)` radians.
    pub fn from_angles(width: usize, height: usize, angle: impl Fn(usize, usize) -> f32 + Sync) -> Self {
        let mut field = Self::zeros(width, height);
        Zip::indexed(&mut field.x)
            .and(&mut field.y)
            .par_for_each(|(y, x), vx, vy| {
                let (s, c) = angle(x, y).sin_cos();
                *vx = c;
                *vy = s;
            });
        field
    }

    pub fn uniform(width: usize, height: usize, angle: f32) -> Self {
        Self::from_angles(width, height, |_, _| angle)
    }

    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.x.dim()
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> (f32, f32) {
        (self.x[[y, x]], self.y[[y, x]])
    }
}

/// Produces a raw (unsmoothed) direction field.
pub trait DirectionStrategy {
    fn generate(
        &self,
        width: usize,
        height: usize,
        gray: &Array2<f32>,
        regions: Option<&Segmentation>,
    ) -> DirectionField;
}

/// Same angle everywhere.
pub struct UniformDirection {
    pub angle: f32,
}

impl DirectionStrategy for UniformDirection {
    fn generate(&self, width: usize, height: usize, _gray: &Array2<f32>, _regions: Option<&Segmentation>) -> DirectionField {
        DirectionField::uniform(width, height, self.angle)
    }
}

/// Independent seeded angle per pixel.
pub struct RandomDirection;

impl DirectionStrategy for RandomDirection {
    fn generate(&self, width: usize, height: usize, _gray: &Array2<f32>, _regions: Option<&Segmentation>) -> DirectionField {
        DirectionField::from_angles(width, height, |x, y| {
            let seed = x as f64 * 93.9898 + y as f64 * 67.345 + 1013.0;
            hash01(seed) as f32 * PI
        })
    }
}

/// Angles estimated from local texture on a sparse grid, with a
/// per-region or diagonal fallback where the texture is flat.
pub struct TextureDirection {
    pub estimator: GradientWindowEstimator,
}

impl DirectionStrategy for TextureDirection {
    fn generate(&self, width: usize, height: usize, gray: &Array2<f32>, regions: Option<&Segmentation>) -> DirectionField {
        let mut angles = Array2::<f32>::zeros((height, width));
        let mut fallbacks = 0usize;
        let mut samples = 0usize;

        for by in (0..height).step_by(SAMPLE_STEP) {
            for bx in (0..width).step_by(SAMPLE_STEP) {
                let cx = (bx + SAMPLE_STEP / 2).min(width - 1);
                let cy = (by + SAMPLE_STEP / 2).min(height - 1);

                let angle = match self.estimator.estimate(gray, cx, cy) {
                    Some(angle) => angle,
                    None => {
                        fallbacks += 1;
                        match regions {
                            Some(seg) => region_angle(seg.label_at(cx, cy)),
                            None => DEFAULT_ANGLE,
                        }
                    }
                };
                samples += 1;

                for y in by..(by + SAMPLE_STEP).min(height) {
                    for x in bx..(bx + SAMPLE_STEP).min(width) {
                        angles[[y, x]] = angle;
                    }
                }
            }
        }

        debug!(samples, fallbacks, "texture directions estimated");
        DirectionField::from_angles(width, height, |x, y| angles[[y, x]])
    }
}

/// Seeded stroke angle for a region, in [0, pi).
pub fn region_angle(label: u32) -> f32 {
    hash01(label as f64 * 37.719 + 4.1) as f32 * PI
}

/// Strategy for a configuration's stroke mode.
///
/// `Crosshatch` is uniform here; the rotated second pass is composed by
/// the pipeline.
pub fn strategy_for(config: &SketchConfig) -> Box<dyn DirectionStrategy> {
    match config.stroke_direction {
        StrokeDirection::Uniform | StrokeDirection::Crosshatch => Box::new(UniformDirection {
            angle: config.uniform_angle,
        }),
        StrokeDirection::Random => Box::new(RandomDirection),
        StrokeDirection::Auto | StrokeDirection::Texture => Box::new(TextureDirection {
            estimator: GradientWindowEstimator::new(config.texture_window_size, config.direction_threshold),
        }),
    }
}

/// Generate and smooth the direction field for `config`.
pub fn build_field(config: &SketchConfig, gray: &Array2<f32>, regions: Option<&Segmentation>) -> DirectionField {
    let (height, width) = gray.dim();
    let raw = strategy_for(config).generate(width, height, gray, regions);
    smooth_field(&raw)
}
