//! Sketch configuration.
//!
//! Hosts pass the configuration as JSON using camelCase keys
//! (`kernelLength`, `strokeDirection`, ...). Every field has a default, so
//! partial documents are accepted.
//!
//! ```
//! use lic_sketch::config::{SketchConfig, StrokeDirection};
//!
//! let config = SketchConfig::from_json(r#"{"strokeDirection": "uniform", "kernelLength": 12}"#).unwrap();
//! assert_eq!(config.stroke_direction, StrokeDirection::Uniform);
//! assert_eq!(config.kernel_length, 12);
//! ```

use std::f32::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::error::{SketchError, SketchResult};

/// Upper bound for `histogram_bins`. Luminance is 8-bit, so more bins
/// cannot separate anything further.
pub const MAX_HISTOGRAM_BINS: usize = 256;

/// How the stroke-direction field is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrokeDirection {
    /// Estimated from local image texture.
    #[default]
    Auto,
    /// Constant `uniform_angle` everywhere.
    Uniform,
    /// Independent seeded angle per pixel.
    Random,
    /// Uniform first pass plus a rotated second pass blended on top.
    Crosshatch,
    /// Same estimator as `Auto`.
    Texture,
}

/// How detected edges darken the convolved image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Edge strength scaled up in flat tonal areas.
    #[default]
    Adaptive,
    /// Constant edge strength.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SketchConfig {
    /// Streamline length in pixels (both directions combined).
    pub kernel_length: usize,
    /// Noise cell size; 1 gives per-pixel speckle.
    pub noise_scale: usize,
    pub stroke_direction: StrokeDirection,
    /// Scales the tone-to-density threshold; higher is darker.
    pub brightness: f32,
    pub use_segmentation: bool,
    pub block_size: usize,
    /// Maximum histogram distance (0..1) at which neighboring blocks merge.
    pub merge_threshold: f32,
    pub min_region_size: usize,
    pub draw_boundaries: bool,
    pub texture_window_size: usize,
    /// Minimum RMS gradient (grey levels per pixel) for a confident direction.
    pub direction_threshold: f32,
    pub edge_strength: f32,
    pub edge_mode: EdgeMode,
    pub paper_strength: f32,
    /// Stroke angle in radians for `uniform` and `crosshatch`.
    pub uniform_angle: f32,
    /// Intensity histogram bins per segmentation block.
    pub histogram_bins: usize,
    /// Stroke angle of the second crosshatch pass.
    pub crosshatch_angle: f32,
    /// Brightness multiplier of the second crosshatch pass.
    pub crosshatch_brightness: f32,
    /// LIC rows processed between progress reports.
    pub lic_batch_rows: usize,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            kernel_length: 20,
            noise_scale: 1,
            stroke_direction: StrokeDirection::Auto,
            brightness: 1.0,
            use_segmentation: false,
            block_size: 16,
            merge_threshold: 0.3,
            min_region_size: 256,
            draw_boundaries: false,
            texture_window_size: 9,
            direction_threshold: 4.0,
            edge_strength: 0.5,
            edge_mode: EdgeMode::Adaptive,
            paper_strength: 0.15,
            uniform_angle: FRAC_PI_4,
            histogram_bins: 16,
            crosshatch_angle: -FRAC_PI_4,
            crosshatch_brightness: 0.7,
            lic_batch_rows: 16,
        }
    }
}

impl SketchConfig {
    /// Parse a (possibly partial) camelCase JSON document and validate it.
    pub fn from_json(json: &str) -> SketchResult<Self> {
        let config: SketchConfig = serde_json::from_str(json)
            .map_err(|e| SketchError::invalid_configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no stage can run with.
    ///
    /// Float parameters are never rejected; stages clamp them instead.
    pub fn validate(&self) -> SketchResult<()> {
        let positive = [
            ("kernelLength", self.kernel_length),
            ("noiseScale", self.noise_scale),
            ("blockSize", self.block_size),
            ("textureWindowSize", self.texture_window_size),
            ("histogramBins", self.histogram_bins),
            ("licBatchRows", self.lic_batch_rows),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(SketchError::invalid_configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.histogram_bins > MAX_HISTOGRAM_BINS {
            return Err(SketchError::invalid_configuration(format!(
                "histogramBins must be at most {MAX_HISTOGRAM_BINS}, got {}",
                self.histogram_bins
            )));
        }
        Ok(())
    }

    /// Configuration for the second crosshatch pass: rotated uniform
    /// strokes, lighter tone, no edges, paper or boundaries.
    pub fn crosshatch_pass(&self) -> Self {
        Self {
            stroke_direction: StrokeDirection::Uniform,
            uniform_angle: self.crosshatch_angle,
            brightness: self.brightness * self.crosshatch_brightness,
            edge_strength: 0.0,
            paper_strength: 0.0,
            draw_boundaries: false,
            ..self.clone()
        }
    }
}
