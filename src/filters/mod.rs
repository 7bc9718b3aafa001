//! Per-pixel filters feeding the sketch pipeline.
//!
//! All planes are `ndarray::Array2<f32>` shaped (height, width) on the
//! 0.0-255.0 scale. The host-facing RGBA byte layout only appears at the
//! grayscale entry point and the final output conversion.
//!
//! - **Grayscale**: RGBA bytes to BT.601 luminance and back
//! - **Noise**: tone-matched binary noise from a position hash
//! - **Edge detection**: Sobel gradient magnitude
//! - **Paper**: multi-octave synthetic grain
//!
//! Per-pixel loops run through `Zip::par_for_each` (rayon). Every output
//! pixel depends only on immutable inputs, so results do not depend on
//! thread scheduling.

pub mod core;
pub mod edge;
pub mod grayscale;
pub mod noise;
pub mod paper;
