//! LIC Pencil Sketch
//!
//! Turns photographs into pencil sketches with Line Integral Convolution:
//! tone-matched binary noise is smeared along a per-pixel stroke direction
//! field, then darkened along edges and optional region boundaries and
//! overlaid with a paper grain.
//!
//! ## Image Format
//! Input and output are flat RGBA u8 buffers (length = width * height * 4).
//! Output pixels are grey (R=G=B) with alpha 255.
//!
//! ## Layout
//! - [`filters`]: grayscale, noise, edges, paper grain and shared plane helpers
//! - [`segmentation`]: block histogram region merging
//! - [`direction`]: stroke direction fields
//! - [`lic`]: the convolution itself
//! - [`composite`]: layering of edges, boundaries and paper
//! - [`pipeline`]: orchestration, progress and cancellation
//!
//! Python bindings (feature `python`) and WASM exports (feature `wasm`)
//! both delegate to [`pipeline::render`].

pub mod composite;
pub mod config;
pub mod direction;
pub mod error;
pub mod filters;
pub mod lic;
pub mod pipeline;
pub mod segmentation;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{EdgeMode, SketchConfig, StrokeDirection};
pub use error::{SketchError, SketchResult};
pub use pipeline::{render, render_with_progress, CancelToken, Progress};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use ndarray::Array3;
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::config::SketchConfig;
    use crate::error::SketchError;
    use crate::pipeline::render;

    fn to_py_err(err: SketchError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    /// Render an RGBA u8 image as a pencil sketch.
    ///
    /// # Arguments
    /// * `image` - Input image, shape (height, width, 4)
    /// * `config_json` - Optional camelCase JSON configuration; missing
    ///   fields take their defaults
    ///
    /// # Returns
    /// RGBA u8 image of the same shape, grey with alpha 255
    #[pyfunction]
    #[pyo3(signature = (image, config_json=None))]
    pub fn pencil_sketch<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        config_json: Option<&str>,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let config = match config_json {
            Some(json) => SketchConfig::from_json(json).map_err(to_py_err)?,
            None => SketchConfig::default(),
        };

        let input = image.as_array();
        let (height, width, channels) = input.dim();
        if channels != 4 {
            return Err(PyValueError::new_err(format!(
                "expected 4 channels (RGBA), got {channels}"
            )));
        }
        let data: Vec<u8> = input.iter().copied().collect();

        let output = py
            .allow_threads(|| render(&data, width, height, &config))
            .map_err(to_py_err)?;
        let result = Array3::from_shape_vec((height, width, 4), output)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(result.into_pyarray(py))
    }

    /// Default configuration as camelCase JSON.
    #[pyfunction]
    pub fn default_config_json() -> PyResult<String> {
        serde_json::to_string(&SketchConfig::default()).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    #[pymodule]
    pub fn lic_sketch(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(pencil_sketch, m)?)?;
        m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
        Ok(())
    }
}
