//! WebAssembly exports for the pencil sketch pipeline.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Images are
//! flat RGBA byte arrays (length = width * height * 4). Errors surface as
//! JavaScript exceptions carrying the error message.

use wasm_bindgen::prelude::*;

use crate::config::SketchConfig;
use crate::pipeline::render;

/// Render an RGBA image as a pencil sketch.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `config_json` - camelCase JSON configuration; an empty string selects
///   the defaults
///
/// # Returns
/// Flat array of RGBA bytes, grey with alpha 255
#[wasm_bindgen]
pub fn pencil_sketch_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    config_json: &str,
) -> Result<Vec<u8>, JsError> {
    let config = if config_json.trim().is_empty() {
        SketchConfig::default()
    } else {
        SketchConfig::from_json(config_json)?
    };
    Ok(render(data, width, height, &config)?)
}

/// Default configuration as camelCase JSON.
#[wasm_bindgen]
pub fn default_config_json_wasm() -> Result<String, JsError> {
    Ok(serde_json::to_string(&SketchConfig::default())?)
}
