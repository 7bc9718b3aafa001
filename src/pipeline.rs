//! Sketch pipeline orchestration.
//!
//! Stages run in order: grayscale, segmentation (optional), then one or two
//! stroke passes (noise, direction field, LIC, edges, compositing). The
//! crosshatch mode runs a second, rotated and lighter pass and blends it
//! over the first.
//!
//! Progress is reported through a caller-supplied callback at every stage
//! boundary and after each band of LIC rows. The same points check the
//! optional [`CancelToken`].
//!
//! ```
//! use lic_sketch::config::SketchConfig;
//! use lic_sketch::pipeline::render;
//!
//! let rgba = vec![200u8; 8 * 8 * 4];
//! let out = render(&rgba, 8, 8, &SketchConfig::default()).unwrap();
//! assert_eq!(out.len(), rgba.len());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use tracing::{debug, trace};

use crate::composite::{blend_crosshatch, composite, Layers};
use crate::config::{SketchConfig, StrokeDirection};
use crate::direction::{build_field, DirectionField};
use crate::error::{SketchError, SketchResult};
use crate::filters::edge::sobel_magnitude;
use crate::filters::grayscale::{luminance_to_rgba, rgba_to_luminance};
use crate::filters::noise::tone_noise;
use crate::filters::paper::paper_texture;
use crate::lic::convolve_band;
use crate::segmentation::{Segmentation, SegmentationEngine, SegmentationParams};

/// One progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 0-100, never decreasing within one render
    pub percent: u8,
    pub label: &'static str,
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Maps stage-local percentages into the global range and enforces
/// monotonic output.
struct ProgressReporter<'a> {
    sink: &'a mut dyn FnMut(Progress),
    cancel: Option<CancelToken>,
    range: (f32, f32),
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    fn new(sink: &'a mut dyn FnMut(Progress), cancel: Option<CancelToken>) -> Self {
        ProgressReporter {
            sink,
            cancel,
            range: (0.0, 100.0),
            last: 0,
        }
    }

    /// Subsequent `report` calls map 0-100 onto `start..end`.
    fn set_range(&mut self, start: f32, end: f32) {
        self.range = (start, end);
    }

    fn report(&mut self, local: f32, label: &'static str) -> SketchResult<()> {
        let (start, end) = self.range;
        self.emit(start + (end - start) * local.clamp(0.0, 100.0) / 100.0, label)
    }

    fn emit(&mut self, percent: f32, label: &'static str) -> SketchResult<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(SketchError::Cancelled);
        }
        let percent = (percent.round().clamp(0.0, 100.0) as u8).max(self.last);
        self.last = percent;
        (self.sink)(Progress { percent, label });
        Ok(())
    }

    fn complete(&mut self) {
        self.last = 100;
        (self.sink)(Progress {
            percent: 100,
            label: "complete",
        });
    }
}

/// Buffers produced by one stroke pass.
#[derive(Debug, Clone)]
pub struct PassBuffers {
    pub noise: Array2<f32>,
    pub field: DirectionField,
    pub lic: Array2<f32>,
    pub edges: Array2<f32>,
    /// Composited pass result, 0.0-255.0
    pub composite: Array2<f32>,
}

/// Every plane of one render. Created per call; nothing is cached.
#[derive(Debug, Clone)]
pub struct SketchPlanes {
    pub gray: Array2<f32>,
    pub segmentation: Option<Segmentation>,
    pub base: PassBuffers,
    /// Second pass, crosshatch mode only
    pub hatch: Option<PassBuffers>,
    /// Final tone plane, 0.0-255.0
    pub output: Array2<f32>,
}

/// Render an RGBA image as a pencil sketch.
///
/// # Returns
/// RGBA bytes of the same size, grey replicated, alpha 255
pub fn render(rgba: &[u8], width: usize, height: usize, config: &SketchConfig) -> SketchResult<Vec<u8>> {
    render_with_progress(rgba, width, height, config, &mut |_| {}, None)
}

/// [`render`] with progress events and optional cancellation.
pub fn render_with_progress(
    rgba: &[u8],
    width: usize,
    height: usize,
    config: &SketchConfig,
    progress: &mut dyn FnMut(Progress),
    cancel: Option<&CancelToken>,
) -> SketchResult<Vec<u8>> {
    let planes = render_planes_with_progress(rgba, width, height, config, progress, cancel)?;
    Ok(luminance_to_rgba(&planes.output))
}

/// Render and return every intermediate plane.
pub fn render_planes(rgba: &[u8], width: usize, height: usize, config: &SketchConfig) -> SketchResult<SketchPlanes> {
    render_planes_with_progress(rgba, width, height, config, &mut |_| {}, None)
}

#[tracing::instrument(skip_all, fields(width = width, height = height, mode = ?config.stroke_direction))]
pub fn render_planes_with_progress(
    rgba: &[u8],
    width: usize,
    height: usize,
    config: &SketchConfig,
    progress: &mut dyn FnMut(Progress),
    cancel: Option<&CancelToken>,
) -> SketchResult<SketchPlanes> {
    config.validate()?;
    let mut reporter = ProgressReporter::new(progress, cancel.cloned());

    let gray = rgba_to_luminance(rgba, width, height)?;
    reporter.emit(5.0, "grayscale")?;

    let segmentation = if config.use_segmentation {
        let engine = SegmentationEngine::new(SegmentationParams::from(config));
        let seg = engine.segment(&gray);
        reporter.emit(12.0, "segmentation")?;
        Some(seg)
    } else {
        None
    };

    let crosshatch = config.stroke_direction == StrokeDirection::Crosshatch;
    let (base, hatch, output) = if crosshatch {
        reporter.set_range(15.0, 55.0);
        let base = render_pass(&gray, config, segmentation.as_ref(), &mut reporter)?;

        reporter.set_range(55.0, 95.0);
        let hatch = render_pass(&gray, &config.crosshatch_pass(), segmentation.as_ref(), &mut reporter)?;

        let output = blend_crosshatch(&base.composite, &hatch.composite);
        reporter.emit(97.0, "crosshatch")?;
        (base, Some(hatch), output)
    } else {
        reporter.set_range(15.0, 95.0);
        let base = render_pass(&gray, config, segmentation.as_ref(), &mut reporter)?;
        let output = base.composite.clone();
        (base, None, output)
    };

    reporter.complete();
    debug!(
        regions = segmentation.as_ref().map(Segmentation::num_regions),
        "sketch complete"
    );

    Ok(SketchPlanes {
        gray,
        segmentation,
        base,
        hatch,
        output,
    })
}

/// One full stroke pass over a luminance plane.
fn render_pass(
    gray: &Array2<f32>,
    config: &SketchConfig,
    segmentation: Option<&Segmentation>,
    reporter: &mut ProgressReporter,
) -> SketchResult<PassBuffers> {
    let (height, width) = gray.dim();

    let noise = tone_noise(gray, config.brightness, config.noise_scale);
    reporter.report(10.0, "noise")?;

    let field = build_field(config, gray, segmentation);
    reporter.report(25.0, "direction field")?;

    let mut lic = Array2::<f32>::zeros((height, width));
    let batch = config.lic_batch_rows.max(1);
    for start in (0..height).step_by(batch) {
        let end = (start + batch).min(height);
        convolve_band(&noise, &field, config.kernel_length, start..end, &mut lic);
        trace!(rows = end, of = height, "lic band done");
        reporter.report(25.0 + 60.0 * end as f32 / height as f32, "lic")?;
    }

    let edges = if config.edge_strength > 0.0 {
        sobel_magnitude(gray)
    } else {
        Array2::zeros((height, width))
    };
    reporter.report(92.0, "edges")?;

    let paper = if config.paper_strength > 0.0 {
        paper_texture(width, height)
    } else {
        Array2::zeros((height, width))
    };
    let boundaries = segmentation
        .filter(|_| config.draw_boundaries)
        .map(|seg| &seg.boundaries);

    let composite = composite(
        &lic,
        &Layers {
            edges: &edges,
            edge_strength: config.edge_strength,
            edge_mode: config.edge_mode,
            boundaries,
            paper: &paper,
            paper_strength: config.paper_strength,
        },
    );
    reporter.report(100.0, "compositing")?;

    Ok(PassBuffers {
        noise,
        field,
        lic,
        edges,
        composite,
    })
}
