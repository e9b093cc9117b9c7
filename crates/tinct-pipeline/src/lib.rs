//! tinct-pipeline: Pure pixel color-transform engine (sans-IO).
//!
//! Works on already-decoded RGBA8888 buffers and offers:
//! per-pixel filters (saturate, brightness, desaturate, invert, outline,
//! contrast), square-kernel convolution, and named presets that chain
//! those filters.
//!
//! This crate has **no I/O dependencies**. Decoding and encoding image
//! files is the host's job; the engine accepts and returns raw buffers
//! (or `image::RgbaImage` rasters).
//!
//! Use [`Pipeline`] for step-by-step processing with `reset`, or
//! [`process`] to run a list of [`Operation`]s in one call.

pub mod buffer;
pub mod convolve;
pub mod diagnostics;
pub mod filter;
pub mod pipeline;
pub mod preset;
pub mod stats;
pub mod types;

pub use buffer::PixelBuffer;
pub use convolve::{EdgeMode, Kernel};
pub use diagnostics::{OperationDiagnostics, PipelineDiagnostics};
pub use filter::{
    BrightnessParams, ContrastParams, DesaturationParams, InvertParams, OutlineParams,
    PixelFilter, ReferenceMode, SaturationParams,
};
pub use pipeline::{Operation, Pipeline, PipelineState};
pub use preset::{Look, Preset, PresetCoefficients};
pub use stats::{ChannelAverages, ChannelTotals, StatsCache};
pub use types::{Dimensions, PipelineError, Pixel, RgbaImage};

/// Run `operations` over `buffer` in order and return the result.
///
/// Equivalent to creating a [`Pipeline`], calling
/// [`apply_all`](Pipeline::apply_all) and taking the current buffer.
/// An empty operation list returns the input unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if `buffer` has no pixels.
pub fn process(buffer: PixelBuffer, operations: &[Operation]) -> Result<PixelBuffer, PipelineError> {
    let mut pipeline = Pipeline::new(buffer)?;
    pipeline.apply_all(operations)?;
    Ok(pipeline.into_current())
}

/// Run the preset registered under `name` over `buffer`.
///
/// Unrecognized names apply a zero saturation, which leaves the buffer
/// unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if `buffer` has no pixels.
pub fn process_preset(buffer: PixelBuffer, name: &str) -> Result<PixelBuffer, PipelineError> {
    process(buffer, &Preset::from_name(name).steps())
}
