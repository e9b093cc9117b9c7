//! Stateful filter pipeline over one source buffer.
//!
//! A [`Pipeline`] owns three buffers: the `original` it was created from,
//! the `before` buffer (input of the most recent operation) and the
//! `current` result. Every operation reads `current`, stores its output
//! as the new `current` and moves the old one into `before`:
//!
//! ```rust
//! # use tinct_pipeline::{Pipeline, PipelineError, PixelBuffer, Pixel, SaturationParams};
//! # fn run() -> Result<(), PipelineError> {
//! let buffer = PixelBuffer::filled(4, 4, Pixel::rgb(100, 100, 100));
//! let mut pipeline = Pipeline::new(buffer)?;
//!
//! pipeline.saturate(SaturationParams::new(100, 0, 0));
//! pipeline.contrast(Default::default())?;
//! assert_eq!(pipeline.history().len(), 2);
//!
//! pipeline.reset();
//! assert_eq!(pipeline.current(), pipeline.original());
//! # Ok(())
//! # }
//! ```
//!
//! `before` is a single-level record of the last input, not an undo stack.
//!
//! # Statistics
//!
//! The pipeline stores the [`StatsCache`] of the last statistics request.
//! Contrast always recomputes totals and averages for the buffer it is
//! about to adjust, so it never uses a stale cache. Other operations leave
//! the stored cache alone; [`reset`](Pipeline::reset) marks it stale.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::convolve::{self, EdgeMode, Kernel};
use crate::diagnostics::{OperationDiagnostics, PipelineDiagnostics};
use crate::filter::{
    BrightnessParams, ContrastParams, DesaturationParams, InvertParams, OutlineParams,
    PixelFilter, SaturationParams,
};
use crate::preset::{Look, Preset};
use crate::stats::{ChannelAverages, StatsCache};
use crate::types::PipelineError;

// ───────────────────────── Operations ─────────────────────────

/// One pipeline step together with its resolved parameters.
///
/// Serialized with an `"op"` tag, so a sequence of steps can be stored as
/// JSON and replayed with [`Pipeline::apply_all`]:
///
/// ```json
/// [{"op": "contrast", "alteration": 40}, {"op": "saturate", "red": 10}]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Per-channel saturation.
    Saturate(SaturationParams),
    /// Uniform saturation on all three channels.
    Brightness(BrightnessParams),
    /// Blend toward a reference value.
    Desaturate(DesaturationParams),
    /// Blend toward the complement.
    Invert(InvertParams),
    /// Threshold posterization.
    Outline(OutlineParams),
    /// Push channels away from the buffer average.
    Contrast(ContrastParams),
    /// Square-kernel convolution.
    Convolve {
        /// Kernel weights.
        kernel: Kernel,
        /// Handling of samples outside the buffer.
        #[serde(default)]
        edge_mode: EdgeMode,
    },
}

impl Operation {
    /// Short name used in logs and diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Saturate(_) => "saturate",
            Self::Brightness(_) => "brightness",
            Self::Desaturate(_) => "desaturate",
            Self::Invert(_) => "invert",
            Self::Outline(_) => "outline",
            Self::Contrast(_) => "contrast",
            Self::Convolve { .. } => "convolve",
        }
    }
}

/// Whether the pipeline still holds its original buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PipelineState {
    /// No operation has run since creation or the last reset.
    #[default]
    Original,
    /// At least one operation has run.
    Modified,
}

// ───────────────────────── Pipeline ─────────────────────────

/// Applies filters, convolutions and presets to a buffer, one operation
/// at a time.
///
/// Operations run strictly in call order; each one reads the `current`
/// buffer left by the previous one. Callers sharing a pipeline across
/// threads must provide their own exclusion (`&mut self` enforces this
/// within safe code).
#[derive(Debug, Clone)]
pub struct Pipeline {
    original: PixelBuffer,
    before: PixelBuffer,
    current: PixelBuffer,
    state: PipelineState,
    stats: StatsCache,
    history: PipelineDiagnostics,
}

impl Pipeline {
    /// Create a pipeline over `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if `buffer` has no pixels.
    pub fn new(buffer: PixelBuffer) -> Result<Self, PipelineError> {
        if buffer.is_empty() {
            return Err(PipelineError::InvalidBuffer {
                width: buffer.width(),
                height: buffer.height(),
            });
        }
        Ok(Self {
            before: buffer.clone(),
            current: buffer.clone(),
            original: buffer,
            state: PipelineState::Original,
            stats: StatsCache::Stale,
            history: PipelineDiagnostics::default(),
        })
    }

    /// The buffer the pipeline was created from.
    #[must_use]
    pub const fn original(&self) -> &PixelBuffer {
        &self.original
    }

    /// Input of the most recent operation (equal to `original` after a
    /// reset).
    #[must_use]
    pub const fn before(&self) -> &PixelBuffer {
        &self.before
    }

    /// Result of the most recent operation.
    #[must_use]
    pub const fn current(&self) -> &PixelBuffer {
        &self.current
    }

    /// Consume the pipeline and return the current buffer.
    #[must_use]
    pub fn into_current(self) -> PixelBuffer {
        self.current
    }

    /// Whether any operation has run since creation or the last reset.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Statistics as last stored.
    #[must_use]
    pub const fn stats(&self) -> &StatsCache {
        &self.stats
    }

    /// Diagnostics for the operations since creation or the last reset.
    ///
    /// Only the newest [`PipelineDiagnostics::HISTORY_LIMIT`] entries are
    /// kept, so a long-lived pipeline that is never reset stays bounded.
    #[must_use]
    pub const fn history(&self) -> &PipelineDiagnostics {
        &self.history
    }

    /// Restore `before` and `current` to the original buffer, mark the
    /// statistics stale and clear the history.
    pub fn reset(&mut self) -> &PixelBuffer {
        self.before = self.original.clone();
        self.current = self.original.clone();
        self.state = PipelineState::Original;
        self.stats = StatsCache::Stale;
        self.history.clear();
        debug!("pipeline reset");
        &self.current
    }

    /// Compute (or reuse) channel averages for the current buffer and
    /// store the resulting cache.
    ///
    /// Without `force`, a cached value is returned even if it was computed
    /// for an earlier buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if the current buffer has
    /// no pixels.
    pub fn compute_averages(&mut self, force: bool) -> Result<ChannelAverages, PipelineError> {
        self.stats = self.stats.compute_averages(&self.current, force)?;
        self.stats.averages().ok_or_else(|| self.invalid_buffer())
    }

    // ───────────────────────── Filters ─────────────────────────

    /// Adjust each channel by its own saturation alteration.
    pub fn saturate(&mut self, params: SaturationParams) -> &PixelBuffer {
        self.map_pixels("saturate", params)
    }

    /// Saturate all three channels by the same alteration.
    pub fn brightness(&mut self, params: BrightnessParams) -> &PixelBuffer {
        self.map_pixels("brightness", params)
    }

    /// Blend each channel toward the reference value of `params.mode`.
    pub fn desaturate(&mut self, params: DesaturationParams) -> &PixelBuffer {
        self.map_pixels("desaturate", params)
    }

    /// Blend each channel toward its complement.
    pub fn invert(&mut self, params: InvertParams) -> &PixelBuffer {
        self.map_pixels("invert", params)
    }

    /// Posterize by channel-sum threshold.
    pub fn outline(&mut self, params: OutlineParams) -> &PixelBuffer {
        self.map_pixels("outline", params)
    }

    /// Push channels away from (or toward) the averages of the current
    /// buffer.
    ///
    /// Totals and averages are always recomputed against the current
    /// buffer before adjusting, and the fresh cache is stored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if the current buffer has
    /// no pixels.
    pub fn contrast(&mut self, params: ContrastParams) -> Result<&PixelBuffer, PipelineError> {
        let averages = self.compute_averages(true)?;
        Ok(self.map_pixels("contrast", params.with_averages(averages)))
    }

    // ───────────────────────── Convolution ─────────────────────────

    /// Convolve the current buffer with `kernel`.
    pub fn convolve(&mut self, kernel: &Kernel, edge_mode: EdgeMode) -> &PixelBuffer {
        self.run("convolve", |buffer| {
            convolve::convolve(buffer, kernel, edge_mode)
        })
    }

    /// Convolve with [`Kernel::sharpen`], skipping out-of-range samples.
    pub fn sharpen(&mut self, alteration: i32) -> &PixelBuffer {
        let kernel = Kernel::sharpen(alteration);
        self.run("sharpen", |buffer| {
            convolve::convolve(buffer, &kernel, EdgeMode::Skip)
        })
    }

    /// Convolve with [`Kernel::blur`], skipping out-of-range samples.
    pub fn blur(&mut self, alteration: i32) -> &PixelBuffer {
        let kernel = Kernel::blur(alteration);
        self.run("blur", |buffer| {
            convolve::convolve(buffer, &kernel, EdgeMode::Skip)
        })
    }

    // ───────────────────────── Sequences ─────────────────────────

    /// Run one [`Operation`].
    ///
    /// # Errors
    ///
    /// Propagates the error of a failing [`contrast`](Self::contrast) step.
    pub fn apply(&mut self, operation: &Operation) -> Result<&PixelBuffer, PipelineError> {
        match operation {
            Operation::Saturate(params) => Ok(self.saturate(*params)),
            Operation::Brightness(params) => Ok(self.brightness(*params)),
            Operation::Desaturate(params) => Ok(self.desaturate(*params)),
            Operation::Invert(params) => Ok(self.invert(*params)),
            Operation::Outline(params) => Ok(self.outline(*params)),
            Operation::Contrast(params) => self.contrast(*params),
            Operation::Convolve { kernel, edge_mode } => Ok(self.convolve(kernel, *edge_mode)),
        }
    }

    /// Run `operations` in order, stopping at the first error.
    ///
    /// An empty slice leaves the pipeline untouched.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by [`apply`](Self::apply).
    /// Operations before the failing one stay applied.
    pub fn apply_all(&mut self, operations: &[Operation]) -> Result<&PixelBuffer, PipelineError> {
        for operation in operations {
            self.apply(operation)?;
        }
        Ok(&self.current)
    }

    // ───────────────────────── Presets ─────────────────────────

    /// Run the preset registered under `name`.
    ///
    /// Unrecognized names run [`Preset::Neutral`] (a zero saturation)
    /// instead of failing.
    ///
    /// # Errors
    ///
    /// Propagates a failing contrast step.
    pub fn preset(&mut self, name: &str) -> Result<&PixelBuffer, PipelineError> {
        self.apply_preset(Preset::from_name(name))
    }

    /// Run every step of `preset` with its default parameters.
    ///
    /// # Errors
    ///
    /// Propagates a failing contrast step.
    pub fn apply_preset(&mut self, preset: Preset) -> Result<&PixelBuffer, PipelineError> {
        debug!(preset = preset.name(), "applying preset");
        self.apply_all(&preset.steps())
    }

    /// Run a composite look scaled by `alteration` percent (`0..=100`).
    ///
    /// # Errors
    ///
    /// Propagates a failing contrast step.
    pub fn look(&mut self, look: Look, alteration: i32) -> Result<&PixelBuffer, PipelineError> {
        debug!(look = look.name(), alteration, "applying look");
        self.apply_all(&look.steps(alteration))
    }

    /// [`Look::BlueHaze`] at `alteration` percent.
    ///
    /// # Errors
    ///
    /// Propagates a failing contrast step.
    pub fn blue_haze(&mut self, alteration: i32) -> Result<&PixelBuffer, PipelineError> {
        self.look(Look::BlueHaze, alteration)
    }

    /// [`Look::RedEye`] at `alteration` percent.
    ///
    /// # Errors
    ///
    /// Propagates a failing contrast step.
    pub fn red_eye(&mut self, alteration: i32) -> Result<&PixelBuffer, PipelineError> {
        self.look(Look::RedEye, alteration)
    }

    /// [`Look::CombatHardened`] at `alteration` percent.
    ///
    /// # Errors
    ///
    /// Propagates a failing contrast step.
    pub fn combat_hardened(&mut self, alteration: i32) -> Result<&PixelBuffer, PipelineError> {
        self.look(Look::CombatHardened, alteration)
    }

    // ───────────────────────── Internals ─────────────────────────

    fn map_pixels<F>(&mut self, name: &'static str, filter: F) -> &PixelBuffer
    where
        F: PixelFilter + Send + Sync,
    {
        self.run(name, |buffer| buffer.map(|p| filter.apply(p)))
    }

    /// Produce the next buffer from `current`, record diagnostics and
    /// advance `before`/`current`.
    fn run(
        &mut self,
        name: &'static str,
        transform: impl FnOnce(&PixelBuffer) -> PixelBuffer,
    ) -> &PixelBuffer {
        let start = web_time::Instant::now();
        let next = transform(&self.current);
        let entry = OperationDiagnostics::measure(name, start.elapsed(), &self.current, &next);

        debug!(
            operation = name,
            width = next.width(),
            height = next.height(),
            changed = entry.changed_pixels,
            elapsed_ms = entry.duration.as_secs_f64() * 1000.0,
            "applied operation"
        );

        self.history.record(entry);
        self.before = std::mem::replace(&mut self.current, next);
        self.state = PipelineState::Modified;
        &self.current
    }

    const fn invalid_buffer(&self) -> PipelineError {
        PipelineError::InvalidBuffer {
            width: self.current.width(),
            height: self.current.height(),
        }
    }
}
