//! Per-channel color statistics with explicit cache state.
//!
//! [`StatsCache`] never notices on its own that the buffer it was
//! computed from has changed. Each `compute_*` call returns the next
//! cache state by value; the caller decides whether to store it and must
//! pass `force = true` after the buffer changes.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::buffer::PixelBuffer;
use crate::types::PipelineError;

/// Sums of each color channel over every pixel of a buffer.
///
/// `u64` holds the total of well over 10^8 pixels at 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelTotals {
    /// Sum of all red values.
    pub red: u64,
    /// Sum of all green values.
    pub green: u64,
    /// Sum of all blue values.
    pub blue: u64,
    /// Number of pixels summed.
    pub pixel_count: u64,
}

impl ChannelTotals {
    /// Sum every channel of `buffer`.
    #[must_use]
    pub fn of(buffer: &PixelBuffer) -> Self {
        let mut totals = Self::default();
        for p in buffer.pixels() {
            totals.red += u64::from(p.red);
            totals.green += u64::from(p.green);
            totals.blue += u64::from(p.blue);
        }
        totals.pixel_count = buffer.dimensions().pixel_count();
        totals
    }

    /// Truncating per-channel mean, clamped to `0..=255`.
    ///
    /// Returns `None` when no pixels were summed.
    #[must_use]
    pub fn averages(&self) -> Option<ChannelAverages> {
        if self.pixel_count == 0 {
            return None;
        }
        let mean = |total: u64| {
            #[allow(clippy::cast_possible_truncation)]
            let clamped = (total / self.pixel_count).min(255) as u8;
            clamped
        };
        Some(ChannelAverages {
            red: mean(self.red),
            green: mean(self.green),
            blue: mean(self.blue),
        })
    }
}

/// Per-channel mean color of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelAverages {
    /// Mean red value.
    pub red: u8,
    /// Mean green value.
    pub green: u8,
    /// Mean blue value.
    pub blue: u8,
}

/// Cached statistics for whichever buffer they were last computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatsCache {
    /// Nothing computed, or explicitly invalidated.
    #[default]
    Stale,
    /// Totals are known; averages are not.
    Totals(ChannelTotals),
    /// Totals and averages are both known.
    Fresh {
        /// Channel sums.
        totals: ChannelTotals,
        /// Channel means derived from `totals`.
        averages: ChannelAverages,
    },
}

impl StatsCache {
    /// The cached totals, if any.
    #[must_use]
    pub const fn totals(&self) -> Option<ChannelTotals> {
        match *self {
            Self::Stale => None,
            Self::Totals(totals) | Self::Fresh { totals, .. } => Some(totals),
        }
    }

    /// The cached averages, if any.
    #[must_use]
    pub const fn averages(&self) -> Option<ChannelAverages> {
        match *self {
            Self::Fresh { averages, .. } => Some(averages),
            Self::Stale | Self::Totals(_) => None,
        }
    }

    /// Returns `true` unless the cache is [`Stale`](Self::Stale).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self, Self::Stale)
    }

    /// Compute channel totals for `buffer`.
    ///
    /// If totals are already cached and `force` is `false`, the cache is
    /// returned unchanged even if `buffer` differs from the one it was
    /// computed from.
    #[must_use = "the recomputed cache is returned, not stored"]
    pub fn compute_totals(self, buffer: &PixelBuffer, force: bool) -> Self {
        match self.totals() {
            Some(_) if !force => self,
            _ => Self::Totals(sum_channels(buffer)),
        }
    }

    /// Compute channel averages for `buffer`, computing totals first if
    /// none are cached (or `force` is set).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if `buffer` has no pixels.
    pub fn compute_averages(self, buffer: &PixelBuffer, force: bool) -> Result<Self, PipelineError> {
        if !force && self.averages().is_some() {
            return Ok(self);
        }
        let invalid = || PipelineError::InvalidBuffer {
            width: buffer.width(),
            height: buffer.height(),
        };
        if buffer.is_empty() {
            return Err(invalid());
        }
        let totals = match self.totals() {
            Some(totals) if !force => totals,
            _ => sum_channels(buffer),
        };
        let averages = totals.averages().ok_or_else(invalid)?;
        trace!(
            red = averages.red,
            green = averages.green,
            blue = averages.blue,
            "computed channel averages"
        );
        Ok(Self::Fresh { totals, averages })
    }
}

fn sum_channels(buffer: &PixelBuffer) -> ChannelTotals {
    let totals = ChannelTotals::of(buffer);
    trace!(
        red = totals.red,
        green = totals.green,
        blue = totals.blue,
        pixels = totals.pixel_count,
        "computed channel totals"
    );
    totals
}
