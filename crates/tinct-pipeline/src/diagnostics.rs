//! Per-operation diagnostics: timing and pixel counts.
//!
//! Every [`Pipeline`](crate::Pipeline) operation records an
//! [`OperationDiagnostics`] entry. The pipeline keeps them until the next
//! [`reset`](crate::Pipeline::reset), which makes it easy to see what a
//! preset actually did and where the time went.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics for a single pipeline operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDiagnostics {
    /// Operation name, e.g. `"saturate"` or `"convolve"`.
    pub operation: String,
    /// Wall-clock duration of the operation (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Number of pixels processed.
    pub pixel_count: u64,
    /// Number of pixels whose value differs from the input.
    pub changed_pixels: u64,
}

impl OperationDiagnostics {
    /// Build an entry by comparing the buffers before and after an
    /// operation.
    #[must_use]
    pub fn measure(
        operation: impl Into<String>,
        duration: Duration,
        before: &PixelBuffer,
        after: &PixelBuffer,
    ) -> Self {
        Self {
            operation: operation.into(),
            duration,
            pixel_count: after.dimensions().pixel_count(),
            changed_pixels: count_changed_pixels(before, after),
        }
    }

    /// Fraction of processed pixels that changed, in `0.0..=1.0`.
    #[must_use]
    pub fn changed_ratio(&self) -> f64 {
        if self.pixel_count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.changed_pixels as f64 / self.pixel_count as f64;
        ratio
    }
}

/// Diagnostics for the most recent operations since the pipeline was
/// created or last reset, in the order they ran.
///
/// At most [`HISTORY_LIMIT`](Self::HISTORY_LIMIT) entries are kept; older
/// ones are dropped first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// One entry per operation.
    pub operations: Vec<OperationDiagnostics>,
}

impl PipelineDiagnostics {
    /// Maximum number of entries retained.
    pub const HISTORY_LIMIT: usize = 256;

    /// Number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if no operation has run since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Names of the recorded operations, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|op| op.operation.as_str())
    }

    /// Sum of all operation durations.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.operations.iter().map(|op| op.duration).sum()
    }

    pub(crate) fn record(&mut self, entry: OperationDiagnostics) {
        if self.operations.len() >= Self::HISTORY_LIMIT {
            let excess = self.operations.len() + 1 - Self::HISTORY_LIMIT;
            self.operations.drain(..excess);
        }
        self.operations.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.operations.clear();
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Operations: {}  |  Total duration: {:.3}ms",
            self.len(),
            duration_ms(self.total_duration()),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<4} {:<16} {:>10} {:>10}  {}",
            "#", "Operation", "Duration", "% Total", "Changed"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration());
        for (index, op) in self.operations.iter().enumerate() {
            let ms = duration_ms(op.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<4} {:<16} {ms:>8.3}ms {pct:>9.1}%  {}/{} ({:.1}%)",
                index + 1,
                op.operation,
                op.changed_pixels,
                op.pixel_count,
                op.changed_ratio() * 100.0,
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Count positions where the two buffers hold different pixels.
///
/// Alpha is compared too, so a change to any channel counts.
pub(crate) fn count_changed_pixels(before: &PixelBuffer, after: &PixelBuffer) -> u64 {
    before
        .pixels()
        .iter()
        .zip(after.pixels())
        .map(|(a, b)| u64::from(a != b))
        .sum()
}
