//! Shared types for the tinct pixel engine.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so hosts can hand decoded rasters to the engine
/// without depending on `image` directly.
pub use image::RgbaImage;

/// One 8-bit RGBA color value.
///
/// Transforms never mutate a pixel they were given; they return a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel. Color transforms pass it through untouched.
    pub alpha: u8,
}

impl Pixel {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create a pixel from all four channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Create a fully opaque pixel.
    #[must_use]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 255)
    }

    /// Return a copy with the color channels replaced and alpha kept.
    #[must_use]
    pub const fn with_rgb(self, red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, self.alpha)
    }

    /// Sum of the three color channels (0..=765).
    #[must_use]
    pub fn channel_sum(self) -> u16 {
        u16::from(self.red) + u16::from(self.green) + u16::from(self.blue)
    }

    /// The brightest of the three color channels.
    #[must_use]
    pub fn max_channel(self) -> u8 {
        self.red.max(self.green).max(self.blue)
    }

    /// Channels as an `[r, g, b, a]` array.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

impl From<[u8; 4]> for Pixel {
    fn from([red, green, blue, alpha]: [u8; 4]) -> Self {
        Self::new(red, green, blue, alpha)
    }
}

impl From<Pixel> for [u8; 4] {
    fn from(pixel: Pixel) -> Self {
        pixel.to_array()
    }
}

/// Buffer dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Errors that can occur while building buffers or running operations.
///
/// Parameter magnitudes never produce an error: every alteration is
/// clamped into its valid range instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// A pixel coordinate lies outside the buffer.
    #[error("pixel ({x}, {y}) is out of bounds for a {width}x{height} buffer")]
    IndexOutOfBounds {
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },

    /// The buffer has no pixels, so per-pixel averages are undefined.
    #[error("buffer has no pixels ({width}x{height})")]
    InvalidBuffer {
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },

    /// A pixel sequence or byte slice does not match the declared size.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch {
        /// Length implied by the declared dimensions.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Kernel weight count is not the square of an odd number.
    #[error("kernel must have an odd perfect-square number of weights, got {len}")]
    InvalidKernel {
        /// Number of weights supplied.
        len: usize,
    },
}
