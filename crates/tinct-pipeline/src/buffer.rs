//! Row-major RGBA pixel buffer.
//!
//! [`PixelBuffer`] is the only data structure the engine mutates, and
//! even then only while building a fresh buffer: every transform reads
//! a finished buffer and produces a new one, so neighbor reads never
//! observe partially transformed pixels.
//!
//! With the `parallel` feature (on by default) per-pixel and per-row work
//! is spread across the `rayon` thread pool. Each destination slot is
//! written exactly once from an untouched source, so results are
//! identical with the feature on or off.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::types::{Dimensions, Pixel, PipelineError, RgbaImage};

/// An owned `width * height` grid of [`Pixel`]s, stored row-major
/// (`index = y * width + x`).
///
/// The pixel count always equals `width * height`; every constructor
/// checks or guarantees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl PixelBuffer {
    /// Create a buffer from an existing row-major pixel sequence.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if `pixels.len()` is
    /// not `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Self, PipelineError> {
        let expected = area(width, height);
        if pixels.len() != expected {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a buffer where every pixel has the same value.
    #[must_use]
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; area(width, height)],
        }
    }

    /// Create a buffer by evaluating `f(x, y)` for every coordinate.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Pixel) -> Self {
        let mut pixels = Vec::with_capacity(area(width, height));
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a buffer from tightly packed RGBA8888 bytes, the form the
    /// host image subsystem hands over after decoding.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if `bytes.len()` is
    /// not `width * height * 4`.
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, PipelineError> {
        let expected = area(width, height) * 4;
        if bytes.len() != expected {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Flatten into tightly packed RGBA8888 bytes.
    #[must_use]
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_array()).collect()
    }

    /// Buffer width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// All pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns `true` if the buffer has zero width or zero height.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Read the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IndexOutOfBounds`] if `x >= width` or
    /// `y >= height`. Coordinates are never clamped.
    pub fn get(&self, x: u32, y: u32) -> Result<Pixel, PipelineError> {
        let index = self.index_of(x, y)?;
        Ok(self.pixels[index])
    }

    /// Overwrite the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IndexOutOfBounds`] if `x >= width` or
    /// `y >= height`.
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) -> Result<(), PipelineError> {
        let index = self.index_of(x, y)?;
        self.pixels[index] = pixel;
        Ok(())
    }

    /// Apply `transform` to every pixel independently, producing a new
    /// buffer of the same dimensions. `self` is left untouched.
    #[must_use = "returns the transformed buffer"]
    pub fn map<F>(&self, transform: F) -> Self
    where
        F: Fn(Pixel) -> Pixel + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        let pixels = self.pixels.par_iter().map(|&p| transform(p)).collect();
        #[cfg(not(feature = "parallel"))]
        let pixels = self.pixels.iter().map(|&p| transform(p)).collect();

        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Build a new buffer of the same dimensions row by row.
    ///
    /// `fill_row(y, row)` receives the destination row `y` (already
    /// sized to `width`) and must write every slot. Rows are disjoint, so
    /// they may be filled concurrently.
    pub(crate) fn build_rows<F>(&self, fill_row: F) -> Self
    where
        F: Fn(u32, &mut [Pixel]) + Send + Sync,
    {
        let mut pixels = vec![Pixel::default(); self.pixels.len()];
        if !pixels.is_empty() {
            let row_len = self.width as usize;

            #[cfg(feature = "parallel")]
            pixels
                .par_chunks_mut(row_len)
                .zip(0..self.height)
                .for_each(|(row, y)| fill_row(y, row));
            #[cfg(not(feature = "parallel"))]
            pixels
                .chunks_mut(row_len)
                .zip(0..self.height)
                .for_each(|(row, y)| fill_row(y, row));
        }
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    fn index_of(&self, x: u32, y: u32) -> Result<usize, PipelineError> {
        if x >= self.width || y >= self.height {
            return Err(PipelineError::IndexOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }
}

impl From<&RgbaImage> for PixelBuffer {
    fn from(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.pixels().map(|p| Pixel::from(p.0)).collect(),
        }
    }
}

impl From<&PixelBuffer> for RgbaImage {
    fn from(buffer: &PixelBuffer) -> Self {
        Self::from_fn(buffer.width, buffer.height, |x, y| {
            let index = y as usize * buffer.width as usize + x as usize;
            image::Rgba(buffer.pixels[index].to_array())
        })
    }
}

/// Pixel count for the given dimensions, as a slice length.
fn area(width: u32, height: u32) -> usize {
    let count = Dimensions { width, height }.pixel_count();
    usize::try_from(count).unwrap_or(usize::MAX)
}
