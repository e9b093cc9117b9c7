//! Square-kernel convolution over the color channels of a buffer.
//!
//! Every destination pixel is computed from the untouched source buffer,
//! so a pass never observes its own writes. Alpha is copied from the
//! source pixel at the same position.
//!
//! # Edge handling
//!
//! [`EdgeMode::Skip`] (the default) drops kernel samples that fall outside
//! the buffer instead of clamping or wrapping them. Border pixels therefore
//! receive less total weight than interior ones: with a non-negative
//! kernel they come out darker (the edge-darkening bias). This matches the
//! established output of the engine and is kept as the default.
//!
//! [`EdgeMode::Clamp`] replicates the nearest edge pixel for out-of-range
//! samples, which removes the bias. It delegates to
//! [`imageproc::filter::filter_clamped`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::buffer::PixelBuffer;
use crate::filter::to_channel;
use crate::types::{PipelineError, Pixel, RgbaImage};

/// A square weight matrix with an odd side length, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Kernel {
    weights: Vec<f32>,
    side: usize,
}

impl Kernel {
    /// Create a kernel from a flat row-major weight list.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidKernel`] unless `weights.len()` is
    /// the square of an odd number.
    pub fn new(weights: Vec<f32>) -> Result<Self, PipelineError> {
        let side = weights.len().isqrt();
        if side * side != weights.len() || side % 2 == 0 {
            return Err(PipelineError::InvalidKernel { len: weights.len() });
        }
        Ok(Self { weights, side })
    }

    /// A kernel that copies the center sample.
    #[must_use]
    pub fn identity(side: usize) -> Self {
        let side = odd(side);
        let mut weights = vec![0.0; side * side];
        weights[side * side / 2] = 1.0;
        Self { weights, side }
    }

    /// Normalized average over a `side x side` window (even sizes are
    /// rounded up to the next odd size).
    #[must_use]
    pub fn box_blur(side: usize) -> Self {
        let side = odd(side);
        let count = side * side;
        #[allow(clippy::cast_precision_loss)]
        let weight = 1.0 / count as f32;
        Self {
            weights: vec![weight; count],
            side,
        }
    }

    /// 3x3 sharpening cross scaled by `alteration` percent (`0..=100`).
    #[must_use]
    pub fn sharpen(alteration: i32) -> Self {
        let f = fraction(alteration);
        let lo = -5.0 * f;
        let hi = 15.0 * f;
        #[rustfmt::skip]
        let weights = vec![
            0.0, lo,  0.0,
            lo,  hi,  lo,
            0.0, lo,  0.0,
        ];
        Self { weights, side: 3 }
    }

    /// 3x3 blur with every weight `0.1` scaled by `alteration` percent
    /// (`0..=100`).
    #[must_use]
    pub fn blur(alteration: i32) -> Self {
        Self {
            weights: vec![0.1 * fraction(alteration); 9],
            side: 3,
        }
    }

    /// Side length of the square.
    #[must_use]
    pub const fn side(&self) -> usize {
        self.side
    }

    /// Row-major weights.
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    fn weight(&self, kx: usize, ky: usize) -> f32 {
        self.weights[ky * self.side + kx]
    }
}

impl TryFrom<Vec<f32>> for Kernel {
    type Error = PipelineError;

    fn try_from(weights: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(weights)
    }
}

impl From<Kernel> for Vec<f32> {
    fn from(kernel: Kernel) -> Self {
        kernel.weights
    }
}

/// How samples outside the buffer are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Out-of-range samples contribute nothing.
    #[default]
    Skip,
    /// Out-of-range samples take the value of the nearest edge pixel.
    Clamp,
}

/// Convolve the red, green and blue channels of `source` with `kernel`.
///
/// Each channel sum is clamped to `0..=255` and truncated.
#[must_use = "returns the convolved buffer"]
pub fn convolve(source: &PixelBuffer, kernel: &Kernel, edge_mode: EdgeMode) -> PixelBuffer {
    trace!(
        width = source.width(),
        height = source.height(),
        side = kernel.side(),
        ?edge_mode,
        "convolve"
    );
    match edge_mode {
        EdgeMode::Skip => convolve_skipping_edges(source, kernel),
        EdgeMode::Clamp => convolve_clamping_edges(source, kernel),
    }
}

fn convolve_skipping_edges(source: &PixelBuffer, kernel: &Kernel) -> PixelBuffer {
    let width = source.width() as usize;
    let height = source.height() as usize;
    let half = kernel.side() / 2;
    let pixels = source.pixels();

    source.build_rows(|y, row| {
        let y = y as usize;
        for (x, slot) in row.iter_mut().enumerate() {
            let mut sums = [0.0_f32; 3];
            for ky in 0..kernel.side() {
                let Some(sy) = (y + ky).checked_sub(half).filter(|&sy| sy < height) else {
                    continue;
                };
                for kx in 0..kernel.side() {
                    let Some(sx) = (x + kx).checked_sub(half).filter(|&sx| sx < width) else {
                        continue;
                    };
                    let weight = kernel.weight(kx, ky);
                    let sample = pixels[sy * width + sx];
                    sums[0] += f32::from(sample.red) * weight;
                    sums[1] += f32::from(sample.green) * weight;
                    sums[2] += f32::from(sample.blue) * weight;
                }
            }
            *slot = with_sums(pixels[y * width + x], sums);
        }
    })
}

fn convolve_clamping_edges(source: &PixelBuffer, kernel: &Kernel) -> PixelBuffer {
    let side = u32::try_from(kernel.side()).unwrap_or(u32::MAX);
    let raster_kernel = imageproc::kernel::Kernel::new(kernel.weights(), side, side);
    let filtered: RgbaImage =
        imageproc::filter::filter_clamped(&RgbaImage::from(source), raster_kernel);
    let filtered = PixelBuffer::from(&filtered);

    // Only color channels are convolved; alpha comes from the source.
    let originals = source.pixels();
    source.build_rows(|y, row| {
        let start = y as usize * row.len();
        for (offset, slot) in row.iter_mut().enumerate() {
            let color = filtered.pixels()[start + offset];
            *slot = originals[start + offset].with_rgb(color.red, color.green, color.blue);
        }
    })
}

fn with_sums(pixel: Pixel, [red, green, blue]: [f32; 3]) -> Pixel {
    pixel.with_rgb(
        to_channel(f64::from(red)),
        to_channel(f64::from(green)),
        to_channel(f64::from(blue)),
    )
}

/// `alteration` percent as a fraction in `0.0..=1.0`.
fn fraction(alteration: i32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let f = alteration.clamp(0, 100) as f32 / 100.0;
    f
}

const fn odd(side: usize) -> usize {
    if side % 2 == 0 { side + 1 } else { side }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gray(value: u8) -> Pixel {
        Pixel::rgb(value, value, value)
    }

    /// 3x3 kernel with every weight 1.0 (an unnormalized box sum).
    fn ones() -> Kernel {
        Kernel::new(vec![1.0; 9]).unwrap()
    }

    #[test]
    fn kernel_requires_odd_perfect_square() {
        for len in [0, 2, 4, 8, 10, 16] {
            assert_eq!(
                Kernel::new(vec![0.0; len]),
                Err(PipelineError::InvalidKernel { len }),
                "len {len} should be rejected",
            );
        }
        for (len, side) in [(1, 1), (9, 3), (25, 5), (49, 7)] {
            assert_eq!(Kernel::new(vec![0.0; len]).unwrap().side(), side);
        }
    }

    #[test]
    fn kernel_deserialize_validates() {
        let ok: Kernel = serde_json::from_str("[0,0,0,0,1,0,0,0,0]").unwrap();
        assert_eq!(ok, Kernel::identity(3));
        assert!(serde_json::from_str::<Kernel>("[1,2,3,4]").is_err());
    }

    #[test]
    fn named_kernels_have_expected_shape() {
        assert_eq!(Kernel::box_blur(4).side(), 5);
        assert_eq!(Kernel::sharpen(100).weights()[4], 15.0);
        assert_eq!(Kernel::sharpen(100).weights()[1], -5.0);
        assert!(Kernel::sharpen(0).weights().iter().all(|&w| w == 0.0));
        assert!(Kernel::blur(100).weights().iter().all(|&w| (w - 0.1).abs() < 1e-6));
    }

    #[test]
    fn identity_kernel_leaves_buffer_unchanged() {
        let buffer = PixelBuffer::filled(3, 3, Pixel::new(50, 50, 50, 255));
        let out = convolve(&buffer, &Kernel::identity(3), EdgeMode::Skip);
        assert_eq!(out, buffer);
    }

    #[test]
    fn skip_mode_darkens_edges_and_corners() {
        let buffer = PixelBuffer::filled(3, 3, gray(10));
        let out = convolve(&buffer, &ones(), EdgeMode::Skip);
        // Interior sees all 9 samples, edges 6, corners 4.
        assert_eq!(out.get(1, 1).unwrap(), gray(90));
        assert_eq!(out.get(1, 0).unwrap(), gray(60));
        assert_eq!(out.get(0, 1).unwrap(), gray(60));
        assert_eq!(out.get(0, 0).unwrap(), gray(40));
        assert_eq!(out.get(2, 2).unwrap(), gray(40));
    }

    #[test]
    fn clamp_mode_has_no_edge_bias() {
        let buffer = PixelBuffer::filled(3, 3, gray(10));
        let out = convolve(&buffer, &ones(), EdgeMode::Clamp);
        for p in out.pixels() {
            assert_eq!(*p, gray(90));
        }
    }

    #[test]
    fn reads_come_from_the_source_not_earlier_writes() {
        let buffer = PixelBuffer::new(3, 1, vec![gray(10), gray(20), gray(30)]).unwrap();
        #[rustfmt::skip]
        let horizontal = Kernel::new(vec![
            0.0, 0.0, 0.0,
            1.0, 1.0, 1.0,
            0.0, 0.0, 0.0,
        ])
        .unwrap();
        let out = convolve(&buffer, &horizontal, EdgeMode::Skip);
        let reds: Vec<u8> = out.pixels().iter().map(|p| p.red).collect();
        assert_eq!(reds, vec![30, 60, 50]);
    }

    #[test]
    fn out_of_range_samples_are_skipped_not_wrapped() {
        let buffer = PixelBuffer::new(3, 1, vec![gray(10), gray(20), gray(30)]).unwrap();
        #[rustfmt::skip]
        let right_neighbor = Kernel::new(vec![
            0.0, 0.0, 0.0,
            0.0, 0.0, 1.0,
            0.0, 0.0, 0.0,
        ])
        .unwrap();
        let out = convolve(&buffer, &right_neighbor, EdgeMode::Skip);
        let reds: Vec<u8> = out.pixels().iter().map(|p| p.red).collect();
        assert_eq!(reds, vec![20, 30, 0]);
    }

    #[test]
    fn sums_are_clamped() {
        let buffer = PixelBuffer::filled(3, 3, gray(200));
        let out = convolve(&buffer, &ones(), EdgeMode::Skip);
        assert_eq!(out.get(1, 1).unwrap(), gray(255));

        let negative = Kernel::new(vec![-1.0]).unwrap();
        let out = convolve(&buffer, &negative, EdgeMode::Skip);
        assert_eq!(out.get(0, 0).unwrap(), gray(0));
    }

    #[test]
    fn alpha_passes_through_in_both_modes() {
        let buffer =
            PixelBuffer::from_fn(3, 3, |x, y| Pixel::new(10, 10, 10, u8::try_from(x * 3 + y).unwrap()));
        for mode in [EdgeMode::Skip, EdgeMode::Clamp] {
            let out = convolve(&buffer, &ones(), mode);
            for (src, dst) in buffer.pixels().iter().zip(out.pixels()) {
                assert_eq!(src.alpha, dst.alpha, "alpha changed in {mode:?}");
            }
        }
    }

    #[test]
    fn empty_buffer_convolves_to_empty() {
        let buffer = PixelBuffer::filled(0, 0, Pixel::BLACK);
        assert!(convolve(&buffer, &ones(), EdgeMode::Skip).is_empty());
    }
}
