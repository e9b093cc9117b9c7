//! Per-pixel color transforms.
//!
//! Every transform maps one [`Pixel`] plus its parameters to one new
//! [`Pixel`] and never looks at neighbors, so whole-buffer application is
//! a plain [`PixelBuffer::map`](crate::PixelBuffer::map).
//!
//! # Numeric model
//!
//! Intermediate values are computed in `f64` and converted back to an
//! 8-bit channel only where a derived quantity is assigned: the value is
//! clamped to `0..=255` and then truncated. Alteration percentages are
//! clamped into their valid range, never rejected.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::stats::ChannelAverages;
use crate::types::Pixel;

/// Upper bound of every alteration percentage.
pub const MAX_ALTERATION: i32 = 100;

/// Distance a channel moves away from the average per unit of contrast,
/// before the alteration percentage is applied.
pub const CONTRAST_MULTIPLIER: i32 = 10;

/// Sum of the three color channels of a white pixel.
const MAX_CHANNEL_SUM: i32 = 3 * 255;

/// Trait for whole-pixel transforms.
///
/// Implemented by each parameter struct so a resolved configuration can be
/// applied directly.
pub trait PixelFilter {
    /// Transform one pixel.
    fn apply(&self, pixel: Pixel) -> Pixel;
}

// ───────────────────────── Saturation ─────────────────────────

/// Per-channel saturation adjustment, each in `-100..=100`.
///
/// Positive values move a channel toward 255 by that percentage of its
/// headroom; negative values move it toward 0 by that percentage of its
/// current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationParams {
    /// Red alteration percentage.
    pub red: i32,
    /// Green alteration percentage.
    pub green: i32,
    /// Blue alteration percentage.
    pub blue: i32,
}

impl SaturationParams {
    /// Default red alteration.
    pub const DEFAULT_RED: i32 = 25;
    /// Default green alteration.
    pub const DEFAULT_GREEN: i32 = 50;
    /// Default blue alteration.
    pub const DEFAULT_BLUE: i32 = 0;

    /// No-op adjustment (all alterations zero).
    pub const NEUTRAL: Self = Self::new(0, 0, 0);

    /// Create a new adjustment.
    #[must_use]
    pub const fn new(red: i32, green: i32, blue: i32) -> Self {
        Self { red, green, blue }
    }

    /// Same alteration on all three channels.
    #[must_use]
    pub const fn uniform(alteration: i32) -> Self {
        Self::new(alteration, alteration, alteration)
    }
}

impl Default for SaturationParams {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RED, Self::DEFAULT_GREEN, Self::DEFAULT_BLUE)
    }
}

impl PixelFilter for SaturationParams {
    fn apply(&self, pixel: Pixel) -> Pixel {
        saturate(pixel, self)
    }
}

/// Brightness: the saturation transform with one alteration shared by all
/// three channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessParams {
    /// Alteration percentage in `-100..=100`.
    pub alteration: i32,
}

impl BrightnessParams {
    /// Default brightness alteration.
    pub const DEFAULT_ALTERATION: i32 = 20;
}

impl Default for BrightnessParams {
    fn default() -> Self {
        Self {
            alteration: Self::DEFAULT_ALTERATION,
        }
    }
}

impl PixelFilter for BrightnessParams {
    fn apply(&self, pixel: Pixel) -> Pixel {
        saturate(pixel, &SaturationParams::uniform(self.alteration))
    }
}

/// Adjust each color channel by its own saturation alteration.
#[must_use]
pub fn saturate(pixel: Pixel, params: &SaturationParams) -> Pixel {
    pixel.with_rgb(
        saturate_channel(pixel.red, params.red),
        saturate_channel(pixel.green, params.green),
        saturate_channel(pixel.blue, params.blue),
    )
}

/// Move one channel toward 255 (positive) or 0 (negative) by
/// `alteration` percent of the available range.
#[must_use]
pub fn saturate_channel(channel: u8, alteration: i32) -> u8 {
    let alteration = alteration.clamp(-MAX_ALTERATION, MAX_ALTERATION);
    let value = f64::from(channel);
    match alteration.cmp(&0) {
        Ordering::Greater => {
            let headroom = 255.0 - value;
            let delta = to_channel(f64::from(alteration) * headroom / 100.0);
            to_channel(value + f64::from(delta))
        }
        Ordering::Less => {
            let delta = to_channel(f64::from(-alteration) * value / 100.0);
            to_channel(value - f64::from(delta))
        }
        Ordering::Equal => channel,
    }
}

// ───────────────────────── Desaturation / inversion ─────────────────────────

/// Which value desaturation pulls channels toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceMode {
    /// The pixel's red channel; green and blue move.
    Red,
    /// The pixel's green channel; red and blue move.
    Green,
    /// The pixel's blue channel; red and green move.
    Blue,
    /// Truncated mean of red, green and blue; all three move.
    #[default]
    Average,
}

impl ReferenceMode {
    /// Parse a mode name; anything unrecognized means
    /// [`Average`](Self::Average).
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "red" => Self::Red,
            "green" => Self::Green,
            "blue" => Self::Blue,
            _ => Self::Average,
        }
    }
}

/// Desaturation toward a reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesaturationParams {
    /// Percentage in `0..=100` of the distance to the reference to cover.
    pub alteration: i32,
    /// Reference the channels move toward.
    pub mode: ReferenceMode,
}

impl DesaturationParams {
    /// Default desaturation alteration (full desaturation).
    pub const DEFAULT_ALTERATION: i32 = 100;

    /// Create a new desaturation.
    #[must_use]
    pub const fn new(alteration: i32, mode: ReferenceMode) -> Self {
        Self { alteration, mode }
    }
}

impl Default for DesaturationParams {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALTERATION, ReferenceMode::Average)
    }
}

impl PixelFilter for DesaturationParams {
    fn apply(&self, pixel: Pixel) -> Pixel {
        desaturate(pixel, self)
    }
}

/// Move channels toward the reference value chosen by `params.mode`.
///
/// With a single-channel mode that channel is the reference and is left
/// as is; with [`ReferenceMode::Average`] all three channels move.
#[must_use]
pub fn desaturate(pixel: Pixel, params: &DesaturationParams) -> Pixel {
    let Pixel {
        red, green, blue, ..
    } = pixel;
    let a = params.alteration;
    match params.mode {
        ReferenceMode::Red => pixel.with_rgb(
            red,
            blend_channel(green, red, a),
            blend_channel(blue, red, a),
        ),
        ReferenceMode::Green => pixel.with_rgb(
            blend_channel(red, green, a),
            green,
            blend_channel(blue, green, a),
        ),
        ReferenceMode::Blue => pixel.with_rgb(
            blend_channel(red, blue, a),
            blend_channel(green, blue, a),
            blue,
        ),
        ReferenceMode::Average => {
            #[allow(clippy::cast_possible_truncation)]
            let mean = (pixel.channel_sum() / 3) as u8;
            pixel.with_rgb(
                blend_channel(red, mean, a),
                blend_channel(green, mean, a),
                blend_channel(blue, mean, a),
            )
        }
    }
}

/// Inversion strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvertParams {
    /// Percentage in `0..=100`; 100 is the full complement.
    pub alteration: i32,
}

impl InvertParams {
    /// Default inversion alteration (full inversion).
    pub const DEFAULT_ALTERATION: i32 = 100;
}

impl Default for InvertParams {
    fn default() -> Self {
        Self {
            alteration: Self::DEFAULT_ALTERATION,
        }
    }
}

impl PixelFilter for InvertParams {
    fn apply(&self, pixel: Pixel) -> Pixel {
        invert(pixel, self)
    }
}

/// Move each channel toward its complement `255 - channel`.
#[must_use]
pub fn invert(pixel: Pixel, params: &InvertParams) -> Pixel {
    let a = params.alteration;
    pixel.with_rgb(
        blend_channel(pixel.red, 255 - pixel.red, a),
        blend_channel(pixel.green, 255 - pixel.green, a),
        blend_channel(pixel.blue, 255 - pixel.blue, a),
    )
}

/// Move `channel` toward `reference` by `alteration` percent of the
/// distance, rounding the step half away from zero.
///
/// `alteration` is clamped to `0..=100`; 0 is the identity and 100 lands
/// exactly on `reference`.
#[must_use]
pub fn blend_channel(channel: u8, reference: u8, alteration: i32) -> u8 {
    let alteration = alteration.clamp(0, MAX_ALTERATION);
    let distance = f64::from(reference) - f64::from(channel);
    let delta = (distance * f64::from(alteration) / 100.0).round();
    to_channel(f64::from(channel) + delta)
}

// ───────────────────────── Outline ─────────────────────────

/// Threshold posterization into black, white (or gray) regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineParams {
    /// Threshold as a percentage in `0..=100` of the maximum channel sum.
    pub alteration: i32,
    /// Paint pixels at or above the threshold pure white; otherwise they
    /// keep their color.
    pub allow_white: bool,
    /// Paint pixels below the threshold as a gray of their brightest
    /// channel instead of pure black.
    pub allow_grays: bool,
}

impl OutlineParams {
    /// Default outline threshold percentage.
    pub const DEFAULT_ALTERATION: i32 = 50;

    /// Channel-sum threshold below which a pixel darkens.
    #[must_use]
    pub fn threshold(&self) -> u16 {
        let threshold =
            MAX_CHANNEL_SUM * self.alteration.clamp(0, MAX_ALTERATION) / MAX_ALTERATION;
        u16::try_from(threshold).unwrap_or(u16::MAX)
    }
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            alteration: Self::DEFAULT_ALTERATION,
            allow_white: true,
            allow_grays: false,
        }
    }
}

impl PixelFilter for OutlineParams {
    fn apply(&self, pixel: Pixel) -> Pixel {
        outline(pixel, self)
    }
}

/// Posterize a pixel by comparing its channel sum to the threshold.
///
/// Alpha is untouched.
#[must_use]
pub fn outline(pixel: Pixel, params: &OutlineParams) -> Pixel {
    if pixel.channel_sum() < params.threshold() {
        let level = if params.allow_grays {
            pixel.max_channel()
        } else {
            0
        };
        pixel.with_rgb(level, level, level)
    } else if params.allow_white {
        pixel.with_rgb(255, 255, 255)
    } else {
        pixel
    }
}

// ───────────────────────── Contrast ─────────────────────────

/// Contrast strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastParams {
    /// Percentage in `-100..=100`. Positive pushes channels away from the
    /// buffer average, negative pulls them toward it.
    pub alteration: i32,
}

impl ContrastParams {
    /// Default contrast alteration.
    pub const DEFAULT_ALTERATION: i32 = 20;

    /// Bind these parameters to the averages of the buffer being adjusted.
    #[must_use]
    pub const fn with_averages(self, averages: ChannelAverages) -> ContrastAdjust {
        ContrastAdjust {
            alteration: self.alteration,
            averages,
        }
    }
}

impl Default for ContrastParams {
    fn default() -> Self {
        Self {
            alteration: Self::DEFAULT_ALTERATION,
        }
    }
}

/// Contrast parameters resolved against a buffer's channel averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContrastAdjust {
    /// Percentage in `-100..=100`.
    pub alteration: i32,
    /// Averages of the buffer before the adjustment.
    pub averages: ChannelAverages,
}

impl PixelFilter for ContrastAdjust {
    fn apply(&self, pixel: Pixel) -> Pixel {
        contrast(pixel, self.averages, self.alteration)
    }
}

/// Push each channel away from (or toward) its buffer average.
#[must_use]
pub fn contrast(pixel: Pixel, averages: ChannelAverages, alteration: i32) -> Pixel {
    pixel.with_rgb(
        contrast_channel(pixel.red, averages.red, alteration),
        contrast_channel(pixel.green, averages.green, alteration),
        contrast_channel(pixel.blue, averages.blue, alteration),
    )
}

/// Scale one channel's distance from `average` by
/// [`CONTRAST_MULTIPLIER`] and `alteration` percent.
#[must_use]
pub fn contrast_channel(channel: u8, average: u8, alteration: i32) -> u8 {
    let alteration = alteration.clamp(-MAX_ALTERATION, MAX_ALTERATION);
    let distance = (i32::from(channel) - i32::from(average)) * CONTRAST_MULTIPLIER;
    let scaled = f64::from(distance) * f64::from(alteration.abs()) / 100.0;
    let value = f64::from(channel);
    match alteration.cmp(&0) {
        Ordering::Greater => to_channel(value + scaled),
        Ordering::Less => to_channel(value - scaled),
        Ordering::Equal => channel,
    }
}

/// Clamp to the channel range and truncate toward zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [Pixel; 6] = [
        Pixel::rgb(0, 0, 0),
        Pixel::rgb(255, 255, 255),
        Pixel::rgb(100, 100, 100),
        Pixel::rgb(60, 90, 30),
        Pixel::new(250, 3, 128, 17),
        Pixel::new(1, 254, 77, 0),
    ];

    // --- Saturation ---

    #[test]
    fn saturation_full_red_fills_headroom() {
        let p = saturate(Pixel::rgb(100, 100, 100), &SaturationParams::new(100, 0, 0));
        assert_eq!(p, Pixel::rgb(255, 100, 100));
    }

    #[test]
    fn saturation_positive_takes_share_of_headroom() {
        // headroom 155, 50% -> 77.5, truncated to 77.
        assert_eq!(saturate_channel(100, 50), 177);
    }

    #[test]
    fn saturation_negative_takes_share_of_value() {
        // 30% of 90 -> 27.
        assert_eq!(saturate_channel(90, -30), 63);
        assert_eq!(saturate_channel(90, -100), 0);
    }

    #[test]
    fn saturation_alteration_is_clamped() {
        assert_eq!(saturate_channel(40, 1000), saturate_channel(40, 100));
        assert_eq!(saturate_channel(40, -1000), saturate_channel(40, -100));
    }

    #[test]
    fn saturation_zero_is_identity() {
        for p in SAMPLES {
            assert_eq!(saturate(p, &SaturationParams::NEUTRAL), p);
        }
    }

    #[test]
    fn brightness_applies_same_alteration_everywhere() {
        let p = BrightnessParams { alteration: 100 }.apply(Pixel::new(0, 10, 200, 9));
        assert_eq!(p, Pixel::new(255, 255, 255, 9));
    }

    #[test]
    fn saturation_defaults() {
        let params = SaturationParams::default();
        assert_eq!(params, SaturationParams::new(25, 50, 0));
    }

    // --- Desaturation ---

    #[test]
    fn desaturate_average_full() {
        let p = desaturate(Pixel::rgb(60, 90, 30), &DesaturationParams::default());
        assert_eq!(p, Pixel::rgb(60, 60, 60));
    }

    #[test]
    fn desaturate_average_truncates_reference() {
        // (10 + 20 + 31) / 3 = 20.33 -> 20.
        let p = desaturate(Pixel::rgb(10, 20, 31), &DesaturationParams::default());
        assert_eq!(p, Pixel::rgb(20, 20, 20));
    }

    #[test]
    fn desaturate_single_channel_leaves_reference_alone() {
        let p = desaturate(
            Pixel::rgb(60, 90, 30),
            &DesaturationParams::new(100, ReferenceMode::Green),
        );
        assert_eq!(p, Pixel::rgb(90, 90, 90));

        let p = desaturate(
            Pixel::rgb(60, 90, 30),
            &DesaturationParams::new(50, ReferenceMode::Blue),
        );
        // red: 60 + round(-15) = 45, green: 90 + round(-30) = 60.
        assert_eq!(p, Pixel::rgb(45, 60, 30));
    }

    #[test]
    fn desaturate_rounds_partial_steps() {
        // distance 25 at 10% -> 2.5 -> 3.
        assert_eq!(blend_channel(0, 25, 10), 3);
        // distance -25 at 10% -> -2.5 -> -3.
        assert_eq!(blend_channel(25, 0, 10), 22);
    }

    #[test]
    fn desaturate_zero_is_identity() {
        for mode in [
            ReferenceMode::Red,
            ReferenceMode::Green,
            ReferenceMode::Blue,
            ReferenceMode::Average,
        ] {
            for p in SAMPLES {
                assert_eq!(desaturate(p, &DesaturationParams::new(0, mode)), p);
            }
        }
    }

    #[test]
    fn desaturate_red_reference_moves_green_and_blue() {
        let p = desaturate(
            Pixel::new(60, 90, 30, 7),
            &DesaturationParams::new(100, ReferenceMode::Red),
        );
        assert_eq!(p, Pixel::new(60, 60, 60, 7));

        // 90 -> 60 and 30 -> 60 at 50%: steps of -15 and +15.
        let p = desaturate(
            Pixel::rgb(60, 90, 30),
            &DesaturationParams::new(50, ReferenceMode::Red),
        );
        assert_eq!(p, Pixel::rgb(60, 75, 45));
    }

    #[test]
    fn desaturate_negative_alteration_is_identity() {
        for mode in [ReferenceMode::Red, ReferenceMode::Average] {
            for p in SAMPLES {
                assert_eq!(desaturate(p, &DesaturationParams::new(-20, mode)), p);
            }
        }
    }

    #[test]
    fn reference_mode_from_name_falls_back_to_average() {
        assert_eq!(ReferenceMode::from_name("red"), ReferenceMode::Red);
        assert_eq!(ReferenceMode::from_name("blue"), ReferenceMode::Blue);
        assert_eq!(ReferenceMode::from_name("luma"), ReferenceMode::Average);
    }

    // --- Inversion ---

    #[test]
    fn invert_full_is_complement() {
        let p = invert(Pixel::new(0, 100, 255, 42), &InvertParams::default());
        assert_eq!(p, Pixel::new(255, 155, 0, 42));
    }

    #[test]
    fn invert_twice_round_trips() {
        for p in SAMPLES {
            let params = InvertParams::default();
            assert_eq!(invert(invert(p, &params), &params), p);
        }
    }

    #[test]
    fn invert_half_meets_in_the_middle() {
        // 100 -> 155, distance 55, half = 27.5 -> 28.
        assert_eq!(blend_channel(100, 155, 50), 128);
    }

    #[test]
    fn invert_zero_is_identity() {
        for p in SAMPLES {
            assert_eq!(invert(p, &InvertParams { alteration: 0 }), p);
        }
    }

    #[test]
    fn invert_alteration_is_clamped() {
        for p in SAMPLES {
            assert_eq!(
                invert(p, &InvertParams { alteration: 250 }),
                invert(p, &InvertParams { alteration: 100 })
            );
            assert_eq!(invert(p, &InvertParams { alteration: -5 }), p);
        }
        assert_eq!(blend_channel(10, 200, 1_000), 200);
        assert_eq!(blend_channel(10, 200, i32::MIN), 10);
    }

    // --- Outline ---

    #[test]
    fn outline_threshold_scales_with_alteration() {
        let at = |alteration| {
            OutlineParams {
                alteration,
                ..OutlineParams::default()
            }
            .threshold()
        };
        assert_eq!(at(0), 0);
        assert_eq!(at(50), 382);
        assert_eq!(at(100), 765);
        assert_eq!(at(500), 765);
    }

    #[test]
    fn outline_dark_pixel_goes_black() {
        let p = outline(Pixel::new(10, 200, 30, 99), &OutlineParams::default());
        assert_eq!(p, Pixel::new(0, 0, 0, 99));
    }

    #[test]
    fn outline_dark_pixel_goes_gray_when_allowed() {
        let params = OutlineParams {
            allow_grays: true,
            ..OutlineParams::default()
        };
        let p = outline(Pixel::rgb(10, 200, 30), &params);
        assert_eq!(p, Pixel::rgb(200, 200, 200));
    }

    #[test]
    fn outline_bright_pixel_goes_white() {
        let p = outline(Pixel::new(200, 200, 0, 5), &OutlineParams::default());
        assert_eq!(p, Pixel::new(255, 255, 255, 5));
    }

    #[test]
    fn outline_bright_pixel_unchanged_without_white() {
        let params = OutlineParams {
            allow_white: false,
            ..OutlineParams::default()
        };
        let p = Pixel::rgb(200, 200, 0);
        assert_eq!(outline(p, &params), p);
    }

    #[test]
    fn outline_sum_equal_to_threshold_is_bright() {
        // 382 == threshold at 50%.
        let p = outline(Pixel::rgb(127, 127, 128), &OutlineParams::default());
        assert_eq!(p, Pixel::WHITE);
    }

    // --- Contrast ---

    #[test]
    fn contrast_pushes_away_from_average() {
        // (110 - 100) * 10 * 20% = 20.
        assert_eq!(contrast_channel(110, 100, 20), 130);
        assert_eq!(contrast_channel(90, 100, 20), 70);
    }

    #[test]
    fn contrast_negative_pulls_toward_average() {
        // (110 - 100) * 10 * 5% = 5.
        assert_eq!(contrast_channel(110, 100, -5), 105);
        assert_eq!(contrast_channel(90, 100, -5), 95);
    }

    #[test]
    fn contrast_clamps_to_channel_range() {
        assert_eq!(contrast_channel(200, 100, 100), 255);
        assert_eq!(contrast_channel(20, 100, 100), 0);
    }

    #[test]
    fn contrast_alteration_is_clamped() {
        // Clamped to 100: 110 + 10 * 10 * 100% = 210, not saturated to 255.
        assert_eq!(contrast_channel(110, 100, 500), contrast_channel(110, 100, 100));
        assert_eq!(contrast_channel(110, 100, 500), 210);
        // Clamped to -100: 110 - 100 = 10, not driven to 0.
        assert_eq!(contrast_channel(110, 100, -500), contrast_channel(110, 100, -100));
        assert_eq!(contrast_channel(110, 100, -500), 10);
    }

    #[test]
    fn contrast_zero_is_identity() {
        let averages = ChannelAverages {
            red: 12,
            green: 200,
            blue: 128,
        };
        for p in SAMPLES {
            assert_eq!(contrast(p, averages, 0), p);
        }
    }

    #[test]
    fn contrast_adjust_uses_bound_averages() {
        let averages = ChannelAverages {
            red: 100,
            green: 100,
            blue: 100,
        };
        let adjust = ContrastParams { alteration: 20 }.with_averages(averages);
        assert_eq!(
            adjust.apply(Pixel::new(110, 100, 90, 3)),
            Pixel::new(130, 100, 70, 3)
        );
    }

    // --- Config serde ---

    #[test]
    #[allow(clippy::unwrap_used)]
    fn partial_params_fill_defaults() {
        let params: OutlineParams = serde_json::from_str(r#"{"allow_grays": true}"#).unwrap();
        assert_eq!(params.alteration, OutlineParams::DEFAULT_ALTERATION);
        assert!(params.allow_white);
        assert!(params.allow_grays);

        let params: DesaturationParams = serde_json::from_str(r#"{"mode": "red"}"#).unwrap();
        assert_eq!(params, DesaturationParams::new(100, ReferenceMode::Red));
    }
}
