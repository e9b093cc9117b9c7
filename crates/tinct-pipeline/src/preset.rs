//! Named presets: single filters with default parameters and composite
//! looks built from fixed coefficient rows.
//!
//! Presets only describe *which* operations to run. They resolve to a
//! sequence of [`Operation`]s that a [`Pipeline`](crate::Pipeline) applies
//! in order.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filter::{
    BrightnessParams, ContrastParams, DesaturationParams, InvertParams, MAX_ALTERATION,
    OutlineParams, ReferenceMode, SaturationParams,
};
use crate::pipeline::Operation;

/// Alteration used when a look is selected by name.
pub const DEFAULT_LOOK_ALTERATION: i32 = 100;

// ───────────────────────── Looks ─────────────────────────

/// Per-step coefficients of a look at full (100%) strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetCoefficients {
    /// Contrast alteration.
    pub contrast: i32,
    /// Brightness alteration.
    pub brightness: i32,
    /// Desaturation toward the channel average, if the look has that step.
    pub desaturate: Option<i32>,
    /// Red saturation.
    pub red: i32,
    /// Green saturation.
    pub green: i32,
    /// Blue saturation.
    pub blue: i32,
}

/// Composite color looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Look {
    /// Slightly darker and cooler.
    BlueHaze,
    /// Warm red cast with a touch of desaturation.
    RedEye,
    /// Strong contrast, brighter, green-heavy.
    CombatHardened,
}

impl Look {
    /// Every look, in catalog order.
    pub const ALL: [Self; 3] = [Self::BlueHaze, Self::RedEye, Self::CombatHardened];

    /// Name recognized by [`Preset::from_name`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BlueHaze => "bluehaze",
            Self::RedEye => "redeye",
            Self::CombatHardened => "combathardened",
        }
    }

    /// Coefficients at full strength.
    #[must_use]
    pub const fn coefficients(self) -> PresetCoefficients {
        match self {
            Self::BlueHaze => PresetCoefficients {
                contrast: 10,
                brightness: -5,
                desaturate: None,
                red: -16,
                green: 0,
                blue: 20,
            },
            Self::RedEye => PresetCoefficients {
                contrast: 10,
                brightness: -5,
                desaturate: Some(10),
                red: 75,
                green: 10,
                blue: -25,
            },
            Self::CombatHardened => PresetCoefficients {
                contrast: 40,
                brightness: 20,
                desaturate: None,
                red: 10,
                green: 44,
                blue: 25,
            },
        }
    }

    /// Steps of this look at `alteration` percent.
    ///
    /// `alteration` is clamped to `0..=100`; each coefficient is scaled by
    /// it and truncated toward zero. Steps run contrast, brightness,
    /// desaturate (when present), then saturate.
    #[must_use]
    pub fn steps(self, alteration: i32) -> Vec<Operation> {
        let c = self.coefficients();
        let strength = alteration.clamp(0, MAX_ALTERATION);
        let scale = |coefficient: i32| coefficient * strength / MAX_ALTERATION;

        let mut steps = vec![
            Operation::Contrast(ContrastParams {
                alteration: scale(c.contrast),
            }),
            Operation::Brightness(BrightnessParams {
                alteration: scale(c.brightness),
            }),
        ];
        if let Some(desaturate) = c.desaturate {
            steps.push(Operation::Desaturate(DesaturationParams::new(
                scale(desaturate),
                ReferenceMode::Average,
            )));
        }
        steps.push(Operation::Saturate(SaturationParams::new(
            scale(c.red),
            scale(c.green),
            scale(c.blue),
        )));
        steps
    }
}

// ───────────────────────── Named presets ─────────────────────────

/// Every preset reachable by name, plus the neutral fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preset {
    /// [`DesaturationParams::default`].
    Desaturate,
    /// [`SaturationParams::default`].
    Saturate,
    /// [`InvertParams::default`].
    Invert,
    /// [`OutlineParams::default`].
    Outline,
    /// [`ContrastParams::default`].
    Contrast,
    /// [`BrightnessParams::default`].
    Brightness,
    /// A composite look at [`DEFAULT_LOOK_ALTERATION`].
    Look(Look),
    /// Zero saturation on every channel. Used for unrecognized names.
    #[default]
    Neutral,
}

impl Preset {
    /// Every named preset, in catalog order. [`Neutral`](Self::Neutral)
    /// is not listed since it has no name of its own.
    pub const ALL: [Self; 9] = [
        Self::Desaturate,
        Self::Saturate,
        Self::Invert,
        Self::Outline,
        Self::Contrast,
        Self::Brightness,
        Self::Look(Look::BlueHaze),
        Self::Look(Look::RedEye),
        Self::Look(Look::CombatHardened),
    ];

    /// Look up a preset by its exact (case-sensitive) name.
    ///
    /// Unrecognized names yield [`Neutral`](Self::Neutral) rather than an
    /// error.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == name)
            .unwrap_or(Self::Neutral)
    }

    /// Canonical name of this preset.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Desaturate => "desaturate",
            Self::Saturate => "saturate",
            Self::Invert => "invert",
            Self::Outline => "outline",
            Self::Contrast => "contrast",
            Self::Brightness => "brightness",
            Self::Look(look) => look.name(),
            Self::Neutral => "neutral",
        }
    }

    /// Operations this preset runs, with default parameters.
    #[must_use]
    pub fn steps(self) -> Vec<Operation> {
        match self {
            Self::Desaturate => vec![Operation::Desaturate(DesaturationParams::default())],
            Self::Saturate => vec![Operation::Saturate(SaturationParams::default())],
            Self::Invert => vec![Operation::Invert(InvertParams::default())],
            Self::Outline => vec![Operation::Outline(OutlineParams::default())],
            Self::Contrast => vec![Operation::Contrast(ContrastParams::default())],
            Self::Brightness => vec![Operation::Brightness(BrightnessParams::default())],
            Self::Look(look) => look.steps(DEFAULT_LOOK_ALTERATION),
            Self::Neutral => vec![Operation::Saturate(SaturationParams::NEUTRAL)],
        }
    }
}

impl From<&str> for Preset {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl FromStr for Preset {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Look> for Preset {
    fn from(look: Look) -> Self {
        Self::Look(look)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_name_resolves_to_its_preset() {
        for preset in Preset::ALL {
            assert_eq!(Preset::from_name(preset.name()), preset);
        }
        assert_eq!(Preset::from_name("bluehaze"), Preset::Look(Look::BlueHaze));
        assert_eq!(Preset::from_name("redeye"), Preset::Look(Look::RedEye));
        assert_eq!(
            Preset::from_name("combathardened"),
            Preset::Look(Look::CombatHardened)
        );
    }

    #[test]
    fn unknown_names_fall_back_to_neutral() {
        for name in ["", "sepia", "BlueHaze", " invert", "neutral"] {
            assert_eq!(Preset::from_name(name), Preset::Neutral, "{name:?}");
        }
        let parsed: Preset = "vintage".parse().unwrap();
        assert_eq!(parsed, Preset::Neutral);
    }

    #[test]
    fn neutral_is_a_zero_saturate() {
        assert_eq!(
            Preset::Neutral.steps(),
            vec![Operation::Saturate(SaturationParams::new(0, 0, 0))]
        );
    }

    #[test]
    fn single_filter_presets_use_defaults() {
        assert_eq!(
            Preset::Outline.steps(),
            vec![Operation::Outline(OutlineParams::default())]
        );
        assert_eq!(
            Preset::Brightness.steps(),
            vec![Operation::Brightness(BrightnessParams { alteration: 20 })]
        );
        assert_eq!(
            Preset::Saturate.steps(),
            vec![Operation::Saturate(SaturationParams::new(25, 50, 0))]
        );
    }

    #[test]
    fn red_eye_steps_at_full_strength() {
        assert_eq!(
            Look::RedEye.steps(100),
            vec![
                Operation::Contrast(ContrastParams { alteration: 10 }),
                Operation::Brightness(BrightnessParams { alteration: -5 }),
                Operation::Desaturate(DesaturationParams::new(10, ReferenceMode::Average)),
                Operation::Saturate(SaturationParams::new(75, 10, -25)),
            ]
        );
    }

    #[test]
    fn looks_without_desaturation_have_three_steps() {
        let names: Vec<_> = Look::BlueHaze
            .steps(100)
            .iter()
            .map(Operation::name)
            .collect();
        assert_eq!(names, ["contrast", "brightness", "saturate"]);
        assert_eq!(Look::CombatHardened.steps(100).len(), 3);
    }

    #[test]
    fn partial_strength_truncates_toward_zero() {
        assert_eq!(
            Look::BlueHaze.steps(50),
            vec![
                Operation::Contrast(ContrastParams { alteration: 5 }),
                Operation::Brightness(BrightnessParams { alteration: -2 }),
                Operation::Saturate(SaturationParams::new(-8, 0, 10)),
            ]
        );
        assert_eq!(
            Look::CombatHardened.steps(50).last(),
            Some(&Operation::Saturate(SaturationParams::new(5, 22, 12)))
        );
    }

    #[test]
    fn alteration_is_clamped() {
        assert_eq!(Look::RedEye.steps(250), Look::RedEye.steps(100));
        assert_eq!(
            Look::CombatHardened.steps(-40),
            vec![
                Operation::Contrast(ContrastParams { alteration: 0 }),
                Operation::Brightness(BrightnessParams { alteration: 0 }),
                Operation::Saturate(SaturationParams::NEUTRAL),
            ]
        );
    }

    #[test]
    fn look_serializes_by_name() {
        for look in Look::ALL {
            let json = serde_json::to_string(&look).unwrap();
            assert_eq!(json, format!("\"{}\"", look.name()));
        }
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(Preset::Look(Look::RedEye).to_string(), "redeye");
        assert_eq!(Preset::from(Look::BlueHaze).to_string(), "bluehaze");
    }
}
