use nih_plug::prelude::*;
use std::sync::Arc;

use crate::audio::constants;
use crate::audio::parameters::{Band, BandParameters, GlobalParameters, ParameterSource};

/// Host-facing parameters. The IDs are what the host stores, so they must never change.
#[derive(Params)]
pub struct MultibandParams {
    #[id = "input_gain"]
    pub input_gain: FloatParam,
    #[id = "output_gain"]
    pub output_gain: FloatParam,

    #[id = "low_mid_crossover"]
    pub low_mid_crossover: FloatParam,
    #[id = "mid_high_crossover"]
    pub mid_high_crossover: FloatParam,

    #[nested(id_prefix = "low", group = "Low")]
    pub low: Arc<BandParams>,
    #[nested(id_prefix = "mid", group = "Mid")]
    pub mid: Arc<BandParams>,
    #[nested(id_prefix = "high", group = "High")]
    pub high: Arc<BandParams>,
}

/// Compressor and mix settings for one band. The same struct is nested three times, the band
/// name only shows up in the display names.
#[derive(Params)]
pub struct BandParams {
    #[id = "attack"]
    pub attack_ms: FloatParam,
    #[id = "release"]
    pub release_ms: FloatParam,
    #[id = "threshold"]
    pub threshold_db: FloatParam,
    /// Index into [`constants::RATIO_CHOICES`]
    #[id = "ratio"]
    pub ratio: IntParam,

    #[id = "bypass"]
    pub bypassed: BoolParam,
    #[id = "mute"]
    pub muted: BoolParam,
    #[id = "solo"]
    pub soloed: BoolParam,
}

impl Default for MultibandParams {
    fn default() -> Self {
        Self {
            input_gain: trim_param("Input Trim"),
            output_gain: trim_param("Output Trim"),

            low_mid_crossover: FloatParam::new(
                "Low-Mid Crossover",
                constants::LOW_MID_CROSSOVER_DEFAULT,
                FloatRange::Skewed {
                    min: constants::LOW_MID_CROSSOVER_MIN,
                    max: constants::LOW_MID_CROSSOVER_MAX,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_value_to_string(formatters::v2s_f32_hz_then_khz(0))
            .with_string_to_value(formatters::s2v_f32_hz_then_khz()),
            mid_high_crossover: FloatParam::new(
                "Mid-High Crossover",
                constants::MID_HIGH_CROSSOVER_DEFAULT,
                FloatRange::Skewed {
                    min: constants::MID_HIGH_CROSSOVER_MIN,
                    max: constants::MID_HIGH_CROSSOVER_MAX,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_value_to_string(formatters::v2s_f32_hz_then_khz(0))
            .with_string_to_value(formatters::s2v_f32_hz_then_khz()),

            low: Arc::new(BandParams::new(Band::Low)),
            mid: Arc::new(BandParams::new(Band::Mid)),
            high: Arc::new(BandParams::new(Band::High)),
        }
    }
}

/// Trims are stored in decibels so the processor can sanitize them before converting
fn trim_param(name: &str) -> FloatParam {
    FloatParam::new(
        name,
        0.0,
        FloatRange::Linear {
            min: constants::GAIN_MIN_DB,
            max: constants::GAIN_MAX_DB,
        },
    )
    .with_unit(" dB")
    .with_step_size(0.1)
}

impl BandParams {
    pub fn new(band: Band) -> Self {
        let name_prefix = band.name();
        let defaults = BandParameters::default();

        Self {
            attack_ms: FloatParam::new(
                format!("{name_prefix} Attack"),
                defaults.attack_ms,
                FloatRange::Linear {
                    min: constants::ATTACK_MIN_MS,
                    max: constants::ATTACK_MAX_MS,
                },
            )
            .with_unit(" ms")
            .with_step_size(1.0),
            release_ms: FloatParam::new(
                format!("{name_prefix} Release"),
                defaults.release_ms,
                FloatRange::Linear {
                    min: constants::RELEASE_MIN_MS,
                    max: constants::RELEASE_MAX_MS,
                },
            )
            .with_unit(" ms")
            .with_step_size(1.0),
            threshold_db: FloatParam::new(
                format!("{name_prefix} Threshold"),
                defaults.threshold_db,
                FloatRange::Linear {
                    min: constants::THRESHOLD_MIN_DB,
                    max: constants::THRESHOLD_MAX_DB,
                },
            )
            .with_unit(" dB")
            .with_step_size(0.1),
            ratio: IntParam::new(
                format!("{name_prefix} Ratio"),
                constants::DEFAULT_RATIO_INDEX,
                IntRange::Linear {
                    min: 0,
                    max: constants::RATIO_CHOICES.len() as i32 - 1,
                },
            )
            .with_value_to_string(Arc::new(|index: i32| format!("{}:1", ratio_for_index(index))))
            .with_string_to_value(Arc::new(|string: &str| {
                let ratio: f32 = string.trim().trim_end_matches(":1").parse().ok()?;
                constants::RATIO_CHOICES
                    .iter()
                    .position(|&choice| choice == ratio)
                    .map(|index| index as i32)
            })),

            bypassed: BoolParam::new(format!("{name_prefix} Bypass"), defaults.bypassed),
            muted: BoolParam::new(format!("{name_prefix} Mute"), defaults.muted),
            soloed: BoolParam::new(format!("{name_prefix} Solo"), defaults.soloed),
        }
    }

    fn snapshot(&self) -> BandParameters {
        BandParameters {
            attack_ms: self.attack_ms.value(),
            release_ms: self.release_ms.value(),
            threshold_db: self.threshold_db.value(),
            ratio: ratio_for_index(self.ratio.value()),
            bypassed: self.bypassed.value(),
            muted: self.muted.value(),
            soloed: self.soloed.value(),
        }
    }
}

/// Ratio for a choice index, out of range indices are clamped to the list
pub fn ratio_for_index(index: i32) -> f32 {
    let index = index.clamp(0, constants::RATIO_CHOICES.len() as i32 - 1) as usize;
    constants::RATIO_CHOICES[index]
}

impl ParameterSource for MultibandParams {
    fn band(&self, band: Band) -> BandParameters {
        match band {
            Band::Low => self.low.snapshot(),
            Band::Mid => self.mid.snapshot(),
            Band::High => self.high.snapshot(),
        }
    }

    fn global(&self) -> GlobalParameters {
        GlobalParameters {
            input_gain_db: self.input_gain.value(),
            output_gain_db: self.output_gain.value(),
            low_mid_crossover_hz: self.low_mid_crossover.value(),
            mid_high_crossover_hz: self.mid_high_crossover.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_core_defaults() {
        let params = MultibandParams::default();

        assert_eq!(params.band(Band::Mid), BandParameters::default());
        assert_eq!(params.global(), GlobalParameters::default());
    }

    #[test]
    fn ratio_indices_are_clamped() {
        assert_eq!(ratio_for_index(-4), 1.0);
        assert_eq!(ratio_for_index(3), 3.0);
        assert_eq!(ratio_for_index(99), 100.0);
    }

    #[test]
    fn ratio_strings_round_trip() {
        let params = BandParams::new(Band::High);
        let ratio = &params.ratio;
        assert_eq!(
            ratio.normalized_value_to_string(ratio.modulated_normalized_value(), false),
            "3:1"
        );
        assert_eq!(
            ratio.string_to_normalized_value("10:1"),
            ratio.string_to_normalized_value("10")
        );
        assert!(ratio.string_to_normalized_value("10:1").is_some());
        assert!(ratio.string_to_normalized_value("2.5:1").is_none());
    }
}
