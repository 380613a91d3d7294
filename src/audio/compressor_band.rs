use crate::audio::parameters::{Band, BandParameters};
use atomic_float::AtomicF32;
use nih_plug::util;
use std::sync::atomic::Ordering;

/// Feed-forward peak compressor for one band.
///
/// The detector is a peak envelope follower with separate attack and release ballistics. Above the
/// threshold the gain follows `(envelope / threshold) ^ (1 / ratio - 1)`, which puts a steady tone's
/// output level at `threshold + (input - threshold) / ratio` dB.
pub struct CompressorBand {
    sample_rate: f32,
    max_block_size: usize,

    settings: BandParameters,
    attack_coefficient: f32,
    release_coefficient: f32,
    threshold_gain: f32,
    /// `1 / ratio - 1`, the exponent applied to the overshoot
    gain_exponent: f32,

    /// Detector state per channel, linear peak level
    envelope: Vec<f32>,
    /// Deepest gain reduction seen during the last processed block, in dB (<= 0)
    gain_reduction_db: f32,
}

impl Default for CompressorBand {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressorBand {
    pub fn new() -> Self {
        let mut band = Self {
            sample_rate: 44100.0,
            max_block_size: 0,
            settings: BandParameters::default(),
            attack_coefficient: 0.0,
            release_coefficient: 0.0,
            threshold_gain: 1.0,
            gain_exponent: 0.0,
            envelope: Vec::new(),
            gain_reduction_db: 0.0,
        };
        band.update_coefficients();

        band
    }

    /// Allocates the detector state. Call again whenever the sample rate, block size or channel
    /// count changes. Not real-time safe.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.envelope = vec![0.0; num_channels];
        self.gain_reduction_db = 0.0;
        self.update_coefficients();
    }

    pub fn reset(&mut self) {
        self.envelope.fill(0.0);
        self.gain_reduction_db = 0.0;
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Pull in new settings. Only call this between blocks.
    pub fn update_settings(&mut self, settings: &BandParameters) {
        let settings = settings.sanitized();
        if settings == self.settings {
            return;
        }

        self.settings = settings;
        self.update_coefficients();
    }

    pub fn settings(&self) -> &BandParameters {
        &self.settings
    }

    /// Bypassed bands and a 1:1 ratio leave the audio untouched
    pub fn is_identity(&self) -> bool {
        self.settings.bypassed || self.settings.ratio <= 1.0
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn update_coefficients(&mut self) {
        let time_to_coefficient =
            |time_ms: f32| (-1.0 / (time_ms * 0.001 * self.sample_rate)).exp();

        self.attack_coefficient = time_to_coefficient(self.settings.attack_ms);
        self.release_coefficient = time_to_coefficient(self.settings.release_ms);
        self.threshold_gain = util::db_to_gain(self.settings.threshold_db);
        self.gain_exponent = 1.0 / self.settings.ratio - 1.0;
    }

    /// Compress the first `num_samples` samples of every channel in place. Returns the deepest
    /// gain reduction applied, in dB.
    pub fn process(&mut self, channels: &mut [Vec<f32>], num_samples: usize) -> f32 {
        if self.is_identity() {
            self.gain_reduction_db = 0.0;
            return 0.0;
        }

        let mut min_gain: f32 = 1.0;
        for (channel, envelope) in channels.iter_mut().zip(self.envelope.iter_mut()) {
            for sample in channel[..num_samples].iter_mut() {
                let level = sample.abs();
                let coefficient = if level > *envelope {
                    self.attack_coefficient
                } else {
                    self.release_coefficient
                };
                *envelope = level + coefficient * (*envelope - level);

                if *envelope > self.threshold_gain {
                    let gain = (*envelope / self.threshold_gain).powf(self.gain_exponent);
                    *sample *= gain;
                    min_gain = min_gain.min(gain);
                }
            }
        }

        self.gain_reduction_db = util::gain_to_db(min_gain).min(0.0);
        self.gain_reduction_db
    }
}

/// Per-band gain reduction published by the audio thread, readable from anywhere
#[derive(Default)]
pub struct GainReductionMeters {
    bands: [AtomicF32; 3],
}

impl GainReductionMeters {
    /// Called from the audio thread once per block
    pub fn store(&self, band: Band, gain_reduction_db: f32) {
        self.bands[band.index()].store(gain_reduction_db, Ordering::Relaxed);
    }

    pub fn load(&self, band: Band) -> f32 {
        self.bands[band.index()].load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use dasp::signal::{self, Signal};

    const SAMPLE_RATE: f32 = 48000.0;

    fn sine(frequency: f64, amplitude: f32, len: usize) -> Vec<f32> {
        signal::rate(SAMPLE_RATE as f64)
            .const_hz(frequency)
            .sine()
            .take(len)
            .map(|s| s as f32 * amplitude)
            .collect()
    }

    fn peak_db(samples: &[f32]) -> f32 {
        util::gain_to_db(samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs())))
    }

    #[test]
    fn unity_ratio_is_an_exact_identity() {
        let mut band = CompressorBand::new();
        band.prepare(SAMPLE_RATE, 512, 1);
        band.update_settings(&BandParameters {
            ratio: 1.0,
            threshold_db: -60.0,
            ..BandParameters::default()
        });

        let input = sine(440.0, 0.9, 512);
        let mut block = vec![input.clone()];
        band.process(&mut block, 512);

        assert_eq!(block[0], input);
        assert_eq!(band.gain_reduction_db(), 0.0);
    }

    #[test]
    fn bypass_is_an_exact_identity() {
        let mut band = CompressorBand::new();
        band.prepare(SAMPLE_RATE, 512, 2);
        band.update_settings(&BandParameters {
            ratio: 100.0,
            threshold_db: -60.0,
            bypassed: true,
            ..BandParameters::default()
        });

        let input = sine(1000.0, 1.0, 512);
        let mut block = vec![input.clone(), input.clone()];
        band.process(&mut block, 512);

        assert_eq!(block[0], input);
        assert_eq!(block[1], input);
    }

    #[test]
    fn steady_state_level_follows_the_static_curve() {
        let threshold_db = -30.0;
        let input_db = -6.0;
        let ratio = 4.0;

        let mut band = CompressorBand::new();
        band.prepare(SAMPLE_RATE, 48000, 1);
        band.update_settings(&BandParameters {
            attack_ms: 5.0,
            release_ms: 500.0,
            threshold_db,
            ratio,
            ..BandParameters::default()
        });

        let len = SAMPLE_RATE as usize;
        let mut block = vec![sine(1000.0, util::db_to_gain(input_db), len)];
        band.process(&mut block, len);

        // Well past the attack time
        let settled = &block[0][len / 2..];
        let expected_db = threshold_db + (input_db - threshold_db) / ratio;
        assert_abs_diff_eq!(peak_db(settled), expected_db, epsilon = 0.5);
        assert!(band.gain_reduction_db() < -17.0);
    }

    #[test]
    fn signals_below_threshold_pass_untouched() {
        let mut band = CompressorBand::new();
        band.prepare(SAMPLE_RATE, 1024, 1);
        band.update_settings(&BandParameters {
            threshold_db: -6.0,
            ratio: 8.0,
            ..BandParameters::default()
        });

        let input = sine(200.0, util::db_to_gain(-12.0), 1024);
        let mut block = vec![input.clone()];
        band.process(&mut block, 1024);

        assert_eq!(block[0], input);
    }

    #[test]
    fn meters_are_stored_per_band() {
        let meters = GainReductionMeters::default();
        meters.store(Band::Mid, -4.5);

        assert_eq!(meters.load(Band::Low), 0.0);
        assert_eq!(meters.load(Band::Mid), -4.5);
    }
}
