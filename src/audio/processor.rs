use nih_plug::prelude::*;
use std::sync::Arc;

use crate::audio::arbitration::active_bands;
use crate::audio::band_splitter::{BandSplitter, SplitBands};
use crate::audio::compressor_band::{CompressorBand, GainReductionMeters};
use crate::audio::constants;
use crate::audio::parameters::{Band, ParameterSource};
use crate::audio::sample_relay::SampleTap;
use crate::error::ConfigError;

/// Everything the processor needs to know up front to preallocate its buffers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessConfig {
    pub sample_rate: f32,
    /// Longest block `process()` handles in one go, longer ones get split up
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl ProcessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite()
            || !(constants::MIN_SAMPLE_RATE..=constants::MAX_SAMPLE_RATE).contains(&self.sample_rate)
        {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if !(1..=constants::MAX_BLOCK_SIZE).contains(&self.max_block_size) {
            return Err(ConfigError::InvalidBlockSize(self.max_block_size));
        }
        if !(1..=constants::MAX_CHANNELS).contains(&self.num_channels) {
            return Err(ConfigError::UnsupportedChannelCount(self.num_channels));
        }

        Ok(())
    }
}

/// The three band compressor.
///
/// Per block: input trim, split into low/mid/high, compress each band, sum the bands that are
/// allowed to play, output trim. Parameters are read from the [`ParameterSource`] once per block.
/// After `prepare()` nothing here allocates, locks or fails.
pub struct MultibandProcessor<P: ParameterSource> {
    params: Arc<P>,
    /// `None` until `prepare()` succeeded, audio passes through untouched until then
    config: Option<ProcessConfig>,

    splitter: BandSplitter,
    compressors: [CompressorBand; 3],
    meters: Arc<GainReductionMeters>,

    /// Split signal, indexed as `[band][channel][sample]`
    band_buffers: [Vec<Vec<f32>>; 3],
    /// Per-sample trim gains for the current block
    gain_scratch: Vec<f32>,
    input_gain: Smoother<f32>,
    output_gain: Smoother<f32>,
    /// Linear gains the smoothers are heading towards, `(input, output)`
    trim_targets: (f32, f32),

    /// Receives the incoming audio for the analyzer, if one is attached
    tap: Option<SampleTap>,
}

impl<P: ParameterSource> MultibandProcessor<P> {
    pub fn new(params: Arc<P>) -> Self {
        Self {
            params,
            config: None,
            splitter: BandSplitter::new(),
            compressors: Default::default(),
            meters: Arc::new(GainReductionMeters::default()),
            band_buffers: Default::default(),
            gain_scratch: Vec::new(),
            input_gain: Smoother::new(SmoothingStyle::Linear(constants::TRIM_SMOOTHING_MS)),
            output_gain: Smoother::new(SmoothingStyle::Linear(constants::TRIM_SMOOTHING_MS)),
            trim_targets: (1.0, 1.0),
            tap: None,
        }
    }

    /// Validate `config` and allocate everything the audio path needs. Not real-time safe.
    pub fn prepare(&mut self, config: ProcessConfig) -> Result<(), ConfigError> {
        if let Err(err) = config.validate() {
            nih_error!("Rejecting processor configuration: {err}");
            return Err(err);
        }

        let ProcessConfig {
            sample_rate,
            max_block_size,
            num_channels,
        } = config;

        self.splitter.prepare(sample_rate, num_channels);
        for compressor in self.compressors.iter_mut() {
            compressor.prepare(sample_rate, max_block_size, num_channels);
        }
        self.band_buffers =
            std::array::from_fn(|_| vec![vec![0.0; max_block_size]; num_channels]);
        self.gain_scratch = vec![0.0; max_block_size];
        self.config = Some(config);
        self.reset();

        nih_log!(
            "Prepared for {} Hz, {} samples per block, {} channel(s)",
            sample_rate,
            max_block_size,
            num_channels
        );
        Ok(())
    }

    /// Clear filter and envelope state, snap the trims to their targets. Real-time safe.
    pub fn reset(&mut self) {
        self.splitter.reset();
        for compressor in self.compressors.iter_mut() {
            compressor.reset();
        }
        for band in Band::ALL {
            self.meters.store(band, 0.0);
        }

        let (input_gain_db, output_gain_db) = self.params.global().sanitized_gains();
        self.trim_targets = (
            util::db_to_gain(input_gain_db),
            util::db_to_gain(output_gain_db),
        );
        self.input_gain.reset(self.trim_targets.0);
        self.output_gain.reset(self.trim_targets.1);

        if let Some(tap) = &mut self.tap {
            tap.discard_partial();
        }
    }

    pub fn config(&self) -> Option<ProcessConfig> {
        self.config
    }

    /// Gain reduction per band, updated every block
    pub fn meters(&self) -> Arc<GainReductionMeters> {
        self.meters.clone()
    }

    /// Start relaying the incoming audio to an analyzer
    pub fn attach_tap(&mut self, tap: SampleTap) {
        self.tap = Some(tap);
    }

    pub fn detach_tap(&mut self) -> Option<SampleTap> {
        self.tap.take()
    }

    /// Process planar audio in place. Blocks longer than the prepared maximum are handled in
    /// pieces, channels past the prepared channel count are left alone.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        let Some(config) = self.config else {
            return;
        };

        let num_channels = channels.len().min(config.num_channels);
        let num_samples = channels[..num_channels]
            .iter()
            .map(|channel| channel.len())
            .min()
            .unwrap_or(0);

        let mut offset = 0;
        while offset < num_samples {
            let block_len = (num_samples - offset).min(config.max_block_size);
            self.process_block(&mut channels[..num_channels], offset, block_len, config.sample_rate);
            offset += block_len;
        }
    }

    fn process_block(
        &mut self,
        channels: &mut [&mut [f32]],
        offset: usize,
        block_len: usize,
        sample_rate: f32,
    ) {
        let range = offset..offset + block_len;

        // Step 1: Snapshot the parameters for this block
        let global = self.params.global();
        let crossovers = global.crossovers();
        let bands = Band::ALL.map(|band| self.params.band(band).sanitized());
        let (input_gain_db, output_gain_db) = global.sanitized_gains();
        let trim_targets = (
            util::db_to_gain(input_gain_db),
            util::db_to_gain(output_gain_db),
        );
        if trim_targets.0 != self.trim_targets.0 {
            self.input_gain.set_target(sample_rate, trim_targets.0);
        }
        if trim_targets.1 != self.trim_targets.1 {
            self.output_gain.set_target(sample_rate, trim_targets.1);
        }
        self.trim_targets = trim_targets;

        // Step 2: The analyzer sees the signal as it comes in
        if let Some(tap) = &mut self.tap {
            for (channel_idx, channel) in channels.iter().enumerate() {
                tap.push(channel_idx, &channel[range.clone()]);
            }
        }

        // Step 3: Input trim
        apply_gain(&self.input_gain, &mut self.gain_scratch, channels, range.clone());

        // Step 4: Split every channel into the three bands
        let [low, mid, high] = &mut self.band_buffers;
        for (channel_idx, channel) in channels.iter().enumerate() {
            self.splitter.split(
                channel_idx,
                &channel[range.clone()],
                crossovers,
                SplitBands {
                    low: &mut low[channel_idx][..block_len],
                    mid: &mut mid[channel_idx][..block_len],
                    high: &mut high[channel_idx][..block_len],
                },
            );
        }

        // Step 5: Compress the bands
        let num_channels = channels.len();
        for band in Band::ALL {
            let compressor = &mut self.compressors[band.index()];
            compressor.update_settings(&bands[band.index()]);
            let gain_reduction_db =
                compressor.process(&mut self.band_buffers[band.index()][..num_channels], block_len);
            self.meters.store(band, gain_reduction_db);
        }

        // Step 6: Sum whatever solo/mute lets through
        let active = active_bands(&bands);
        for (channel_idx, channel) in channels.iter_mut().enumerate() {
            let output = &mut channel[range.clone()];
            output.fill(0.0);
            for band in Band::ALL.into_iter().filter(|band| active[band.index()]) {
                let band_samples = &self.band_buffers[band.index()][channel_idx][..block_len];
                for (sample, band_sample) in output.iter_mut().zip(band_samples) {
                    *sample += band_sample;
                }
            }
        }

        // Step 7: Output trim
        apply_gain(&self.output_gain, &mut self.gain_scratch, channels, range);
    }
}

/// Multiply every channel by the smoother's next values. The smoother advances once per sample,
/// not once per channel.
fn apply_gain(
    smoother: &Smoother<f32>,
    gain_scratch: &mut [f32],
    channels: &mut [&mut [f32]],
    range: std::ops::Range<usize>,
) {
    if !smoother.is_smoothing() && smoother.previous_value() == 1.0 {
        return;
    }

    let block_len = range.len();
    smoother.next_block(&mut gain_scratch[..block_len], block_len);
    for channel in channels.iter_mut() {
        for (sample, gain) in channel[range.clone()].iter_mut().zip(&gain_scratch[..block_len]) {
            *sample *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::parameters::{BandParameters, SharedParameters};

    fn prepared(
        params: Arc<SharedParameters>,
        max_block_size: usize,
    ) -> MultibandProcessor<SharedParameters> {
        let mut processor = MultibandProcessor::new(params);
        processor
            .prepare(ProcessConfig {
                sample_rate: 48000.0,
                max_block_size,
                num_channels: 2,
            })
            .unwrap();
        processor
    }

    #[test]
    fn rejects_invalid_configurations() {
        let mut processor = MultibandProcessor::new(Arc::new(SharedParameters::default()));
        let valid = ProcessConfig {
            sample_rate: 44100.0,
            max_block_size: 512,
            num_channels: 2,
        };

        assert_eq!(
            processor.prepare(ProcessConfig {
                sample_rate: 0.0,
                ..valid
            }),
            Err(ConfigError::InvalidSampleRate(0.0))
        );
        assert_eq!(
            processor.prepare(ProcessConfig {
                max_block_size: 0,
                ..valid
            }),
            Err(ConfigError::InvalidBlockSize(0))
        );
        assert_eq!(
            processor.prepare(ProcessConfig {
                num_channels: 6,
                ..valid
            }),
            Err(ConfigError::UnsupportedChannelCount(6))
        );
        assert!(processor.config().is_none());
        assert!(processor.prepare(valid).is_ok());
    }

    #[test]
    fn unprepared_processor_passes_audio_through() {
        let mut processor = MultibandProcessor::new(Arc::new(SharedParameters::default()));
        let mut left = vec![0.25; 64];
        let mut right = vec![-0.5; 64];
        processor.process(&mut [left.as_mut_slice(), right.as_mut_slice()]);

        assert!(left.iter().all(|&s| s == 0.25));
        assert!(right.iter().all(|&s| s == -0.5));
    }

    #[test]
    fn muting_every_band_silences_the_output() {
        let params = Arc::new(SharedParameters::default());
        for band in Band::ALL {
            params.set_muted(band, true);
        }
        let mut processor = prepared(params, 256);

        let mut left = vec![0.5; 256];
        let mut right = vec![0.5; 256];
        processor.process(&mut [left.as_mut_slice(), right.as_mut_slice()]);

        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    }

    #[test]
    fn long_blocks_are_processed_in_pieces() {
        let params = Arc::new(SharedParameters::new(
            Default::default(),
            BandParameters {
                threshold_db: -20.0,
                ratio: 4.0,
                ..BandParameters::default()
            },
        ));

        let input: Vec<f32> = (0..1000).map(|i| ((i as f32) * 0.05).sin() * 0.8).collect();

        let mut whole = prepared(params.clone(), 1000);
        let (mut left_a, mut right_a) = (input.clone(), input.clone());
        whole.process(&mut [left_a.as_mut_slice(), right_a.as_mut_slice()]);

        let mut pieces = prepared(params, 128);
        let (mut left_b, mut right_b) = (input.clone(), input.clone());
        pieces.process(&mut [left_b.as_mut_slice(), right_b.as_mut_slice()]);

        for (a, b) in left_a.iter().zip(&left_b) {
            assert!((a - b).abs() < 1e-5);
        }
        assert!(whole.meters().load(Band::Low) < 0.0);
    }
}
