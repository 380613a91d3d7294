pub mod audio;
pub mod error;
pub mod params;
pub mod ui;

use audio::processor::{MultibandProcessor, ProcessConfig};
use audio::spectral_transform::FftOrder;
use nih_plug::prelude::*;
use params::MultibandParams;
use std::sync::Arc;

pub use audio::parameters::{Band, BandParameters, CrossoverFrequencies, GlobalParameters};
pub use audio::parameters::{ParameterSource, SharedParameters};
pub use error::ConfigError;
pub use ui::analyzer::{AnalyzerControl, AnalyzerPipeline, PathConsumer};

pub struct MultibandComp {
    params: Arc<MultibandParams>,
    processor: MultibandProcessor<MultibandParams>,

    /// Fed by the processor's tap, rebuilt on every `initialize()`
    analyzer: Option<AnalyzerPipeline>,
    /// One per channel, handed out once through [`Self::take_analyzer_paths()`]
    analyzer_paths: Vec<PathConsumer>,
}

impl Default for MultibandComp {
    fn default() -> Self {
        let params = Arc::new(MultibandParams::default());

        Self {
            processor: MultibandProcessor::new(params.clone()),
            params,
            analyzer: None,
            analyzer_paths: Vec::new(),
        }
    }
}

impl MultibandComp {
    /// Prepare the processor and connect a fresh analyzer to it. Not real-time safe.
    fn setup(&mut self, config: ProcessConfig) -> Result<(), ConfigError> {
        self.processor.prepare(config)?;

        let (tap, pipeline, paths) = AnalyzerPipeline::connect(
            config.num_channels,
            FftOrder::default(),
            config.sample_rate,
        )?;
        self.processor.attach_tap(tap);
        self.analyzer = Some(pipeline);
        self.analyzer_paths = paths;

        Ok(())
    }

    /// The analyzer reading this instance's input. Whoever displays it calls
    /// [`AnalyzerPipeline::tick()`] on it.
    pub fn analyzer(&mut self) -> Option<&mut AnalyzerPipeline> {
        self.analyzer.as_mut()
    }

    /// The per-channel paths for the renderer, empty after the first call
    pub fn take_analyzer_paths(&mut self) -> Vec<PathConsumer> {
        std::mem::take(&mut self.analyzer_paths)
    }
}

impl Plugin for MultibandComp {
    const NAME: &'static str = "multiband-comp";
    const VENDOR: &'static str = "Cmdv";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "info@cmdv.me";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The first audio IO layout is used as the default. The crossovers and compressors work on
    // one or two channels.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    // Parameters are read once per block, splitting blocks at automation points gains nothing
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let config = ProcessConfig {
            sample_rate: buffer_config.sample_rate,
            max_block_size: buffer_config.max_buffer_size as usize,
            num_channels: audio_io_layout
                .main_output_channels
                .map(NonZeroU32::get)
                .unwrap_or(0) as usize,
        };

        // All allocation happens here, `process()` only works with what was set up now
        match self.setup(config) {
            Ok(()) => true,
            Err(err) => {
                nih_error!("Failed to initialize: {err}");
                false
            }
        }
    }

    fn reset(&mut self) {
        // Called from the audio thread, `reset()` doesn't allocate
        self.processor.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.processor.process(buffer.as_slice());

        ProcessStatus::Normal
    }
}

impl ClapPlugin for MultibandComp {
    const CLAP_ID: &'static str = "me.cmdv.multiband-comp";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Three band compressor with a spectrum analyzer");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Compressor,
    ];
}

impl Vst3Plugin for MultibandComp {
    const VST3_CLASS_ID: [u8; 16] = *b"CmdvMultibandCmp";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Dynamics];
}

nih_export_clap!(MultibandComp);
