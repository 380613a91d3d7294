use atomic_float::AtomicF32;
use nih_plug::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use triple_buffer::TripleBuffer;

use crate::audio::constants;
use crate::audio::sample_relay::{RelayConsumer, SampleTap};
use crate::audio::spectral_transform::{FftOrder, SpectralTransform};
use crate::audio::window_functions::WindowType;
use crate::error::ConfigError;
use crate::ui::curve_generator::{AnalyzerPath, CurveGenerator, DbRange};
use crate::ui::geometry::{self, Rect};

/// Switches shared between the analyzer and whoever displays it. Cloning gives another handle to
/// the same switches.
#[derive(Clone)]
pub struct AnalyzerControl {
    enabled: Arc<AtomicBool>,
    negative_infinity_db: Arc<AtomicF32>,
}

impl Default for AnalyzerControl {
    fn default() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            negative_infinity_db: Arc::new(AtomicF32::new(constants::ANALYZER_MIN_DB)),
        }
    }
}

impl AnalyzerControl {
    /// When disabled, ticks don't do anything and the last published paths stay as they are
    pub fn set_enabled(&self, enabled: bool) {
        let was_enabled = self.enabled.swap(enabled, Ordering::Relaxed);
        if was_enabled != enabled {
            nih_debug!("Analyzer {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Floor for the frames and paths produced by later ticks. Non-finite values are ignored.
    pub fn set_negative_infinity(&self, db: f32) {
        if db.is_finite() {
            self.negative_infinity_db.store(db, Ordering::Relaxed);
        }
    }

    pub fn negative_infinity(&self) -> f32 {
        self.negative_infinity_db.load(Ordering::Relaxed)
    }
}

/// Renderer side of one channel's path
pub struct PathConsumer {
    output: triple_buffer::Output<AnalyzerPath>,
}

impl PathConsumer {
    /// The most recently published path. Always a complete one.
    pub fn read(&mut self) -> &AnalyzerPath {
        self.output.read()
    }

    /// Whether a path was published since the last read
    pub fn has_update(&self) -> bool {
        self.output.updated()
    }
}

/// Relay, transform and curve generator for one channel
struct PathProducer {
    relay: RelayConsumer,
    transform: SpectralTransform,
    path: AnalyzerPath,
    publisher: triple_buffer::Input<AnalyzerPath>,
}

impl PathProducer {
    fn new(relay: RelayConsumer, order: FftOrder, sample_rate: f32) -> (Self, PathConsumer) {
        let (publisher, output) = TripleBuffer::new(&AnalyzerPath::default()).split();

        let producer = Self {
            relay,
            transform: SpectralTransform::new(order, sample_rate),
            path: AnalyzerPath::default(),
            publisher,
        };

        (producer, PathConsumer { output })
    }

    /// Feed every pending chunk through the transform, then redraw from the newest frame. Returns
    /// whether a new path was published.
    fn tick(&mut self, generator: &CurveGenerator, area: Rect, negative_infinity_db: f32) -> bool {
        while let Some(chunk) = self.relay.pop() {
            self.transform.push_chunk(chunk, negative_infinity_db);
        }

        match self.transform.latest_frame() {
            Some(frame) => {
                generator.generate_into(&frame, area, &mut self.path);
                self.publisher.write(self.path.clone());
                true
            }
            None => false,
        }
    }
}

/// Drives the analyzer: relays in, one path per channel out.
///
/// Call [`tick()`][Self::tick()] from a non-realtime thread at display rate (roughly every 16 ms).
/// A tick drains whatever the audio thread has relayed since the last one and never waits for
/// more. Taking longer than a tick period is harmless, the relays and frame queues simply drop
/// their oldest data.
pub struct AnalyzerPipeline {
    channels: Vec<PathProducer>,
    control: AnalyzerControl,
    /// Area the paths are mapped onto
    area: Rect,
    max_db: f32,
}

impl AnalyzerPipeline {
    /// One path per relay, in the same order
    pub fn new(
        relays: Vec<RelayConsumer>,
        order: FftOrder,
        sample_rate: f32,
    ) -> (Self, Vec<PathConsumer>) {
        let (channels, consumers) = relays
            .into_iter()
            .map(|relay| PathProducer::new(relay, order, sample_rate))
            .unzip();

        let pipeline = Self {
            channels,
            control: AnalyzerControl::default(),
            area: Rect::default(),
            max_db: constants::ANALYZER_MAX_DB,
        };

        (pipeline, consumers)
    }

    /// Set up relays for `num_channels` with the default chunk size and depth, and an analyzer
    /// reading from them. The tap goes to the audio processor.
    pub fn connect(
        num_channels: usize,
        order: FftOrder,
        sample_rate: f32,
    ) -> Result<(SampleTap, Self, Vec<PathConsumer>), ConfigError> {
        let (tap, relays) = SampleTap::new(
            num_channels,
            constants::RELAY_CHUNK_SIZE,
            constants::RELAY_CAPACITY,
        )?;
        let (pipeline, paths) = Self::new(relays, order, sample_rate);
        nih_debug!(
            "Analyzer connected: {} channel(s), {} point FFT",
            num_channels,
            order.size()
        );

        Ok((tap, pipeline, paths))
    }

    /// A handle for toggling the analyzer and moving its floor from other threads
    pub fn control(&self) -> AnalyzerControl {
        self.control.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.control.set_enabled(enabled);
    }

    pub fn set_negative_infinity(&self, db: f32) {
        self.control.set_negative_infinity(db);
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Map paths onto `area` directly, the floor is left alone
    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    /// Lay the analyzer out inside a view with the given bounds. The paths are mapped onto the
    /// view's analysis area and the floor follows the view's height.
    pub fn set_view_bounds(&mut self, bounds: Rect) {
        self.area = geometry::analysis_area(bounds);
        self.control
            .set_negative_infinity(geometry::negative_infinity_for(bounds, self.area));
    }

    /// Level mapped to the top of the area
    pub fn set_max_db(&mut self, max_db: f32) {
        if max_db.is_finite() {
            self.max_db = max_db;
        }
    }

    pub fn change_order(&mut self, order: FftOrder) {
        for channel in self.channels.iter_mut() {
            channel.transform.change_order(order);
        }
    }

    pub fn set_window(&mut self, window_type: WindowType) {
        for channel in self.channels.iter_mut() {
            channel.transform.set_window(window_type);
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for channel in self.channels.iter_mut() {
            channel.transform.set_sample_rate(sample_rate);
        }
    }

    /// Chunks lost to relay overflow, summed over all channels
    pub fn dropped_chunks(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.relay.dropped_chunks())
            .sum()
    }

    /// The last path generated for `channel`, as published
    pub fn latest_path(&self, channel: usize) -> Option<&AnalyzerPath> {
        self.channels.get(channel).map(|channel| &channel.path)
    }

    /// Does nothing while disabled. Returns the number of channels that got a new path.
    pub fn tick(&mut self) -> usize {
        if !self.control.is_enabled() {
            return 0;
        }

        let negative_infinity_db = self.control.negative_infinity();
        let generator = CurveGenerator::new(DbRange {
            min_db: negative_infinity_db,
            max_db: self.max_db.max(negative_infinity_db),
        });

        let area = self.area;
        self.channels
            .iter_mut()
            .map(|channel| channel.tick(&generator, area, negative_infinity_db))
            .filter(|&published| published)
            .count()
    }
}
