use nih_plug::prelude::*;
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use std::collections::VecDeque;
use std::sync::Arc;

use super::constants::FRAME_QUEUE_DEPTH;
use super::window_functions::{WindowData, WindowType};

/// Supported FFT sizes. 2048 gives us 23.4Hz resolution at 48kHz, the larger orders trade
/// responsiveness for bass resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FftOrder {
    #[default]
    Order2048,
    Order4096,
    Order8192,
}

impl FftOrder {
    /// Number of time domain samples per transform
    pub fn size(self) -> usize {
        match self {
            Self::Order2048 => 2048,
            Self::Order4096 => 4096,
            Self::Order8192 => 8192,
        }
    }

    /// Number of magnitude values in a frame, DC up to just below Nyquist
    pub fn bins(self) -> usize {
        self.size() / 2
    }
}

/// One magnitude snapshot in dBFS, bin `k` sits at `k * sample_rate / fft_size` Hz
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    magnitudes_db: Vec<f32>,
    bin_width_hz: f32,
}

impl SpectralFrame {
    /// A frame where every bin sits at `floor_db`
    pub fn silent(order: FftOrder, sample_rate: f32, floor_db: f32) -> Self {
        Self {
            magnitudes_db: vec![floor_db; order.bins()],
            bin_width_hz: sample_rate / order.size() as f32,
        }
    }

    pub fn magnitudes_db(&self) -> &[f32] {
        &self.magnitudes_db
    }

    /// Frequency distance between two neighbouring bins
    pub fn bin_width_hz(&self) -> f32 {
        self.bin_width_hz
    }

    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.bin_width_hz
    }

    pub fn len(&self) -> usize {
        self.magnitudes_db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes_db.is_empty()
    }
}

/// Turns a rolling window of samples into spectral frames.
///
/// New samples are shifted into a buffer as long as the FFT. Every chunk pushed produces one
/// frame, so the hop size is whatever chunk size the caller feeds in. Finished frames wait in a
/// small queue, when nobody picks them up the oldest ones are dropped.
pub struct SpectralTransform {
    order: FftOrder,
    sample_rate: f32,
    window_type: WindowType,
    window: WindowData,

    /// FFT processing engine
    fft_processor: Arc<dyn RealToComplex<f32>>,
    /// Most recent `order.size()` samples, oldest first
    shift_register: Vec<f32>,
    /// Input buffer for windowed samples (time domain)
    time_domain_buffer: Vec<f32>,
    /// Output buffer for FFT results (frequency domain)
    frequency_domain_buffer: Vec<Complex32>,
    fft_scratch: Vec<Complex32>,

    frames: VecDeque<SpectralFrame>,
    dropped_frames: usize,
}

impl SpectralTransform {
    pub fn new(order: FftOrder, sample_rate: f32) -> Self {
        let window_type = WindowType::default();
        let mut fft_planner = RealFftPlanner::<f32>::new();
        let fft_processor = fft_planner.plan_fft_forward(order.size());

        Self {
            order,
            sample_rate,
            window_type,
            window: WindowData::new(window_type, order.size()),
            time_domain_buffer: fft_processor.make_input_vec(),
            frequency_domain_buffer: fft_processor.make_output_vec(),
            fft_scratch: fft_processor.make_scratch_vec(),
            fft_processor,
            shift_register: vec![0.0; order.size()],
            frames: VecDeque::with_capacity(FRAME_QUEUE_DEPTH),
            dropped_frames: 0,
        }
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Re-plan for a different FFT size. Clears all history and any queued frames.
    pub fn change_order(&mut self, order: FftOrder) {
        if order == self.order {
            return;
        }

        nih_debug!("Changing analyzer FFT size to {}", order.size());
        *self = Self {
            window_type: self.window_type,
            window: WindowData::new(self.window_type, order.size()),
            ..Self::new(order, self.sample_rate)
        };
    }

    /// Swap the tapering window. History is kept.
    pub fn set_window(&mut self, window_type: WindowType) {
        self.window_type = window_type;
        self.window = WindowData::new(window_type, self.order.size());
    }

    /// Bin frequencies depend on this, queued frames are thrown away
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.frames.clear();
    }

    /// Forget all history, e.g. after the analyzer was switched back on
    pub fn reset(&mut self) {
        self.shift_register.fill(0.0);
        self.frames.clear();
    }

    /// Shift `chunk` into the window and queue a new frame. Magnitudes below
    /// `negative_infinity_db` are clamped to it.
    pub fn push_chunk(&mut self, chunk: &[f32], negative_infinity_db: f32) {
        let size = self.shift_register.len();
        if chunk.len() >= size {
            self.shift_register
                .copy_from_slice(&chunk[chunk.len() - size..]);
        } else {
            self.shift_register.copy_within(chunk.len().., 0);
            self.shift_register[size - chunk.len()..].copy_from_slice(chunk);
        }

        let frame = self.compute_frame(negative_infinity_db);
        if self.frames.len() >= FRAME_QUEUE_DEPTH {
            self.frames.pop_front();
            self.dropped_frames += 1;
        }
        self.frames.push_back(frame);
    }

    /// Oldest queued frame
    pub fn next_frame(&mut self) -> Option<SpectralFrame> {
        self.frames.pop_front()
    }

    /// Newest queued frame. Everything older is discarded.
    pub fn latest_frame(&mut self) -> Option<SpectralFrame> {
        let latest = self.frames.pop_back();
        self.frames.clear();
        latest
    }

    pub fn queued_frames(&self) -> usize {
        self.frames.len()
    }

    /// Frames pushed out of the queue before anyone read them
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    fn compute_frame(&mut self, negative_infinity_db: f32) -> SpectralFrame {
        // Window the current history into the FFT input
        self.time_domain_buffer.copy_from_slice(&self.shift_register);
        self.window.apply(&mut self.time_domain_buffer);

        let mut frame = SpectralFrame::silent(self.order, self.sample_rate, negative_infinity_db);
        if self
            .fft_processor
            .process_with_scratch(
                &mut self.time_domain_buffer,
                &mut self.frequency_domain_buffer,
                &mut self.fft_scratch,
            )
            .is_err()
        {
            // Buffer sizes come from the planner, this can't actually happen
            return frame;
        }

        compute_magnitude_spectrum(
            &self.frequency_domain_buffer,
            self.order.size(),
            self.window.coherent_gain,
            negative_infinity_db,
            &mut frame.magnitudes_db,
        );

        frame
    }
}

/// Converts complex FFT output to a magnitude spectrum in dBFS
///
/// # Parameters
/// * `frequency_bins` - Complex FFT output bins (N/2+1 for real FFT)
/// * `window_size` - Size of FFT window (for normalization)
/// * `window_coherent_gain` - Window's coherent gain for amplitude correction
/// * `floor_db` - Lowest value written
/// * `output` - Receives one value per bin, only the first `output.len()` bins are used
///
/// # Scaling
/// - Single-sided scaling: 2/N for k>0, 1/N for DC (k=0)
/// - Window compensation: divide by coherent gain
///
/// With that a full-scale sine centered on a bin reads 0 dBFS.
pub fn compute_magnitude_spectrum(
    frequency_bins: &[Complex32],
    window_size: usize,
    window_coherent_gain: f32,
    floor_db: f32,
    output: &mut [f32],
) {
    let normalization = 1.0 / (window_size as f32 * window_coherent_gain);

    for (bin_idx, (value, bin)) in output.iter_mut().zip(frequency_bins).enumerate() {
        let scale = if bin_idx == 0 { 1.0 } else { 2.0 };
        let amplitude = bin.norm() * scale * normalization;
        // `util::gain_to_db()` stops at -100 dB, floors can sit below that
        *value = if amplitude > 0.0 {
            (20.0 * amplitude.log10()).max(floor_db)
        } else {
            floor_db
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    const SAMPLE_RATE: f32 = 48000.0;

    fn push_sine(transform: &mut SpectralTransform, frequency: f32, floor_db: f32) {
        let samples: Vec<f32> = (0..transform.order().size())
            .map(|i| (2.0 * PI * frequency * i as f32 / SAMPLE_RATE).sin())
            .collect();
        for chunk in samples.chunks(512) {
            transform.push_chunk(chunk, floor_db);
        }
    }

    #[test]
    fn full_scale_sine_reads_zero_dbfs() {
        let mut transform = SpectralTransform::new(FftOrder::Order2048, SAMPLE_RATE);
        let bin = 100;
        push_sine(&mut transform, bin as f32 * SAMPLE_RATE / 2048.0, -150.0);

        let frame = transform.latest_frame().unwrap();
        assert_eq!(frame.len(), 1024);
        assert_abs_diff_eq!(frame.magnitudes_db()[bin], 0.0, epsilon = 0.1);
    }

    #[test]
    fn silence_sits_on_the_floor() {
        let mut transform = SpectralTransform::new(FftOrder::Order4096, SAMPLE_RATE);
        transform.push_chunk(&[0.0; 512], -48.0);

        let frame = transform.next_frame().unwrap();
        assert!(frame.magnitudes_db().iter().all(|&db| db == -48.0));
    }

    #[test]
    fn floors_below_minus_100_db_are_honoured() {
        let mut transform = SpectralTransform::new(FftOrder::Order2048, SAMPLE_RATE);
        transform.push_chunk(&[0.0; 512], -120.0);
        let frame = transform.next_frame().unwrap();
        assert!(frame.magnitudes_db().iter().all(|&db| db == -120.0));

        // A quiet tone still reads below -100 dB instead of being clamped there
        let mut output = [0.0; 2];
        let bins = [Complex32::new(0.0, 0.0), Complex32::new(1e-6 * 1024.0, 0.0)];
        compute_magnitude_spectrum(&bins, 2048, 1.0, -150.0, &mut output);
        assert_eq!(output[0], -150.0);
        assert_abs_diff_eq!(output[1], -120.0, epsilon = 0.01);
    }

    #[test]
    fn frame_queue_drops_the_oldest() {
        let mut transform = SpectralTransform::new(FftOrder::Order2048, SAMPLE_RATE);
        for _ in 0..FRAME_QUEUE_DEPTH + 3 {
            transform.push_chunk(&[0.0; 256], -48.0);
        }

        assert_eq!(transform.queued_frames(), FRAME_QUEUE_DEPTH);
        assert_eq!(transform.dropped_frames(), 3);
        assert!(transform.latest_frame().is_some());
        assert_eq!(transform.queued_frames(), 0);
    }

    #[test]
    fn changing_order_resizes_frames() {
        let mut transform = SpectralTransform::new(FftOrder::Order2048, SAMPLE_RATE);
        transform.set_window(WindowType::Hann);
        transform.push_chunk(&[0.5; 512], -48.0);
        transform.change_order(FftOrder::Order8192);

        assert_eq!(transform.queued_frames(), 0);
        assert_eq!(transform.window_type(), WindowType::Hann);

        transform.push_chunk(&[0.5; 512], -48.0);
        let frame = transform.latest_frame().unwrap();
        assert_eq!(frame.len(), 4096);
        assert_abs_diff_eq!(frame.bin_width_hz(), SAMPLE_RATE / 8192.0);
    }
}
