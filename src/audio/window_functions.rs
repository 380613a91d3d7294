/// Window functions for FFT spectral analysis
///
/// Windows taper the edges of each analysis frame so the FFT doesn't see a hard discontinuity
/// where the frame wraps around, which would smear a pure tone across the whole spectrum.
use core::f32::consts::PI;
use libm::cosf;

/// Pre-computed window function data for efficient FFT processing
///
/// Holds both the window shape (coefficients) and the compensation factor (coherent_gain)
/// needed to restore correct amplitude measurements after windowing.
pub struct WindowData {
    /// Window function values [0.0..1.0] that multiply with the frame's samples.
    /// Length matches the FFT size.
    pub coefficients: Vec<f32>,

    /// Average window value. A windowed full-scale sine comes out of the FFT this much
    /// quieter, so magnitudes are divided by it.
    /// Typical values: Hann ~0.5, Blackman ~0.42, Blackman-Harris ~0.36
    pub coherent_gain: f32,
}

impl WindowData {
    pub fn new(window_type: WindowType, window_size: usize) -> Self {
        let coefficients = window_type.generate(window_size);
        let coherent_gain = window_type.coherent_gain(&coefficients);

        Self {
            coefficients,
            coherent_gain,
        }
    }

    /// Multiply `frame` by the window in place. `frame` must be as long as the window.
    #[inline]
    pub fn apply(&self, frame: &mut [f32]) {
        for (sample, coefficient) in frame.iter_mut().zip(&self.coefficients) {
            *sample *= coefficient;
        }
    }
}

/// Window function types for FFT analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WindowType {
    /// Hann: Good general-purpose balance
    Hann,
    /// Blackman: Excellent sidelobe suppression, wider main lobe
    Blackman,
    /// Blackman-Harris: -92 dB sidelobes, what the analyzer uses
    #[default]
    BlackmanHarris,
}

impl WindowType {
    /// Generate window coefficients for this window type
    pub fn generate(self, window_size: usize) -> Vec<f32> {
        match self {
            Self::Hann => apodize::hanning_iter(window_size)
                .map(|coefficient| coefficient as f32)
                .collect(),
            Self::Blackman => generate_blackman_window(window_size),
            Self::BlackmanHarris => generate_blackman_harris_window(window_size),
        }
    }

    /// Get the coherent gain for this window type
    pub fn coherent_gain(self, coefficients: &[f32]) -> f32 {
        if coefficients.is_empty() {
            return 1.0;
        }

        coefficients.iter().sum::<f32>() / coefficients.len() as f32
    }
}

/// Generates Blackman window coefficients
///
/// # Mathematical Background
/// Blackman formula: w[n] = 0.42 - 0.5*cos(2πn/N) + 0.08*cos(4πn/N)
/// - Main lobe width: 6 bins
/// - First sidelobe: -58dB
pub fn generate_blackman_window(window_size: usize) -> Vec<f32> {
    let window_size_f32 = window_size as f32;

    (0..window_size)
        .map(|i| {
            let position = i as f32 / window_size_f32;
            0.42 - 0.5 * cosf(2.0 * PI * position) + 0.08 * cosf(4.0 * PI * position)
        })
        .collect()
}

/// Generates 4-term Blackman-Harris window coefficients
///
/// # Mathematical Background
/// w[n] = a0 - a1*cos(2πn/N) + a2*cos(4πn/N) - a3*cos(6πn/N)
/// with a0 = 0.35875, a1 = 0.48829, a2 = 0.14128, a3 = 0.01168
/// - Main lobe width: 8 bins
/// - Highest sidelobe: -92dB, so leakage from a loud tone never reaches the display floor
pub fn generate_blackman_harris_window(window_size: usize) -> Vec<f32> {
    const A0: f32 = 0.35875;
    const A1: f32 = 0.48829;
    const A2: f32 = 0.14128;
    const A3: f32 = 0.01168;

    let window_size_f32 = window_size as f32;

    (0..window_size)
        .map(|i| {
            let position = i as f32 / window_size_f32;
            A0 - A1 * cosf(2.0 * PI * position) + A2 * cosf(4.0 * PI * position)
                - A3 * cosf(6.0 * PI * position)
        })
        .collect()
}
