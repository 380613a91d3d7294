/// Audio processing constants and helper functions
/// Separated from the analyzer geometry for better organization

/// Frequency range constants
pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Crossovers never get closer to Nyquist than this fraction of the sample rate
pub const MAX_CROSSOVER_NYQUIST_RATIO: f32 = 0.49;
/// Smallest distance between the two crossovers, the mid band never collapses
pub const MIN_CROSSOVER_SPACING_HZ: f32 = 1.0;

/// dB range for the analyzer trace
pub const ANALYZER_MAX_DB: f32 = 12.0;
pub const ANALYZER_MIN_DB: f32 = -48.0;

/// The analysis area maps this range onto its own vertical extent when deriving the floor
pub const FLOOR_REFERENCE_BOTTOM_DB: f32 = -48.0;
pub const FLOOR_REFERENCE_TOP_DB: f32 = 0.0;

/// Trim parameter range
pub const GAIN_MIN_DB: f32 = -24.0;
pub const GAIN_MAX_DB: f32 = 24.0;

/// Compressor time constant ranges (ms)
pub const ATTACK_MIN_MS: f32 = 5.0;
pub const ATTACK_MAX_MS: f32 = 500.0;
pub const RELEASE_MIN_MS: f32 = 5.0;
pub const RELEASE_MAX_MS: f32 = 500.0;

/// Time constants below this are treated as instant
pub const MIN_TIME_CONSTANT_MS: f32 = 0.1;

/// Compressor threshold range (dB)
pub const THRESHOLD_MIN_DB: f32 = -60.0;
pub const THRESHOLD_MAX_DB: f32 = 12.0;

/// Selectable compression ratios (x:1)
pub const RATIO_CHOICES: [f32; 14] = [
    1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 15.0, 20.0, 50.0, 100.0,
];
pub const DEFAULT_RATIO_INDEX: i32 = 3; // 3:1

/// Crossover parameter ranges and defaults (Hz)
pub const LOW_MID_CROSSOVER_MIN: f32 = 20.0;
pub const LOW_MID_CROSSOVER_MAX: f32 = 999.0;
pub const LOW_MID_CROSSOVER_DEFAULT: f32 = 400.0;
pub const MID_HIGH_CROSSOVER_MIN: f32 = 1000.0;
pub const MID_HIGH_CROSSOVER_MAX: f32 = 20000.0;
pub const MID_HIGH_CROSSOVER_DEFAULT: f32 = 2000.0;

/// Trim ramps, long enough to hide zipper noise
pub const TRIM_SMOOTHING_MS: f32 = 50.0;

/// Prepare-time limits
pub const MIN_SAMPLE_RATE: f32 = 8000.0;
pub const MAX_SAMPLE_RATE: f32 = 384000.0;
pub const MAX_BLOCK_SIZE: usize = 65536;
pub const MAX_CHANNELS: usize = 2;

/// Sample relay geometry: chunks of this many samples, this many chunks deep (power of two)
pub const RELAY_CHUNK_SIZE: usize = 512;
pub const RELAY_CAPACITY: usize = 128;

/// Finished spectral frames kept for the curve generator before the oldest is dropped
pub const FRAME_QUEUE_DEPTH: usize = 8;

// === HELPER FUNCTIONS ===

/// Convert frequency to logarithmic position (0.0 to 1.0)
pub fn freq_to_log_position(freq: f32) -> f32 {
    (freq / MIN_FREQUENCY).log10() / (MAX_FREQUENCY / MIN_FREQUENCY).log10()
}

/// Convert logarithmic position (0.0 to 1.0) back to frequency
pub fn log_position_to_freq(position: f32) -> f32 {
    MIN_FREQUENCY * (MAX_FREQUENCY / MIN_FREQUENCY).powf(position)
}

/// Linear re-mapping, like a ranged lerp
pub fn map_range(value: f32, source_min: f32, source_max: f32, target_min: f32, target_max: f32) -> f32 {
    target_min + (value - source_min) * (target_max - target_min) / (source_max - source_min)
}
