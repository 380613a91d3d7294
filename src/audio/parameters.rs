use crate::audio::constants;
use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, Ordering};

/// The three frequency bands produced by the crossover split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Low, Band::Mid, Band::High];

    /// Position of this band in per-band arrays
    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Mid => 1,
            Self::High => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Mid => "Mid",
            Self::High => "High",
        }
    }
}

/// Snapshot of one band's compressor and mix settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandParameters {
    pub attack_ms: f32,
    pub release_ms: f32,
    pub threshold_db: f32,
    /// Compression ratio as x:1
    pub ratio: f32,
    pub bypassed: bool,
    pub muted: bool,
    pub soloed: bool,
}

impl Default for BandParameters {
    fn default() -> Self {
        Self {
            attack_ms: 50.0,
            release_ms: 250.0,
            threshold_db: 0.0,
            ratio: constants::RATIO_CHOICES[constants::DEFAULT_RATIO_INDEX as usize],
            bypassed: false,
            muted: false,
            soloed: false,
        }
    }
}

impl BandParameters {
    /// Clamp every value into the range the compressor can work with. Non-finite values fall
    /// back to the defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };

        Self {
            attack_ms: finite_or(self.attack_ms, defaults.attack_ms)
                .max(constants::MIN_TIME_CONSTANT_MS),
            release_ms: finite_or(self.release_ms, defaults.release_ms)
                .max(constants::MIN_TIME_CONSTANT_MS),
            threshold_db: finite_or(self.threshold_db, defaults.threshold_db),
            ratio: finite_or(self.ratio, defaults.ratio).max(1.0),
            ..self
        }
    }
}

/// The two boundaries between low/mid and mid/high
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverFrequencies {
    low_mid_hz: f32,
    mid_high_hz: f32,
}

impl CrossoverFrequencies {
    /// Clamps both frequencies into the audible range and keeps them ordered. Never rejects.
    pub fn new(low_mid_hz: f32, mid_high_hz: f32) -> Self {
        let clamp = |hz: f32, fallback: f32| {
            if hz.is_finite() {
                hz.clamp(constants::MIN_FREQUENCY, constants::MAX_FREQUENCY)
            } else {
                fallback
            }
        };

        let low_mid_hz = clamp(low_mid_hz, constants::LOW_MID_CROSSOVER_DEFAULT);
        let mid_high_hz = clamp(mid_high_hz, constants::MID_HIGH_CROSSOVER_DEFAULT);

        Self::ordered(low_mid_hz, mid_high_hz, constants::MAX_FREQUENCY)
    }

    /// `low_mid < mid_high <= ceiling`, with at least [`constants::MIN_CROSSOVER_SPACING_HZ`]
    /// between them
    fn ordered(low_mid_hz: f32, mid_high_hz: f32, ceiling: f32) -> Self {
        let spacing = constants::MIN_CROSSOVER_SPACING_HZ;
        let low_mid_hz = low_mid_hz.min(ceiling - spacing);
        let mid_high_hz = mid_high_hz.min(ceiling).max(low_mid_hz + spacing);

        Self {
            low_mid_hz,
            mid_high_hz,
        }
    }

    /// Pulls both frequencies below Nyquist for the given sample rate, keeping the ordering
    pub fn limited_to(self, sample_rate: f32) -> Self {
        let ceiling = (sample_rate * constants::MAX_CROSSOVER_NYQUIST_RATIO)
            .min(constants::MAX_FREQUENCY)
            .max(constants::MIN_FREQUENCY + constants::MIN_CROSSOVER_SPACING_HZ);

        Self::ordered(self.low_mid_hz, self.mid_high_hz, ceiling)
    }

    pub fn low_mid_hz(&self) -> f32 {
        self.low_mid_hz
    }

    pub fn mid_high_hz(&self) -> f32 {
        self.mid_high_hz
    }
}

impl Default for CrossoverFrequencies {
    fn default() -> Self {
        Self::new(
            constants::LOW_MID_CROSSOVER_DEFAULT,
            constants::MID_HIGH_CROSSOVER_DEFAULT,
        )
    }
}

/// Snapshot of the global (non per-band) settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalParameters {
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    pub low_mid_crossover_hz: f32,
    pub mid_high_crossover_hz: f32,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self {
            input_gain_db: 0.0,
            output_gain_db: 0.0,
            low_mid_crossover_hz: constants::LOW_MID_CROSSOVER_DEFAULT,
            mid_high_crossover_hz: constants::MID_HIGH_CROSSOVER_DEFAULT,
        }
    }
}

impl GlobalParameters {
    pub fn crossovers(&self) -> CrossoverFrequencies {
        CrossoverFrequencies::new(self.low_mid_crossover_hz, self.mid_high_crossover_hz)
    }

    /// Trims clamped to the parameter range, non-finite values become 0 dB
    pub fn sanitized_gains(&self) -> (f32, f32) {
        let clamp = |db: f32| {
            if db.is_finite() {
                db.clamp(constants::GAIN_MIN_DB, constants::GAIN_MAX_DB)
            } else {
                0.0
            }
        };
        (clamp(self.input_gain_db), clamp(self.output_gain_db))
    }
}

/// Where the processor reads its settings from, once per block.
///
/// Every individual value must be read atomically. Reads across values don't need to be
/// consistent with each other, a mismatch corrects itself on the next block.
pub trait ParameterSource: Send + Sync {
    fn band(&self, band: Band) -> BandParameters;
    fn global(&self) -> GlobalParameters;
}

/// Lock-free parameter store for one band
struct SharedBandParameters {
    attack_ms: AtomicF32,
    release_ms: AtomicF32,
    threshold_db: AtomicF32,
    ratio: AtomicF32,
    bypassed: AtomicBool,
    muted: AtomicBool,
    soloed: AtomicBool,
}

impl SharedBandParameters {
    fn new(initial: BandParameters) -> Self {
        Self {
            attack_ms: AtomicF32::new(initial.attack_ms),
            release_ms: AtomicF32::new(initial.release_ms),
            threshold_db: AtomicF32::new(initial.threshold_db),
            ratio: AtomicF32::new(initial.ratio),
            bypassed: AtomicBool::new(initial.bypassed),
            muted: AtomicBool::new(initial.muted),
            soloed: AtomicBool::new(initial.soloed),
        }
    }

    fn load(&self) -> BandParameters {
        BandParameters {
            attack_ms: self.attack_ms.load(Ordering::Relaxed),
            release_ms: self.release_ms.load(Ordering::Relaxed),
            threshold_db: self.threshold_db.load(Ordering::Relaxed),
            ratio: self.ratio.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            muted: self.muted.load(Ordering::Relaxed),
            soloed: self.soloed.load(Ordering::Relaxed),
        }
    }

    fn store(&self, values: BandParameters) {
        self.attack_ms.store(values.attack_ms, Ordering::Relaxed);
        self.release_ms.store(values.release_ms, Ordering::Relaxed);
        self.threshold_db.store(values.threshold_db, Ordering::Relaxed);
        self.ratio.store(values.ratio, Ordering::Relaxed);
        self.bypassed.store(values.bypassed, Ordering::Relaxed);
        self.muted.store(values.muted, Ordering::Relaxed);
        self.soloed.store(values.soloed, Ordering::Relaxed);
    }
}

/// Host-independent [`ParameterSource`] backed by atomics. Any thread may write, the audio
/// thread reads.
pub struct SharedParameters {
    bands: [SharedBandParameters; 3],
    input_gain_db: AtomicF32,
    output_gain_db: AtomicF32,
    low_mid_crossover_hz: AtomicF32,
    mid_high_crossover_hz: AtomicF32,
}

impl Default for SharedParameters {
    fn default() -> Self {
        Self::new(GlobalParameters::default(), BandParameters::default())
    }
}

impl SharedParameters {
    /// Every band starts out with the same settings
    pub fn new(global: GlobalParameters, band: BandParameters) -> Self {
        Self {
            bands: [
                SharedBandParameters::new(band),
                SharedBandParameters::new(band),
                SharedBandParameters::new(band),
            ],
            input_gain_db: AtomicF32::new(global.input_gain_db),
            output_gain_db: AtomicF32::new(global.output_gain_db),
            low_mid_crossover_hz: AtomicF32::new(global.low_mid_crossover_hz),
            mid_high_crossover_hz: AtomicF32::new(global.mid_high_crossover_hz),
        }
    }

    pub fn set_band(&self, band: Band, values: BandParameters) {
        self.bands[band.index()].store(values);
    }

    pub fn set_bypassed(&self, band: Band, bypassed: bool) {
        self.bands[band.index()]
            .bypassed
            .store(bypassed, Ordering::Relaxed);
    }

    pub fn set_muted(&self, band: Band, muted: bool) {
        self.bands[band.index()].muted.store(muted, Ordering::Relaxed);
    }

    pub fn set_soloed(&self, band: Band, soloed: bool) {
        self.bands[band.index()].soloed.store(soloed, Ordering::Relaxed);
    }

    pub fn set_threshold_db(&self, band: Band, threshold_db: f32) {
        self.bands[band.index()]
            .threshold_db
            .store(threshold_db, Ordering::Relaxed);
    }

    pub fn set_ratio(&self, band: Band, ratio: f32) {
        self.bands[band.index()].ratio.store(ratio, Ordering::Relaxed);
    }

    pub fn set_input_gain_db(&self, gain_db: f32) {
        self.input_gain_db.store(gain_db, Ordering::Relaxed);
    }

    pub fn set_output_gain_db(&self, gain_db: f32) {
        self.output_gain_db.store(gain_db, Ordering::Relaxed);
    }

    pub fn set_crossovers(&self, low_mid_hz: f32, mid_high_hz: f32) {
        self.low_mid_crossover_hz.store(low_mid_hz, Ordering::Relaxed);
        self.mid_high_crossover_hz
            .store(mid_high_hz, Ordering::Relaxed);
    }
}

impl ParameterSource for SharedParameters {
    fn band(&self, band: Band) -> BandParameters {
        self.bands[band.index()].load()
    }

    fn global(&self) -> GlobalParameters {
        GlobalParameters {
            input_gain_db: self.input_gain_db.load(Ordering::Relaxed),
            output_gain_db: self.output_gain_db.load(Ordering::Relaxed),
            low_mid_crossover_hz: self.low_mid_crossover_hz.load(Ordering::Relaxed),
            mid_high_crossover_hz: self.mid_high_crossover_hz.load(Ordering::Relaxed),
        }
    }
}
