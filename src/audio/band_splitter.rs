use crate::audio::parameters::CrossoverFrequencies;
use std::f32::consts::{PI, SQRT_2};

/// Which response a [`LinkwitzRileyFilter`] produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    /// Same phase response as a lowpass/highpass pair summed together, flat magnitude
    Allpass,
}

/// 4th order Linkwitz-Riley filter built from two cascaded Butterworth state variable stages
/// (topology-preserving transform). The lowpass and highpass outputs for the same cutoff sum to
/// the allpass output.
pub struct LinkwitzRileyFilter {
    filter_type: FilterType,
    cutoff_hz: f32,
    sample_rate: f32,

    /// Prewarped integrator gain
    g: f32,
    /// Shared denominator `1 / (1 + sqrt(2) * g + g^2)`
    h: f32,

    /// Integrator states per channel, `[s1, s2, s3, s4]`
    state: Vec<[f32; 4]>,
}

impl LinkwitzRileyFilter {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            filter_type,
            cutoff_hz: 1000.0,
            sample_rate: 44100.0,
            g: 0.0,
            h: 1.0,
            state: Vec::new(),
        }
    }

    /// Allocates per-channel state. Not real-time safe.
    pub fn prepare(&mut self, sample_rate: f32, num_channels: usize, cutoff_hz: f32) {
        self.state = vec![[0.0; 4]; num_channels];
        self.sample_rate = sample_rate;
        self.cutoff_hz = cutoff_hz;
        self.update_coefficients();
    }

    pub fn reset(&mut self) {
        for state in self.state.iter_mut() {
            *state = [0.0; 4];
        }
    }

    /// Only recomputes the coefficients when the cutoff actually moved
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.update_coefficients();
        }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    fn update_coefficients(&mut self) {
        self.g = (PI * self.cutoff_hz / self.sample_rate).tan();
        self.h = 1.0 / (1.0 + SQRT_2 * self.g + self.g * self.g);
    }

    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let g = self.g;
        let h = self.h;
        let [s1, s2, s3, s4] = &mut self.state[channel];

        // First Butterworth stage
        let y_h = (input - (SQRT_2 + g) * *s1 - *s2) * h;
        let y_b = g * y_h + *s1;
        *s1 = g * y_h + y_b;
        let y_l = g * y_b + *s2;
        *s2 = g * y_b + y_l;

        let stage_input = match self.filter_type {
            FilterType::Allpass => return y_l - SQRT_2 * y_b + y_h,
            FilterType::Lowpass => y_l,
            FilterType::Highpass => y_h,
        };

        // Second stage squares the Butterworth response
        let y_h2 = (stage_input - (SQRT_2 + g) * *s3 - *s4) * h;
        let y_b2 = g * y_h2 + *s3;
        *s3 = g * y_h2 + y_b2;
        let y_l2 = g * y_b2 + *s4;
        *s4 = g * y_b2 + y_l2;

        match self.filter_type {
            FilterType::Lowpass => y_l2,
            _ => y_h2,
        }
    }
}

/// Output slices for one channel of a split block
pub struct SplitBands<'a> {
    pub low: &'a mut [f32],
    pub mid: &'a mut [f32],
    pub high: &'a mut [f32],
}

/// Three band crossover.
///
/// The low band goes through an allpass at the mid/high crossover so it picks up the same phase
/// shift as the mid and high bands, which makes the three bands sum back to an allpassed copy of
/// the input with a flat magnitude response:
///
/// ```text
/// input -+-> LP1 -> AP2 ----------> low
///        |
///        +-> HP1 -+-> LP2 --------> mid
///                 |
///                 +-> HP2 --------> high
/// ```
pub struct BandSplitter {
    lp1: LinkwitzRileyFilter,
    hp1: LinkwitzRileyFilter,
    ap2: LinkwitzRileyFilter,
    lp2: LinkwitzRileyFilter,
    hp2: LinkwitzRileyFilter,

    sample_rate: f32,
    crossovers: CrossoverFrequencies,
}

impl Default for BandSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl BandSplitter {
    pub fn new() -> Self {
        Self {
            lp1: LinkwitzRileyFilter::new(FilterType::Lowpass),
            hp1: LinkwitzRileyFilter::new(FilterType::Highpass),
            ap2: LinkwitzRileyFilter::new(FilterType::Allpass),
            lp2: LinkwitzRileyFilter::new(FilterType::Lowpass),
            hp2: LinkwitzRileyFilter::new(FilterType::Highpass),
            sample_rate: 44100.0,
            crossovers: CrossoverFrequencies::default(),
        }
    }

    /// Allocates filter state for `num_channels`. Not real-time safe.
    pub fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        self.sample_rate = sample_rate;
        let crossovers = self.crossovers.limited_to(sample_rate);
        let (low_mid, mid_high) = (crossovers.low_mid_hz(), crossovers.mid_high_hz());

        self.lp1.prepare(sample_rate, num_channels, low_mid);
        self.hp1.prepare(sample_rate, num_channels, low_mid);
        self.ap2.prepare(sample_rate, num_channels, mid_high);
        self.lp2.prepare(sample_rate, num_channels, mid_high);
        self.hp2.prepare(sample_rate, num_channels, mid_high);
        self.crossovers = crossovers;
    }

    pub fn reset(&mut self) {
        for filter in [
            &mut self.lp1,
            &mut self.hp1,
            &mut self.ap2,
            &mut self.lp2,
            &mut self.hp2,
        ] {
            filter.reset();
        }
    }

    /// The crossovers currently in effect, after clamping
    pub fn crossovers(&self) -> CrossoverFrequencies {
        self.crossovers
    }

    /// Move the crossover points. Only call this between blocks so the coefficients never change
    /// halfway through one.
    pub fn set_crossovers(&mut self, crossovers: CrossoverFrequencies) {
        let crossovers = crossovers.limited_to(self.sample_rate);
        if crossovers == self.crossovers {
            return;
        }

        self.lp1.set_cutoff(crossovers.low_mid_hz());
        self.hp1.set_cutoff(crossovers.low_mid_hz());
        self.ap2.set_cutoff(crossovers.mid_high_hz());
        self.lp2.set_cutoff(crossovers.mid_high_hz());
        self.hp2.set_cutoff(crossovers.mid_high_hz());
        self.crossovers = crossovers;
    }

    /// Split one channel of a block into its three bands. The band slices must be at least as long
    /// as `input`.
    pub fn split(
        &mut self,
        channel: usize,
        input: &[f32],
        crossovers: CrossoverFrequencies,
        bands: SplitBands<'_>,
    ) {
        self.set_crossovers(crossovers);

        let SplitBands { low, mid, high } = bands;
        for (i, &sample) in input.iter().enumerate() {
            let low_sample = self.lp1.process_sample(channel, sample);
            low[i] = self.ap2.process_sample(channel, low_sample);

            let upper = self.hp1.process_sample(channel, sample);
            mid[i] = self.lp2.process_sample(channel, upper);
            high[i] = self.hp2.process_sample(channel, upper);
        }
    }
}
