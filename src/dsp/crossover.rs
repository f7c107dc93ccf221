// src/dsp/crossover.rs

use biquad::*;
use tracing::warn;

pub const DEFAULT_LOW_CROSSOVER: f32 = 600.0;
pub const DEFAULT_HIGH_CROSSOVER: f32 = 4000.0;

const CROSSOVER_Q: f32 = 0.707;
pub const MIN_CUTOFF: f32 = 10.0;

/// One sample split into three bands. `bass + mid + high` equals the input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bands {
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
}

impl Bands {
    pub fn sum(&self) -> f32 {
        self.bass + self.mid + self.high
    }
}

/// Two cascaded low-pass stages. The bass stage sees the raw signal, the
/// mid stage sees whatever the bass stage left behind, and the remainder
/// of that is the high band.
pub struct Crossover {
    sample_rate: f32,
    low_hz: f32,
    high_hz: f32,
    low_lp: DirectForm2Transposed<f32>,
    high_lp: DirectForm2Transposed<f32>,
}

impl Crossover {
    pub fn new(sample_rate: f32, low_hz: f32, high_hz: f32) -> Self {
        let passthrough = Coefficients {
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        };
        let mut crossover = Self {
            sample_rate,
            low_hz,
            high_hz,
            low_lp: DirectForm2Transposed::<f32>::new(passthrough),
            high_lp: DirectForm2Transposed::<f32>::new(passthrough),
        };
        crossover.update_coefficients();
        crossover.reset();
        crossover
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn crossovers(&self) -> (f32, f32) {
        (self.low_hz, self.high_hz)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.update_coefficients();
        }
    }

    pub fn set_crossovers(&mut self, low_hz: f32, high_hz: f32) {
        if low_hz != self.low_hz || high_hz != self.high_hz {
            self.low_hz = low_hz;
            self.high_hz = high_hz;
            self.update_coefficients();
        }
    }

    /// Zero both delay lines. Call before feeding anything that does not
    /// directly follow the previous sample.
    pub fn reset(&mut self) {
        self.low_lp.reset_state();
        self.high_lp.reset_state();
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> Bands {
        let bass = self.low_lp.run(sample);
        let rest = sample - bass;
        let mid = self.high_lp.run(rest);
        Bands {
            bass,
            mid,
            high: rest - mid,
        }
    }

    fn update_coefficients(&mut self) {
        // Cutoff must stay below Nyquist or biquad refuses the parameters
        let ceiling = (self.sample_rate * 0.5 - 1.0).max(MIN_CUTOFF);

        for (cutoff, filter) in [
            (self.low_hz, &mut self.low_lp),
            (self.high_hz, &mut self.high_lp),
        ] {
            let safe = cutoff.clamp(MIN_CUTOFF, ceiling);
            match Coefficients::<f32>::from_params(
                Type::LowPass,
                self.sample_rate.hz(),
                safe.hz(),
                CROSSOVER_Q,
            ) {
                Ok(coeffs) => filter.update_coefficients(coeffs),
                Err(e) => warn!(
                    "crossover: rejected {safe:.1} Hz at {:.1} Hz sample rate: {e:?}",
                    self.sample_rate
                ),
            }
        }
    }
}
