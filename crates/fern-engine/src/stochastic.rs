//! Instance-scoped random draws for stepping strategies.
//!
//! Each [`Simulator`](crate::Simulator) owns one [`StochasticSource`]
//! seeded at construction. Nothing is shared between simulators, so
//! ensembles run on separate threads stay reproducible per seed.
//!
//! Draws:
//! - **Uniform** on `[0, 1)` and `(0, 1]`
//! - **Exponential** by inversion
//! - **Normal** by the Box-Muller transform
//! - **Poisson** by multiplication of uniforms for small means, and by
//!   Hörmann's transformed rejection (PTRS) for means of 10 and above

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Seedable source of the random variates used by the simulator.
#[derive(Clone, Debug)]
pub struct StochasticSource {
    rng: ChaCha8Rng,
    seed: u64,
}

/// Mean at and above which Poisson draws switch to PTRS.
const PTRS_THRESHOLD: f64 = 10.0;

impl StochasticSource {
    /// Create a source from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Restart the stream from a new seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// The seed this stream was last (re)started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw on `[0, 1)`.
    #[inline]
    pub fn unif(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform draw on `(0, 1]`; safe to pass to `ln`.
    #[inline]
    pub fn unif_open(&mut self) -> f64 {
        1.0 - self.rng.random::<f64>()
    }

    /// Exponential waiting time with the given rate.
    ///
    /// Returns `+inf` for a rate of zero.
    pub fn exponential(&mut self, rate: f64) -> f64 {
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        -self.unif_open().ln() / rate
    }

    /// Standard normal draw (Box-Muller).
    pub fn standard_normal(&mut self) -> f64 {
        let u1 = self.unif_open();
        let u2 = self.unif();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Normal draw with the given mean and standard deviation.
    pub fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        mean + sd * self.standard_normal()
    }

    /// Poisson draw with the given mean. Non-positive means give 0.
    pub fn poisson(&mut self, mean: f64) -> u64 {
        if mean.is_nan() || mean <= 0.0 {
            return 0;
        }
        if mean < PTRS_THRESHOLD {
            self.poisson_multiplication(mean)
        } else {
            self.poisson_ptrs(mean)
        }
    }

    fn poisson_multiplication(&mut self, mean: f64) -> u64 {
        let limit = (-mean).exp();
        let mut k = 0u64;
        let mut p = self.unif_open();
        while p > limit {
            k += 1;
            p *= self.unif_open();
        }
        k
    }

    // W. Hörmann, "The transformed rejection method for generating
    // Poisson random variables", 1993.
    fn poisson_ptrs(&mut self, mean: f64) -> u64 {
        let smu = mean.sqrt();
        let b = 0.931 + 2.53 * smu;
        let a = -0.059 + 0.02483 * b;
        let inv_alpha = 1.1239 + 1.1328 / (b - 3.4);
        let vr = 0.9277 - 3.6224 / (b - 2.0);
        let log_mean = mean.ln();
        loop {
            let u = self.unif() - 0.5;
            let v = self.unif_open();
            let us = 0.5 - u.abs();
            let k = ((2.0 * a / us + b) * u + mean + 0.43).floor();
            if us >= 0.07 && v <= vr {
                return k as u64;
            }
            if k < 0.0 || (us < 0.013 && v > us) {
                continue;
            }
            let lhs = v.ln() + inv_alpha.ln() - (a / (us * us) + b).ln();
            let rhs = -mean + k * log_mean - ln_factorial(k);
            if lhs <= rhs {
                return k as u64;
            }
        }
    }
}

/// `ln(k!)` for integral `k >= 0`: exact sum below 10, Stirling series above.
fn ln_factorial(k: f64) -> f64 {
    if k < 10.0 {
        let mut acc = 0.0;
        let mut i = 2.0;
        while i <= k {
            acc += f64::ln(i);
            i += 1.0;
        }
        return acc;
    }
    let k2 = k * k;
    (k + 0.5) * k.ln() - k + 0.5 * (2.0 * std::f64::consts::PI).ln() + 1.0 / (12.0 * k)
        - 1.0 / (360.0 * k2 * k)
        + 1.0 / (1260.0 * k2 * k2 * k)
}
