//! Injected randomness for metric generation.
//!
//! Metric churn is an intentional stochastic input, so it enters through a
//! trait rather than direct `rand` calls: production uses [`RngSampler`],
//! tests supply deterministic samplers and assert exact outcomes.

use rand::Rng;

/// A source of bounded random values for metric generation and seeding.
pub trait MetricSampler: Send + Sync {
    /// Sample a percentage in the inclusive range `[lo, hi]`.
    fn sample(&self, lo: u8, hi: u8) -> u8;

    /// Sample a boolean that is `true` with the given probability.
    fn chance(&self, probability: f64) -> bool;
}

/// Thread-local RNG sampler used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RngSampler;

impl MetricSampler for RngSampler {
    fn sample(&self, lo: u8, hi: u8) -> u8 {
        if lo >= hi {
            return lo;
        }
        rand::thread_rng().gen_range(lo..=hi)
    }

    fn chance(&self, probability: f64) -> bool {
        rand::thread_rng().gen_bool(probability.clamp(0.0, 1.0))
    }
}

/// Deterministic sampler for tests: always returns `percent` clamped into
/// the requested range, and a fixed answer for `chance`.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler {
    /// The preferred value; clamped to `[lo, hi]` on every call.
    pub percent: u8,
    /// The fixed answer for every `chance` call.
    pub chance: bool,
}

impl FixedSampler {
    /// A sampler that always lands on the low edge of each range.
    pub fn low() -> Self {
        Self {
            percent: 0,
            chance: false,
        }
    }

    /// A sampler that always lands on the high edge of each range.
    pub fn high() -> Self {
        Self {
            percent: 100,
            chance: true,
        }
    }
}

impl MetricSampler for FixedSampler {
    fn sample(&self, lo: u8, hi: u8) -> u8 {
        self.percent.clamp(lo, hi)
    }

    fn chance(&self, _probability: f64) -> bool {
        self.chance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_sampler_stays_in_range() {
        let sampler = RngSampler;
        for _ in 0..1000 {
            let v = sampler.sample(10, 40);
            assert!((10..=40).contains(&v));
        }
    }

    #[test]
    fn rng_sampler_degenerate_range() {
        let sampler = RngSampler;
        assert_eq!(sampler.sample(25, 25), 25);
    }

    #[test]
    fn fixed_sampler_clamps_into_range() {
        let low = FixedSampler::low();
        assert_eq!(low.sample(10, 40), 10);

        let high = FixedSampler::high();
        assert_eq!(high.sample(10, 40), 40);

        let mid = FixedSampler {
            percent: 30,
            chance: false,
        };
        assert_eq!(mid.sample(10, 40), 30);
    }

    #[test]
    fn fixed_sampler_chance_is_fixed() {
        assert!(!FixedSampler::low().chance(0.99));
        assert!(FixedSampler::high().chance(0.01));
    }
}
