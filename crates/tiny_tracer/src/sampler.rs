//! Random number sources for integrators.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiny_math::Vec2;

/// Stream of uniform samples in `[0, 1)`.
///
/// Owned by whoever drives rendering and lent to integrators as
/// `&mut dyn Sampler`; never shared between threads.
pub trait Sampler {
    fn next_1d(&mut self) -> f32;

    fn next_2d(&mut self) -> Vec2 {
        let x = self.next_1d();
        let y = self.next_1d();
        Vec2::new(x, y)
    }
}

/// Independent uniform samples from a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct IndependentSampler {
    rng: StdRng,
}

impl IndependentSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sampler for one bucket of a render, decorrelated from its neighbours.
    pub fn for_bucket(seed: u64, bucket_index: usize) -> Self {
        let mixed = seed ^ (bucket_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self::new(mixed)
    }
}

impl Sampler for IndependentSampler {
    fn next_1d(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_in_unit_range() {
        let mut sampler = IndependentSampler::new(7);
        for _ in 0..1000 {
            let x = sampler.next_1d();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = IndependentSampler::for_bucket(42, 3);
        let mut b = IndependentSampler::for_bucket(42, 3);
        for _ in 0..16 {
            assert_eq!(a.next_2d(), b.next_2d());
        }
    }

    #[test]
    fn test_buckets_get_distinct_streams() {
        let mut a = IndependentSampler::for_bucket(42, 0);
        let mut b = IndependentSampler::for_bucket(42, 1);
        let first: Vec<f32> = (0..8).map(|_| a.next_1d()).collect();
        let second: Vec<f32> = (0..8).map(|_| b.next_1d()).collect();
        assert_ne!(first, second);
    }
}
