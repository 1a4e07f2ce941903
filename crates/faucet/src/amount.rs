//! Random payout size

use crate::error::{FaucetError, FaucetResult};
use rand::Rng;

/// Draws payouts uniformly from `[min, max)` in atomic units
#[derive(Debug, Clone, Copy)]
pub struct AmountGenerator {
    min: u64,
    max: u64,
}

impl AmountGenerator {
    pub fn new(min: u64, max: u64) -> FaucetResult<Self> {
        if min > max {
            return Err(FaucetError::Config(format!(
                "payout range is empty: min {} > max {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn draw(&self) -> u64 {
        self.draw_with(&mut rand::thread_rng())
    }

    /// `floor(u * (max - min) + min)` for `u` uniform in `[0, 1)`.
    /// Returns `min` when the range is a single value.
    pub fn draw_with<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.max == self.min {
            return self.min;
        }
        let u: f64 = rng.gen();
        let raw = (u * (self.max - self.min) as f64 + self.min as f64).floor() as u64;
        // f64 rounding can land on max for very wide ranges
        raw.clamp(self.min, self.max - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_inverted_range() {
        assert!(AmountGenerator::new(10, 5).is_err());
    }

    #[test]
    fn test_single_value_range() {
        let generator = AmountGenerator::new(4200, 4200).unwrap();
        for _ in 0..100 {
            assert_eq!(generator.draw(), 4200);
        }
    }

    #[test]
    fn test_draws_stay_in_range() {
        let generator = AmountGenerator::new(1000, 25000).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100_000 {
            let amount = generator.draw_with(&mut rng);
            assert!((1000..25000).contains(&amount), "{} out of range", amount);
        }
    }

    #[test]
    fn test_distribution_is_roughly_uniform() {
        let generator = AmountGenerator::new(1000, 25000).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let samples = 240_000;
        // 24 buckets of 1000 atomic units each
        let mut buckets = [0u32; 24];
        for _ in 0..samples {
            let amount = generator.draw_with(&mut rng);
            buckets[((amount - 1000) / 1000) as usize] += 1;
        }

        let expected = samples as f64 / 24.0;
        for (i, count) in buckets.iter().enumerate() {
            let deviation = (*count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "bucket {} holds {} draws", i, count);
        }
        // No pile-up at the edges
        let first = buckets[0] as f64;
        let last = buckets[23] as f64;
        assert!((first - last).abs() / expected < 0.1);
    }

    #[test]
    fn test_extreme_uniform_values() {
        struct Fixed(u64);
        impl rand::RngCore for Fixed {
            fn next_u32(&mut self) -> u32 {
                self.0 as u32
            }
            fn next_u64(&mut self) -> u64 {
                self.0
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0xff);
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                self.fill_bytes(dest);
                Ok(())
            }
        }

        let generator = AmountGenerator::new(1000, 25000).unwrap();
        assert_eq!(generator.draw_with(&mut Fixed(0)), 1000);
        assert_eq!(generator.draw_with(&mut Fixed(u64::MAX)), 24999);
    }
}
