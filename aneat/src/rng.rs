use rand::Rng;

use std::f64::consts::PI;

/// Bernoulli and Gaussian draws shared by
/// every stochastic operator in the crate.
pub(crate) trait RngExt: Rng {
    /// Returns `true` with probability `chance`.
    /// Out-of-range chances saturate instead of panicking.
    fn roll(&mut self, chance: f64) -> bool {
        self.gen::<f64>() < chance
    }

    /// Samples from N(0, sigma²) with the Box-Muller transform.
    fn gaussian(&mut self, sigma: f64) -> f64 {
        // u1 in (0, 1] keeps ln(u1) finite.
        let u1 = 1.0 - self.gen::<f64>();
        let u2 = self.gen::<f64>();
        sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

impl<R: Rng + ?Sized> RngExt for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn roll_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1000).all(|_| !rng.roll(0.0)));
        assert!((0..1000).all(|_| rng.roll(1.0)));
    }

    #[test]
    fn gaussian_moments() {
        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<f64> = (0..20_000).map(|_| rng.gaussian(2.0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.1, "mean {}", mean);
        assert!((variance - 4.0).abs() < 0.3, "variance {}", variance);
    }
}
