//! Inverse-transform sampling.
//!
//! # Examples
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use u_distfit::binned::{BinnedDistribution, RandSource};
//!
//! let dist = BinnedDistribution::from_values(10.0, &[1.0, 3.0]);
//! let mut source = RandSource(StdRng::seed_from_u64(7));
//! let x = dist.random(&mut source);
//! assert!((0.0..=10.0).contains(&x));
//! ```

use rand::Rng;

use super::BinnedDistribution;

/// Supplier of uniform variates in `[0, 1]`.
///
/// Implemented by [`RandSource`] for any [`rand::Rng`]; tests supply fixed
/// sequences.
pub trait UniformSource {
    /// Next uniform variate in `[0, 1]`.
    fn next_f64(&mut self) -> f64;
}

/// Adapter from a [`rand::Rng`] to [`UniformSource`].
#[derive(Debug, Clone)]
pub struct RandSource<R>(pub R);

impl<R: Rng> UniformSource for RandSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

impl<F: FnMut() -> f64> UniformSource for F {
    fn next_f64(&mut self) -> f64 {
        self()
    }
}

impl BinnedDistribution {
    /// Draws one value by feeding a uniform variate through the inverse CDF.
    ///
    /// The result lies in `[0, upper_bound]`. A distribution without
    /// positive weight always returns `0`.
    pub fn random<S: UniformSource + ?Sized>(&self, source: &mut S) -> f64 {
        self.inverse_cumulative_probability_lenient(source.next_f64())
    }

    /// Draws `count` values.
    pub fn random_many<S: UniformSource + ?Sized>(&self, source: &mut S, count: usize) -> Vec<f64> {
        (0..count).map(|_| self.random(source)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed(values: &[f64]) -> impl FnMut() -> f64 + '_ {
        let mut it = values.iter().copied().cycle();
        move || it.next().unwrap_or(0.0)
    }

    #[test]
    fn fixed_sequence_hits_interpolated_points() {
        let dist = BinnedDistribution::from_values(10.0, &[1.0, 3.0]);
        let mut source = fixed(&[0.0, 0.125, 0.25, 0.625, 1.0]);
        let drawn = dist.random_many(&mut source, 5);
        assert_eq!(drawn, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn zero_weight_draws_left_edge() {
        let dist = BinnedDistribution::new(10.0, 4);
        let mut source = fixed(&[0.3, 0.9]);
        assert_eq!(dist.random(&mut source), 0.0);
        assert_eq!(dist.random(&mut source), 0.0);
    }

    #[test]
    fn seeded_rng_stays_in_support_and_skips_empty_bins() {
        let dist = BinnedDistribution::from_values(10.0, &[1.0, 0.0, 0.0, 0.0, 1.0]);
        let mut source = RandSource(StdRng::seed_from_u64(42));
        for x in dist.random_many(&mut source, 2000) {
            assert!((0.0..=10.0).contains(&x), "x = {x}");
            assert!(!(2.0..8.0).contains(&x), "x = {x} landed in an empty bin");
        }
    }

    #[test]
    fn seeded_rng_mean_is_close() {
        let dist = BinnedDistribution::from_values(10.0, &[1.0, 3.0]);
        let mut source = RandSource(StdRng::seed_from_u64(1));
        let draws = dist.random_many(&mut source, 20_000);
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        // E = 0.25·2.5 + 0.75·7.5
        assert!((mean - 6.25).abs() < 0.1, "mean = {mean}");
    }
}
