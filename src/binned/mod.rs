//! Binned (discretized) probability distributions over `[0, upper_bound]`.
//!
//! A [`BinnedDistribution`] stores `N` raw, not necessarily normalized,
//! weights. Bin `i` covers the half-open interval
//! `[i / scale, (i+1) / scale)` where `scale = N / upper_bound`; the last bin
//! also owns `upper_bound` itself.
//!
//! The normalized cumulative array is built lazily on the first query that
//! needs it and is dropped by every mutation of the bins.
//!
//! # Examples
//!
//! ```
//! use u_distfit::binned::BinnedDistribution;
//!
//! let dist = BinnedDistribution::from_values(10.0, &[1.0, 3.0]);
//! assert_eq!(dist.len(), 2);
//! assert_eq!(dist.density(2.0), 1.0);
//! assert!((dist.cumulative_probability(5.0) - 0.25).abs() < 1e-12);
//! assert!((dist.mean() - 3.75).abs() < 1e-12);
//! ```

mod arith;
mod sampling;
mod stats;
mod text;

pub use sampling::{RandSource, UniformSource};
pub use text::{parse_number, Locale, DEFAULT_SEPARATOR, MAX_SAMPLE_VALUE};
pub(crate) use text::format_decimals;

use std::cell::OnceCell;

/// Seconds in one day. Time axes entered as `23:59:59` are snapped to it.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Lower end of the half-open range `[86399, 86400)` snapped to a full day.
const LAST_SECOND_OF_DAY: f64 = SECONDS_PER_DAY - 1.0;

/// Replaces an upper bound in `[86399, 86400)` by exactly [`SECONDS_PER_DAY`].
///
/// Callers describing "one full day" frequently pass `86399` (the last
/// second, `23:59:59`). No other value is adjusted.
///
/// # Examples
///
/// ```
/// use u_distfit::binned::snap_upper_bound;
///
/// assert_eq!(snap_upper_bound(86_399.0), 86_400.0);
/// assert_eq!(snap_upper_bound(86_399.5), 86_400.0);
/// assert_eq!(snap_upper_bound(86_400.0), 86_400.0);
/// assert_eq!(snap_upper_bound(12_345.0), 12_345.0);
/// ```
pub fn snap_upper_bound(upper_bound: f64) -> f64 {
    if (LAST_SECOND_OF_DAY..SECONDS_PER_DAY).contains(&upper_bound) {
        SECONDS_PER_DAY
    } else {
        upper_bound
    }
}

/// Discretized density over the closed support `[0, upper_bound]`.
///
/// Value-like: the combine operators return new instances, while the
/// `*_to_this` operators and the mutators work in place. The cumulative
/// cache uses interior mutability, so the type is `Send` but not `Sync`;
/// sharing one instance across threads needs external synchronization.
#[derive(Debug, Clone)]
pub struct BinnedDistribution {
    upper_bound: f64,
    scale_factor: f64,
    bins: Vec<f64>,
    cumulative: OnceCell<Vec<f64>>,
}

impl PartialEq for BinnedDistribution {
    fn eq(&self, other: &Self) -> bool {
        self.upper_bound == other.upper_bound && self.bins == other.bins
    }
}

impl BinnedDistribution {
    /// Creates a distribution with `n` zero bins.
    ///
    /// `upper_bound` is passed through [`snap_upper_bound`]. A non-positive
    /// or non-finite bound yields a scale factor of `0`, for which every
    /// position query returns `0`.
    pub fn new(upper_bound: f64, n: usize) -> Self {
        Self::from_vec(upper_bound, vec![0.0; n])
    }

    /// Creates a distribution by copying `values` element by element.
    ///
    /// Accepts any numeric type losslessly convertible to `f64`
    /// (`f64`, `f32`, `i32`, `u32`, `i16`, ...).
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let from_ints = BinnedDistribution::from_values(10.0, &[3_i32, 4, 2, 0, 1]);
    /// let from_floats = BinnedDistribution::from_values(10.0, &[3.0, 4.0, 2.0, 0.0, 1.0]);
    /// assert_eq!(from_ints, from_floats);
    /// ```
    pub fn from_values<T>(upper_bound: f64, values: &[T]) -> Self
    where
        T: Copy + Into<f64>,
    {
        Self::from_vec(upper_bound, values.iter().map(|&v| v.into()).collect())
    }

    /// Creates a distribution from `i64` weights (e.g. counters).
    pub fn from_counts(upper_bound: f64, counts: &[i64]) -> Self {
        Self::from_vec(upper_bound, counts.iter().map(|&c| c as f64).collect())
    }

    /// Adopts `bins` as the backing storage without copying.
    pub fn from_vec(upper_bound: f64, bins: Vec<f64>) -> Self {
        let upper_bound = snap_upper_bound(upper_bound);
        Self {
            upper_bound,
            scale_factor: scale_factor_for(bins.len(), upper_bound),
            bins,
            cumulative: OnceCell::new(),
        }
    }

    /// Upper end of the support (after snapping).
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Bins per unit of the support, `N / upper_bound`.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// `true` if the distribution has no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Raw bin weights.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Mutable access to the bin weights.
    ///
    /// This is the single mutation entry point: it drops the cumulative
    /// cache. The number of bins cannot change through the slice.
    pub fn bins_mut(&mut self) -> &mut [f64] {
        self.cumulative.take();
        &mut self.bins
    }

    /// Consumes the distribution and returns its bins.
    pub fn into_bins(self) -> Vec<f64> {
        self.bins
    }

    /// Normalized cumulative weights, built on first use.
    ///
    /// `cumulative()[i]` is the share of the total weight in bins `0..=i`.
    /// If the total weight is not positive every entry is `0`.
    pub fn cumulative(&self) -> &[f64] {
        self.cumulative.get_or_init(|| {
            let mut acc = 0.0;
            let mut cumulative: Vec<f64> = self
                .bins
                .iter()
                .map(|&b| {
                    acc += b;
                    acc
                })
                .collect();
            if acc > 0.0 {
                cumulative.iter_mut().for_each(|c| *c /= acc);
            } else {
                cumulative.iter_mut().for_each(|c| *c = 0.0);
            }
            cumulative
        })
    }

    /// Whether the cumulative array is currently cached.
    pub fn is_cumulative_cached(&self) -> bool {
        self.cumulative.get().is_some()
    }

    /// Replaces all bins; the scale factor follows the new length.
    pub(crate) fn replace_bins(&mut self, bins: Vec<f64>) {
        self.scale_factor = scale_factor_for(bins.len(), self.upper_bound);
        self.bins = bins;
        self.cumulative.take();
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Divides every bin by the total weight. No-op if the total is not
    /// positive.
    ///
    /// The normalized cumulative array does not change, so a cached copy
    /// survives.
    pub fn normalize_density(&mut self) {
        let sum = self.sum();
        if sum > 0.0 && sum.is_finite() {
            self.bins.iter_mut().for_each(|b| *b /= sum);
        }
    }

    /// Sets every bin to `0`.
    pub fn clear_density_data(&mut self) {
        self.set_to_value(0.0);
    }

    /// Sets every bin to `value`.
    pub fn set_to_value(&mut self, value: f64) {
        self.bins_mut().iter_mut().for_each(|b| *b = value);
    }

    /// Resamples to `count` bins with `new[i] = old[floor(i·N/count)]`.
    ///
    /// Upsampling by an integer factor duplicates blocks; downsampling picks
    /// the nearest lower index (no averaging). An empty distribution is
    /// stretched to `count` zeros.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let mut dist = BinnedDistribution::from_values(10.0, &[3.0, 4.0, 2.0, 0.0, 1.0]);
    /// dist.stretch_to_value_count(3);
    /// assert_eq!(dist.bins(), &[3.0, 4.0, 0.0]);
    /// ```
    pub fn stretch_to_value_count(&mut self, count: usize) {
        if count == self.bins.len() {
            return;
        }
        let stretched = stretch(&self.bins, count);
        self.replace_bins(stretched);
    }
}

/// Resampling formula shared by [`BinnedDistribution::stretch_to_value_count`]
/// and the combine operators.
pub(crate) fn stretch(bins: &[f64], count: usize) -> Vec<f64> {
    let n = bins.len();
    if n == 0 {
        return vec![0.0; count];
    }
    (0..count)
        .map(|i| {
            let x = i as f64 / count as f64 * n as f64;
            bins[(x.floor() as usize).min(n - 1)]
        })
        .collect()
}

fn scale_factor_for(n: usize, upper_bound: f64) -> f64 {
    if upper_bound > 0.0 && upper_bound.is_finite() {
        n as f64 / upper_bound
    } else {
        0.0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn stretch_by_integer_factor_duplicates(
            bins in proptest::collection::vec(0.0_f64..100.0, 1..=20),
            factor in 1_usize..=5,
        ) {
            let mut dist = BinnedDistribution::from_values(10.0, &bins);
            dist.stretch_to_value_count(bins.len() * factor);
            for (i, &b) in dist.bins().iter().enumerate() {
                prop_assert_eq!(b, bins[i / factor]);
            }
        }

        #[test]
        fn scale_factor_matches_length(
            n in 0_usize..200,
            upper in 0.5_f64..1e5,
        ) {
            let dist = BinnedDistribution::new(upper, n);
            let expected = n as f64 / snap_upper_bound(upper);
            prop_assert!((dist.scale_factor() - expected).abs() <= 1e-12 * expected.max(1.0));
        }

        #[test]
        fn cumulative_is_monotone(bins in proptest::collection::vec(0.0_f64..50.0, 1..=40)) {
            let dist = BinnedDistribution::from_values(1.0, &bins);
            let c = dist.cumulative();
            for w in c.windows(2) {
                prop_assert!(w[1] >= w[0] - 1e-12);
            }
            if dist.sum() > 0.0 {
                prop_assert!((c[c.len() - 1] - 1.0).abs() < 1e-9);
            }
        }
    }
}
