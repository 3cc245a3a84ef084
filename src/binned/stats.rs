//! Density, CDF and inverse-CDF queries plus descriptive statistics.

use super::BinnedDistribution;
use crate::error::{DistributionError, Result};

/// Per-bin magnitude below which [`BinnedDistribution::sum_is_zero`] treats a
/// weight as zero.
const ZERO_WEIGHT: f64 = 1e-8;

impl BinnedDistribution {
    /// Raw weight of the bin containing `x`.
    ///
    /// Inside the closed support `[0, upper_bound]` the bin index is
    /// `floor(x·scale)` clamped to the last bin, so `x == upper_bound` maps to
    /// the last bin. Outside the support the density is `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let dist = BinnedDistribution::from_values(10.0, &[1.0]);
    /// assert_eq!(dist.density(-0.1), 0.0);
    /// assert_eq!(dist.density(10.0), 1.0);
    /// assert_eq!(dist.density(20.0), 0.0);
    /// ```
    pub fn density(&self, x: f64) -> f64 {
        match self.bin_index(x) {
            Some(i) => self.bins[i],
            None => 0.0,
        }
    }

    /// Index of the bin containing `x`, `None` outside the support.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        let n = self.bins.len();
        if n == 0 || self.scale_factor == 0.0 {
            return None;
        }
        if !(x >= 0.0 && x <= self.upper_bound) {
            return None;
        }
        Some(((x * self.scale_factor).floor() as usize).min(n - 1))
    }

    /// Left edge of bin `i` on the support axis, `i / scale`.
    pub fn bin_position(&self, i: usize) -> f64 {
        if self.scale_factor == 0.0 {
            0.0
        } else {
            i as f64 / self.scale_factor
        }
    }

    /// Continuous CDF: linear interpolation of the normalized cumulative
    /// weights across each bin.
    ///
    /// Returns `0` below the support (and for NaN) and `1` from
    /// `upper_bound` on.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let dist = BinnedDistribution::from_values(10.0, &[1.0]);
    /// assert_eq!(dist.cumulative_probability(0.0), 0.0);
    /// assert_eq!(dist.cumulative_probability(5.0), 0.5);
    /// assert_eq!(dist.cumulative_probability(10.0), 1.0);
    /// ```
    pub fn cumulative_probability(&self, x: f64) -> f64 {
        let n = self.bins.len();
        if n == 0 || self.scale_factor == 0.0 {
            return 0.0;
        }
        let t = x * self.scale_factor;
        if !(t >= 0.0) {
            return 0.0;
        }
        if t >= n as f64 {
            return 1.0;
        }

        let cumulative = self.cumulative();
        let i = t.floor() as usize;
        let a = if i == 0 { 0.0 } else { cumulative[i - 1] };
        let b = cumulative[i];
        let frac = t - i as f64;
        a * (1.0 - frac) + b * frac
    }

    /// Strict inverse CDF.
    ///
    /// # Errors
    ///
    /// [`DistributionError::InvalidProbability`] if `p` is NaN or outside
    /// `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let dist = BinnedDistribution::from_values(10.0, &[1.0, 3.0]);
    /// assert_eq!(dist.inverse_cumulative_probability(0.125).unwrap(), 2.5);
    /// assert!(dist.inverse_cumulative_probability(1.5).is_err());
    /// ```
    pub fn inverse_cumulative_probability(&self, p: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&p) {
            return Err(DistributionError::InvalidProbability(p));
        }
        Ok(self.inverse_cumulative_probability_lenient(p))
    }

    /// Inverse CDF that never fails: `p ≤ 0` (and NaN) gives `0`, `p ≥ 1`
    /// gives `upper_bound`.
    ///
    /// Binary search for the first bin whose cumulative share exceeds `p`,
    /// then linear interpolation inside that bin. A distribution without
    /// positive weight returns `0`.
    pub fn inverse_cumulative_probability_lenient(&self, p: f64) -> f64 {
        let n = self.bins.len();
        if n == 0 || self.scale_factor == 0.0 || !(p > 0.0) {
            return 0.0;
        }
        if p >= 1.0 {
            return self.upper_bound;
        }

        let cumulative = self.cumulative();
        if cumulative[n - 1] <= 0.0 {
            return 0.0;
        }

        let nr = cumulative.partition_point(|&c| c <= p).min(n - 1);
        let lower = if nr == 0 { 0.0 } else { cumulative[nr - 1] };
        let diff = cumulative[nr] - lower;
        let within = if diff == 0.0 { 0.0 } else { (p - lower) / diff };
        (nr as f64 + within) / self.scale_factor
    }

    // -----------------------------------------------------------------------
    // Descriptive statistics
    // -----------------------------------------------------------------------

    /// Total raw weight.
    pub fn sum(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// `true` if every bin is zero (within `1e-8`).
    pub fn sum_is_zero(&self) -> bool {
        self.bins.iter().all(|b| b.abs() <= ZERO_WEIGHT)
    }

    /// Smallest bin weight (`0` for an empty distribution).
    pub fn min_weight(&self) -> f64 {
        self.bins.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    /// Largest bin weight (`0` for an empty distribution).
    pub fn max_weight(&self) -> f64 {
        self.bins.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Weighted mean `Σ bᵢ·xᵢ / Σ bᵢ` with `xᵢ = i / scale`.
    ///
    /// `0` for an empty or zero-sum distribution.
    pub fn mean(&self) -> f64 {
        self.raw_moment(1)
    }

    /// Alias of [`mean`](Self::mean).
    pub fn numerical_mean(&self) -> f64 {
        self.mean()
    }

    /// Population variance about [`mean`](Self::mean), same weighting.
    pub fn variance(&self) -> f64 {
        let m = self.mean();
        (self.raw_moment(2) - m * m).max(0.0)
    }

    /// Alias of [`variance`](Self::variance).
    pub fn numerical_variance(&self) -> f64 {
        self.variance()
    }

    /// Population standard deviation.
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Skewness `(E[X³] − 3μσ² − μ³) / σ³`; `0` if σ is `0`.
    pub fn skewness(&self) -> f64 {
        let mu = self.mean();
        let sigma = self.standard_deviation();
        if sigma == 0.0 {
            return 0.0;
        }
        (self.raw_moment(3) - 3.0 * mu * sigma * sigma - mu * mu * mu) / sigma.powi(3)
    }

    fn raw_moment(&self, power: i32) -> f64 {
        if self.bins.is_empty() || self.scale_factor == 0.0 {
            return 0.0;
        }
        let width = 1.0 / self.scale_factor;
        let mut weight = 0.0;
        let mut acc = 0.0;
        for (i, &b) in self.bins.iter().enumerate() {
            weight += b;
            acc += b * (width * i as f64).powi(power);
        }
        if weight == 0.0 {
            0.0
        } else {
            acc / weight
        }
    }

    /// Index of the first bin whose cumulative weight reaches `p·sum`.
    ///
    /// `p` is clamped to `[0, 1]`. `None` for an empty distribution or when
    /// no bin reaches the share (possible with negative weights).
    pub fn quantile_index(&self, p: f64) -> Option<usize> {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        let target = self.sum() * p;
        let mut partial = 0.0;
        self.bins.iter().position(|&b| {
            partial += b;
            partial >= target
        })
    }

    /// Quantile as a support position, `quantile_index(p) / scale`.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let dist = BinnedDistribution::from_values(10.0, &[3.0, 4.0, 2.0, 0.0, 1.0]);
    /// assert_eq!(dist.quantile(0.2), 0.0);
    /// assert_eq!(dist.quantile(0.8), 4.0);
    /// assert_eq!(dist.median(), 2.0);
    /// ```
    pub fn quantile(&self, p: f64) -> f64 {
        match self.quantile_index(p) {
            Some(i) => self.bin_position(i),
            None => 0.0,
        }
    }

    /// Median, `quantile(0.5)`.
    pub fn median(&self) -> f64 {
        self.quantile(0.5)
    }

    /// Indices of all bins holding the maximum weight, ascending.
    ///
    /// Empty for an empty or all-zero distribution.
    pub fn mode_indices(&self) -> Vec<usize> {
        if self.sum_is_zero() {
            return Vec::new();
        }
        let max = self.max_weight();
        self.bins
            .iter()
            .enumerate()
            .filter(|(_, &b)| b == max)
            .map(|(i, _)| i)
            .collect()
    }

    /// First and last bin with positive weight.
    pub fn occupied_range(&self) -> Option<(usize, usize)> {
        let first = self.bins.iter().position(|&b| b > 0.0)?;
        let last = self.bins.iter().rposition(|&b| b > 0.0)?;
        Some((first, last))
    }

    /// Upper end of the support as implied by the bins, `N / scale`.
    pub fn support_upper_bound(&self) -> f64 {
        self.bin_position(self.bins.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: [f64; 5] = [3.0, 4.0, 2.0, 0.0, 1.0];

    fn dist(values: &[f64]) -> BinnedDistribution {
        BinnedDistribution::from_values(10.0, values)
    }

    #[test]
    fn density_boundaries() {
        for values in [&[1.0][..], &[1.0, 1.0], &[1.0, 1.0, 1.0]] {
            let d = dist(values);
            assert_eq!(d.density(-0.1), 0.0);
            assert_eq!(d.density(1.0), 1.0);
            assert_eq!(d.density(10.0), 1.0);
            assert_eq!(d.density(20.0), 0.0);
            assert_eq!(d.support_upper_bound(), 10.0);
        }
    }

    #[test]
    fn density_of_empty() {
        let d = dist(&[]);
        assert_eq!(d.density(5.0), 0.0);
        assert_eq!(d.cumulative_probability(5.0), 0.0);
        assert_eq!(d.inverse_cumulative_probability_lenient(0.5), 0.0);
    }

    #[test]
    fn density_picks_bins() {
        let d = dist(&EXAMPLE);
        assert_eq!(d.density(0.0), 3.0);
        assert_eq!(d.density(1.99), 3.0);
        assert_eq!(d.density(2.0), 4.0);
        assert_eq!(d.density(9.5), 1.0);
        assert_eq!(d.density(f64::NAN), 0.0);
    }

    #[test]
    fn cdf_boundaries() {
        let d = dist(&[1.0]);
        assert_eq!(d.cumulative_probability(-0.1), 0.0);
        assert_eq!(d.cumulative_probability(0.0), 0.0);
        assert_eq!(d.cumulative_probability(5.0), 0.5);
        assert_eq!(d.cumulative_probability(10.0), 1.0);
        assert_eq!(d.cumulative_probability(15.0), 1.0);
        assert_eq!(d.cumulative_probability(f64::NAN), 0.0);
    }

    #[test]
    fn cdf_interpolates() {
        let d = dist(&[1.0, 3.0]);
        assert!((d.cumulative_probability(2.5) - 0.125).abs() < 1e-12);
        assert!((d.cumulative_probability(5.0) - 0.25).abs() < 1e-12);
        assert!((d.cumulative_probability(7.5) - 0.625).abs() < 1e-12);
    }

    #[test]
    fn cdf_of_zero_sum() {
        let d = BinnedDistribution::new(10.0, 4);
        assert_eq!(d.cumulative_probability(5.0), 0.0);
        assert_eq!(d.cumulative_probability(10.0), 1.0);
    }

    #[test]
    fn inverse_endpoints() {
        for values in [&[1.0][..], &[1.0, 2.0, 1.0], &[1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0]] {
            let d = dist(values);
            assert_eq!(d.inverse_cumulative_probability_lenient(-1.0), 0.0);
            assert_eq!(d.inverse_cumulative_probability(0.0).unwrap(), 0.0);
            assert_eq!(d.inverse_cumulative_probability(1.0).unwrap(), 10.0);
            assert_eq!(d.inverse_cumulative_probability_lenient(2.0), 10.0);
            assert_eq!(d.inverse_cumulative_probability_lenient(0.0), 0.0);
            assert_eq!(d.inverse_cumulative_probability_lenient(1.0), 10.0);
        }
    }

    #[test]
    fn inverse_strict_rejects_out_of_range() {
        let d = dist(&[1.0]);
        assert_eq!(
            d.inverse_cumulative_probability(-1.0),
            Err(DistributionError::InvalidProbability(-1.0))
        );
        assert!(d.inverse_cumulative_probability(2.0).is_err());
        assert!(d.inverse_cumulative_probability(f64::NAN).is_err());
    }

    #[test]
    fn inverse_interpolates_within_bin() {
        let d = dist(&[1.0, 3.0]);
        assert_eq!(d.inverse_cumulative_probability_lenient(0.125), 2.5);
        assert_eq!(d.inverse_cumulative_probability_lenient(0.25), 5.0);
        assert_eq!(d.inverse_cumulative_probability_lenient(0.625), 7.5);
    }

    #[test]
    fn inverse_of_zero_sum_is_left_edge() {
        let d = BinnedDistribution::new(10.0, 4);
        assert_eq!(d.inverse_cumulative_probability_lenient(0.5), 0.0);
        assert_eq!(d.inverse_cumulative_probability_lenient(0.999), 0.0);
    }

    #[test]
    fn min_max_sum() {
        let d = dist(&EXAMPLE);
        assert_eq!(d.min_weight(), 0.0);
        assert_eq!(d.max_weight(), 4.0);
        assert_eq!(d.sum(), 10.0);
        assert_eq!(dist(&[]).min_weight(), 0.0);
        assert_eq!(dist(&[]).max_weight(), 0.0);
    }

    #[test]
    fn mean_and_variance() {
        let d = dist(&EXAMPLE);
        let (mut m, mut m2) = (0.0, 0.0);
        for (i, &v) in EXAMPLE.iter().enumerate() {
            let x = i as f64 * 2.0;
            m += v * x;
            m2 += v * x * x;
        }
        m /= 10.0;
        m2 /= 10.0;

        assert!((d.mean() - m).abs() < 1e-12);
        assert_eq!(d.numerical_mean(), d.mean());
        assert!((d.numerical_variance() - (m2 - m * m)).abs() < 1e-10);
        assert!((d.standard_deviation() - (m2 - m * m).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn degenerate_statistics_are_zero() {
        for d in [dist(&[]), BinnedDistribution::new(10.0, 6)] {
            assert_eq!(d.mean(), 0.0);
            assert_eq!(d.variance(), 0.0);
            assert_eq!(d.standard_deviation(), 0.0);
            assert_eq!(d.skewness(), 0.0);
            assert_eq!(d.median(), 0.0);
        }
    }

    #[test]
    fn skewness_sign() {
        let right = dist(&[5.0, 3.0, 1.0, 0.5, 0.25]);
        let left = dist(&[0.25, 0.5, 1.0, 3.0, 5.0]);
        assert!(right.skewness() > 0.0);
        assert!(left.skewness() < 0.0);
        assert!(dist(&[1.0, 2.0, 1.0]).skewness().abs() < 1e-12);
    }

    #[test]
    fn quantiles_first_reaching_share() {
        let d = dist(&EXAMPLE);
        assert_eq!(d.median(), 2.0);
        assert_eq!(d.quantile(0.2), 0.0);
        assert_eq!(d.quantile(0.4), 2.0);
        assert_eq!(d.quantile(0.6), 2.0);
        assert_eq!(d.quantile(0.8), 4.0);
        assert_eq!(d.quantile_index(0.8), Some(2));
        assert_eq!(d.quantile_index(0.0), Some(0));
        assert_eq!(d.quantile_index(1.0), Some(4));
        assert_eq!(dist(&[]).quantile_index(0.5), None);
    }

    #[test]
    fn modes_and_range() {
        let d = dist(&[0.0, 2.0, 5.0, 1.0, 5.0, 0.0]);
        assert_eq!(d.mode_indices(), vec![2, 4]);
        assert_eq!(d.occupied_range(), Some((1, 4)));
        assert!(BinnedDistribution::new(1.0, 3).mode_indices().is_empty());
        assert_eq!(BinnedDistribution::new(1.0, 3).occupied_range(), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn cdf_monotone_and_bounded(
            bins in proptest::collection::vec(0.0_f64..100.0, 1..=30),
            a in 0.0_f64..12.0,
            b in 0.0_f64..12.0,
        ) {
            let d = BinnedDistribution::from_values(10.0, &bins);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let f_lo = d.cumulative_probability(lo);
            let f_hi = d.cumulative_probability(hi);
            prop_assert!((0.0..=1.0).contains(&f_lo));
            prop_assert!(f_hi >= f_lo - 1e-12);
        }

        #[test]
        fn inverse_inverts_cdf(
            bins in proptest::collection::vec(0.1_f64..100.0, 1..=30),
            p in 0.001_f64..0.999,
        ) {
            let d = BinnedDistribution::from_values(10.0, &bins);
            let x = d.inverse_cumulative_probability_lenient(p);
            prop_assert!((0.0..=10.0).contains(&x));
            prop_assert!((d.cumulative_probability(x) - p).abs() < 1e-9,
                "F({x}) = {} != {p}", d.cumulative_probability(x));
        }

        #[test]
        fn variance_non_negative(bins in proptest::collection::vec(0.0_f64..100.0, 0..=30)) {
            let d = BinnedDistribution::from_values(7.0, &bins);
            prop_assert!(d.variance() >= 0.0);
            prop_assert!(d.mean() >= 0.0 && d.mean() <= 7.0);
        }
    }
}
