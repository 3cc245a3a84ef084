//! Goodness-of-fit metrics between an empirical histogram and a fitted
//! family.
//!
//! The ranking metric is [`squared_error`]; the p-values are informational.
//! All metrics evaluate bin `i` at its left edge `i / scale`, the same
//! position the empirical mean and quantiles use.

use u_numflow::special::{chi_squared_cdf, standard_normal_cdf};

use crate::binned::BinnedDistribution;
use crate::catalog::FittedDistribution;

/// Normalized densities above this are treated as poles and skipped.
const POLE: f64 = 1e101;

/// CDF level after which the tail is not compared any more.
const TAIL_CDF: f64 = 0.9999;

/// Corrected Anderson-Darling statistic beyond which the p-value is `0`
/// (the approximation turns upward for very large values).
const AD_STATISTIC_LIMIT: f64 = 10.0;

/// Sum of squared differences between the empirical and the family density.
///
/// Both series are taken on `x_i = i / scale` for `i in 0..points` (the
/// empirical density is `0` past the last bin) and normalized to sum `1`
/// (a zero sum is left as is). A non-finite family density at `x = 0` is
/// read as `0`. Returns NaN if the family density cannot be normalized.
///
/// # Examples
///
/// ```
/// use u_distfit::binned::BinnedDistribution;
/// use u_distfit::catalog::{Family, FittedDistribution};
/// use u_distfit::fitter::goodness::squared_error;
///
/// let hist = BinnedDistribution::from_values(4.0, &[1.0, 1.0, 1.0, 1.0]);
/// let uniform = FittedDistribution::new(Family::Uniform, vec![0.0, 3.0]).unwrap();
/// assert!(squared_error(&hist, &uniform, 4) < 1e-12);
/// ```
pub fn squared_error(empirical: &BinnedDistribution, dist: &FittedDistribution, points: usize) -> f64 {
    let bins = empirical.bins();
    let mut observed = Vec::with_capacity(points);
    let mut expected = Vec::with_capacity(points);
    for i in 0..points {
        observed.push(bins.get(i).copied().unwrap_or(0.0));
        let d = dist.density(empirical.bin_position(i));
        expected.push(if i == 0 && !d.is_finite() { 0.0 } else { d });
    }

    let norm = |sum: f64| if sum == 0.0 { 1.0 } else { sum };
    let sum_observed = norm(observed.iter().sum());
    let sum_expected = norm(expected.iter().sum());

    observed
        .iter()
        .zip(&expected)
        .map(|(&a, &b)| (a / sum_observed, b / sum_expected))
        .filter(|&(a, b)| !(a > POLE || b > POLE))
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

/// Kolmogorov-Smirnov p-value, `min(1, 2·exp(−2·D²))`.
///
/// `D` is the largest gap between the empirical cumulative share of bins
/// `0..=i` and the family CDF at `i / scale`, stopping once the family CDF
/// passes `0.9999`.
pub fn ks_p_value(empirical: &BinnedDistribution, dist: &FittedDistribution) -> f64 {
    let cumulative = empirical.cumulative();
    let mut max_diff: f64 = 0.0;
    for (i, &c) in cumulative.iter().enumerate() {
        let d = dist.cdf(empirical.bin_position(i));
        if d > TAIL_CDF {
            break;
        }
        if i == 0 && !d.is_finite() {
            continue;
        }
        max_diff = max_diff.max((c - d).abs());
    }
    (2.0 * (-2.0 * max_diff * max_diff).exp()).min(1.0)
}

/// χ² p-value over the bins for `count` observations.
///
/// Each bin with positive family mass `Δd` contributes
/// `count·(Δs − Δd)²/Δd`, `Δs` being the empirical share of that bin;
/// bins after the family CDF passes `0.9999` are not compared. Degrees of
/// freedom are `max(steps − 1, 1)`.
pub fn chi_squared_p_value(empirical: &BinnedDistribution, dist: &FittedDistribution, count: f64) -> f64 {
    let cumulative = empirical.cumulative();
    let mut statistic = 0.0;
    let mut steps = 0usize;
    let mut lower = dist.cdf(0.0);
    for i in 0..cumulative.len() {
        let upper = dist.cdf(empirical.bin_position(i + 1));
        if !upper.is_finite() {
            continue;
        }
        if !lower.is_finite() {
            lower = upper;
            continue;
        }
        let delta = upper - lower;
        lower = upper;
        if upper > TAIL_CDF {
            break;
        }
        if delta <= 0.0 {
            continue;
        }
        steps += 1;
        let share = if i == 0 {
            cumulative[0]
        } else {
            cumulative[i] - cumulative[i - 1]
        };
        statistic += count * (share - delta) * (share - delta) / delta;
    }
    let df = steps.saturating_sub(1).max(1) as f64;
    (1.0 - chi_squared_cdf(statistic, df)).clamp(0.0, 1.0)
}

/// Anderson-Darling normality p-value for a histogram of counts.
///
/// Every bin contributes `round(weight)` observations at `i / scale`,
/// standardized with `mean` and `sd`. The p-value follows the
/// D'Agostino–Stephens approximation on the size-corrected statistic
/// `A²·(1 + 0.75/n + 2.25/n²)`.
///
/// Returns `None` if the histogram holds no whole observation, and `0` for
/// `sd == 0`.
pub fn anderson_darling_p_value(counts: &BinnedDistribution, mean: f64, sd: f64) -> Option<f64> {
    let runs: Vec<(f64, f64)> = counts
        .bins()
        .iter()
        .enumerate()
        .filter_map(|(i, &w)| {
            let c = w.round();
            (c >= 1.0).then(|| (counts.bin_position(i), c))
        })
        .collect();
    if runs.is_empty() {
        return None;
    }
    if sd == 0.0 {
        return Some(0.0);
    }

    let phi: Vec<(f64, f64)> = runs
        .iter()
        .map(|&(x, c)| (standard_normal_cdf((x - mean) / sd), c))
        .collect();
    let nf: f64 = phi.iter().map(|&(_, c)| c).sum();
    let a2 = anderson_darling_statistic(&phi);
    let z = a2 * (1.0 + 0.75 / nf + 2.25 / (nf * nf));
    let p = if z >= AD_STATISTIC_LIMIT {
        0.0
    } else if z > 0.6 {
        (1.2937 - 5.709 * z + 0.0186 * z * z).exp()
    } else if z > 0.34 {
        (0.9177 - 4.279 * z - 1.38 * z * z).exp()
    } else if z > 0.2 {
        1.0 - (-8.318 + 42.796 * z - 59.938 * z * z).exp()
    } else {
        1.0 - (-13.436 + 101.14 * z - 223.73 * z * z).exp()
    };
    Some(p.clamp(0.0, 1.0))
}

/// A² over ascending runs of `(Φ(z), count)`.
///
/// The ordered sample pairs `Φ₍ₖ₎` with `Φ₍ₙ₋₁₋ₖ₎`. Runs are walked from both
/// ends at once, and each stretch of `len` pairs starting at rank `k0` with
/// the same two values contributes `Σ(2k+1) = len·(2·k0 + len)` times their
/// log term, so the cost grows with the number of runs, not with `n`.
/// Non-finite log terms count as `0`.
fn anderson_darling_statistic(phi: &[(f64, f64)]) -> f64 {
    let Some(last) = phi.len().checked_sub(1) else {
        return 0.0;
    };
    let n: f64 = phi.iter().map(|&(_, c)| c).sum();
    let (mut lo, mut hi) = (0, last);
    let (mut left_lo, mut left_hi) = (phi[lo].1, phi[hi].1);
    let mut k0 = 0.0;
    let mut s = 0.0;
    loop {
        let len = left_lo.min(left_hi);
        let value = phi[lo].0.ln() + (1.0 - phi[hi].0).ln();
        if value.is_finite() {
            s += value * len * (2.0 * k0 + len);
        }
        k0 += len;
        left_lo -= len;
        left_hi -= len;
        if left_lo <= 0.0 {
            lo += 1;
            match phi.get(lo) {
                Some(&(_, c)) => left_lo = c,
                None => break,
            }
        }
        if left_hi <= 0.0 {
            let Some(next) = hi.checked_sub(1) else {
                break;
            };
            hi = next;
            left_hi = phi[hi].1;
        }
    }
    -n - s / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Family;

    fn normal(mean: f64, sd: f64) -> FittedDistribution {
        FittedDistribution::new(Family::Normal, vec![mean, sd]).unwrap()
    }

    /// Counts of N(mean, sd²) rounded to integers, `total` observations
    /// over `n` unit bins.
    fn discretized_normal(total: f64, mean: f64, sd: f64, n: usize) -> BinnedDistribution {
        let d = normal(mean, sd);
        let bins: Vec<f64> = (0..n)
            .map(|i| ((d.cdf(i as f64 + 0.5) - d.cdf(i as f64 - 0.5)) * total).round())
            .collect();
        BinnedDistribution::from_vec(n as f64, bins)
    }

    fn normal_counts(total: f64) -> BinnedDistribution {
        discretized_normal(total, 50.0, 10.0, 100)
    }

    #[test]
    fn squared_error_prefers_the_generating_family() {
        let mut hist = normal_counts(10_000.0);
        hist.normalize_density();
        let good = squared_error(&hist, &normal(50.0, 10.0), 200);
        let bad = squared_error(&hist, &normal(30.0, 10.0), 200);
        assert!(good < 1e-5, "good = {good}");
        assert!(bad > good * 100.0, "bad = {bad}");
    }

    #[test]
    fn squared_error_ignores_pole_at_origin() {
        let hist = BinnedDistribution::from_values(4.0, &[1.0, 1.0, 1.0, 1.0]);
        let gamma = FittedDistribution::new(Family::Gamma, vec![0.5, 2.0]).unwrap();
        assert!(squared_error(&hist, &gamma, 8).is_finite());
    }

    #[test]
    fn squared_error_of_empty_grid_is_zero() {
        let hist = BinnedDistribution::new(4.0, 0);
        assert_eq!(squared_error(&hist, &normal(0.0, 1.0), 0), 0.0);
    }

    #[test]
    fn ks_close_fit_has_high_p() {
        let hist = normal_counts(10_000.0);
        // Left-edge evaluation puts the CDF half a bin behind the
        // cumulative share, so compare against a shifted normal.
        let p = ks_p_value(&hist, &normal(50.5, 10.0));
        assert!(p > 0.99, "p = {p}");
        let p_bad = ks_p_value(&hist, &normal(80.0, 5.0));
        assert!(p_bad < p);
    }

    #[test]
    fn chi_squared_in_unit_interval() {
        let hist = normal_counts(1_000.0);
        for d in [normal(50.0, 10.0), normal(70.0, 3.0)] {
            let p = chi_squared_p_value(&hist, &d, 1_000.0);
            assert!((0.0..=1.0).contains(&p), "p = {p}");
        }
        let good = chi_squared_p_value(&hist, &normal(50.0, 10.0), 1_000.0);
        let bad = chi_squared_p_value(&hist, &normal(70.0, 3.0), 1_000.0);
        assert!(good > bad);
    }

    #[test]
    fn anderson_darling_normal_vs_skewed() {
        let hist = discretized_normal(2_000.0, 150.0, 30.0, 300);
        let p_normal = anderson_darling_p_value(&hist, hist_mean(&hist), hist_sd(&hist)).unwrap();

        let skewed = BinnedDistribution::from_vec(
            100.0,
            (0..100).map(|i| (2_000.0 * (-(i as f64) / 8.0).exp()).round()).collect(),
        );
        let p_skewed = anderson_darling_p_value(&skewed, hist_mean(&skewed), hist_sd(&skewed)).unwrap();

        assert!(p_normal > 0.05, "normal p = {p_normal}");
        assert!(p_skewed < 0.01, "skewed p = {p_skewed}");
    }

    #[test]
    fn anderson_darling_edge_cases() {
        let empty = BinnedDistribution::from_values(3.0, &[0.2, 0.3, 0.4]);
        assert!(anderson_darling_p_value(&empty, 1.0, 1.0).is_none());
        let single = BinnedDistribution::from_values(3.0, &[0.0, 5.0, 0.0]);
        assert_eq!(anderson_darling_p_value(&single, 1.0, 0.0), Some(0.0));
    }

    #[test]
    fn anderson_darling_statistic_matches_expanded_sample() {
        let runs = [(0.1, 2.0), (0.4, 3.0), (0.7, 1.0), (0.95, 2.0)];
        let sorted: Vec<f64> = runs
            .iter()
            .flat_map(|&(p, c)| std::iter::repeat(p).take(c as usize))
            .collect();
        let n = sorted.len();
        let s: f64 = (0..n)
            .map(|k| (2 * k + 1) as f64 * (sorted[k].ln() + (1.0 - sorted[n - 1 - k]).ln()))
            .sum();
        let expected = -(n as f64) - s / n as f64;
        let a2 = anderson_darling_statistic(&runs);
        assert!((a2 - expected).abs() < 1e-12, "{a2} vs {expected}");
    }

    #[test]
    fn anderson_darling_skips_infinite_log_terms() {
        // Φ = 0 and Φ = 1 at the extremes make both log terms -∞
        let runs = [(0.0, 1.0), (0.5, 2.0), (1.0, 1.0)];
        let a2 = anderson_darling_statistic(&runs);
        // only the two middle ranks (k = 1, 2) contribute 2·ln 0.5 each
        let expected = -4.0 - (3.0 + 5.0) * 2.0 * 0.5_f64.ln() / 4.0;
        assert!((a2 - expected).abs() < 1e-12, "{a2} vs {expected}");
    }

    #[test]
    fn anderson_darling_with_huge_weights() {
        let hist = BinnedDistribution::from_values(4.0, &[1e12, 3e12, 3e12, 1e12]);
        let p = anderson_darling_p_value(&hist, hist_mean(&hist), hist_sd(&hist)).unwrap();
        assert!((0.0..=1.0).contains(&p), "p = {p}");
        assert!(p < 0.01, "p = {p}");
    }

    fn hist_mean(d: &BinnedDistribution) -> f64 {
        d.mean()
    }

    fn hist_sd(d: &BinnedDistribution) -> f64 {
        d.standard_deviation()
    }
}
