//! Method-of-moments estimators, densities and CDFs of the catalog families.
//!
//! Every estimator maps [`Moments`] to the family's parameter vector (order
//! as in the record's `parameter_names`) or `None` if the moments cannot be
//! matched. Densities and CDFs take that vector back and return `0` outside
//! the support.
//!
//! Families that `u_numflow::distributions` models are evaluated through it.
//! Parameters it rejects evaluate to `NaN`, which the fitter ranks as
//! rejected.

use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

use u_numflow::distributions::{
    BetaDistribution, ChiSquared, Exponential, GammaDistribution, LogNormal, Normal, Pert, Uniform,
    Weibull,
};
use u_numflow::special::ln_gamma;

use super::Moments;
use crate::special::bisect;

/// Euler–Mascheroni constant γ.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Weibull shape search interval for the coefficient-of-variation match.
const WEIBULL_SHAPE_RANGE: (f64, f64) = (0.05, 100.0);

fn positive(v: f64) -> Option<f64> {
    (v > 0.0 && v.is_finite()).then_some(v)
}

/// Evaluates `f` on a constructed distribution, `NaN` if construction failed.
fn eval<D, E>(dist: Result<D, E>, f: impl FnOnce(&D) -> f64) -> f64 {
    dist.map_or(f64::NAN, |d| f(&d))
}

fn sd(m: &Moments) -> Option<f64> {
    positive(m.variance).map(f64::sqrt)
}

fn range(m: &Moments) -> Option<(f64, f64)> {
    (m.max > m.min && m.min.is_finite() && m.max.is_finite()).then_some((m.min, m.max))
}

// ---------------------------------------------------------------------------
// Shared shapes
// ---------------------------------------------------------------------------

/// Gamma(shape k, scale θ) density, including the `x = 0` limits.
fn gamma_density(x: f64, k: f64, theta: f64) -> f64 {
    if x < 0.0 {
        return 0.0;
    }
    if x == 0.0 {
        return if k < 1.0 {
            f64::INFINITY
        } else if k == 1.0 {
            1.0 / theta
        } else {
            0.0
        };
    }
    eval(GammaDistribution::from_shape_scale(k, theta), |d| d.pdf(x))
}

/// Beta(α, β) density on `[0, 1]`, including both boundary limits.
fn beta_density(t: f64, a: f64, b: f64) -> f64 {
    if !(0.0..=1.0).contains(&t) {
        return 0.0;
    }
    let edge = |shape: f64, other: f64| {
        if shape < 1.0 {
            f64::INFINITY
        } else if shape == 1.0 {
            // B(1, β) = 1/β
            other
        } else {
            0.0
        }
    };
    if t == 0.0 {
        return edge(a, b);
    }
    if t == 1.0 {
        return edge(b, a);
    }
    eval(BetaDistribution::new(a, b), |d| d.pdf(t))
}

/// Log-scale (μ, σ) of a log-normal with the given mean and SD.
fn lognormal_log_params(mean: f64, sd: f64) -> (f64, f64) {
    let sigma2 = (1.0 + (sd * sd) / (mean * mean)).ln();
    (mean.ln() - sigma2 / 2.0, sigma2.sqrt())
}

// ---------------------------------------------------------------------------
// One point
// ---------------------------------------------------------------------------

pub(super) fn one_point_estimate(m: &Moments) -> Option<Vec<f64>> {
    m.mean.is_finite().then(|| vec![m.mean])
}

pub(super) fn one_point_density(x: f64, p: &[f64]) -> f64 {
    if x == p[0] {
        f64::INFINITY
    } else {
        0.0
    }
}

pub(super) fn one_point_cdf(x: f64, p: &[f64]) -> f64 {
    if x >= p[0] {
        1.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Uniform
// ---------------------------------------------------------------------------

pub(super) fn uniform_estimate(m: &Moments) -> Option<Vec<f64>> {
    let (a, b) = range(m)?;
    Some(vec![a, b])
}

pub(super) fn uniform_density(x: f64, p: &[f64]) -> f64 {
    eval(Uniform::new(p[0], p[1]), |d| d.pdf(x))
}

pub(super) fn uniform_cdf(x: f64, p: &[f64]) -> f64 {
    eval(Uniform::new(p[0], p[1]), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Exponential
// ---------------------------------------------------------------------------

pub(super) fn exponential_estimate(m: &Moments) -> Option<Vec<f64>> {
    Some(vec![positive(m.mean)?])
}

// Parameterized by the mean, the rate is its inverse.
pub(super) fn exponential_density(x: f64, p: &[f64]) -> f64 {
    eval(Exponential::new(1.0 / p[0]), |d| d.pdf(x))
}

pub(super) fn exponential_cdf(x: f64, p: &[f64]) -> f64 {
    eval(Exponential::new(1.0 / p[0]), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Normal
// ---------------------------------------------------------------------------

pub(super) fn normal_estimate(m: &Moments) -> Option<Vec<f64>> {
    Some(vec![m.mean, sd(m)?])
}

pub(super) fn normal_density(x: f64, p: &[f64]) -> f64 {
    eval(Normal::new(p[0], p[1]), |d| d.pdf(x))
}

pub(super) fn normal_cdf(x: f64, p: &[f64]) -> f64 {
    eval(Normal::new(p[0], p[1]), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Log-normal (parameterized by mean and SD of the variable itself)
// ---------------------------------------------------------------------------

pub(super) fn lognormal_estimate(m: &Moments) -> Option<Vec<f64>> {
    Some(vec![positive(m.mean)?, sd(m)?])
}

fn lognormal(p: &[f64]) -> Result<LogNormal, u_numflow::distributions::DistributionError> {
    let (mu, sigma) = lognormal_log_params(p[0], p[1]);
    LogNormal::new(mu, sigma)
}

pub(super) fn lognormal_density(x: f64, p: &[f64]) -> f64 {
    eval(lognormal(p), |d| d.pdf(x))
}

pub(super) fn lognormal_cdf(x: f64, p: &[f64]) -> f64 {
    eval(lognormal(p), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Gamma and Erlang
// ---------------------------------------------------------------------------

pub(super) fn gamma_estimate(m: &Moments) -> Option<Vec<f64>> {
    let mean = positive(m.mean)?;
    let var = positive(m.variance)?;
    Some(vec![mean * mean / var, var / mean])
}

pub(super) fn erlang_estimate(m: &Moments) -> Option<Vec<f64>> {
    let mean = positive(m.mean)?;
    let var = positive(m.variance)?;
    let n = (mean * mean / var).round().max(1.0);
    Some(vec![n, mean / n])
}

pub(super) fn gamma_family_density(x: f64, p: &[f64]) -> f64 {
    gamma_density(x, p[0], p[1])
}

pub(super) fn gamma_family_cdf(x: f64, p: &[f64]) -> f64 {
    eval(GammaDistribution::from_shape_scale(p[0], p[1]), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Beta on [a, b]
// ---------------------------------------------------------------------------

pub(super) fn beta_estimate(m: &Moments) -> Option<Vec<f64>> {
    let (a, b) = range(m)?;
    let width = b - a;
    let mu = (m.mean - a) / width;
    let var = positive(m.variance)? / (width * width);
    if !(mu > 0.0 && mu < 1.0) {
        return None;
    }
    let common = positive(mu * (1.0 - mu) / var - 1.0)?;
    Some(vec![mu * common, (1.0 - mu) * common, a, b])
}

pub(super) fn beta_family_density(x: f64, p: &[f64]) -> f64 {
    let width = p[3] - p[2];
    beta_density((x - p[2]) / width, p[0], p[1]) / width
}

pub(super) fn beta_family_cdf(x: f64, p: &[f64]) -> f64 {
    let t = (x - p[2]) / (p[3] - p[2]);
    eval(BetaDistribution::new(p[0], p[1]), |d| d.cdf(t))
}

// ---------------------------------------------------------------------------
// Weibull
// ---------------------------------------------------------------------------

/// Shape from the coefficient of variation: Γ(1+2/k)/Γ(1+1/k)² − 1 = CV².
pub(super) fn weibull_estimate(m: &Moments) -> Option<Vec<f64>> {
    let mean = positive(m.mean)?;
    let cv2 = positive(m.variance)? / (mean * mean);
    let excess = |k: f64| (ln_gamma(1.0 + 2.0 / k) - 2.0 * ln_gamma(1.0 + 1.0 / k)).exp() - 1.0 - cv2;
    let (lo, hi) = WEIBULL_SHAPE_RANGE;
    let shape = bisect(excess, lo, hi, 200)?;
    let scale = mean / ln_gamma(1.0 + 1.0 / shape).exp();
    Some(vec![shape, scale])
}

pub(super) fn weibull_density(x: f64, p: &[f64]) -> f64 {
    eval(Weibull::new(p[0], p[1]), |d| d.pdf(x))
}

pub(super) fn weibull_cdf(x: f64, p: &[f64]) -> f64 {
    eval(Weibull::new(p[0], p[1]), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Chi-squared
// ---------------------------------------------------------------------------

pub(super) fn chi_squared_estimate(m: &Moments) -> Option<Vec<f64>> {
    Some(vec![positive(m.mean)?])
}

pub(super) fn chi_squared_density(x: f64, p: &[f64]) -> f64 {
    gamma_density(x, p[0] / 2.0, 2.0)
}

pub(super) fn chi_squared_family_cdf(x: f64, p: &[f64]) -> f64 {
    eval(ChiSquared::new(p[0]), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Triangular and PERT on [a, b] with mode c
// ---------------------------------------------------------------------------

pub(super) fn triangular_estimate(m: &Moments) -> Option<Vec<f64>> {
    let (a, b) = range(m)?;
    let c = (3.0 * m.mean - a - b).clamp(a, b);
    Some(vec![a, c, b])
}

pub(super) fn triangular_density(x: f64, p: &[f64]) -> f64 {
    let (a, c, b) = (p[0], p[1], p[2]);
    if x < a || x > b {
        0.0
    } else if x < c {
        2.0 * (x - a) / ((b - a) * (c - a))
    } else if x == c {
        2.0 / (b - a)
    } else {
        2.0 * (b - x) / ((b - a) * (b - c))
    }
}

pub(super) fn triangular_cdf(x: f64, p: &[f64]) -> f64 {
    let (a, c, b) = (p[0], p[1], p[2]);
    if x <= a {
        0.0
    } else if x >= b {
        1.0
    } else if x <= c {
        (x - a) * (x - a) / ((b - a) * (c - a))
    } else {
        1.0 - (b - x) * (b - x) / ((b - a) * (b - c))
    }
}

pub(super) fn pert_estimate(m: &Moments) -> Option<Vec<f64>> {
    let (a, b) = range(m)?;
    let c = ((6.0 * m.mean - a - b) / 4.0).clamp(a, b);
    Some(vec![a, c, b])
}

fn pert_shapes(p: &[f64]) -> (f64, f64) {
    let (a, c, b) = (p[0], p[1], p[2]);
    (1.0 + 4.0 * (c - a) / (b - a), 1.0 + 4.0 * (b - c) / (b - a))
}

pub(super) fn pert_density(x: f64, p: &[f64]) -> f64 {
    let (alpha, beta) = pert_shapes(p);
    let width = p[2] - p[0];
    beta_density((x - p[0]) / width, alpha, beta) / width
}

pub(super) fn pert_cdf(x: f64, p: &[f64]) -> f64 {
    eval(Pert::new(p[0], p[1], p[2]), |d| d.cdf(x))
}

// ---------------------------------------------------------------------------
// Laplace, logistic, Gumbel, Rayleigh
// ---------------------------------------------------------------------------

pub(super) fn laplace_estimate(m: &Moments) -> Option<Vec<f64>> {
    Some(vec![m.mean, sd(m)? / SQRT_2])
}

pub(super) fn laplace_density(x: f64, p: &[f64]) -> f64 {
    (-(x - p[0]).abs() / p[1]).exp() / (2.0 * p[1])
}

pub(super) fn laplace_cdf(x: f64, p: &[f64]) -> f64 {
    let z = (x - p[0]) / p[1];
    if z < 0.0 {
        0.5 * z.exp()
    } else {
        1.0 - 0.5 * (-z).exp()
    }
}

pub(super) fn logistic_estimate(m: &Moments) -> Option<Vec<f64>> {
    Some(vec![m.mean, sd(m)? * 3.0_f64.sqrt() / PI])
}

pub(super) fn logistic_density(x: f64, p: &[f64]) -> f64 {
    let e = (-((x - p[0]) / p[1]).abs()).exp();
    e / (p[1] * (1.0 + e) * (1.0 + e))
}

pub(super) fn logistic_cdf(x: f64, p: &[f64]) -> f64 {
    1.0 / (1.0 + (-(x - p[0]) / p[1]).exp())
}

pub(super) fn gumbel_estimate(m: &Moments) -> Option<Vec<f64>> {
    let beta = sd(m)? * 6.0_f64.sqrt() / PI;
    Some(vec![m.mean - EULER_GAMMA * beta, beta])
}

pub(super) fn gumbel_density(x: f64, p: &[f64]) -> f64 {
    let z = (x - p[0]) / p[1];
    (-(z + (-z).exp())).exp() / p[1]
}

pub(super) fn gumbel_cdf(x: f64, p: &[f64]) -> f64 {
    (-(-(x - p[0]) / p[1]).exp()).exp()
}

pub(super) fn rayleigh_estimate(m: &Moments) -> Option<Vec<f64>> {
    Some(vec![positive(m.mean)? / FRAC_PI_2.sqrt()])
}

pub(super) fn rayleigh_density(x: f64, p: &[f64]) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        let s2 = p[0] * p[0];
        x / s2 * (-x * x / (2.0 * s2)).exp()
    }
}

pub(super) fn rayleigh_cdf(x: f64, p: &[f64]) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        1.0 - (-x * x / (2.0 * p[0] * p[0])).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moments(mean: f64, variance: f64) -> Moments {
        Moments {
            mean,
            variance,
            min: 0.0,
            max: 10.0,
        }
    }

    #[test]
    fn lognormal_log_params_reproduce_moments() {
        let (mu, sigma) = lognormal_log_params(50.0, 100.0);
        let mean = (mu + sigma * sigma / 2.0).exp();
        let var = ((sigma * sigma).exp() - 1.0) * (2.0 * mu + sigma * sigma).exp();
        assert!((mean - 50.0).abs() < 1e-9);
        assert!((var.sqrt() - 100.0).abs() < 1e-8);
    }

    #[test]
    fn gamma_moments() {
        let p = gamma_estimate(&moments(6.0, 12.0)).unwrap();
        // k·θ = 6, k·θ² = 12
        assert!((p[0] - 3.0).abs() < 1e-12);
        assert!((p[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn erlang_rounds_shape() {
        let p = erlang_estimate(&moments(6.0, 13.0)).unwrap();
        assert_eq!(p[0], 3.0);
        assert!((p[1] - 2.0).abs() < 1e-12);
        let p = erlang_estimate(&moments(1.0, 50.0)).unwrap();
        assert_eq!(p[0], 1.0);
    }

    #[test]
    fn weibull_exponential_case() {
        // CV = 1 gives shape 1
        let p = weibull_estimate(&moments(4.0, 16.0)).unwrap();
        assert!((p[0] - 1.0).abs() < 1e-6, "shape = {}", p[0]);
        assert!((p[1] - 4.0).abs() < 1e-5, "scale = {}", p[1]);
    }

    #[test]
    fn beta_moments_round_trip() {
        // Beta(2, 3) on [0, 10]: mean 4, variance 100·6/(25·6) = 4
        let m = Moments {
            mean: 4.0,
            variance: 4.0,
            min: 0.0,
            max: 10.0,
        };
        let p = beta_estimate(&m).unwrap();
        assert!((p[0] - 2.0).abs() < 1e-9);
        assert!((p[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn beta_rejects_too_wide_variance() {
        let m = Moments {
            mean: 5.0,
            variance: 100.0,
            min: 0.0,
            max: 10.0,
        };
        assert!(beta_estimate(&m).is_none());
    }

    #[test]
    fn triangular_mode_from_mean() {
        let p = triangular_estimate(&moments(4.0, 1.0)).unwrap();
        assert_eq!(p, vec![0.0, 2.0, 10.0]);
        assert!((triangular_cdf(2.0, &p) - 0.2).abs() < 1e-12);
        assert!((triangular_density(2.0, &p) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn pert_symmetric_is_half_at_mode() {
        let p = pert_estimate(&moments(5.0, 1.0)).unwrap();
        assert_eq!(p, vec![0.0, 5.0, 10.0]);
        assert!((pert_cdf(5.0, &p) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn boundary_limits() {
        assert_eq!(gamma_density(0.0, 0.5, 1.0), f64::INFINITY);
        assert_eq!(gamma_density(0.0, 1.0, 2.0), 0.5);
        assert_eq!(gamma_density(0.0, 3.0, 1.0), 0.0);
        assert_eq!(beta_density(0.0, 1.0, 3.0), 3.0);
        assert_eq!(beta_density(1.0, 3.0, 1.0), 3.0);
        assert_eq!(beta_density(1.5, 2.0, 2.0), 0.0);
    }

    #[test]
    fn rejected_parameters_evaluate_to_nan() {
        assert!(normal_density(1.0, &[0.0, 0.0]).is_nan());
        assert!(gamma_family_cdf(1.0, &[-1.0, 2.0]).is_nan());
        assert!(beta_family_cdf(0.5, &[0.0, 1.0, 0.0, 1.0]).is_nan());
        assert!(weibull_cdf(1.0, &[2.0, -1.0]).is_nan());
        assert!(chi_squared_family_cdf(1.0, &[0.0]).is_nan());
    }

    #[test]
    fn cdfs_match_closed_forms() {
        // Gamma(1, θ) is exponential with mean θ
        let x = 3.0;
        let expected = 1.0 - (-x / 2.0_f64).exp();
        assert!((gamma_family_cdf(x, &[1.0, 2.0]) - expected).abs() < 1e-10);
        assert!((exponential_cdf(x, &[2.0]) - expected).abs() < 1e-12);
        // χ²(2) is exponential with mean 2
        assert!((chi_squared_family_cdf(x, &[2.0]) - expected).abs() < 1e-10);
        // Beta(1, 1) on [0, 10] is uniform
        assert!((beta_family_cdf(2.5, &[1.0, 1.0, 0.0, 10.0]) - 0.25).abs() < 1e-10);
        assert_eq!(beta_family_cdf(-1.0, &[2.0, 3.0, 0.0, 10.0]), 0.0);
        assert_eq!(beta_family_cdf(11.0, &[2.0, 3.0, 0.0, 10.0]), 1.0);
    }

    #[test]
    fn lognormal_median_is_exp_mu() {
        let p = [50.0, 100.0];
        let (mu, _) = lognormal_log_params(p[0], p[1]);
        assert!((lognormal_cdf(mu.exp(), &p) - 0.5).abs() < 1e-7);
        assert_eq!(lognormal_density(0.0, &p), 0.0);
    }

    #[test]
    fn symmetric_families_are_half_at_mean() {
        type Pair = (fn(&Moments) -> Option<Vec<f64>>, fn(f64, &[f64]) -> f64);
        let m = moments(5.0, 4.0);
        let cases: [Pair; 3] = [
            (normal_estimate, normal_cdf),
            (laplace_estimate, laplace_cdf),
            (logistic_estimate, logistic_cdf),
        ];
        for (estimate, cdf) in cases {
            let p = estimate(&m).unwrap();
            assert!((cdf(5.0, &p) - 0.5).abs() < 1e-7);
        }
    }

    #[test]
    fn gumbel_mean_matches() {
        let p = gumbel_estimate(&moments(5.0, 4.0)).unwrap();
        let mean = p[0] + EULER_GAMMA * p[1];
        assert!((mean - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rayleigh_mean_matches() {
        let p = rayleigh_estimate(&moments(3.0, 1.0)).unwrap();
        assert!((p[0] * FRAC_PI_2.sqrt() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_inputs_fail() {
        let m = moments(-1.0, 4.0);
        assert!(exponential_estimate(&m).is_none());
        assert!(lognormal_estimate(&m).is_none());
        assert!(gamma_estimate(&m).is_none());
        assert!(rayleigh_estimate(&m).is_none());
        let m = moments(2.0, 0.0);
        assert!(normal_estimate(&m).is_none());
        assert!(weibull_estimate(&m).is_none());
        let m = Moments {
            mean: 2.0,
            variance: 1.0,
            min: 3.0,
            max: 3.0,
        };
        assert!(uniform_estimate(&m).is_none());
        assert!(triangular_estimate(&m).is_none());
    }
}
