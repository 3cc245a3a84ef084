//! Closed catalog of parametric distribution families.
//!
//! Each [`Family`] owns one static [`FamilyRecord`] carrying its display
//! name, parameter names and three function pointers: method-of-moments
//! estimation, density and CDF. Dispatch is a table lookup, so adding a
//! family means adding one enum variant and one record.
//!
//! # Examples
//!
//! ```
//! use u_distfit::catalog::{Family, FittedDistribution, Moments};
//!
//! let moments = Moments { mean: 6.0, variance: 12.0, min: 0.0, max: 30.0 };
//! let gamma = FittedDistribution::estimate(Family::Gamma, &moments).unwrap();
//! assert_eq!(gamma.parameters(), &[3.0, 2.0]);
//! assert!(gamma.cdf(6.0) > 0.5);
//! assert_eq!(gamma.describe(), "Gamma distribution (shape=3, scale=2)");
//! ```

mod families;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binned::{format_decimals, BinnedDistribution};

/// Decimals shown for parameters in [`FittedDistribution::describe`].
const DESCRIBE_DECIMALS: usize = 4;

/// Parametric distribution family known to the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    /// Point mass at the mean.
    OnePoint,
    /// Uniform on the occupied range.
    Uniform,
    /// Exponential with the given mean.
    Exponential,
    /// Normal (mean, SD).
    Normal,
    /// Log-normal parameterized by its own mean and SD.
    LogNormal,
    /// Gamma (shape, scale).
    Gamma,
    /// Erlang: gamma with integer shape.
    Erlang,
    /// Beta stretched to the occupied range.
    Beta,
    /// Weibull (shape, scale).
    Weibull,
    /// Chi-squared with `mean` degrees of freedom.
    ChiSquared,
    /// Triangular on the occupied range.
    Triangular,
    /// PERT (beta-shaped three-point estimate).
    Pert,
    /// Laplace (double exponential).
    Laplace,
    /// Logistic.
    Logistic,
    /// Gumbel (extreme value, maximum).
    Gumbel,
    /// Rayleigh.
    Rayleigh,
}

impl Family {
    /// Every family in catalog order (the tie-break order of the fitter).
    pub const ALL: [Family; 16] = [
        Family::OnePoint,
        Family::Uniform,
        Family::Exponential,
        Family::Normal,
        Family::LogNormal,
        Family::Gamma,
        Family::Erlang,
        Family::Beta,
        Family::Weibull,
        Family::ChiSquared,
        Family::Triangular,
        Family::Pert,
        Family::Laplace,
        Family::Logistic,
        Family::Gumbel,
        Family::Rayleigh,
    ];

    /// The family's record.
    pub fn record(self) -> &'static FamilyRecord {
        &RECORDS[self as usize]
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        self.record().name
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input of the method-of-moments estimators.
///
/// `min` and `max` are the positions of the first and last occupied bins;
/// bounded families (uniform, beta, triangular, PERT) use them as support.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    /// Mean.
    pub mean: f64,
    /// Variance.
    pub variance: f64,
    /// Smallest occupied position.
    pub min: f64,
    /// Largest occupied position.
    pub max: f64,
}

impl Moments {
    /// Moments of an empirical distribution, or `None` if it carries no
    /// positive weight.
    pub fn of(dist: &BinnedDistribution) -> Option<Self> {
        let (first, last) = dist.occupied_range()?;
        Some(Self {
            mean: dist.mean(),
            variance: dist.variance(),
            min: dist.bin_position(first),
            max: dist.bin_position(last),
        })
    }

    /// Standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// Parameter estimator: moments to parameter vector.
pub type EstimateFn = fn(&Moments) -> Option<Vec<f64>>;

/// Density or CDF at `x` for a parameter vector.
pub type EvaluateFn = fn(f64, &[f64]) -> f64;

/// Static description of one family.
#[derive(Debug)]
pub struct FamilyRecord {
    /// Variant this record belongs to.
    pub family: Family,
    /// Display name.
    pub name: &'static str,
    /// Names of the parameters, in vector order.
    pub parameter_names: &'static [&'static str],
    /// Method-of-moments estimator.
    pub estimate: EstimateFn,
    /// Probability density.
    pub density: EvaluateFn,
    /// Cumulative distribution function.
    pub cdf: EvaluateFn,
}

static RECORDS: [FamilyRecord; 16] = [
    FamilyRecord {
        family: Family::OnePoint,
        name: "One point distribution",
        parameter_names: &["point"],
        estimate: families::one_point_estimate,
        density: families::one_point_density,
        cdf: families::one_point_cdf,
    },
    FamilyRecord {
        family: Family::Uniform,
        name: "Uniform distribution",
        parameter_names: &["a", "b"],
        estimate: families::uniform_estimate,
        density: families::uniform_density,
        cdf: families::uniform_cdf,
    },
    FamilyRecord {
        family: Family::Exponential,
        name: "Exponential distribution",
        parameter_names: &["mean"],
        estimate: families::exponential_estimate,
        density: families::exponential_density,
        cdf: families::exponential_cdf,
    },
    FamilyRecord {
        family: Family::Normal,
        name: "Normal distribution",
        parameter_names: &["mean", "sd"],
        estimate: families::normal_estimate,
        density: families::normal_density,
        cdf: families::normal_cdf,
    },
    FamilyRecord {
        family: Family::LogNormal,
        name: "Log-normal distribution",
        parameter_names: &["mean", "sd"],
        estimate: families::lognormal_estimate,
        density: families::lognormal_density,
        cdf: families::lognormal_cdf,
    },
    FamilyRecord {
        family: Family::Gamma,
        name: "Gamma distribution",
        parameter_names: &["shape", "scale"],
        estimate: families::gamma_estimate,
        density: families::gamma_family_density,
        cdf: families::gamma_family_cdf,
    },
    FamilyRecord {
        family: Family::Erlang,
        name: "Erlang distribution",
        parameter_names: &["n", "scale"],
        estimate: families::erlang_estimate,
        density: families::gamma_family_density,
        cdf: families::gamma_family_cdf,
    },
    FamilyRecord {
        family: Family::Beta,
        name: "Beta distribution",
        parameter_names: &["alpha", "beta", "a", "b"],
        estimate: families::beta_estimate,
        density: families::beta_family_density,
        cdf: families::beta_family_cdf,
    },
    FamilyRecord {
        family: Family::Weibull,
        name: "Weibull distribution",
        parameter_names: &["shape", "scale"],
        estimate: families::weibull_estimate,
        density: families::weibull_density,
        cdf: families::weibull_cdf,
    },
    FamilyRecord {
        family: Family::ChiSquared,
        name: "Chi-squared distribution",
        parameter_names: &["k"],
        estimate: families::chi_squared_estimate,
        density: families::chi_squared_density,
        cdf: families::chi_squared_family_cdf,
    },
    FamilyRecord {
        family: Family::Triangular,
        name: "Triangular distribution",
        parameter_names: &["a", "c", "b"],
        estimate: families::triangular_estimate,
        density: families::triangular_density,
        cdf: families::triangular_cdf,
    },
    FamilyRecord {
        family: Family::Pert,
        name: "PERT distribution",
        parameter_names: &["a", "c", "b"],
        estimate: families::pert_estimate,
        density: families::pert_density,
        cdf: families::pert_cdf,
    },
    FamilyRecord {
        family: Family::Laplace,
        name: "Laplace distribution",
        parameter_names: &["mu", "b"],
        estimate: families::laplace_estimate,
        density: families::laplace_density,
        cdf: families::laplace_cdf,
    },
    FamilyRecord {
        family: Family::Logistic,
        name: "Logistic distribution",
        parameter_names: &["mu", "s"],
        estimate: families::logistic_estimate,
        density: families::logistic_density,
        cdf: families::logistic_cdf,
    },
    FamilyRecord {
        family: Family::Gumbel,
        name: "Gumbel distribution",
        parameter_names: &["mu", "beta"],
        estimate: families::gumbel_estimate,
        density: families::gumbel_density,
        cdf: families::gumbel_cdf,
    },
    FamilyRecord {
        family: Family::Rayleigh,
        name: "Rayleigh distribution",
        parameter_names: &["sigma"],
        estimate: families::rayleigh_estimate,
        density: families::rayleigh_density,
        cdf: families::rayleigh_cdf,
    },
];

// ---------------------------------------------------------------------------
// Fitted distribution
// ---------------------------------------------------------------------------

/// A family together with concrete parameters.
///
/// Deserialization goes through [`FittedDistribution::new`], so a parameter
/// list that does not match the family is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFittedDistribution")]
pub struct FittedDistribution {
    family: Family,
    parameters: Vec<f64>,
}

#[derive(Deserialize)]
struct RawFittedDistribution {
    family: Family,
    parameters: Vec<f64>,
}

impl TryFrom<RawFittedDistribution> for FittedDistribution {
    type Error = String;

    fn try_from(raw: RawFittedDistribution) -> Result<Self, Self::Error> {
        let expected = raw.family.record().parameter_names.len();
        let got = raw.parameters.len();
        Self::new(raw.family, raw.parameters).ok_or_else(|| {
            format!("{} expects {expected} finite parameters, got {got}", raw.family.name())
        })
    }
}

impl FittedDistribution {
    /// Creates a distribution from explicit parameters.
    ///
    /// Returns `None` if the number of parameters does not match the family
    /// or any parameter is not finite.
    pub fn new(family: Family, parameters: Vec<f64>) -> Option<Self> {
        let valid = parameters.len() == family.record().parameter_names.len()
            && parameters.iter().all(|p| p.is_finite());
        valid.then_some(Self { family, parameters })
    }

    /// Method-of-moments estimate of `family` for `moments`.
    ///
    /// Returns `None` if the family cannot match the moments (e.g. a
    /// log-normal for a non-positive mean) or the estimate is not finite.
    pub fn estimate(family: Family, moments: &Moments) -> Option<Self> {
        let parameters = (family.record().estimate)(moments)?;
        Self::new(family, parameters)
    }

    /// The family.
    pub fn family(&self) -> Family {
        self.family
    }

    /// Parameter values, ordered as the record's `parameter_names`.
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Display name of the family.
    pub fn name(&self) -> &'static str {
        self.family.name()
    }

    /// Probability density at `x`.
    pub fn density(&self, x: f64) -> f64 {
        (self.family.record().density)(x, &self.parameters)
    }

    /// Cumulative probability at `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        (self.family.record().cdf)(x, &self.parameters)
    }

    /// Name followed by `name=value` pairs, e.g.
    /// `Normal distribution (mean=5, sd=2)`.
    pub fn describe(&self) -> String {
        let params = self
            .family
            .record()
            .parameter_names
            .iter()
            .zip(&self.parameters)
            .map(|(name, value)| format!("{name}={}", format_decimals(*value, DESCRIBE_DECIMALS)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} ({params})", self.name())
    }
}

impl fmt::Display for FittedDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moments() -> Moments {
        Moments {
            mean: 5.0,
            variance: 4.0,
            min: 0.0,
            max: 12.0,
        }
    }

    #[test]
    fn records_follow_enum_order() {
        for (i, family) in Family::ALL.iter().enumerate() {
            assert_eq!(RECORDS[i].family, *family);
            assert_eq!(*family as usize, i);
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = Family::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Family::ALL.len());
    }

    #[test]
    fn every_family_estimates_typical_moments() {
        for family in Family::ALL {
            let dist = FittedDistribution::estimate(family, &moments())
                .unwrap_or_else(|| panic!("{family} failed"));
            assert_eq!(dist.parameters().len(), family.record().parameter_names.len());
        }
    }

    #[test]
    fn cdfs_are_monotone_and_bounded() {
        for family in Family::ALL {
            let dist = FittedDistribution::estimate(family, &moments()).unwrap();
            let mut prev = 0.0;
            for i in 0..=240 {
                let x = i as f64 * 0.05;
                let c = dist.cdf(x);
                assert!((-1e-9..=1.0 + 1e-9).contains(&c), "{family} cdf({x}) = {c}");
                assert!(c >= prev - 1e-7, "{family} cdf decreases at {x}");
                prev = c;
            }
        }
    }

    #[test]
    fn densities_integrate_to_cdf() {
        // Trapezoid of the density over [2, 8] against the CDF difference.
        let skip = [Family::OnePoint];
        for family in Family::ALL.into_iter().filter(|f| !skip.contains(f)) {
            let dist = FittedDistribution::estimate(family, &moments()).unwrap();
            let (a, b, steps) = (2.0, 8.0, 6000);
            let h = (b - a) / steps as f64;
            let mut area = 0.5 * (dist.density(a) + dist.density(b));
            for i in 1..steps {
                area += dist.density(a + i as f64 * h);
            }
            area *= h;
            let expected = dist.cdf(b) - dist.cdf(a);
            assert!((area - expected).abs() < 1e-4, "{family}: {area} vs {expected}");
        }
    }

    #[test]
    fn moments_of_binned() {
        let dist = BinnedDistribution::from_values(5.0, &[0.0, 3.0, 4.0, 0.0, 1.0]);
        let m = Moments::of(&dist).unwrap();
        assert_eq!(m.min, 1.0);
        assert_eq!(m.max, 4.0);
        assert!((m.mean - dist.mean()).abs() < 1e-15);
        assert!(Moments::of(&BinnedDistribution::new(5.0, 3)).is_none());
    }

    #[test]
    fn new_validates_parameters() {
        assert!(FittedDistribution::new(Family::Normal, vec![1.0]).is_none());
        assert!(FittedDistribution::new(Family::Normal, vec![1.0, f64::NAN]).is_none());
        assert!(FittedDistribution::new(Family::Normal, vec![1.0, 2.0]).is_some());
    }

    #[test]
    fn describe_formats_parameters() {
        let d = FittedDistribution::new(Family::Normal, vec![5.0, 1.234_567]).unwrap();
        assert_eq!(d.describe(), "Normal distribution (mean=5, sd=1.2346)");
        assert_eq!(d.to_string(), d.describe());
    }

    #[test]
    fn family_serde_kebab_case() {
        let json = serde_json::to_string(&Family::LogNormal).unwrap();
        assert_eq!(json, "\"log-normal\"");
        let back: Family = serde_json::from_str("\"chi-squared\"").unwrap();
        assert_eq!(back, Family::ChiSquared);
    }

    #[test]
    fn fitted_distribution_serde_round_trip() {
        let d = FittedDistribution::new(Family::Gamma, vec![3.0, 2.0]).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"family":"gamma","parameters":[3.0,2.0]}"#);
        let back: FittedDistribution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn deserialize_rejects_wrong_parameter_count() {
        let err = serde_json::from_str::<FittedDistribution>(r#"{"family":"normal","parameters":[]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("expects 2"), "{err}");
        assert!(serde_json::from_str::<FittedDistribution>(
            r#"{"family":"beta","parameters":[2.0,3.0,0.0]}"#
        )
        .is_err());
    }
}
