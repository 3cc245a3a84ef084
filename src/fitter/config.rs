//! Fitter configuration.
//!
//! # Examples
//!
//! ```
//! use u_distfit::catalog::Family;
//! use u_distfit::fitter::FitterConfig;
//!
//! let config = FitterConfig::default()
//!     .with_families(vec![Family::Normal, Family::LogNormal])
//!     .and_then(|c| c.with_evaluation_span(3.0))
//!     .unwrap();
//! assert_eq!(config.families.len(), 2);
//! assert!(FitterConfig::default().with_evaluation_span(0.0).is_none());
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::Family;

/// Upper limit on the number of grid points of the squared-error metric.
pub const DEFAULT_MAX_EVALUATION_POINTS: usize = 1_000_000;

/// Grid length as a multiple of the number of bins.
pub const DEFAULT_EVALUATION_SPAN: f64 = 2.0;

/// Settings of [`DistributionFitter`](super::DistributionFitter).
///
/// Missing fields fall back to their defaults when deserializing. The rest
/// pass through the `with_*` builders, so values they reject fail to
/// deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFitterConfig")]
pub struct FitterConfig {
    /// Families to try, evaluated in this order.
    pub families: Vec<Family>,
    /// Cap on the squared-error grid.
    pub max_evaluation_points: usize,
    /// Squared-error grid covers `evaluation_span · N` bins (beyond the
    /// support the empirical density is `0`).
    pub evaluation_span: f64,
    /// Compute the Anderson-Darling p-value for the normal candidate.
    pub anderson_darling: bool,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            families: Family::ALL.to_vec(),
            max_evaluation_points: DEFAULT_MAX_EVALUATION_POINTS,
            evaluation_span: DEFAULT_EVALUATION_SPAN,
            anderson_darling: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawFitterConfig {
    families: Vec<Family>,
    max_evaluation_points: usize,
    evaluation_span: f64,
    anderson_darling: bool,
}

impl Default for RawFitterConfig {
    fn default() -> Self {
        let config = FitterConfig::default();
        Self {
            families: config.families,
            max_evaluation_points: config.max_evaluation_points,
            evaluation_span: config.evaluation_span,
            anderson_darling: config.anderson_darling,
        }
    }
}

impl TryFrom<RawFitterConfig> for FitterConfig {
    type Error = String;

    fn try_from(raw: RawFitterConfig) -> Result<Self, Self::Error> {
        let span = raw.evaluation_span;
        let points = raw.max_evaluation_points;
        FitterConfig::default()
            .with_families(raw.families)
            .ok_or("families must not be empty")?
            .with_max_evaluation_points(points)
            .ok_or("max_evaluation_points must be positive")?
            .with_evaluation_span(span)
            .map(|c| c.with_anderson_darling(raw.anderson_darling))
            .ok_or_else(|| format!("evaluation_span must be finite and at least 1, got {span}"))
    }
}

impl FitterConfig {
    /// Restricts the candidate families.
    ///
    /// Duplicates are removed (first occurrence wins). Returns `None` for an
    /// empty list.
    pub fn with_families(mut self, families: Vec<Family>) -> Option<Self> {
        let mut unique = Vec::with_capacity(families.len());
        for family in families {
            if !unique.contains(&family) {
                unique.push(family);
            }
        }
        if unique.is_empty() {
            return None;
        }
        self.families = unique;
        Some(self)
    }

    /// Sets the grid cap. Returns `None` for `0`.
    pub fn with_max_evaluation_points(mut self, points: usize) -> Option<Self> {
        if points == 0 {
            return None;
        }
        self.max_evaluation_points = points;
        Some(self)
    }

    /// Sets the grid span. Returns `None` unless `span` is finite and at
    /// least `1`.
    pub fn with_evaluation_span(mut self, span: f64) -> Option<Self> {
        if !span.is_finite() || span < 1.0 {
            return None;
        }
        self.evaluation_span = span;
        Some(self)
    }

    /// Enables or disables the Anderson-Darling test.
    pub fn with_anderson_darling(mut self, enabled: bool) -> Self {
        self.anderson_darling = enabled;
        self
    }

    /// Number of grid points for a distribution with `n` bins.
    ///
    /// Out-of-range values assigned to the public fields fall back to the
    /// builder limits (span at least `1`, cap at least one point).
    pub(crate) fn evaluation_points(&self, n: usize) -> usize {
        let span = if self.evaluation_span.is_finite() {
            self.evaluation_span.max(1.0)
        } else {
            DEFAULT_EVALUATION_SPAN
        };
        ((n as f64 * span).round() as usize).min(self.max_evaluation_points.max(1))
    }
}
