//! Ranking every catalog family against one empirical histogram.

use std::fmt::Write as _;

use tracing::{debug, warn};

use super::config::FitterConfig;
use super::goodness;
use crate::binned::{format_decimals, BinnedDistribution, Locale};
use crate::catalog::{Family, FittedDistribution, Moments};

/// Below this SD a histogram counts as a single point.
const DEGENERATE_SD: f64 = 1e-5;

/// Largest distance between point and mean accepted for a one-point fit.
const ONE_POINT_TOLERANCE: f64 = 0.01;

/// One family fitted to the data, with its scores.
#[derive(Debug, Clone, PartialEq)]
pub struct FitCandidate {
    /// Family and estimated parameters.
    pub distribution: FittedDistribution,
    /// Squared density error (lower is better); the ranking key.
    pub error: f64,
    /// Kolmogorov-Smirnov p-value.
    pub p_value_ks: f64,
    /// χ² p-value.
    pub p_value_chi_squared: f64,
    /// Anderson-Darling p-value; only for the normal family.
    pub p_value_anderson_darling: Option<f64>,
}

impl FitCandidate {
    /// The candidate's family.
    pub fn family(&self) -> Family {
        self.distribution.family()
    }

    /// Name, parameters and error on one line.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.distribution.describe(), format_error(self.error))
    }
}

/// Outcome of one fitting run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Normalized empirical histogram the families were compared with.
    pub empirical: BinnedDistribution,
    /// Raw input weights (counts for sample input).
    pub counts: BinnedDistribution,
    /// Candidates sorted by ascending error, ties in catalog order.
    pub ranked: Vec<FitCandidate>,
    /// Families that could not be fitted.
    pub rejected: Vec<Family>,
}

impl FitResult {
    /// The lowest-error candidate, if any family could be fitted.
    pub fn best(&self) -> Option<&FitCandidate> {
        self.ranked.first()
    }
}

/// Fits every configured family to empirical data and ranks them.
///
/// Stateful: one of the `process*` methods loads data and computes the
/// ranking, the accessors read it back. A failed `process*` call leaves the
/// fitter without a result.
///
/// # Examples
///
/// ```
/// use u_distfit::catalog::Family;
/// use u_distfit::fitter::DistributionFitter;
///
/// // Histogram shaped like N(20, 4²)
/// let weights: Vec<f64> = (0..40)
///     .map(|i| (-((i as f64 - 20.0) / 4.0).powi(2) / 2.0).exp())
///     .collect();
/// let mut fitter = DistributionFitter::new();
/// assert!(fitter.process_density(&[&weights]));
/// let result = fitter.result().unwrap();
/// let normal = result.ranked.iter().find(|c| c.family() == Family::Normal).unwrap();
/// assert!(normal.error < 1e-4);
/// assert!(fitter.fit_distribution().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DistributionFitter {
    config: FitterConfig,
    result: Option<FitResult>,
}

impl DistributionFitter {
    /// Fitter trying every catalog family.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitter with explicit settings.
    pub fn with_config(config: FitterConfig) -> Self {
        Self {
            config,
            result: None,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Drops the loaded data and the ranking.
    pub fn clear(&mut self) {
        self.result = None;
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Fits a histogram of integer samples (several collections are
    /// merged).
    ///
    /// Returns `false` if there is no sample at all or a sample exceeds
    /// [`MAX_SAMPLE_VALUE`](crate::binned::MAX_SAMPLE_VALUE).
    pub fn process_samples(&mut self, sets: &[&[u32]]) -> bool {
        self.clear();
        if sets.iter().all(|s| s.is_empty()) {
            debug!("no samples to fit");
            return false;
        }
        match BinnedDistribution::from_sample_sets(sets, false) {
            Ok(hist) => self.process(hist),
            Err(err) => {
                warn!(%err, "samples rejected");
                false
            }
        }
    }

    /// Fits samples given as text (`;`, tab or newline separated).
    ///
    /// Returns `false` if any token is not a non-negative integer, a sample
    /// exceeds [`MAX_SAMPLE_VALUE`](crate::binned::MAX_SAMPLE_VALUE) or there
    /// is no sample at all.
    pub fn process_sample_texts(&mut self, texts: &[&str]) -> bool {
        self.clear();
        match BinnedDistribution::from_sample_texts(texts, false) {
            Ok(hist) if !hist.is_empty() => self.process(hist),
            Ok(_) => {
                debug!("no samples to fit");
                false
            }
            Err(err) => {
                warn!(%err, "sample text rejected");
                false
            }
        }
    }

    /// Fits density rows; each row is one weight per unit bin, rows are
    /// summed (shorter rows stretched to the longest).
    ///
    /// Returns `false` if there is no positive weight.
    pub fn process_density(&mut self, rows: &[&[f64]]) -> bool {
        self.clear();
        let rows: Vec<BinnedDistribution> = rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| BinnedDistribution::from_values(row.len() as f64, *row))
            .collect();
        self.process_density_rows(rows)
    }

    /// Fits density rows given as text (see
    /// [`BinnedDistribution::from_any_text`] for the format).
    ///
    /// Returns `false` for unparsable text or if there is no positive
    /// weight.
    pub fn process_density_texts(&mut self, texts: &[&str]) -> bool {
        self.clear();
        let mut rows = Vec::with_capacity(texts.len());
        for &text in texts {
            match BinnedDistribution::from_any_text(Some(text), 1.0) {
                Ok(row) if !row.is_empty() => rows.push(row),
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "density text rejected");
                    return false;
                }
            }
        }
        self.process_density_rows(rows)
    }

    fn process_density_rows(&mut self, rows: Vec<BinnedDistribution>) -> bool {
        let mut rows = rows.into_iter();
        let Some(mut total) = rows.next() else {
            debug!("no density rows to fit");
            return false;
        };
        for row in rows {
            total.add_to_this(&row);
        }
        let n = total.len();
        let total = BinnedDistribution::from_vec(n as f64, total.into_bins());
        if !(total.sum() > 0.0) {
            debug!("density rows carry no weight");
            return false;
        }
        self.process(total)
    }

    /// Fits an already built histogram of raw weights.
    ///
    /// Always succeeds; a histogram without positive weight yields an empty
    /// ranking with every family rejected.
    pub fn process(&mut self, counts: BinnedDistribution) -> bool {
        let result = self.fit(counts);
        debug!(
            ranked = result.ranked.len(),
            rejected = result.rejected.len(),
            best = result.best().map(|c| c.family().name()),
            "fit finished"
        );
        self.result = Some(result);
        true
    }

    fn fit(&self, counts: BinnedDistribution) -> FitResult {
        let total = counts.sum();
        let mut empirical = counts.clone();
        empirical.normalize_density();

        let moments = Moments::of(&empirical);
        let points = self.config.evaluation_points(empirical.len());

        let mut ranked = Vec::new();
        let mut rejected = Vec::new();
        for &family in &self.config.families {
            let candidate = moments
                .as_ref()
                .and_then(|m| self.candidate(family, m, &empirical, &counts, total, points));
            match candidate {
                Some(c) => {
                    debug!(family = family.name(), error = c.error, "family fitted");
                    ranked.push(c);
                }
                None => {
                    debug!(family = family.name(), "family rejected");
                    rejected.push(family);
                }
            }
        }

        ranked.sort_by(|a, b| a.error.total_cmp(&b.error).then(a.family().cmp(&b.family())));

        FitResult {
            empirical,
            counts,
            ranked,
            rejected,
        }
    }

    fn candidate(
        &self,
        family: Family,
        moments: &Moments,
        empirical: &BinnedDistribution,
        counts: &BinnedDistribution,
        total: f64,
        points: usize,
    ) -> Option<FitCandidate> {
        let distribution = FittedDistribution::estimate(family, moments)?;

        let error = if family == Family::OnePoint {
            one_point_error(moments, &distribution)?
        } else {
            goodness::squared_error(empirical, &distribution, points)
        };
        if !error.is_finite() {
            return None;
        }

        let p_value_anderson_darling = if family == Family::Normal && self.config.anderson_darling {
            let p = distribution.parameters();
            goodness::anderson_darling_p_value(counts, p[0], p[1])
        } else {
            None
        };

        Some(FitCandidate {
            p_value_ks: goodness::ks_p_value(empirical, &distribution),
            p_value_chi_squared: goodness::chi_squared_p_value(empirical, &distribution, total),
            p_value_anderson_darling,
            error,
            distribution,
        })
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    /// The complete result of the last successful run.
    pub fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }

    /// Best fitting distribution.
    pub fn fit_distribution(&self) -> Option<&FittedDistribution> {
        self.result()?.best().map(|c| &c.distribution)
    }

    /// Normalized histogram of the loaded data.
    pub fn samples_distribution(&self) -> Option<&BinnedDistribution> {
        self.result().map(|r| &r.empirical)
    }

    /// Best fit as text: only its description if `short`, otherwise the
    /// full [`report`](Self::report). Empty without a result.
    pub fn result_text(&self, short: bool) -> String {
        if short {
            self.fit_distribution()
                .map(FittedDistribution::describe)
                .unwrap_or_default()
        } else {
            self.report()
        }
    }

    /// One summary line per ranked candidate.
    pub fn result_list(&self) -> Vec<String> {
        self.ranked().iter().map(FitCandidate::summary).collect()
    }

    /// Ranked distributions, best first.
    pub fn result_list_dist(&self) -> Vec<FittedDistribution> {
        self.ranked().iter().map(|c| c.distribution.clone()).collect()
    }

    /// Errors of the ranked distributions, ascending.
    pub fn result_list_error(&self) -> Vec<f64> {
        self.ranked().iter().map(|c| c.error).collect()
    }

    fn ranked(&self) -> &[FitCandidate] {
        self.result().map(|r| r.ranked.as_slice()).unwrap_or_default()
    }

    /// Plain-text report: data summary, ranking with all scores and the
    /// families that could not be fitted.
    pub fn report(&self) -> String {
        let Some(result) = self.result() else {
            return String::new();
        };
        let pct = |p: f64| Locale::INVARIANT.format_percent(p);
        let mut out = String::new();

        let data = &result.empirical;
        let _ = writeln!(out, "Bins: {}", data.len());
        let _ = writeln!(out, "Mean: {}", format_decimals(data.mean(), 4));
        let _ = writeln!(out, "Standard deviation: {}", format_decimals(data.standard_deviation(), 4));
        let _ = writeln!(out, "Compared distributions: {}", self.config.families.len());
        let _ = writeln!(out);
        let _ = writeln!(out, "Best fit:");
        for (rank, c) in result.ranked.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", rank + 1, c.distribution.describe());
            let _ = writeln!(out, "   Mean squared error: {}", format_error(c.error));
            let _ = writeln!(out, "   p-value (Kolmogorov-Smirnov): {}", pct(c.p_value_ks));
            let _ = writeln!(out, "   p-value (chi-squared): {}", pct(c.p_value_chi_squared));
            if let Some(p) = c.p_value_anderson_darling {
                let _ = writeln!(out, "   p-value (Anderson-Darling): {}", pct(p));
            }
        }
        if !result.rejected.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Not fittable:");
            for family in &result.rejected {
                let _ = writeln!(out, "   {family}");
            }
        }
        out
    }
}

/// Exact fit for a degenerate histogram, otherwise not applicable.
fn one_point_error(moments: &Moments, dist: &FittedDistribution) -> Option<f64> {
    let point = dist.parameters()[0];
    (moments.std_dev() < DEGENERATE_SD && (point - moments.mean).abs() < ONE_POINT_TOLERANCE).then_some(0.0)
}

/// Three decimals, or nine if three would show `0`.
fn format_error(error: f64) -> String {
    let s = format_decimals(error, 3);
    if s == "0" {
        format_decimals(error, 9)
    } else {
        s
    }
}
