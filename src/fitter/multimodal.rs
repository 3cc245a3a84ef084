//! Decomposition of a multimodal histogram into a mixture of unimodal
//! components.
//!
//! The fitter peels off one component per step: it takes the highest bin
//! of the remaining weight as the component's mode, searches the mean that
//! puts a log-normal (or gamma) of the residual's SD at that mode, shrinks
//! the SD until the component does not claim more weight than is there and
//! subtracts it. At most four components are extracted; extraction stops
//! early once they explain 99% of the weight. A final coordinate search
//! re-balances the fractions so the mixture matches the data at every
//! component mode.
//!
//! All positions (modes, means, SDs) are bin indices.
//!
//! # Examples
//!
//! ```
//! use u_distfit::binned::BinnedDistribution;
//! use u_distfit::catalog::{Family, FittedDistribution};
//! use u_distfit::fitter::{ComponentFamily, MultiModalFitter};
//!
//! let low = FittedDistribution::new(Family::LogNormal, vec![20.0, 8.0]).unwrap();
//! let high = FittedDistribution::new(Family::LogNormal, vec![120.0, 15.0]).unwrap();
//! let bins: Vec<f64> = (0..400)
//!     .map(|i| 1e5 * (0.6 * low.density(i as f64) + 0.4 * high.density(i as f64)))
//!     .collect();
//! let hist = BinnedDistribution::from_vec(400.0, bins);
//!
//! let mut fitter = MultiModalFitter::new(ComponentFamily::LogNormal);
//! assert!(fitter.process(&hist));
//! let total: f64 = fitter.components().iter().map(|c| c.fraction).sum();
//! assert!((total - 1.0).abs() < 1e-9);
//! assert!(fitter.calculation_command().starts_with("RandomValues("));
//! ```

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::binned::{format_decimals, BinnedDistribution, Locale};
use crate::catalog::{Family, FittedDistribution, Moments};
use crate::special::bisect;

/// Upper limit on extracted components.
const MAX_COMPONENTS: usize = 4;

/// Explained weight after which extraction stops.
const EXPLAINED_SHARE: f64 = 0.99;

/// Share of the weight the first component may claim at its mode.
const FIRST_MAX_FRACTION: f64 = 0.95;

/// Same limit for later components.
const LATER_MAX_FRACTION: f64 = 1.1;

/// SD shrink factor per refinement round.
const SD_SHRINK: f64 = 0.8;

/// Refinement rounds per component.
const MAX_SD_ROUNDS: usize = 10;

/// Stand-in weight for an empty first bin.
const EMPTY_ORIGIN_WEIGHT: f64 = 0.0001;

/// Lower bound for a component mean.
const MIN_MEAN: f64 = 0.001;

/// Fraction step of the re-balancing search.
const FRACTION_STEP: f64 = 0.01;

/// Unsuccessful sweeps after which the re-balancing search stops.
const STALE_SWEEPS: usize = 3;

/// Bisection budget of the mean search.
const MEAN_SEARCH_ITERATIONS: usize = 100;

/// Family used for the mixture components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentFamily {
    /// Log-normal components.
    #[default]
    LogNormal,
    /// Gamma components.
    Gamma,
}

impl ComponentFamily {
    /// The matching catalog family.
    pub fn family(self) -> Family {
        match self {
            ComponentFamily::LogNormal => Family::LogNormal,
            ComponentFamily::Gamma => Family::Gamma,
        }
    }

    /// Component with the given mean and SD, or `None` unless both are
    /// positive.
    pub fn distribution(self, mean: f64, sd: f64) -> Option<FittedDistribution> {
        let moments = Moments {
            mean,
            variance: sd * sd,
            min: 0.0,
            max: 0.0,
        };
        FittedDistribution::estimate(self.family(), &moments)
    }

    /// Mean that puts the mode of a component with SD `sd` at `mode`.
    ///
    /// Searched by bisection on `[0, 10·len]`. A gamma component with a
    /// mode at the origin keeps `fallback`.
    fn mean_for_mode(self, mode: f64, sd: f64, fallback: f64, len: usize) -> Option<f64> {
        let hi = 10.0 * len as f64;
        let s2 = sd * sd;
        match self {
            ComponentFamily::LogNormal => bisect(
                |x| x.powi(4) / (s2 + x * x).powf(1.5) - mode,
                0.0,
                hi,
                MEAN_SEARCH_ITERATIONS,
            ),
            ComponentFamily::Gamma if mode <= EMPTY_ORIGIN_WEIGHT => Some(fallback),
            // mode = mean − sd²/mean; diverges at 0, so start just above it
            ComponentFamily::Gamma => bisect(|x| (x * x - s2) / x - mode, 1e-9, hi, MEAN_SEARCH_ITERATIONS),
        }
    }

    fn command_name(self) -> &'static str {
        match self {
            ComponentFamily::LogNormal => "LogNormalDist",
            ComponentFamily::Gamma => "GammaDistDirect",
        }
    }
}

/// One extracted mixture component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Bin the component was anchored at.
    pub mode: usize,
    /// Component mean.
    pub mean: f64,
    /// Component standard deviation.
    pub sd: f64,
    /// Share of the total weight.
    pub fraction: f64,
}

/// Splits a histogram into up to four log-normal or gamma components.
#[derive(Debug, Clone, Default)]
pub struct MultiModalFitter {
    family: ComponentFamily,
    components: Vec<Component>,
    initial_fractions: Vec<f64>,
}

impl MultiModalFitter {
    /// Fitter using `family` for every component.
    pub fn new(family: ComponentFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    /// Component family.
    pub fn family(&self) -> ComponentFamily {
        self.family
    }

    /// Drops the components of the last run.
    pub fn clear(&mut self) {
        self.components.clear();
        self.initial_fractions.clear();
    }

    /// Decomposes `dist`, replacing any previous result.
    ///
    /// Returns `false` if not even one component could be extracted (empty
    /// or weightless input).
    pub fn process(&mut self, dist: &BinnedDistribution) -> bool {
        self.clear();
        if dist.is_empty() {
            return false;
        }
        let n = dist.len();
        let original = BinnedDistribution::from_vec(n as f64, dist.bins().to_vec());

        let mut residual = original.clone();
        for _ in 0..MAX_COMPONENTS {
            match self.extract(&residual) {
                Some(next) => residual = next,
                None => break,
            }
            let explained: f64 = self.components.iter().map(|c| c.fraction).sum();
            if explained > EXPLAINED_SHARE {
                break;
            }
        }
        if self.components.is_empty() {
            debug!("no component found");
            return false;
        }

        self.initial_fractions = self.components.iter().map(|c| c.fraction).collect();
        self.rebalance(&original);
        debug!(components = self.components.len(), "multimodal fit finished");
        true
    }

    /// Fits one component to `remaining` and returns what is left.
    fn extract(&mut self, remaining: &BinnedDistribution) -> Option<BinnedDistribution> {
        let mut bins = remaining.bins().to_vec();
        if bins[0] == 0.0 {
            bins[0] = EMPTY_ORIGIN_WEIGHT;
        }
        for b in bins.iter_mut().skip(1) {
            if *b < 0.0 {
                *b = 0.0;
            }
        }
        let n = bins.len();
        let dist = BinnedDistribution::from_vec(n as f64, bins);

        let sum = dist.sum();
        let mean = dist.mean();
        let Some(&mode) = dist.mode_indices().first() else {
            trace!("no mode left");
            return None;
        };

        let max_fraction = if self.components.is_empty() {
            FIRST_MAX_FRACTION
        } else {
            LATER_MAX_FRACTION
        };

        let mut sd = dist.standard_deviation();
        let mut round = 1;
        let (estimate, partial, fraction) = loop {
            let Some(estimate) = self.family.mean_for_mode(mode as f64, sd, mean, n) else {
                trace!(mode, sd, "mean search failed");
                return None;
            };
            let estimate = estimate.max(MIN_MEAN);
            let partial = self.partial_density(estimate, sd, n)?;
            let at_mode = partial[mode];
            let fraction = (if at_mode <= 0.0 { 1.0 } else { dist.bins()[mode] / at_mode }) / sum;
            if fraction < max_fraction || round >= MAX_SD_ROUNDS {
                break (estimate, partial, fraction);
            }
            sd *= SD_SHRINK;
            round += 1;
        };

        let claimed: f64 = self.components.iter().map(|c| c.fraction).sum();
        let component = Component {
            mode,
            mean: estimate,
            sd,
            fraction: (1.0 - claimed) * fraction.min(1.0),
        };
        trace!(step = self.components.len() + 1, ?component, "component extracted");
        self.components.push(component);

        let scale = max_fraction * sum;
        let mut residual: Vec<f64> = dist
            .bins()
            .iter()
            .zip(&partial)
            .map(|(&b, &p)| b - p * scale)
            .collect();

        // Leading bins that still hold the maximum are edge artifacts.
        let mut first = 0;
        while first < residual.len() && last_arg_max(&residual) == Some(first) {
            residual[first] = 0.0;
            first += 1;
        }

        Some(BinnedDistribution::from_vec(n as f64, residual))
    }

    /// Component density on bins `0..n - 1`; the last bin stays `0`.
    fn partial_density(&self, mean: f64, sd: f64, n: usize) -> Option<Vec<f64>> {
        let component = self.family.distribution(mean, sd)?;
        let mut values: Vec<f64> = (0..n)
            .map(|i| {
                let d = component.density(i as f64);
                if d.is_finite() {
                    d
                } else {
                    0.0
                }
            })
            .collect();
        if let Some(last) = values.last_mut() {
            *last = 0.0;
        }
        Some(values)
    }

    /// Coordinate search on the fractions: matches the mixture density to
    /// the data at every component mode, keeping the fractions' sum.
    fn rebalance(&mut self, original: &BinnedDistribution) {
        let k = self.components.len();
        let sum = original.sum();
        let modes: Vec<usize> = self.components.iter().map(|c| c.mode.max(1)).collect();
        let target: Vec<f64> = modes
            .iter()
            .map(|&m| original.bins().get(m).copied().unwrap_or(0.0) / sum)
            .collect();
        // densities[j][i]: component j at mode i
        let densities: Vec<Vec<f64>> = self
            .components
            .iter()
            .map(|c| {
                let d = self.family.distribution(c.mean, c.sd);
                modes
                    .iter()
                    .map(|&m| d.as_ref().map_or(0.0, |d| d.density(m as f64)))
                    .collect()
            })
            .collect();

        let objective = |fractions: &[f64]| -> f64 {
            if fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
                return f64::MAX;
            }
            (0..k)
                .filter(|&i| target[i] > 0.0)
                .map(|i| {
                    let y: f64 = (0..k).map(|j| densities[j][i] * fractions[j]).sum();
                    (y - target[i]).abs() / target[i]
                })
                .sum()
        };

        let mut fractions = self.initial_fractions.clone();
        let mut stale = 0;
        while stale < STALE_SWEEPS {
            stale += 1;
            for index in 0..k {
                let up = shift_fraction(&fractions, index, 1.0);
                let down = shift_fraction(&fractions, index, -1.0);
                let current = objective(&fractions);
                let (e_up, e_down) = (objective(&up), objective(&down));
                if e_up < current || e_down < current {
                    fractions = if e_up < e_down { up } else { down };
                    stale = 0;
                }
            }
        }

        let total: f64 = fractions.iter().sum();
        for (c, f) in self.components.iter_mut().zip(fractions) {
            c.fraction = f / total;
        }
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    /// Extracted components in extraction order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The components as catalog distributions.
    pub fn distributions(&self) -> Vec<FittedDistribution> {
        self.components
            .iter()
            .filter_map(|c| self.family.distribution(c.mean, c.sd))
            .collect()
    }

    /// Expression drawing random numbers from the mixture, e.g.
    /// `RandomValues(0.75;LogNormalDist(50.2;99.8);0.25;LogNormalDist(150;30))`.
    ///
    /// Fractions have two decimals, means and SDs one. Empty without
    /// components.
    pub fn calculation_command(&self) -> String {
        if self.components.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| {
                format!(
                    "{};{}({};{})",
                    format_decimals(c.fraction, 2),
                    self.family.command_name(),
                    format_decimals(c.mean, 1),
                    format_decimals(c.sd, 1)
                )
            })
            .collect();
        format!("RandomValues({})", parts.join(";"))
    }

    /// Plain-text protocol of the last run. Empty without components.
    pub fn report(&self) -> String {
        if self.components.is_empty() {
            return String::new();
        }
        let pct = |f: &f64| Locale::INVARIANT.format_percent(*f);
        let mut out = String::new();
        let _ = writeln!(out, "Component distribution: {}", self.family.family().name());
        for (step, c) in self.components.iter().enumerate() {
            let _ = writeln!(out, "Step {}:", step + 1);
            let _ = writeln!(out, "  Mode: {}", c.mode);
            let _ = writeln!(
                out,
                "  Approximation: mean={}, sd={}",
                format_decimals(c.mean, 1),
                format_decimals(c.sd, 1)
            );
            if let Some(f) = self.initial_fractions.get(step) {
                let _ = writeln!(out, "  Fraction: {}", pct(f));
            }
        }
        let initial: Vec<String> = self.initial_fractions.iter().map(pct).collect();
        let optimized: Vec<String> = self.components.iter().map(|c| pct(&c.fraction)).collect();
        let _ = writeln!(out, "Fraction re-balancing:");
        let _ = writeln!(out, "  Before: {}", initial.join(", "));
        let _ = writeln!(out, "  After: {}", optimized.join(", "));
        let _ = writeln!(out, "Calculation command:");
        let _ = writeln!(out, "  {}", self.calculation_command());
        out
    }
}

/// Moves `FRACTION_STEP` towards (`direction > 0`) or away from `index`,
/// spreading the opposite change evenly over the other entries.
fn shift_fraction(fractions: &[f64], index: usize, direction: f64) -> Vec<f64> {
    let others = fractions.len().saturating_sub(1).max(1) as f64;
    fractions
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            if i == index {
                f + direction * FRACTION_STEP
            } else {
                f - direction * FRACTION_STEP / others
            }
        })
        .collect()
}

/// Index of the maximum; the highest index wins ties.
fn last_arg_max(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.map_or(true, |(_, b)| v >= b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}
