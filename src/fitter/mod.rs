//! Fitting parametric families to empirical histograms.
//!
//! # Single-family ranking
//!
//! - [`DistributionFitter`] — estimates every catalog family by the method
//!   of moments and ranks them by squared density error
//! - [`FitterConfig`] — candidate families, error grid and optional tests
//! - [`goodness`] — squared error, Kolmogorov-Smirnov, χ² and
//!   Anderson-Darling metrics
//!
//! # Mixtures
//!
//! - [`MultiModalFitter`] — splits a multimodal histogram into up to four
//!   log-normal or gamma components
//!
//! # References
//!
//! - D'Agostino, R.B., Stephens, M.A. (1986). *Goodness-of-Fit Techniques*.
//! - Law, A.M. (2015). *Simulation Modeling and Analysis*, 5th ed., ch. 6.

mod config;
pub mod goodness;
mod multimodal;
mod single;

pub use config::{FitterConfig, DEFAULT_EVALUATION_SPAN, DEFAULT_MAX_EVALUATION_POINTS};
pub use multimodal::{Component, ComponentFamily, MultiModalFitter};
pub use single::{DistributionFitter, FitCandidate, FitResult};
