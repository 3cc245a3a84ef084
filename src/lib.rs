//! # u-distfit
//!
//! Binned empirical distributions and moment-based distribution fitting.
//!
//! A histogram of observations (counts per unit bin, or any non-negative
//! weights over `[0, upper_bound]`) is compared with a closed catalog of
//! parametric families. Each family is estimated by the method of moments
//! and scored by the squared difference between its density and the
//! empirical one; the lowest score wins.
//!
//! ## Modules
//!
//! - [`binned`] — `BinnedDistribution`: discretized distribution with lazy
//!   cumulative cache, arithmetic, sampling and a text codec
//! - [`catalog`] — Parametric families (normal, log-normal, gamma, Weibull, ...)
//!   with moment estimators and CDFs
//! - [`fitter`] — Ranking fitter, goodness-of-fit metrics and the
//!   multimodal mixture fitter
//! - [`special`] — Root bisection (special functions come from `u-numflow`)
//! - [`error`] — Error type of the strict parsers and queries
//!
//! ## Example
//!
//! ```
//! use u_distfit::fitter::DistributionFitter;
//!
//! let samples = [3u32, 4, 4, 5, 5, 5, 6, 6, 7, 9];
//! let mut fitter = DistributionFitter::new();
//! assert!(fitter.process_samples(&[&samples]));
//! println!("{}", fitter.report());
//! assert!(fitter.fit_distribution().is_some());
//! ```
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: no clocks, no hidden randomness; ties are broken in
//!   catalog order
//! - **Numerical stability**: Leverages `u-numflow` for special functions and
//!   the standard distributions
//! - **Quiet library**: diagnostics go through `tracing`, no subscriber is
//!   installed

pub mod binned;
pub mod catalog;
pub mod error;
pub mod fitter;
pub mod special;

pub use binned::BinnedDistribution;
pub use catalog::{Family, FittedDistribution};
pub use error::{DistributionError, Result};
pub use fitter::{DistributionFitter, MultiModalFitter};
