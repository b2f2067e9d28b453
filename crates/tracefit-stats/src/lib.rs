//! Numerical core of the tracefit pipeline.
//!
//! This crate turns aggregated trace histograms into fitted distribution
//! families and scores:
//!
//! - **Rebinning**: aggregate (value, count) rows onto log-spaced bin edges
//! - **Empirical curves**: pdf, cdf, survival and fit weights per bin
//! - **Distribution families**: scipy-style `loc`/`scale` families backed by `statrs`
//! - **Fitting**: Levenberg-Marquardt least squares with an evaluation budget
//! - **Goodness of fit**: Kolmogorov-Smirnov distance and Pearson chi-square
//!
//! # Modules
//!
//! - [`rebin`]: Log-spaced edges and count aggregation
//! - [`empirical`]: Normalization of rebinned counts into an [`empirical::EmpiricalCurve`]
//! - [`distribution`]: The closed set of [`distribution::DistributionFamily`] values
//! - [`solver`]: Generic nonlinear least squares
//! - [`fit`]: Fitting a family to an empirical curve
//! - [`goodness`]: Scoring a fitted curve
//!
//! # Examples
//!
//! ```
//! use tracefit_stats::{
//!     distribution::DistributionFamily,
//!     empirical::EmpiricalCurve,
//!     fit::{FitOptions, RegressionTarget, Weighting, fit_curve},
//!     goodness::GoodnessOfFit,
//!     rebin::{RebinnedSeries, log_spaced_edges},
//! };
//!
//! let values = [1.0, 2.0, 5.0, 5.0, 100.0];
//! let counts = [10, 5, 3, 2, 1];
//!
//! let series = RebinnedSeries::from_sorted(&values, &counts, &log_spaced_edges(100.0, 1000));
//! let curve = EmpiricalCurve::from_rebinned(&series).unwrap();
//! let fitted = fit_curve(
//!     &curve,
//!     DistributionFamily::Exponential,
//!     RegressionTarget::Pdf,
//!     Weighting::Unweighted,
//!     FitOptions::default(),
//! )
//! .unwrap();
//! let score = GoodnessOfFit::score(&curve, &fitted).unwrap();
//! assert!(score.ks_dist < 1.0);
//! ```

pub mod distribution;
pub mod empirical;
pub mod fit;
pub mod goodness;
pub mod rebin;
pub mod solver;
