//! Dataset loading and regression orchestration for trace distributions
//!
//! This crate connects trace datasets on disk to the numerical routines of
//! [`tracefit_stats`].
//!
//! # Overview
//!
//! 1. **Load Datasets** ([`dataset::Dataset`]): Read aggregated (value, count) CSV files
//! 2. **Select Features** ([`feature::FeatureKind`]): Only allow-listed features are regressed
//! 3. **Regress** ([`regression::Regression`]): Rebin, normalize, fit and score every
//!    configured distribution family in four combinations
//! 4. **Collect Results** ([`regression::RegressionSink`]): Store scores and render plots
//!
//! The crate performs no IO beyond reading datasets; where results end up is
//! up to the [`regression::RegressionSink`] implementation.

pub mod dataset;
pub mod feature;
pub mod regression;
