//! Batch regression of distribution families over trace datasets
//!
//! This module drives the whole pipeline for one dataset at a time and hands
//! the results to a [`RegressionSink`], which decides where scores and plots
//! go.
//!
//! # Pipeline
//!
//! For every configured dataset:
//!
//! 1. **Allow-list**: feature names outside [`FeatureKind`] are skipped
//! 2. **Load**: read the CSV and sort by feature value ([`Dataset`])
//! 3. **Rebin**: aggregate onto log-spaced edges over `[1, max)`; an empty
//!    result skips the dataset
//! 4. **Normalize**: build the [`EmpiricalCurve`]; failure skips the dataset
//! 5. **Regress**: for each combination in [`COMBINATIONS`], fit and score
//!    every configured family, then pass the scores and the fitted curves to
//!    the sink
//!
//! A family that fails to fit or score is left out of that combination's
//! scores; the other families are unaffected.
//!
//! # Failure Isolation
//!
//! Nothing that goes wrong with one dataset stops the others. The outcome of
//! each dataset is recorded in the [`RunSummary`]:
//!
//! ```text
//! DatasetOutcome
//! ├─ Regressed  (all four combinations were handed to the sink)
//! ├─ Skipped    (unsupported feature, empty after rebinning, unprocessable)
//! └─ Failed     (the CSV could not be loaded or the sink returned an error)
//! ```
//!
//! # Examples
//!
//! ```
//! use tracefit_analysis::{
//!     dataset::{Dataset, RawObservation},
//!     regression::{Regression, RegressionConfig},
//! };
//! use tracefit_stats::{
//!     distribution::DistributionFamily,
//!     fit::{RegressionTarget, Weighting},
//! };
//!
//! let dataset = Dataset::from_observations(
//!     (1..=200)
//!         .map(|i| RawObservation {
//!             feature_value: f64::from(i),
//!             count: (1000.0 * (-f64::from(i) / 20.0).exp()).round() as u64,
//!         })
//!         .collect(),
//! );
//!
//! let regression = Regression::new(RegressionConfig {
//!     families: vec![DistributionFamily::Exponential],
//!     ..RegressionConfig::default()
//! });
//! let curve = regression.prepare(&dataset).unwrap();
//! let result = regression.regress(&curve, RegressionTarget::Pdf, Weighting::Unweighted);
//! assert!(result.scores.contains_key(&DistributionFamily::Exponential));
//! ```

use std::{
    collections::BTreeMap,
    error::Error,
    fmt,
    path::{Path, PathBuf},
};

use tracefit_stats::{
    distribution::DistributionFamily,
    empirical::{EmpiricalCurve, NormalizeError},
    fit::{self, FitError, FitOptions, FittedCurve, RegressionTarget, Weighting},
    goodness::{GoodnessOfFit, ScoreError},
    rebin::{RebinnedSeries, log_spaced_edges},
};

use crate::{
    dataset::{Dataset, DatasetError},
    feature::{AxisLabels, FeatureKind, UnsupportedFeature},
};

/// Regression combinations in the order they are run for every dataset.
pub const COMBINATIONS: [(RegressionTarget, Weighting); 4] = [
    (RegressionTarget::Survival, Weighting::Unweighted),
    (RegressionTarget::Pdf, Weighting::Unweighted),
    (RegressionTarget::Survival, Weighting::Weighted),
    (RegressionTarget::Pdf, Weighting::Weighted),
];

/// Scores of every family that fitted successfully, keyed by family.
pub type GoodnessOfFitResult = BTreeMap<DistributionFamily, GoodnessOfFit>;

/// Explicit configuration of a regression run.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionConfig {
    /// Families fitted for every combination, in fitting order
    pub families: Vec<DistributionFamily>,
    /// Number of log-spaced bin edges
    pub num_bins: usize,
    pub fit_options: FitOptions,
    /// Axis labels per feature
    pub labels: BTreeMap<FeatureKind, AxisLabels>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            families: DistributionFamily::ACTIVE.to_vec(),
            num_bins: 1000,
            fit_options: FitOptions::default(),
            labels: FeatureKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.axis_labels()))
                .collect(),
        }
    }
}

impl RegressionConfig {
    #[must_use]
    pub fn labels_for(&self, feature: FeatureKind) -> AxisLabels {
        self.labels
            .get(&feature)
            .cloned()
            .unwrap_or_else(|| feature.axis_labels())
    }
}

/// Identifies one regression combination of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegressionKey {
    pub data_type: String,
    pub feature: FeatureKind,
    pub target: RegressionTarget,
    pub weighting: Weighting,
}

impl fmt::Display for RegressionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({}, {})",
            self.data_type, self.feature, self.target, self.weighting
        )
    }
}

impl RegressionKey {
    /// `{feature}_{target}_{weighting}`, shared by the score and plot files.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.feature, self.target, self.weighting)
    }

    /// `{root}/{data_type}_regressed`
    #[must_use]
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(format!("{}_regressed", self.data_type))
    }
}

/// One configured dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSource {
    pub data_type: String,
    pub feature_name: String,
    pub path: PathBuf,
}

/// Why a family is missing from a combination's scores.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum FamilyError {
    #[display("fit failed: {_0}")]
    Fit(FitError),
    #[display("scoring failed: {_0}")]
    Score(ScoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilyFailure {
    pub family: DistributionFamily,
    pub error: FamilyError,
}

/// Result of one combination over one empirical curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationResult {
    pub target: RegressionTarget,
    pub weighting: Weighting,
    pub scores: GoodnessOfFitResult,
    /// Non-empty fitted curves, in fitting order
    pub fitted: Vec<FittedCurve>,
    pub failures: Vec<FamilyFailure>,
}

/// Everything a renderer needs for one comparison plot.
#[derive(Debug, Clone, Copy)]
pub struct PlotRequest<'a> {
    pub key: &'a RegressionKey,
    pub labels: &'a AxisLabels,
    pub empirical: &'a EmpiricalCurve,
    pub fitted: &'a [FittedCurve],
}

/// Destination of regression results.
///
/// Only [`write_scores`](Self::write_scores) and [`render`](Self::render)
/// are required. The remaining methods are progress notifications with no-op
/// defaults.
pub trait RegressionSink {
    type Error: fmt::Display + fmt::Debug;

    /// Stores the scores of one combination.
    fn write_scores(
        &mut self,
        key: &RegressionKey,
        scores: &GoodnessOfFitResult,
    ) -> Result<(), Self::Error>;

    /// Renders the comparison plot of one combination.
    fn render(&mut self, plot: &PlotRequest<'_>) -> Result<(), Self::Error>;

    fn dataset_started(&mut self, _source: &DatasetSource) {}

    fn fit_started(&mut self, _key: &RegressionKey, _family: DistributionFamily) {}

    fn fit_failed(&mut self, _key: &RegressionKey, _failure: &FamilyFailure) {}

    fn dataset_finished(
        &mut self,
        _source: &DatasetSource,
        _outcome: &DatasetOutcome<Self::Error>,
    ) {
    }
}

/// Why a dataset produced no results.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum SkipReason {
    #[display("{_0}")]
    UnsupportedFeature(UnsupportedFeature),
    #[display("largest feature value {max_value} is below 1")]
    OutOfRange { max_value: f64 },
    #[display("no counts left after rebinning {observations} observations")]
    EmptyAfterRebin { observations: usize },
    #[display("unprocessable dataset ({bins} bins, {total_count} tasks): {error}")]
    Unprocessable {
        error: NormalizeError,
        bins: usize,
        total_count: u64,
    },
}

#[derive(Debug)]
pub enum RegressionError<E> {
    Dataset(DatasetError),
    Sink(E),
}

impl<E> fmt::Display for RegressionError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset(err) => fmt::Display::fmt(err, f),
            Self::Sink(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<E> Error for RegressionError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Dataset(err) => err.source(),
            Self::Sink(err) => err.source(),
        }
    }
}

#[derive(Debug, derive_more::IsVariant)]
pub enum DatasetOutcome<E> {
    Regressed {
        /// Number of (combination, family) pairs left out of the scores
        fit_failures: usize,
    },
    Skipped(SkipReason),
    Failed(RegressionError<E>),
}

#[derive(Debug)]
pub struct RunSummary<E> {
    pub outcomes: Vec<(DatasetSource, DatasetOutcome<E>)>,
}

impl<E> RunSummary<E> {
    #[must_use]
    pub fn regressed(&self) -> usize {
        self.count(DatasetOutcome::is_regressed)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(DatasetOutcome::is_skipped)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(DatasetOutcome::is_failed)
    }

    fn count(&self, pred: impl Fn(&DatasetOutcome<E>) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .count()
    }
}

/// Signature of the function used to fit one family.
pub type FitFn = fn(
    &EmpiricalCurve,
    DistributionFamily,
    RegressionTarget,
    Weighting,
    FitOptions,
) -> Result<FittedCurve, FitError>;

/// Regression orchestrator.
///
/// `F` fits one family to a curve; [`Regression::new`] uses
/// [`fit::fit_curve`].
#[derive(Debug, Clone)]
pub struct Regression<F = FitFn> {
    config: RegressionConfig,
    fit: F,
}

impl Regression {
    #[must_use]
    pub fn new(config: RegressionConfig) -> Self {
        Self {
            config,
            fit: fit::fit_curve,
        }
    }
}

impl<F> Regression<F>
where
    F: Fn(
        &EmpiricalCurve,
        DistributionFamily,
        RegressionTarget,
        Weighting,
        FitOptions,
    ) -> Result<FittedCurve, FitError>,
{
    /// Uses `fit` in place of the least-squares fitter.
    pub fn with_fitter(config: RegressionConfig, fit: F) -> Self {
        Self { config, fit }
    }

    #[must_use]
    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Rebins and normalizes a dataset into the curve every combination is
    /// fitted against.
    ///
    /// # Errors
    ///
    /// Returns the reason the dataset has to be skipped.
    pub fn prepare(&self, dataset: &Dataset) -> Result<EmpiricalCurve, SkipReason> {
        let Some(max_value) = dataset.max_feature_value() else {
            return Err(SkipReason::EmptyAfterRebin { observations: 0 });
        };
        // Edges start at 1, so a smaller maximum would make them descend.
        if max_value < 1.0 {
            return Err(SkipReason::OutOfRange { max_value });
        }

        let edges = log_spaced_edges(max_value, self.config.num_bins);
        let series =
            RebinnedSeries::from_sorted(&dataset.feature_values(), &dataset.counts(), &edges);
        if series.is_empty() {
            return Err(SkipReason::EmptyAfterRebin {
                observations: dataset.len(),
            });
        }

        EmpiricalCurve::from_rebinned(&series).map_err(|error| SkipReason::Unprocessable {
            error,
            bins: series.len(),
            total_count: series.total_count(),
        })
    }

    /// Fits and scores every configured family for one combination.
    pub fn regress(
        &self,
        curve: &EmpiricalCurve,
        target: RegressionTarget,
        weighting: Weighting,
    ) -> CombinationResult {
        self.regress_observed(curve, target, weighting, |_| {})
    }

    fn regress_observed(
        &self,
        curve: &EmpiricalCurve,
        target: RegressionTarget,
        weighting: Weighting,
        mut on_start: impl FnMut(DistributionFamily),
    ) -> CombinationResult {
        let mut result = CombinationResult {
            target,
            weighting,
            scores: BTreeMap::new(),
            fitted: vec![],
            failures: vec![],
        };

        for &family in &self.config.families {
            on_start(family);
            let scored = (self.fit)(curve, family, target, weighting, self.config.fit_options)
                .map_err(FamilyError::from)
                .and_then(|fitted| {
                    let score = GoodnessOfFit::score(curve, &fitted).map_err(FamilyError::from);
                    if !fitted.is_empty() {
                        result.fitted.push(fitted);
                    }
                    score
                });
            match scored {
                Ok(score) => {
                    result.scores.insert(family, score);
                }
                Err(error) => result.failures.push(FamilyFailure { family, error }),
            }
        }

        result
    }

    /// Runs all combinations of one loaded dataset.
    pub fn regress_dataset<S>(
        &self,
        data_type: &str,
        feature: FeatureKind,
        dataset: &Dataset,
        sink: &mut S,
    ) -> DatasetOutcome<S::Error>
    where
        S: RegressionSink,
    {
        let curve = match self.prepare(dataset) {
            Ok(curve) => curve,
            Err(reason) => return DatasetOutcome::Skipped(reason),
        };
        let labels = self.config.labels_for(feature);

        let mut fit_failures = 0;
        for (target, weighting) in COMBINATIONS {
            let key = RegressionKey {
                data_type: data_type.to_owned(),
                feature,
                target,
                weighting,
            };
            let result = self.regress_observed(&curve, target, weighting, |family| {
                sink.fit_started(&key, family);
            });
            for failure in &result.failures {
                sink.fit_failed(&key, failure);
            }
            fit_failures += result.failures.len();

            if let Err(err) = sink.write_scores(&key, &result.scores) {
                return DatasetOutcome::Failed(RegressionError::Sink(err));
            }
            let plot = PlotRequest {
                key: &key,
                labels: &labels,
                empirical: &curve,
                fitted: &result.fitted,
            };
            if let Err(err) = sink.render(&plot) {
                return DatasetOutcome::Failed(RegressionError::Sink(err));
            }
        }

        DatasetOutcome::Regressed { fit_failures }
    }

    /// Loads and regresses one configured dataset file.
    pub fn run_source<S>(&self, source: &DatasetSource, sink: &mut S) -> DatasetOutcome<S::Error>
    where
        S: RegressionSink,
    {
        let feature = match source.feature_name.parse::<FeatureKind>() {
            Ok(feature) => feature,
            Err(err) => return DatasetOutcome::Skipped(SkipReason::UnsupportedFeature(err)),
        };
        let dataset = match Dataset::open(&source.path, feature.id()) {
            Ok(dataset) => dataset,
            Err(err) => return DatasetOutcome::Failed(RegressionError::Dataset(err)),
        };
        self.regress_dataset(&source.data_type, feature, &dataset, sink)
    }

    /// Regresses every source in order.
    pub fn run<I, S>(&self, sources: I, sink: &mut S) -> RunSummary<S::Error>
    where
        I: IntoIterator<Item = DatasetSource>,
        S: RegressionSink,
    {
        let mut outcomes = vec![];
        for source in sources {
            sink.dataset_started(&source);
            let outcome = self.run_source(&source, sink);
            sink.dataset_finished(&source, &outcome);
            outcomes.push((source, outcome));
        }
        RunSummary { outcomes }
    }
}
