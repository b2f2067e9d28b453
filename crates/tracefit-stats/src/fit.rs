//! Fitting distribution families to empirical curves.
//!
//! A fit always regresses the family's **density** function against one
//! column of the empirical curve. With [`RegressionTarget::Survival`] the
//! dependent variable is the survival column, but the model is still the
//! pdf. Downstream consumers rely on this pairing, so it is kept as is.
//!
//! Weighted fits use the empirical `weight` column as the standard deviation
//! of each point: residuals are divided by it.
//!
//! After fitting, the family's pdf, cdf and sf are evaluated at every
//! empirical feature value and filtered in two passes: first to finite,
//! strictly positive pdf values, then to finite, strictly positive survival
//! values.

use std::fmt;

use crate::{
    distribution::DistributionFamily,
    empirical::EmpiricalCurve,
    solver::{self, LeastSquaresOptions, SolverError},
};

/// Which empirical column a regression is fitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegressionTarget {
    Pdf,
    Survival,
}

impl fmt::Display for RegressionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.id(), f)
    }
}

impl RegressionTarget {
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Survival => "survival",
        }
    }
}

/// Whether residuals are scaled by the empirical weight column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weighting {
    Unweighted,
    Weighted,
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.id(), f)
    }
}

impl Weighting {
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Unweighted => "unweighted",
            Self::Weighted => "weighted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum FitError {
    #[display("{points} points cannot determine {params} parameters")]
    TooFewPoints { points: usize, params: usize },
    #[display("{_0}")]
    Solver(#[error(source)] SolverError),
}

impl From<SolverError> for FitError {
    fn from(err: SolverError) -> Self {
        Self::Solver(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    /// Maximum number of pdf evaluations per fit.
    pub max_evaluations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 1000,
        }
    }
}

impl FitOptions {
    fn solver_options(self) -> LeastSquaresOptions {
        LeastSquaresOptions {
            max_evaluations: self.max_evaluations,
            ..LeastSquaresOptions::default()
        }
    }
}

/// Parameters returned by a fit, in the family's parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct FitParameters {
    values: Vec<f64>,
}

impl FitParameters {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// A fitted family evaluated at one empirical point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedPoint {
    /// Index of the empirical point this was evaluated at.
    pub row: usize,
    pub variate: f64,
    pub pdf: f64,
    pub cdf: f64,
    pub survival: f64,
}

impl FittedPoint {
    #[must_use]
    pub fn value_of(&self, target: RegressionTarget) -> f64 {
        match target {
            RegressionTarget::Pdf => self.pdf,
            RegressionTarget::Survival => self.survival,
        }
    }
}

/// A fitted family evaluated over the empirical support.
///
/// Every point has a finite, strictly positive pdf and survival.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCurve {
    family: DistributionFamily,
    parameters: FitParameters,
    points: Vec<FittedPoint>,
}

impl FittedCurve {
    /// Evaluates `family` with `parameters` at each variate and filters out
    /// points with unusable pdf or survival values.
    #[must_use]
    pub fn evaluate(
        family: DistributionFamily,
        parameters: FitParameters,
        variates: &[f64],
    ) -> Self {
        let params = parameters.as_slice();
        let pdf = family.pdf(variates, params);
        let cdf = family.cdf(variates, params);
        let survival = family.sf(variates, params);

        let mut points = variates
            .iter()
            .enumerate()
            .map(|(row, &variate)| FittedPoint {
                row,
                variate,
                pdf: pdf[row],
                cdf: cdf[row],
                survival: survival[row],
            })
            .collect::<Vec<_>>();
        points.retain(|p| p.pdf.is_finite() && p.pdf > 0.0);
        points.retain(|p| p.survival.is_finite() && p.survival > 0.0);

        Self {
            family,
            parameters,
            points,
        }
    }

    #[must_use]
    pub fn family(&self) -> DistributionFamily {
        self.family
    }

    #[must_use]
    pub fn parameters(&self) -> &FitParameters {
        &self.parameters
    }

    #[must_use]
    pub fn points(&self) -> &[FittedPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Least-squares fit of `family.pdf` to `observed`.
///
/// Starts from all parameters set to one.
///
/// # Arguments
///
/// * `family` - Family whose pdf is the model
/// * `variates` - Independent variable
/// * `observed` - Dependent variable, same length as `variates`
/// * `sigma` - Optional per-point standard deviation dividing each residual
/// * `options` - Evaluation budget
pub fn fit_pdf(
    family: DistributionFamily,
    variates: &[f64],
    observed: &[f64],
    sigma: Option<&[f64]>,
    options: FitOptions,
) -> Result<FitParameters, FitError> {
    assert_eq!(variates.len(), observed.len());
    if let Some(sigma) = sigma {
        assert_eq!(variates.len(), sigma.len());
    }

    let params = family.num_params();
    if variates.len() < params {
        return Err(FitError::TooFewPoints {
            points: variates.len(),
            params,
        });
    }

    let residuals = |p: &[f64]| -> Vec<f64> {
        let model = family.pdf(variates, p);
        match sigma {
            Some(sigma) => model
                .iter()
                .zip(observed)
                .zip(sigma)
                .map(|((m, y), s)| (m - y) / s)
                .collect(),
            None => model.iter().zip(observed).map(|(m, y)| m - y).collect(),
        }
    };

    let solution =
        solver::levenberg_marquardt(residuals, &vec![1.0; params], &options.solver_options())?;
    Ok(FitParameters::new(solution.params))
}

/// Fits `family` to one column of an empirical curve.
///
/// # Examples
///
/// ```
/// use tracefit_stats::{
///     distribution::DistributionFamily,
///     empirical::EmpiricalCurve,
///     fit::{FitOptions, RegressionTarget, Weighting, fit_curve},
/// };
///
/// let values = (0..40).map(|i| 1.0 + f64::from(i)).collect::<Vec<_>>();
/// let counts = values.iter().map(|x| (1000.0 * (-x / 8.0).exp()) as u64 + 1).collect::<Vec<_>>();
/// let curve = EmpiricalCurve::from_counts(&values, &counts).unwrap();
///
/// let fitted = fit_curve(
///     &curve,
///     DistributionFamily::Exponential,
///     RegressionTarget::Pdf,
///     Weighting::Unweighted,
///     FitOptions::default(),
/// )
/// .unwrap();
/// assert!(fitted.points().iter().all(|p| p.pdf > 0.0 && p.survival > 0.0));
/// ```
pub fn fit_curve(
    curve: &EmpiricalCurve,
    family: DistributionFamily,
    target: RegressionTarget,
    weighting: Weighting,
    options: FitOptions,
) -> Result<FittedCurve, FitError> {
    let variates = curve.feature_values();
    let observed = curve.column(target);
    let sigma = match weighting {
        Weighting::Weighted => Some(curve.weights()),
        Weighting::Unweighted => None,
    };

    let parameters = fit_pdf(family, &variates, &observed, sigma.as_deref(), options)?;
    Ok(FittedCurve::evaluate(family, parameters, &variates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebin::{RebinnedSeries, log_spaced_edges};

    fn decaying_curve() -> EmpiricalCurve {
        let values = (1..=200).map(f64::from).collect::<Vec<_>>();
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let counts = values
            .iter()
            .map(|x| (1000.0 * (-x / 20.0).exp()).round() as u64)
            .collect::<Vec<_>>();
        let series = RebinnedSeries::from_sorted(&values, &counts, &log_spaced_edges(200.0, 1000));
        EmpiricalCurve::from_rebinned(&series).unwrap()
    }

    #[test]
    fn test_recovers_exponential_parameters() {
        let variates = (1..=20).map(f64::from).collect::<Vec<_>>();
        let observed = DistributionFamily::Exponential.pdf(&variates, &[0.0, 5.0]);

        let params = fit_pdf(
            DistributionFamily::Exponential,
            &variates,
            &observed,
            None,
            FitOptions::default(),
        )
        .unwrap();

        assert!(params.as_slice()[0].abs() < 1e-4);
        assert!((params.as_slice()[1] - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_fitted_points_are_finite_and_positive() {
        let curve = decaying_curve();
        for target in [RegressionTarget::Pdf, RegressionTarget::Survival] {
            for weighting in [Weighting::Unweighted, Weighting::Weighted] {
                let fitted = fit_curve(
                    &curve,
                    DistributionFamily::Exponential,
                    target,
                    weighting,
                    FitOptions::default(),
                )
                .unwrap();
                assert!(!fitted.is_empty());
                assert!(fitted.points().iter().all(|p| {
                    p.pdf.is_finite() && p.pdf > 0.0 && p.survival.is_finite() && p.survival > 0.0
                }));
                assert!(fitted.points().windows(2).all(|w| w[0].row < w[1].row));
            }
        }
    }

    #[test]
    fn test_pdf_fit_tracks_the_density() {
        let curve = decaying_curve();
        let fitted = fit_curve(
            &curve,
            DistributionFamily::Exponential,
            RegressionTarget::Pdf,
            Weighting::Unweighted,
            FitOptions::default(),
        )
        .unwrap();

        // Counts decay with scale 20, so the fitted scale must be close to it.
        let scale = fitted.parameters().as_slice()[1];
        assert!((scale - 20.0).abs() < 1.0, "scale = {scale}");
    }

    #[test]
    fn test_evaluate_filters_out_of_support_points() {
        // With loc = 3, points below 3 have zero density.
        let variates = [1.0, 2.0, 4.0, 5.0];
        let fitted = FittedCurve::evaluate(
            DistributionFamily::Exponential,
            FitParameters::new(vec![3.0, 1.0]),
            &variates,
        );

        let rows = fitted.points().iter().map(|p| p.row).collect::<Vec<_>>();
        assert_eq!(rows, vec![2, 3]);
    }

    #[test]
    fn test_evaluate_with_invalid_parameters_is_empty() {
        let fitted = FittedCurve::evaluate(
            DistributionFamily::Gamma,
            FitParameters::new(vec![1.0, 0.0, -1.0]),
            &[1.0, 2.0],
        );
        assert!(fitted.is_empty());
    }

    #[test]
    fn test_too_few_points() {
        let result = fit_pdf(
            DistributionFamily::Weibull,
            &[1.0, 2.0],
            &[0.5, 0.25],
            None,
            FitOptions::default(),
        );
        assert_eq!(
            result,
            Err(FitError::TooFewPoints {
                points: 2,
                params: 3
            })
        );
    }

    #[test]
    fn test_budget_exhaustion_is_a_fit_error() {
        let curve = decaying_curve();
        let result = fit_curve(
            &curve,
            DistributionFamily::Gamma,
            RegressionTarget::Pdf,
            Weighting::Unweighted,
            FitOptions { max_evaluations: 3 },
        );
        assert_eq!(
            result,
            Err(FitError::Solver(SolverError::MaxEvaluationsExceeded {
                max_evaluations: 3
            }))
        );
    }
}
