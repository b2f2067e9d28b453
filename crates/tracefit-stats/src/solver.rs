//! Nonlinear least squares.
//!
//! Minimizes `sum(r_i(p)^2)` for a residual function `r` starting from an
//! initial parameter vector, using the MINPACK-style Levenberg-Marquardt
//! implementation of the [`levenberg_marquardt`] crate. The Jacobian is
//! approximated by forward differences, and every residual evaluation
//! (including the ones spent on the Jacobian) counts against a hard
//! evaluation budget. Running out of budget is an error, never a silent
//! "best effort" answer.
//!
//! Non-finite residuals at a trial point are replaced by a large finite
//! penalty, so steps into regions where the model is undefined are rejected
//! and the trust region shrinks.
//!
//! # Examples
//!
//! ```
//! use tracefit_stats::solver::{LeastSquaresOptions, levenberg_marquardt};
//!
//! // Fit y = a * x + b through three exact points
//! let xs = [0.0, 1.0, 2.0];
//! let ys = [1.0, 3.0, 5.0];
//! let solution = levenberg_marquardt(
//!     |p: &[f64]| xs.iter().zip(&ys).map(|(x, y)| p[0] * x + p[1] - y).collect(),
//!     &[1.0, 1.0],
//!     &LeastSquaresOptions::default(),
//! )
//! .unwrap();
//! assert!((solution.params[0] - 2.0).abs() < 1e-6);
//! assert!((solution.params[1] - 1.0).abs() < 1e-6);
//! ```

use std::cell::Cell;

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{DMatrix, DVector, Dyn, storage::Owned};

const NON_FINITE_RESIDUAL: f64 = 1e100;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SolverError {
    #[display("exceeded the budget of {max_evaluations} function evaluations")]
    MaxEvaluationsExceeded { max_evaluations: usize },
    #[display("residuals are not finite at the initial parameters")]
    NonFiniteInitialResidual,
    #[display("solver stopped without converging: {reason}")]
    NotConverged { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeastSquaresOptions {
    /// Maximum number of residual evaluations.
    pub max_evaluations: usize,
    /// Relative cost reduction below which the fit is converged.
    pub ftol: f64,
    /// Relative step size below which the fit is converged.
    pub xtol: f64,
}

impl Default for LeastSquaresOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 1000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresSolution {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub evaluations: usize,
}

/// Residual function adapted to [`LeastSquaresProblem`].
///
/// Residuals are evaluated once per `set_params` and cached, since the
/// optimizer reads them back several times per step.
struct BudgetedProblem<F> {
    residuals: F,
    params: DVector<f64>,
    current: Option<DVector<f64>>,
    best: Option<(DVector<f64>, f64)>,
    evaluations: Cell<usize>,
    max_evaluations: usize,
}

impl<F> BudgetedProblem<F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn evaluate(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        let used = self.evaluations.get();
        if used >= self.max_evaluations {
            return None;
        }
        self.evaluations.set(used + 1);
        Some(DVector::from_vec((self.residuals)(params.as_slice())))
    }

    fn exhausted(&self) -> bool {
        self.evaluations.get() >= self.max_evaluations
    }

    fn record(&mut self, residuals: &DVector<f64>) {
        let cost = residuals.norm_squared();
        if self.best.as_ref().is_none_or(|(_, best)| cost < *best) {
            self.best = Some((self.params.clone(), cost));
        }
    }
}

fn penalize(mut residuals: DVector<f64>) -> DVector<f64> {
    for r in residuals.iter_mut() {
        if !r.is_finite() {
            *r = NON_FINITE_RESIDUAL;
        }
    }
    residuals
}

impl<F> LeastSquaresProblem<f64, Dyn, Dyn> for BudgetedProblem<F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, params: &DVector<f64>) {
        self.params.clone_from(params);
        self.current = self.evaluate(params).map(penalize);
        if let Some(residuals) = self.current.clone() {
            self.record(&residuals);
        }
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.current.clone()
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let current = self.current.as_ref()?;
        let step_scale = f64::EPSILON.sqrt();
        let mut jacobian = DMatrix::zeros(current.len(), self.params.len());
        for j in 0..self.params.len() {
            let h = step_scale * self.params[j].abs().max(1.0);
            let mut perturbed = self.params.clone();
            perturbed[j] += h;
            let shifted = penalize(self.evaluate(&perturbed)?);
            jacobian.set_column(j, &((shifted - current) / h));
        }
        Some(jacobian)
    }
}

/// Minimizes the sum of squared residuals starting from `initial`.
///
/// # Arguments
///
/// * `residuals` - Maps a parameter slice to the residual vector. Must return
///   the same number of residuals on every call.
/// * `initial` - Starting parameters
/// * `options` - Evaluation budget and tolerances
///
/// # Errors
///
/// * [`SolverError::MaxEvaluationsExceeded`] - budget spent before converging
/// * [`SolverError::NonFiniteInitialResidual`] - the starting point is not
///   evaluable
/// * [`SolverError::NotConverged`] - the optimizer gave up for another reason,
///   such as tolerances too tight for any further improvement
pub fn levenberg_marquardt<F>(
    residuals: F,
    initial: &[f64],
    options: &LeastSquaresOptions,
) -> Result<LeastSquaresSolution, SolverError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let max_evaluations = options.max_evaluations;
    let exceeded = SolverError::MaxEvaluationsExceeded { max_evaluations };

    let params = DVector::from_column_slice(initial);
    let mut problem = BudgetedProblem {
        residuals,
        params: params.clone(),
        current: None,
        best: None,
        evaluations: Cell::new(0),
        max_evaluations,
    };
    let start = problem.evaluate(&params).ok_or_else(|| exceeded.clone())?;
    if start.iter().any(|r| !r.is_finite()) {
        return Err(SolverError::NonFiniteInitialResidual);
    }
    problem.record(&start);
    problem.current = Some(start);

    // The crate's own limit is `patience * (n + 1)` residual calls, which
    // stays above the budget enforced by `BudgetedProblem`.
    let (problem, report) = LevenbergMarquardt::new()
        .with_ftol(options.ftol)
        .with_xtol(options.xtol)
        .with_patience(max_evaluations.max(1))
        .minimize(problem);

    if !report.termination.was_successful() {
        if problem.exhausted() {
            return Err(exceeded);
        }
        return Err(SolverError::NotConverged {
            reason: format!("{:?}", report.termination),
        });
    }

    let evaluations = problem.evaluations.get();
    let (params, cost) = problem.best.ok_or(exceeded)?;
    Ok(LeastSquaresSolution {
        params: params.as_slice().to_vec(),
        cost,
        evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_fit_is_exact() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = xs.map(|x| 0.5 * x - 2.0);
        let solution = levenberg_marquardt(
            |p: &[f64]| xs.iter().zip(&ys).map(|(x, y)| p[0] * x + p[1] - y).collect(),
            &[1.0, 1.0],
            &LeastSquaresOptions::default(),
        )
        .unwrap();

        assert!((solution.params[0] - 0.5).abs() < 1e-6);
        assert!((solution.params[1] + 2.0).abs() < 1e-6);
        assert!(solution.cost < 1e-12);
        assert!(solution.evaluations <= 1000);
    }

    #[test]
    fn test_exponential_decay() {
        let xs = (0..20).map(f64::from).collect::<Vec<_>>();
        let ys = xs.iter().map(|x| 3.0 * (-x / 4.0).exp()).collect::<Vec<_>>();
        let solution = levenberg_marquardt(
            |p: &[f64]| {
                xs.iter()
                    .zip(&ys)
                    .map(|(x, y)| p[0] * (-x / p[1]).exp() - y)
                    .collect()
            },
            &[1.0, 1.0],
            &LeastSquaresOptions::default(),
        )
        .unwrap();

        assert!((solution.params[0] - 3.0).abs() < 1e-4);
        assert!((solution.params[1] - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_undefined_trial_points_are_rejected() {
        // The full Gauss-Newton step from 1 lands on -2, where ln is NaN.
        let solution = levenberg_marquardt(
            |p: &[f64]| vec![p[0].ln() + 3.0],
            &[1.0],
            &LeastSquaresOptions::default(),
        )
        .unwrap();

        assert!((solution.params[0] - (-3.0_f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_budget_is_enforced() {
        // Initial evaluation plus two Jacobian columns needs three calls.
        let options = LeastSquaresOptions {
            max_evaluations: 2,
            ..LeastSquaresOptions::default()
        };
        let result = levenberg_marquardt(
            |p: &[f64]| vec![p[0] - 1.0, p[1] - 2.0, p[0] + p[1]],
            &[0.0, 0.0],
            &options,
        );
        assert_eq!(
            result,
            Err(SolverError::MaxEvaluationsExceeded { max_evaluations: 2 })
        );
    }

    #[test]
    fn test_calls_never_exceed_budget() {
        let calls = Cell::new(0);
        let options = LeastSquaresOptions {
            max_evaluations: 5,
            ..LeastSquaresOptions::default()
        };
        let _ = levenberg_marquardt(
            |p: &[f64]| {
                calls.set(calls.get() + 1);
                vec![(p[0] - 10.0).powi(3), p[0].sin()]
            },
            &[1.0],
            &options,
        );
        assert!(calls.get() <= 5);
    }

    #[test]
    fn test_non_finite_start_is_rejected() {
        let result = levenberg_marquardt(
            |p: &[f64]| vec![p[0].ln() - 1.0],
            &[-1.0],
            &LeastSquaresOptions::default(),
        );
        assert_eq!(result, Err(SolverError::NonFiniteInitialResidual));
    }
}
