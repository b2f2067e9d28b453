//! Goodness-of-fit scores for a fitted curve against its empirical curve.
//!
//! Fitted points are matched to empirical points by the row index they were
//! evaluated at, never by feature value.
//!
//! - **KS distance**: `max |empirical.cdf - fitted.cdf|` over matched rows
//! - **Pearson chi-square**: `sum((fitted.pdf - empirical.pdf)^2 / empirical.pdf)`
//!   with a p-value from the chi-square survival function on `k - 1`
//!   degrees of freedom, `k` being the number of matched rows

use statrs::distribution::{ChiSquared, ContinuousCDF as _};

use crate::{empirical::EmpiricalCurve, fit::FittedCurve};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ScoreError {
    #[display("fitted curve has no points")]
    EmptyFit,
    #[display("chi-square needs at least 2 points, got {points}")]
    TooFewPoints { points: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodnessOfFit {
    pub ks_dist: f64,
    pub chi2_dist: f64,
    pub chi2_p: f64,
}

impl GoodnessOfFit {
    /// Scores `fitted` against the curve it was fitted to.
    ///
    /// # Panics
    ///
    /// Panics if a fitted point refers to a row outside `empirical`.
    pub fn score(empirical: &EmpiricalCurve, fitted: &FittedCurve) -> Result<Self, ScoreError> {
        if fitted.is_empty() {
            return Err(ScoreError::EmptyFit);
        }
        if fitted.len() < 2 {
            return Err(ScoreError::TooFewPoints {
                points: fitted.len(),
            });
        }

        let rows = empirical.points();
        let ks_dist = fitted
            .points()
            .iter()
            .map(|p| (rows[p.row].cdf - p.cdf).abs())
            .fold(0.0, f64::max);

        let (chi2_dist, chi2_p) =
            chi_square(fitted.points().iter().map(|p| (p.pdf, rows[p.row].pdf)));

        Ok(Self {
            ks_dist,
            chi2_dist,
            chi2_p,
        })
    }
}

/// Pearson statistic and p-value over `(observed, expected)` pairs.
///
/// Requires at least two pairs.
#[expect(clippy::cast_precision_loss)]
fn chi_square<I>(pairs: I) -> (f64, f64)
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut statistic = 0.0;
    let mut k = 0usize;
    for (observed, expected) in pairs {
        statistic += (observed - expected).powi(2) / expected;
        k += 1;
    }
    let p_value = match ChiSquared::new((k - 1) as f64) {
        Ok(dist) if statistic.is_finite() => dist.sf(statistic),
        _ => f64::NAN,
    };
    (statistic, p_value)
}
