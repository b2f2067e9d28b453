//! Empirical density, cumulative and survival estimates from binned counts.
//!
//! An [`EmpiricalCurve`] is the regression target: one point per populated
//! bin with the normalized count (`pdf`), its running sum (`cdf`), the
//! complement (`survival`), and a per-point `weight` used as the standard
//! deviation of that point in weighted fits.
//!
//! # Normalization
//!
//! 1. `pdf = count / total_count`
//! 2. `cdf = cumulative sum of pdf`
//! 3. `survival = 1 - cdf`
//! 4. `weight = 1 / (value - first_value)` for every bin but the first
//! 5. Points with `survival < 0` are dropped (cumulative rounding at the tail)
//! 6. The first remaining point is dropped: its weight is undefined and on a
//!    log scale it sits at the origin
//!
//! # Examples
//!
//! ```
//! use tracefit_stats::empirical::EmpiricalCurve;
//!
//! let curve = EmpiricalCurve::from_counts(&[1.0, 2.0, 4.0], &[2, 1, 1]).unwrap();
//! assert_eq!(curve.len(), 2);
//! assert_eq!(curve.points()[0].feature_value, 2.0);
//! assert_eq!(curve.points()[0].weight, 1.0);
//! ```

use crate::{fit::RegressionTarget, rebin::RebinnedSeries};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NormalizeError {
    #[display("total count is zero")]
    ZeroTotalCount,
    #[display("no points remain after filtering {input_len} bins")]
    NoRowsRemaining { input_len: usize },
}

/// A single point of an empirical curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmpiricalPoint {
    pub feature_value: f64,
    pub count: u64,
    pub pdf: f64,
    pub cdf: f64,
    pub survival: f64,
    /// Inverse distance to the first bin of the series.
    pub weight: f64,
}

impl EmpiricalPoint {
    #[must_use]
    pub fn value_of(&self, target: RegressionTarget) -> f64 {
        match target {
            RegressionTarget::Pdf => self.pdf,
            RegressionTarget::Survival => self.survival,
        }
    }
}

/// Normalized empirical curve in ascending feature order.
///
/// Always non-empty, every point has `survival >= 0` and a finite weight.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalCurve {
    points: Vec<EmpiricalPoint>,
}

impl EmpiricalCurve {
    /// Normalizes a rebinned series.
    pub fn from_rebinned(series: &RebinnedSeries) -> Result<Self, NormalizeError> {
        Self::from_counts(series.edges(), series.counts())
    }

    /// Normalizes parallel feature values and counts.
    ///
    /// # Arguments
    ///
    /// * `feature_values` - Bin positions, strictly increasing
    /// * `counts` - Count for each bin
    ///
    /// # Errors
    ///
    /// * [`NormalizeError::ZeroTotalCount`] - counts sum to zero (including
    ///   empty input)
    /// * [`NormalizeError::NoRowsRemaining`] - every point was filtered out
    ///
    /// # Panics
    ///
    /// Panics if `feature_values` and `counts` differ in length.
    #[expect(clippy::cast_precision_loss)]
    pub fn from_counts(feature_values: &[f64], counts: &[u64]) -> Result<Self, NormalizeError> {
        assert_eq!(
            feature_values.len(),
            counts.len(),
            "values and counts must have the same length"
        );

        let total = counts.iter().sum::<u64>();
        if total == 0 {
            return Err(NormalizeError::ZeroTotalCount);
        }
        let total = total as f64;
        let first_value = feature_values[0];

        let mut cdf = 0.0;
        let points = feature_values
            .iter()
            .zip(counts)
            .map(|(&feature_value, &count)| {
                let pdf = count as f64 / total;
                cdf += pdf;
                (feature_value, count, pdf, cdf, 1.0 - cdf)
            })
            // NaN survival is not negative and is kept
            .filter(|&(.., survival)| survival >= 0.0 || survival.is_nan())
            .skip(1)
            .map(
                |(feature_value, count, pdf, cdf, survival)| EmpiricalPoint {
                    feature_value,
                    count,
                    pdf,
                    cdf,
                    survival,
                    weight: 1.0 / (feature_value - first_value),
                },
            )
            .collect::<Vec<_>>();

        if points.is_empty() {
            return Err(NormalizeError::NoRowsRemaining {
                input_len: feature_values.len(),
            });
        }

        Ok(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[EmpiricalPoint] {
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

    #[must_use]
    pub fn feature_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.feature_value).collect()
    }

    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.weight).collect()
    }

    /// The column a regression of the given kind is fitted against.
    #[must_use]
    pub fn column(&self, target: RegressionTarget) -> Vec<f64> {
        self.points.iter().map(|p| p.value_of(target)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebin::log_spaced_edges;

    #[test]
    fn test_first_point_is_removed() {
        let curve = EmpiricalCurve::from_counts(&[1.0, 3.0, 5.0], &[5, 3, 2]).unwrap();

        assert_eq!(curve.len(), 2);
        assert_eq!(curve.feature_values(), vec![3.0, 5.0]);
        assert_eq!(curve.points()[0].count, 3);
    }

    #[test]
    fn test_columns() {
        let curve = EmpiricalCurve::from_counts(&[1.0, 3.0, 5.0], &[5, 3, 2]).unwrap();
        let p = curve.points();

        assert!((p[0].pdf - 0.3).abs() < 1e-12);
        assert!((p[0].cdf - 0.8).abs() < 1e-12);
        assert!((p[0].survival - 0.2).abs() < 1e-12);
        assert!((p[0].weight - 0.5).abs() < 1e-12);
        assert!((p[1].pdf - 0.2).abs() < 1e-12);
        assert!((p[1].cdf - 1.0).abs() < 1e-12);
        assert!((p[1].weight - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_pdf_sums_to_one_and_cdf_is_monotone() {
        // Powers of two keep every pdf and cdf value exact.
        let values = (1..=8).map(f64::from).collect::<Vec<_>>();
        let counts = [1, 1, 2, 4, 8, 16, 32, 64];

        let curve = EmpiricalCurve::from_counts(&values, &counts).unwrap();

        // The removed first point holds counts[0] / total of the mass.
        let removed = 1.0 / 128.0;
        let sum = curve.points().iter().map(|p| p.pdf).sum::<f64>();
        assert_eq!(curve.len(), 7);
        assert!((sum + removed - 1.0).abs() < 1e-12);
        assert!(curve.points().windows(2).all(|w| w[0].cdf <= w[1].cdf));
        assert_eq!(curve.points()[6].survival, 0.0);
    }

    #[test]
    #[expect(clippy::cast_precision_loss)]
    fn test_tail_with_negative_survival_drift_is_dropped() {
        let values = (1..=50).map(f64::from).collect::<Vec<_>>();
        let counts = (1..=50u64).map(|i| 1000 / i).collect::<Vec<_>>();
        let total = counts.iter().sum::<u64>() as f64;
        let accumulated = counts.iter().map(|&c| c as f64 / total).sum::<f64>();
        assert!(1.0 - accumulated < 0.0);

        let curve = EmpiricalCurve::from_counts(&values, &counts).unwrap();

        assert_eq!(curve.len(), 48);
        assert_eq!(curve.feature_values().last(), Some(&49.0));
        assert!(curve.points().iter().all(|p| p.survival >= 0.0));
    }

    #[test]
    fn test_all_zero_counts_fail() {
        let result = EmpiricalCurve::from_counts(&[1.0, 2.0, 3.0], &[0, 0, 0]);
        assert_eq!(result, Err(NormalizeError::ZeroTotalCount));
    }

    #[test]
    fn test_empty_series_fails() {
        let series = RebinnedSeries::from_sorted(&[1.0, 2.0], &[0, 0], &[1.0, 2.0]);
        assert_eq!(
            EmpiricalCurve::from_rebinned(&series),
            Err(NormalizeError::ZeroTotalCount)
        );
    }

    #[test]
    fn test_single_bin_leaves_nothing() {
        let result = EmpiricalCurve::from_counts(&[1.0], &[10]);
        assert_eq!(
            result,
            Err(NormalizeError::NoRowsRemaining { input_len: 1 })
        );
    }

    #[test]
    fn test_small_trace_scenario() {
        let values = [1.0, 2.0, 5.0, 5.0, 100.0];
        let counts = [10, 5, 3, 2, 1];
        let series = RebinnedSeries::from_sorted(&values, &counts, &log_spaced_edges(100.0, 1000));

        let curve = EmpiricalCurve::from_rebinned(&series).unwrap();

        assert_eq!(curve.len(), 3);
        assert!(
            curve
                .points()
                .iter()
                .all(|p| p.weight.is_finite() && p.weight > 0.0)
        );
        assert!(curve.points().iter().all(|p| p.survival >= 0.0));
    }

    #[test]
    fn test_deterministic() {
        let values = (1..=300).map(|i| f64::from(i) * 1.7).collect::<Vec<_>>();
        let counts = (1..=300u64).map(|i| (i * 7919) % 13).collect::<Vec<_>>();
        let edges = log_spaced_edges(values[299], 1000);

        let run = || {
            let series = RebinnedSeries::from_sorted(&values, &counts, &edges);
            EmpiricalCurve::from_rebinned(&series).unwrap()
        };
        let a = run();
        let b = run();

        assert_eq!(a.len(), b.len());
        for (x, y) in a.points().iter().zip(b.points()) {
            assert_eq!(x.pdf.to_bits(), y.pdf.to_bits());
            assert_eq!(x.cdf.to_bits(), y.cdf.to_bits());
            assert_eq!(x.survival.to_bits(), y.survival.to_bits());
            assert_eq!(x.weight.to_bits(), y.weight.to_bits());
        }
    }
}
