//! Rebinning of (value, count) observations onto logarithmic edges
//!
//! Trace datasets arrive as pre-aggregated histograms: every row carries a
//! feature value and the number of times it was observed. This module maps
//! those rows onto a coarser set of bin edges so that heavy-tailed data gets
//! an even density of points on a log scale.
//!
//! # Aggregation Rule
//!
//! Edges are visited in ascending order with the previous edge starting at
//! zero. Each edge collects:
//!
//! - **first edge**: every value `<= edge`
//! - **interior edges**: every value in `(previous_edge, edge]`
//! - **last edge**: every value `> previous_edge`, including values past the
//!   edge itself
//!
//! Edges that collect nothing are dropped, so the result only contains
//! populated bins.
//!
//! # Examples
//!
//! ```
//! use tracefit_stats::rebin::{RebinnedSeries, log_spaced_edges};
//!
//! let values = [1.0, 2.0, 5.0, 5.0, 100.0];
//! let counts = [10, 5, 3, 2, 1];
//! let edges = log_spaced_edges(100.0, 1000);
//!
//! let series = RebinnedSeries::from_sorted(&values, &counts, &edges);
//! assert_eq!(series.total_count(), 21);
//! assert_eq!(series.edges()[0], 1.0);
//! ```

/// Generates `num_edges` base-10 logarithmically spaced edges over
/// `[1, max_value)`.
///
/// Edge `i` is `10^(i * log10(max_value) / num_edges)`; the upper bound is
/// never included.
///
/// # Examples
///
/// ```
/// use tracefit_stats::rebin::log_spaced_edges;
///
/// let edges = log_spaced_edges(100.0, 4);
/// assert_eq!(edges.len(), 4);
/// assert_eq!(edges[0], 1.0);
/// assert!((edges[2] - 10.0).abs() < 1e-12);
/// assert!(edges[3] < 100.0);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn log_spaced_edges(max_value: f64, num_edges: usize) -> Vec<f64> {
    let stop = max_value.log10();
    let step = stop / num_edges as f64;
    (0..num_edges)
        .map(|i| 10f64.powf(i as f64 * step))
        .collect()
}

/// A histogram of aggregated counts keyed by bin edge.
///
/// Only populated bins are stored: every count is strictly positive and the
/// edges are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct RebinnedSeries {
    edges: Vec<f64>,
    counts: Vec<u64>,
}

impl RebinnedSeries {
    /// Aggregates sorted observations onto `bin_edges`.
    ///
    /// # Arguments
    ///
    /// * `sorted_values` - Feature values sorted in ascending order
    /// * `counts` - Observation count for each value
    /// * `bin_edges` - Bin edges sorted in ascending order
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` and `counts` differ in length, or if either
    /// `sorted_values` or `bin_edges` is not sorted in ascending order.
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64], counts: &[u64], bin_edges: &[f64]) -> Self {
        assert_eq!(
            sorted_values.len(),
            counts.len(),
            "values and counts must have the same length"
        );
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );
        assert!(
            bin_edges.is_sorted_by(|a, b| a <= b),
            "bin edges must be sorted in ascending order"
        );

        let mut edges = vec![];
        let mut aggregated = vec![];

        // Values are sorted, so each edge consumes a contiguous run starting
        // where the previous edge stopped.
        let mut cursor = 0;
        let last_index = bin_edges.len().saturating_sub(1);
        for (index, &edge) in bin_edges.iter().enumerate() {
            let end = if index == last_index {
                sorted_values.len()
            } else {
                cursor + sorted_values[cursor..].partition_point(|&value| value <= edge)
            };

            let sum = counts[cursor..end].iter().sum::<u64>();
            if sum > 0 {
                edges.push(edge);
                aggregated.push(sum);
            }
            cursor = end;
        }

        Self {
            edges,
            counts: aggregated,
        }
    }

    /// Bin edges of populated bins, strictly increasing.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Aggregated count of each populated bin.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of all aggregated counts.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }
}
