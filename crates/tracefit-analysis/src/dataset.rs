//! Trace dataset loading
//!
//! A dataset is a pre-aggregated histogram stored as CSV: one row per
//! distinct feature value with the number of tasks that had it.
//!
//! # File Format
//!
//! ```text
//! interarrival,count
//! 1,10
//! 2,5
//! 5,3
//! ```
//!
//! The feature column is the one whose header matches the feature name. When
//! no header matches, the first column is used. The `count` column is
//! required and must hold non-negative integers. Any other columns are
//! ignored.
//!
//! Rows are sorted by feature value on load.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

/// Header of the count column.
pub const COUNT_COLUMN: &str = "count";

/// One aggregated row of a trace dataset.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawObservation {
    pub feature_value: f64,
    pub count: u64,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("failed to open dataset {}", path.display())]
    Open {
        path: PathBuf,
        #[error(source)]
        source: io::Error,
    },
    #[display("failed to read dataset")]
    Csv(#[error(source)] csv::Error),
    #[display("dataset has no `count` column")]
    MissingCountColumn,
    #[display("dataset has no columns")]
    NoColumns,
    #[display("invalid feature value {value} on line {line}")]
    InvalidFeatureValue { value: f64, line: u64 },
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Observations of one feature, sorted ascending by feature value.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    observations: Vec<RawObservation>,
}

impl Dataset {
    /// Loads a dataset CSV file.
    ///
    /// # Arguments
    ///
    /// * `path` - CSV file with a header row
    /// * `feature_column` - Header of the feature column, falling back to the
    ///   first column when absent
    pub fn open<P>(path: P, feature_column: &str) -> Result<Self, DatasetError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_owned(),
            source,
        })?;
        Self::from_reader(io::BufReader::new(file), feature_column)
    }

    /// Loads a dataset from CSV text.
    ///
    /// # Examples
    ///
    /// ```
    /// use tracefit_analysis::dataset::Dataset;
    ///
    /// let csv = "lifetime,count\n5,3\n1,10\n2,5\n";
    /// let dataset = Dataset::from_reader(csv.as_bytes(), "lifetime").unwrap();
    /// assert_eq!(dataset.feature_values(), vec![1.0, 2.0, 5.0]);
    /// assert_eq!(dataset.counts(), vec![10, 5, 3]);
    /// ```
    pub fn from_reader<R>(reader: R, feature_column: &str) -> Result<Self, DatasetError>
    where
        R: io::Read,
    {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(DatasetError::NoColumns);
        }
        let feature_index = headers
            .iter()
            .position(|h| h == feature_column)
            .unwrap_or(0);
        let count_index = headers
            .iter()
            .position(|h| h == COUNT_COLUMN)
            .ok_or(DatasetError::MissingCountColumn)?;

        // Project every record onto the two columns RawObservation reads.
        let projected_headers = csv::StringRecord::from(vec!["feature_value", COUNT_COLUMN]);
        let mut observations = vec![];
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, csv::Position::line);
            let projected = [feature_index, count_index]
                .into_iter()
                .map(|i| record.get(i).unwrap_or_default())
                .collect::<csv::StringRecord>();
            let observation = projected.deserialize::<RawObservation>(Some(&projected_headers))?;
            if !observation.feature_value.is_finite() {
                return Err(DatasetError::InvalidFeatureValue {
                    value: observation.feature_value,
                    line,
                });
            }
            observations.push(observation);
        }

        Ok(Self::from_observations(observations))
    }

    /// Builds a dataset from observations in any order.
    #[must_use]
    pub fn from_observations(mut observations: Vec<RawObservation>) -> Self {
        observations.sort_by(|a, b| a.feature_value.total_cmp(&b.feature_value));
        Self { observations }
    }

    #[must_use]
    pub fn observations(&self) -> &[RawObservation] {
        &self.observations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    #[must_use]
    pub fn feature_values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.feature_value).collect()
    }

    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        self.observations.iter().map(|o| o.count).collect()
    }

    /// Largest feature value, `None` for an empty dataset.
    #[must_use]
    pub fn max_feature_value(&self) -> Option<f64> {
        self.observations.last().map(|o| o.feature_value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_reads_named_feature_column() {
        let csv = "count,interarrival,note\n3,5.0,x\n10,1.0,y\n5,2.0,z\n";
        let dataset = Dataset::from_reader(csv.as_bytes(), "interarrival").unwrap();

        assert_eq!(
            dataset.observations(),
            &[
                RawObservation {
                    feature_value: 1.0,
                    count: 10
                },
                RawObservation {
                    feature_value: 2.0,
                    count: 5
                },
                RawObservation {
                    feature_value: 5.0,
                    count: 3
                },
            ]
        );
        assert_eq!(dataset.max_feature_value(), Some(5.0));
    }

    #[test]
    fn test_falls_back_to_first_column() {
        let csv = "value,count\n2,1\n1,4\n";
        let dataset = Dataset::from_reader(csv.as_bytes(), "lifetime").unwrap();

        assert_eq!(dataset.feature_values(), vec![1.0, 2.0]);
        assert_eq!(dataset.counts(), vec![4, 1]);
    }

    #[test]
    fn test_missing_count_column() {
        let csv = "lifetime,tasks\n1,4\n";
        let result = Dataset::from_reader(csv.as_bytes(), "lifetime");
        assert!(matches!(result, Err(DatasetError::MissingCountColumn)));
    }

    #[test]
    fn test_non_integer_count_is_rejected() {
        let csv = "lifetime,count\n1,4.5\n";
        let result = Dataset::from_reader(csv.as_bytes(), "lifetime");
        assert!(matches!(result, Err(DatasetError::Csv(_))));
    }

    #[test]
    fn test_nan_feature_value_is_rejected() {
        let csv = "lifetime,count\n1,4\nNaN,2\n";
        let result = Dataset::from_reader(csv.as_bytes(), "lifetime");
        assert!(matches!(
            result,
            Err(DatasetError::InvalidFeatureValue { line: 3, .. })
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let dataset = Dataset::from_reader("lifetime,count\n".as_bytes(), "lifetime").unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.max_feature_value(), None);
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lifetime,count").unwrap();
        writeln!(file, "100,1").unwrap();
        writeln!(file, "1,10").unwrap();
        file.flush().unwrap();

        let dataset = Dataset::open(file.path(), "lifetime").unwrap();

        assert_eq!(dataset.feature_values(), vec![1.0, 100.0]);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Dataset::open(dir.path().join("absent.csv"), "lifetime");
        assert!(matches!(result, Err(DatasetError::Open { .. })));
    }
}
