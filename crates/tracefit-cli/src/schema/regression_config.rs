use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracefit_analysis::regression::DatasetSource;

/// Regression run configuration
///
/// ```json
/// {
///   "source_directory": "data",
///   "target_directory": "out",
///   "datasets": {
///     "google": {
///       "interarrival": { "filename": "google_interarrival.csv" },
///       "lifetime": { "filename": "google_lifetime.csv" }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegressionConfigFile {
    /// Directory dataset filenames are relative to
    pub source_directory: PathBuf,
    /// Directory the `{data_type}_regressed` directories are created in
    pub target_directory: PathBuf,
    /// Data type -> feature name -> dataset
    pub datasets: BTreeMap<String, BTreeMap<String, DatasetEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatasetEntry {
    pub filename: PathBuf,
}

impl RegressionConfigFile {
    /// Lists every configured dataset, resolving filenames against
    /// `source_directory`.
    pub fn sources(&self, source_directory: &Path) -> Vec<DatasetSource> {
        self.datasets
            .iter()
            .flat_map(|(data_type, features)| {
                features
                    .iter()
                    .map(move |(feature_name, entry)| DatasetSource {
                        data_type: data_type.clone(),
                        feature_name: feature_name.clone(),
                        path: source_directory.join(&entry.filename),
                    })
            })
            .collect()
    }
}
