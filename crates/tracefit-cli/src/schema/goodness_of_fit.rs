use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracefit_analysis::regression::GoodnessOfFitResult;
use tracefit_stats::goodness::GoodnessOfFit;

/// Score file contents: family id -> scores
///
/// ```json
/// {
///   "expon": { "ks_dist": 0.026, "chi2_dist": 0.004, "chi2_p": 1.0 },
///   "gamma": { "ks_dist": 0.031, "chi2_dist": 0.006, "chi2_p": 1.0 }
/// }
/// ```
///
/// Non-finite scores are written as `null`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct GoodnessOfFitFile(pub BTreeMap<String, ScoreEntry>);

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScoreEntry {
    pub ks_dist: Option<f64>,
    pub chi2_dist: Option<f64>,
    pub chi2_p: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl From<&GoodnessOfFit> for ScoreEntry {
    fn from(score: &GoodnessOfFit) -> Self {
        Self {
            ks_dist: finite(score.ks_dist),
            chi2_dist: finite(score.chi2_dist),
            chi2_p: finite(score.chi2_p),
        }
    }
}

impl From<&GoodnessOfFitResult> for GoodnessOfFitFile {
    fn from(result: &GoodnessOfFitResult) -> Self {
        Self(
            result
                .iter()
                .map(|(family, score)| (family.id().to_owned(), ScoreEntry::from(score)))
                .collect(),
        )
    }
}

/// Scores of one combination in a `fit` report
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CombinationScores {
    pub regression_type: String,
    pub weight_nature: String,
    pub scores: GoodnessOfFitFile,
}

#[cfg(test)]
mod tests {
    use tracefit_stats::distribution::DistributionFamily;

    use super::*;

    #[test]
    fn test_serializes_by_family_id() {
        let mut result = GoodnessOfFitResult::new();
        result.insert(
            DistributionFamily::GenPareto,
            GoodnessOfFit {
                ks_dist: 0.5,
                chi2_dist: 2.0,
                chi2_p: f64::NAN,
            },
        );

        let json = serde_json::to_value(GoodnessOfFitFile::from(&result)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "gen_pareto": { "ks_dist": 0.5, "chi2_dist": 2.0, "chi2_p": null }
            })
        );
    }

    #[test]
    fn test_reads_score_file() {
        let text = r#"{"expon":{"ks_dist":0.1,"chi2_dist":0.2,"chi2_p":0.9}}"#;
        let file: GoodnessOfFitFile = serde_json::from_str(text).unwrap();
        assert_eq!(file.0["expon"].chi2_p, Some(0.9));
    }
}
