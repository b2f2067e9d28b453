use std::{fs, path::PathBuf};

use anyhow::Context;
use tracefit_analysis::regression::{
    DatasetOutcome, DatasetSource, FamilyFailure, GoodnessOfFitResult, PlotRequest, RegressionKey,
    RegressionSink,
};
use tracefit_stats::distribution::DistributionFamily;

use super::plot;
use crate::{schema::goodness_of_fit::GoodnessOfFitFile, util};

/// Writes score files and plots under the target directory.
#[derive(Debug)]
pub(super) struct FileSink {
    target_dir: PathBuf,
    render_plots: bool,
}

impl FileSink {
    pub(super) fn new(target_dir: PathBuf, render_plots: bool) -> Self {
        Self {
            target_dir,
            render_plots,
        }
    }

    fn output_path(&self, key: &RegressionKey, extension: &str) -> anyhow::Result<PathBuf> {
        let dir = key.output_dir(&self.target_dir);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        Ok(dir.join(format!("{}.{extension}", key.file_stem())))
    }
}

impl RegressionSink for FileSink {
    type Error = anyhow::Error;

    fn write_scores(
        &mut self,
        key: &RegressionKey,
        scores: &GoodnessOfFitResult,
    ) -> Result<(), Self::Error> {
        let path = self.output_path(key, "json")?;
        util::save_json(&GoodnessOfFitFile::from(scores), &path)
    }

    fn render(&mut self, request: &PlotRequest<'_>) -> Result<(), Self::Error> {
        if !self.render_plots {
            return Ok(());
        }
        let path = self.output_path(request.key, "png")?;
        plot::render_comparison(request, &path)
            .with_context(|| format!("Failed to render plot: {}", path.display()))
    }

    fn dataset_started(&mut self, source: &DatasetSource) {
        eprintln!("{} ({})", source.feature_name, source.data_type);
    }

    fn fit_started(&mut self, key: &RegressionKey, family: DistributionFamily) {
        eprintln!(
            "  Fitting {family} to {} ({}, {})...",
            key.feature, key.target, key.weighting
        );
    }

    fn fit_failed(&mut self, key: &RegressionKey, failure: &FamilyFailure) {
        eprintln!(
            "  Unable to fit {} to {} ({}, {}): {}",
            failure.family, key.feature, key.target, key.weighting, failure.error
        );
    }

    fn dataset_finished(&mut self, source: &DatasetSource, outcome: &DatasetOutcome<Self::Error>) {
        match outcome {
            DatasetOutcome::Regressed { .. } => {}
            DatasetOutcome::Skipped(reason) => {
                eprintln!(
                    "  Skipping {} ({}): {reason}",
                    source.feature_name, source.data_type
                );
            }
            DatasetOutcome::Failed(err) => {
                eprintln!(
                    "  Failed to regress {} ({}): {err:#}",
                    source.feature_name, source.data_type
                );
            }
        }
    }
}
