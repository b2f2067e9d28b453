//! Ad-hoc regression of a single dataset
//!
//! Runs the regression pipeline on one CSV file and prints a score table for
//! every combination. Nothing is written unless `--output` is given.

mod table;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracefit_analysis::{
    dataset::Dataset,
    regression::{COMBINATIONS, CombinationResult, Regression},
};

use crate::{
    command::RegressionOptionsArg,
    schema::goodness_of_fit::{CombinationScores, GoodnessOfFitFile},
    util,
};

#[derive(Debug, Clone, Args)]
pub(crate) struct FitArg {
    /// Path to the dataset CSV file
    pub dataset: PathBuf,

    /// Header of the feature column (defaults to the first column)
    #[arg(long)]
    pub column: Option<String>,

    /// Write the scores of every combination to this JSON file
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub options: RegressionOptionsArg,
}

pub(crate) fn run(arg: &FitArg) -> anyhow::Result<()> {
    let column = arg.column.as_deref().unwrap_or_default();
    let dataset = Dataset::open(&arg.dataset, column)
        .with_context(|| format!("Failed to load dataset: {}", arg.dataset.display()))?;

    let regression = Regression::new(arg.options.to_config());
    let curve = regression
        .prepare(&dataset)
        .map_err(|reason| anyhow::anyhow!("Cannot regress {}: {reason}", arg.dataset.display()))?;

    println!("Regression Report: {}", arg.dataset.display());
    println!("==========================================");
    println!(
        "  {} observations, {} points after rebinning onto {} edges",
        dataset.len(),
        curve.len(),
        regression.config().num_bins
    );
    println!();

    let mut results = vec![];
    for (target, weighting) in COMBINATIONS {
        let result = regression.regress(&curve, target, weighting);
        table::print_combination(&result);
        println!();
        results.push(result);
    }

    if let Some(output) = &arg.output {
        let report = results.iter().map(combination_scores).collect::<Vec<_>>();
        util::save_json(&report, output)?;
        eprintln!("Scores written to {}", output.display());
    }

    Ok(())
}

fn combination_scores(result: &CombinationResult) -> CombinationScores {
    CombinationScores {
        regression_type: result.target.id().to_owned(),
        weight_nature: result.weighting.id().to_owned(),
        scores: GoodnessOfFitFile::from(&result.scores),
    }
}
