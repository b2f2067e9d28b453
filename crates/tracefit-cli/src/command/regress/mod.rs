//! Configuration-driven batch regression
//!
//! Regresses every dataset listed in the configuration file and writes one
//! score file and one comparison plot per (feature, regression type, weight
//! nature) under `{target_directory}/{data_type}_regressed/`.

mod plot;
mod sink;

use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Args;
use tracefit_analysis::regression::Regression;

use self::sink::FileSink;
use crate::{command::RegressionOptionsArg, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct RegressArg {
    /// Path to the regression configuration JSON file
    pub config: PathBuf,

    /// Directory dataset filenames are relative to (overrides the configuration)
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Directory results are written to (overrides the configuration)
    #[arg(long)]
    pub target_dir: Option<PathBuf>,

    /// Only write score files
    #[arg(long)]
    pub no_plots: bool,

    #[clap(flatten)]
    pub options: RegressionOptionsArg,
}

pub(crate) fn run(arg: &RegressArg) -> anyhow::Result<()> {
    let config_file = util::read_regression_config_file(&arg.config)?;
    let source_dir = arg
        .source_dir
        .clone()
        .unwrap_or_else(|| config_file.source_directory.clone());
    let target_dir = arg
        .target_dir
        .clone()
        .unwrap_or_else(|| config_file.target_directory.clone());

    fs::create_dir_all(&target_dir).with_context(|| {
        format!(
            "Failed to create target directory: {}",
            target_dir.display()
        )
    })?;

    let regression = Regression::new(arg.options.to_config());
    let mut sink = FileSink::new(target_dir, !arg.no_plots);
    let summary = regression.run(config_file.sources(&source_dir), &mut sink);

    eprintln!();
    eprintln!(
        "Regressed {} dataset(s), skipped {}, failed {}",
        summary.regressed(),
        summary.skipped(),
        summary.failed()
    );
    Ok(())
}
