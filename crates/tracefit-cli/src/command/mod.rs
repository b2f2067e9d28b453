use clap::{Args, Parser, Subcommand};
use tracefit_analysis::regression::RegressionConfig;
use tracefit_stats::{distribution::DistributionFamily, fit::FitOptions};

use self::{fit::FitArg, regress::RegressArg};

mod fit;
mod regress;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Regress every dataset listed in a configuration file
    Regress(#[clap(flatten)] RegressArg),
    /// Regress a single dataset and print the scores
    Fit(#[clap(flatten)] FitArg),
}

/// Tunables shared by every regression command
#[derive(Debug, Clone, Args)]
pub(crate) struct RegressionOptionsArg {
    /// Number of log-spaced bin edges
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    pub bins: u32,

    /// Maximum number of function evaluations per fit
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_evaluations: u32,

    /// Distribution families to fit (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["weibull", "gen_pareto", "expon", "gamma", "lognormal", "levy"]
    )]
    pub families: Vec<DistributionFamily>,
}

impl RegressionOptionsArg {
    pub(crate) fn to_config(&self) -> RegressionConfig {
        RegressionConfig {
            families: self.families.clone(),
            num_bins: self.bins as usize,
            fit_options: FitOptions {
                max_evaluations: self.max_evaluations as usize,
            },
            ..RegressionConfig::default()
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Regress(arg) => regress::run(&arg)?,
        Mode::Fit(arg) => fit::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_command_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_default_options_use_active_families() {
        let args = CommandArgs::parse_from(["tracefit", "fit", "data.csv"]);
        let Mode::Fit(arg) = args.mode else {
            panic!("expected fit mode");
        };

        let config = arg.options.to_config();

        assert_eq!(config.families, DistributionFamily::ACTIVE.to_vec());
        assert_eq!(config.num_bins, 1000);
        assert_eq!(config.fit_options.max_evaluations, 1000);
    }

    #[test]
    fn test_families_are_parsed() {
        let args = CommandArgs::parse_from([
            "tracefit",
            "regress",
            "config.json",
            "--families",
            "pareto,expon",
            "--bins",
            "50",
        ]);
        let Mode::Regress(arg) = args.mode else {
            panic!("expected regress mode");
        };

        assert_eq!(
            arg.options.families,
            vec![DistributionFamily::Pareto, DistributionFamily::Exponential]
        );
        assert_eq!(arg.options.bins, 50);
    }

    #[test]
    fn test_unknown_family_is_rejected() {
        let result =
            CommandArgs::try_parse_from(["tracefit", "fit", "data.csv", "--families", "student_t"]);
        assert!(result.is_err());
    }
}
