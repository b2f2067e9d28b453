//! Score table display

use tracefit_analysis::regression::CombinationResult;
use tracefit_stats::goodness::GoodnessOfFit;

fn print_header() {
    println!(
        "  {:<12} {:>12} {:>14} {:>12}",
        "Family", "KS", "Chi2", "Chi2 p"
    );
    // family(12) + ks(12) + chi2(14) + p(12) + spaces(3)
    println!("  {}", "-".repeat(53));
}

fn print_row(family: &str, score: &GoodnessOfFit) {
    println!(
        "  {:<12} {:>12.6} {:>14.6e} {:>12.6}",
        family, score.ks_dist, score.chi2_dist, score.chi2_p
    );
}

/// Print the scores and failures of one regression combination
pub(super) fn print_combination(result: &CombinationResult) {
    println!("{} ({})", result.target, result.weighting);
    print_header();
    for (family, score) in &result.scores {
        print_row(family.id(), score);
    }
    for failure in &result.failures {
        println!("  {:<12} {}", failure.family.id(), failure.error);
    }
}
