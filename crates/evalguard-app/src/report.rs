//! Report serialization and exit-code mapping.

use anyhow::Context;
use evalguard_types::{EvaluationReport, Outcome};

pub fn serialize_report(report: &EvaluationReport) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec_pretty(report).context("serialize report")
}

/// Map a finished report to an exit code.
///
/// 0 = passed or review pending, 2 = failed or unknown, 3 = changes left corrupted.
pub fn outcome_exit_code(report: &EvaluationReport) -> i32 {
    if report.corrupted_state {
        return 3;
    }
    match report.outcome {
        Outcome::Passed | Outcome::NotApplicable | Outcome::NeedsReview | Outcome::NotRun => 0,
        Outcome::Failed | Outcome::Unknown => 2,
    }
}
