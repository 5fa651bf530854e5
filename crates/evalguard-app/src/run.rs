//! The `run` use case: resolve policy, evaluate, and produce a report.

use anyhow::Context;
use evalguard_domain::Evaluation;
use evalguard_settings::{EvalguardConfigV1, Overrides, ResolvedConfig};
use evalguard_types::{EvaluationReport, ReportEnvelope, RunMeta, SCHEMA_REPORT_V1, ToolMeta};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::info;

/// Input for the run use case.
#[derive(Clone, Debug)]
pub struct RunInput<'a> {
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// Caller overrides.
    pub overrides: Overrides,
}

/// Output from the run use case.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub report: EvaluationReport,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
}

/// Parse config, evaluate every control against `target`, produce the report.
pub fn run_evaluation(
    evaluation: &mut Evaluation,
    target: &Value,
    input: RunInput<'_>,
) -> anyhow::Result<RunOutput> {
    let started_at = OffsetDateTime::now_utc();

    // Empty config is allowed; the profile supplies defaults.
    let cfg = if input.config_text.trim().is_empty() {
        EvalguardConfigV1::default()
    } else {
        evalguard_settings::parse_config_toml(input.config_text).context("parse config")?
    };

    let resolved =
        evalguard_settings::resolve_config(cfg, input.overrides).context("resolve config")?;
    let policy = &resolved.policy;

    info!(
        catalog_id = evaluation.catalog_id(),
        profile = %policy.profile,
        changes_allowed = policy.changes_allowed,
        "starting evaluation"
    );
    let outcome = evaluation.evaluate_with(target, policy);

    let ended_at = OffsetDateTime::now_utc();
    let duration_ms = u64::try_from((ended_at - started_at).whole_milliseconds().max(0))
        .unwrap_or(u64::MAX);

    let report = ReportEnvelope {
        schema: SCHEMA_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "evalguard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        run: RunMeta {
            started_at,
            ended_at: Some(ended_at),
            duration_ms: Some(duration_ms),
            applicability: policy.applicability.clone(),
            changes_allowed: policy.changes_allowed,
        },
        outcome,
        corrupted_state: evaluation.corrupted_state(),
        data: evaluation.report_data(),
    };

    Ok(RunOutput {
        report,
        resolved_config: resolved,
    })
}
