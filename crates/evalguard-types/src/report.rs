use crate::Outcome;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

/// Stable schema identifiers.
pub const SCHEMA_REPORT_V1: &str = "evalguard.report.v1";
pub const SCHEMA_CONFIG_V1: &str = "evalguard.config.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunMeta {
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "Option<String>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub applicability: Vec<String>,
    pub changes_allowed: bool,
}

/// Snapshot of a single change after an evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeRecord {
    pub name: String,
    pub target_name: String,
    pub description: String,
    pub allowed: bool,
    pub applied: bool,
    pub reverted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub target_object: JsonValue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentRecord {
    pub requirement_id: String,
    pub description: String,
    pub applicability: Vec<String>,
    pub outcome: Outcome,
    pub message: String,
    /// Step names in registration order.
    pub steps: Vec<String>,
    pub steps_executed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: JsonValue,
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ControlEvaluationRecord {
    pub name: String,
    pub control_id: String,
    pub outcome: Outcome,
    pub message: String,
    pub corrupted_state: bool,
    pub assessments: Vec<AssessmentRecord>,
}

/// Number of control evaluations per outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutcomeCounts {
    pub not_run: u32,
    pub passed: u32,
    pub failed: u32,
    pub needs_review: u32,
    pub not_applicable: u32,
    pub unknown: u32,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::NotRun => self.not_run += 1,
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::NeedsReview => self.needs_review += 1,
            Outcome::NotApplicable => self.not_applicable += 1,
            Outcome::Unknown => self.unknown += 1,
        }
    }
}

impl FromIterator<Outcome> for OutcomeCounts {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut counts = OutcomeCounts::default();
        for outcome in iter {
            counts.record(outcome);
        }
        counts
    }
}

/// Evaluation-specific payload of the report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationData {
    pub catalog_id: String,
    pub counts: OutcomeCounts,
    pub controls: Vec<ControlEvaluationRecord>,
}

/// Report envelope handed to exporters.
///
/// Keeping this generic allows the payload to change while the outer shape stays stable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportEnvelope<TData = EvaluationData> {
    /// Versioned schema identifier for the envelope shape.
    pub schema: String,
    pub tool: ToolMeta,
    pub run: RunMeta,
    pub outcome: Outcome,
    pub corrupted_state: bool,
    pub data: TData,
}

pub type EvaluationReport = ReportEnvelope<EvaluationData>;
