use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `evalguard.toml` schema v1.
///
/// Every field is optional so a partial file layers over the selected profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvalguardConfigV1 {
    /// Optional schema string for tooling (`evalguard.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// `audit` (default) or `remediate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Applicability tags of the evaluation context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applicability: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_allowed: Option<bool>,

    /// Revert outstanding changes when the process is interrupted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt_guard: Option<bool>,
}
