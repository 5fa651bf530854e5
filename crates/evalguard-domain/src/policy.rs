/// Resolved run settings for an [`crate::Evaluation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationPolicy {
    pub profile: String,
    /// Tags an assessment must share at least one of to run.
    pub applicability: Vec<String>,
    pub changes_allowed: bool,
    pub interrupt_guard: bool,
}
