use crate::changes::ChangeSet;
use evalguard_types::Outcome;
use serde_json::Value;

/// What a step reports back to its assessment.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub outcome: Outcome,
    pub message: String,
    /// Replaces the assessment's returned value when present.
    pub value: Option<Value>,
}

impl StepOutcome {
    pub fn new(outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
            value: None,
        }
    }

    pub fn passed(message: impl Into<String>) -> Self {
        Self::new(Outcome::Passed, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(Outcome::Failed, message)
    }

    pub fn needs_review(message: impl Into<String>) -> Self {
        Self::new(Outcome::NeedsReview, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Outcome::Unknown, message)
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// One inspection performed by an assessment.
///
/// Steps get the target data and the assessment's named changes; they may apply those changes,
/// so they must not be assumed free of side effects.
pub trait Step {
    fn name(&self) -> &str;

    fn execute(&self, target: &Value, changes: &ChangeSet) -> StepOutcome;
}

impl<S: Step + ?Sized> Step for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, target: &Value, changes: &ChangeSet) -> StepOutcome {
        (**self).execute(target, changes)
    }
}

/// Adapter returned by [`step_fn`].
pub struct FnStep<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named [`Step`].
pub fn step_fn<F>(name: impl Into<String>, f: F) -> FnStep<F>
where
    F: Fn(&Value, &ChangeSet) -> StepOutcome,
{
    FnStep {
        name: name.into(),
        f,
    }
}

impl<F> Step for FnStep<F>
where
    F: Fn(&Value, &ChangeSet) -> StepOutcome,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, target: &Value, changes: &ChangeSet) -> StepOutcome {
        (self.f)(target, changes)
    }
}
