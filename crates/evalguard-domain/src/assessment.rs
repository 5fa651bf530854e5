use crate::change::{ApplyAction, Change, ChangeHandle, RevertAction};
use crate::changes::ChangeSet;
use crate::step::{Step, StepOutcome};
use evalguard_types::{AssessmentRecord, Outcome};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Returned when an assessment is constructed with a missing field.
///
/// Carries the rejected assessment (outcome `Unknown`, diagnostic message) so callers can keep it
/// for the audit trail.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct InvalidAssessment {
    message: String,
    assessment: Box<Assessment>,
}

impl InvalidAssessment {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn into_assessment(self) -> Assessment {
        *self.assessment
    }
}

/// One verification unit for a single requirement.
pub struct Assessment {
    requirement_id: String,
    description: String,
    applicability: Vec<String>,
    steps: Vec<Box<dyn Step>>,
    outcome: Outcome,
    message: String,
    steps_executed: u32,
    run_duration: Option<Duration>,
    value: Value,
    changes: ChangeSet,
}

impl Assessment {
    /// Build a validated assessment. Every field must be non-empty.
    pub fn new(
        requirement_id: impl Into<String>,
        description: impl Into<String>,
        applicability: Vec<String>,
        steps: Vec<Box<dyn Step>>,
    ) -> Result<Self, InvalidAssessment> {
        let mut assessment = Assessment::seed(requirement_id, description, applicability);
        assessment.steps = steps;
        if assessment.precheck() {
            Ok(assessment)
        } else {
            Err(InvalidAssessment {
                message: assessment.message.clone(),
                assessment: Box::new(assessment),
            })
        }
    }

    /// Build an assessment with no steps yet; validation is deferred to [`Assessment::run`].
    pub fn seed(
        requirement_id: impl Into<String>,
        description: impl Into<String>,
        applicability: Vec<String>,
    ) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            description: description.into(),
            applicability,
            steps: Vec::new(),
            outcome: Outcome::NotRun,
            message: String::new(),
            steps_executed: 0,
            run_duration: None,
            value: Value::Null,
            changes: ChangeSet::default(),
        }
    }

    pub fn add_step(&mut self, step: impl Step + 'static) {
        self.steps.push(Box::new(step));
    }

    /// Register a change this assessment owns. Steps reach it through the [`ChangeSet`] by `name`.
    pub fn add_change(&mut self, name: impl Into<String>, change: Change) -> ChangeHandle {
        self.changes.insert(name, change)
    }

    pub fn new_change(
        &mut self,
        name: impl Into<String>,
        target_name: impl Into<String>,
        description: impl Into<String>,
        target_object: Value,
        apply: impl ApplyAction + 'static,
        revert: impl RevertAction + 'static,
    ) -> ChangeHandle {
        self.add_change(
            name,
            Change::new(target_name, description, target_object, apply, revert),
        )
    }

    /// Run every step in order, halting on the first `Failed` step.
    ///
    /// An assessment runs once: later calls return the recorded outcome.
    pub fn run(&mut self, target: &Value, changes_allowed: bool) -> Outcome {
        self.run_steps(target, changes_allowed, true)
    }

    /// Like [`Assessment::run`], but keeps going after a `Failed` step.
    pub fn run_tolerating_failures(&mut self, target: &Value, changes_allowed: bool) -> Outcome {
        self.run_steps(target, changes_allowed, false)
    }

    fn run_steps(&mut self, target: &Value, changes_allowed: bool, halt_on_failure: bool) -> Outcome {
        if self.outcome != Outcome::NotRun {
            debug!(
                requirement_id = %self.requirement_id,
                outcome = %self.outcome,
                "assessment already run"
            );
            return self.outcome;
        }

        let started = Instant::now();
        if !self.precheck() {
            warn!(requirement_id = %self.requirement_id, message = %self.message, "assessment is incomplete");
            return self.outcome;
        }
        if changes_allowed {
            self.changes.allow_all();
        }

        debug!(
            requirement_id = %self.requirement_id,
            steps = self.steps.len(),
            changes_allowed,
            "running assessment"
        );
        for step in &self.steps {
            let StepOutcome {
                outcome,
                message,
                value,
            } = step.execute(target, &self.changes);
            self.steps_executed += 1;
            self.outcome = Outcome::aggregate(self.outcome, outcome);
            self.message = message;
            if let Some(value) = value {
                self.value = value;
            }
            if halt_on_failure && outcome == Outcome::Failed {
                info!(
                    requirement_id = %self.requirement_id,
                    step = step.name(),
                    "assessment halted on failed step"
                );
                return self.outcome;
            }
        }

        self.run_duration = Some(started.elapsed());
        debug!(
            requirement_id = %self.requirement_id,
            outcome = %self.outcome,
            steps_executed = self.steps_executed,
            "assessment finished"
        );
        self.outcome
    }

    /// Revert every outstanding change. Returns `true` if any change is left corrupted.
    pub fn revert_changes(&self) -> bool {
        let corrupted = self.changes.revert_all();
        if corrupted {
            warn!(requirement_id = %self.requirement_id, "assessment changes could not be fully reverted");
        }
        corrupted
    }

    /// Whether any of this assessment's tags appear in `user_applicability`.
    pub fn is_applicable(&self, user_applicability: &[String]) -> bool {
        self.applicability
            .iter()
            .any(|tag| user_applicability.contains(tag))
    }

    fn precheck(&mut self) -> bool {
        if !self.requirement_id.is_empty()
            && !self.description.is_empty()
            && !self.applicability.is_empty()
            && !self.steps.is_empty()
        {
            return true;
        }
        self.outcome = Outcome::Unknown;
        self.message = format!(
            "expected all Assessment fields to have a value, but got: requirementId=len({}), description=len({}), applicability=len({}), steps=len({})",
            self.requirement_id.len(),
            self.description.len(),
            self.applicability.len(),
            self.steps.len(),
        );
        false
    }

    pub fn requirement_id(&self) -> &str {
        &self.requirement_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn applicability(&self) -> &[String] {
        &self.applicability
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name())
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn steps_executed(&self) -> u32 {
        self.steps_executed
    }

    /// Wall-clock time of the last completed (non-halted) run.
    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn record(&self) -> AssessmentRecord {
        AssessmentRecord {
            requirement_id: self.requirement_id.clone(),
            description: self.description.clone(),
            applicability: self.applicability.clone(),
            outcome: self.outcome,
            message: self.message.clone(),
            steps: self.step_names().map(str::to_string).collect(),
            steps_executed: self.steps_executed,
            duration_ms: self
                .run_duration
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            value: self.value.clone(),
            changes: self.changes.records(),
        }
    }
}

impl fmt::Debug for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assessment")
            .field("requirement_id", &self.requirement_id)
            .field("description", &self.description)
            .field("applicability", &self.applicability)
            .field("steps", &self.step_names().collect::<Vec<_>>())
            .field("outcome", &self.outcome)
            .field("message", &self.message)
            .field("steps_executed", &self.steps_executed)
            .field("run_duration", &self.run_duration)
            .field("value", &self.value)
            .field("changes", &self.changes)
            .finish()
    }
}
