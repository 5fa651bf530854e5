use crate::assessment::Assessment;
use crate::changes::ChangeSet;
use crate::interrupt::InterruptGuard;
use crate::step::Step;
use evalguard_types::{ControlEvaluationRecord, Outcome};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// All assessments for one control, plus their aggregate outcome.
#[derive(Debug)]
pub struct ControlEvaluation {
    name: String,
    control_id: String,
    outcome: Outcome,
    message: String,
    corrupted_state: bool,
    assessments: Vec<Assessment>,
    evaluated: bool,
    interrupt_guard: bool,
}

impl ControlEvaluation {
    pub fn new(name: impl Into<String>, control_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            control_id: control_id.into(),
            outcome: Outcome::NotRun,
            message: String::new(),
            corrupted_state: false,
            assessments: Vec::new(),
            evaluated: false,
            interrupt_guard: true,
        }
    }

    /// Construct and append an assessment.
    ///
    /// An invalid assessment is still appended, but marks this evaluation `Failed` with the
    /// validation message.
    pub fn add_assessment(
        &mut self,
        requirement_id: impl Into<String>,
        description: impl Into<String>,
        applicability: Vec<String>,
        steps: Vec<Box<dyn Step>>,
    ) -> &mut Assessment {
        let assessment = match Assessment::new(requirement_id, description, applicability, steps) {
            Ok(assessment) => assessment,
            Err(invalid) => {
                warn!(control_id = %self.control_id, error = %invalid, "invalid assessment added");
                self.outcome = Outcome::Failed;
                self.message = invalid.message().to_string();
                invalid.into_assessment()
            }
        };
        self.push_assessment(assessment)
    }

    /// Append an already built (possibly seeded) assessment as is.
    pub fn push_assessment(&mut self, assessment: Assessment) -> &mut Assessment {
        let index = self.assessments.len();
        self.assessments.push(assessment);
        &mut self.assessments[index]
    }

    /// Whether [`ControlEvaluation::evaluate`] registers the process interrupt hook.
    pub fn set_interrupt_guard(&mut self, enabled: bool) {
        self.interrupt_guard = enabled;
    }

    /// Run every applicable assessment in order and clean up afterwards.
    ///
    /// An assessment applies when its tags intersect `user_applicability`. Evaluation halts once
    /// the aggregate is `Failed`. Cleanup always runs, also when a step panics; the panic is
    /// resumed afterwards. Only the first call does anything.
    pub fn evaluate(&mut self, target: &Value, user_applicability: &[String], changes_allowed: bool) {
        if self.evaluated {
            debug!(control_id = %self.control_id, "control already evaluated");
            return;
        }
        self.evaluated = true;

        if self.assessments.is_empty() {
            self.outcome = Outcome::NeedsReview;
            info!(control_id = %self.control_id, "no assessments to evaluate");
            return;
        }

        let _guard = if self.interrupt_guard {
            InterruptGuard::register(self.control_id.clone(), self.cleanup_hook())
        } else {
            None
        };

        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_assessments(target, user_applicability, changes_allowed)
        }));

        self.cleanup();
        if let Err(payload) = run {
            error!(control_id = %self.control_id, "assessment panicked after cleanup ran");
            panic::resume_unwind(payload);
        }
        info!(
            control_id = %self.control_id,
            outcome = %self.outcome,
            corrupted_state = self.corrupted_state,
            "control evaluated"
        );
    }

    fn run_assessments(&mut self, target: &Value, user_applicability: &[String], changes_allowed: bool) {
        for assessment in &mut self.assessments {
            if !assessment.is_applicable(user_applicability) {
                debug!(
                    control_id = %self.control_id,
                    requirement_id = assessment.requirement_id(),
                    "assessment not applicable"
                );
                continue;
            }
            let outcome = assessment.run(target, changes_allowed);
            self.outcome = Outcome::aggregate(self.outcome, outcome);
            self.message = assessment.message().to_string();
            if self.outcome.is_failed() {
                info!(
                    control_id = %self.control_id,
                    requirement_id = assessment.requirement_id(),
                    "control evaluation halted"
                );
                break;
            }
        }
    }

    /// Revert the changes of every assessment.
    ///
    /// Corruption is sticky: a later clean pass does not clear it.
    pub fn cleanup(&mut self) {
        for assessment in &self.assessments {
            if assessment.revert_changes() {
                self.corrupted_state = true;
            }
        }
        if self.corrupted_state {
            error!(control_id = %self.control_id, "changes left in a corrupted state");
        }
    }

    /// Cleanup closure for the interrupt listener; shares the assessments' changes.
    pub(crate) fn cleanup_hook(&self) -> impl Fn() + Send + 'static {
        let change_sets: Vec<(String, ChangeSet)> = self
            .assessments
            .iter()
            .map(|a| (a.requirement_id().to_string(), a.changes().clone()))
            .collect();
        move || {
            for (requirement_id, changes) in &change_sets {
                if changes.revert_all() {
                    error!(requirement_id = %requirement_id, "changes could not be reverted during interrupt");
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn corrupted_state(&self) -> bool {
        self.corrupted_state
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    pub fn assessment_mut(&mut self, requirement_id: &str) -> Option<&mut Assessment> {
        self.assessments
            .iter_mut()
            .find(|a| a.requirement_id() == requirement_id)
    }

    pub fn record(&self) -> ControlEvaluationRecord {
        ControlEvaluationRecord {
            name: self.name.clone(),
            control_id: self.control_id.clone(),
            outcome: self.outcome,
            message: self.message.clone(),
            corrupted_state: self.corrupted_state,
            assessments: self.assessments.iter().map(Assessment::record).collect(),
        }
    }
}
