use crate::assessment::Assessment;
use crate::control::ControlEvaluation;
use crate::policy::EvaluationPolicy;
use evalguard_types::{Catalog, EvaluationData, Outcome, OutcomeCounts};
use serde_json::Value;
use tracing::info;

/// Control evaluations for every control of one catalog.
#[derive(Debug, Default)]
pub struct Evaluation {
    catalog_id: String,
    controls: Vec<ControlEvaluation>,
    outcome: Outcome,
    corrupted_state: bool,
}

impl Evaluation {
    pub fn new(catalog_id: impl Into<String>) -> Self {
        Self {
            catalog_id: catalog_id.into(),
            ..Self::default()
        }
    }

    /// One control evaluation per catalog control, each holding one assessment per requirement.
    ///
    /// Assessments start without steps; callers wire them through [`Evaluation::assessment_mut`].
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut evaluation = Evaluation::new(catalog.metadata.id.clone());
        for (family, control) in catalog.controls() {
            let mut control_eval = ControlEvaluation::new(family.name.clone(), control.id.clone());
            for requirement in &control.requirements {
                control_eval.push_assessment(Assessment::seed(
                    requirement.id.clone(),
                    requirement.text.clone(),
                    requirement.applicability.clone(),
                ));
            }
            evaluation.controls.push(control_eval);
        }
        evaluation
    }

    pub fn push_control(&mut self, control: ControlEvaluation) -> &mut ControlEvaluation {
        let index = self.controls.len();
        self.controls.push(control);
        &mut self.controls[index]
    }

    pub fn set_interrupt_guard(&mut self, enabled: bool) {
        for control in &mut self.controls {
            control.set_interrupt_guard(enabled);
        }
    }

    /// Evaluate each control in order. Returns the aggregate over all controls.
    pub fn evaluate(
        &mut self,
        target: &Value,
        user_applicability: &[String],
        changes_allowed: bool,
    ) -> Outcome {
        if self.controls.is_empty() {
            self.outcome = Outcome::NeedsReview;
            return self.outcome;
        }
        for control in &mut self.controls {
            control.evaluate(target, user_applicability, changes_allowed);
            self.outcome = Outcome::aggregate(self.outcome, control.outcome());
            self.corrupted_state |= control.corrupted_state();
        }
        info!(
            catalog_id = %self.catalog_id,
            controls = self.controls.len(),
            outcome = %self.outcome,
            corrupted_state = self.corrupted_state,
            "evaluation finished"
        );
        self.outcome
    }

    /// Apply `policy`'s interrupt setting, then evaluate with its applicability and permissions.
    pub fn evaluate_with(&mut self, target: &Value, policy: &EvaluationPolicy) -> Outcome {
        self.set_interrupt_guard(policy.interrupt_guard);
        self.evaluate(target, &policy.applicability, policy.changes_allowed)
    }

    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    pub fn controls(&self) -> &[ControlEvaluation] {
        &self.controls
    }

    pub fn control_mut(&mut self, control_id: &str) -> Option<&mut ControlEvaluation> {
        self.controls
            .iter_mut()
            .find(|c| c.control_id() == control_id)
    }

    pub fn assessment_mut(
        &mut self,
        control_id: &str,
        requirement_id: &str,
    ) -> Option<&mut Assessment> {
        self.control_mut(control_id)?.assessment_mut(requirement_id)
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn corrupted_state(&self) -> bool {
        self.corrupted_state
    }

    pub fn report_data(&self) -> EvaluationData {
        EvaluationData {
            catalog_id: self.catalog_id.clone(),
            counts: self.controls.iter().map(ControlEvaluation::outcome).collect::<OutcomeCounts>(),
            controls: self.controls.iter().map(ControlEvaluation::record).collect(),
        }
    }
}
