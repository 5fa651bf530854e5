use crate::assessment::Assessment;
use crate::change::{ApplyAction, Change, RevertAction, apply_fn, revert_fn};
use crate::control::ControlEvaluation;
use crate::step::{Step, StepOutcome, step_fn};
use evalguard_types::{Catalog, Control, ControlFamily, Metadata, Requirement};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn testing_applicability() -> Vec<String> {
    vec!["test-applicability".to_string()]
}

pub fn good_apply() -> impl ApplyAction + 'static {
    apply_fn(Ok)
}

pub fn bad_apply() -> impl ApplyAction + 'static {
    apply_fn(|_| Err(anyhow::anyhow!("apply rejected by target").into()))
}

pub fn good_revert() -> impl RevertAction + 'static {
    revert_fn(|_| Ok(()))
}

pub fn bad_revert() -> impl RevertAction + 'static {
    revert_fn(|_| anyhow::bail!("revert rejected by target"))
}

pub fn counting_apply(calls: Arc<AtomicUsize>) -> impl ApplyAction + 'static {
    apply_fn(move |input| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    })
}

pub fn pending_change(target_name: &str) -> Change {
    Change::new(
        target_name,
        "description placeholder",
        Value::Null,
        good_apply(),
        good_revert(),
    )
}

pub fn bad_revert_change() -> Change {
    Change::new(
        "bad-revert",
        "description placeholder",
        Value::Null,
        good_apply(),
        bad_revert(),
    )
}

pub fn passing_step() -> Box<dyn Step> {
    Box::new(step_fn("passing_step", |_, _| StepOutcome::passed("passed")))
}

pub fn failing_step() -> Box<dyn Step> {
    Box::new(step_fn("failing_step", |_, _| StepOutcome::failed("failed")))
}

fn needs_review_step() -> Box<dyn Step> {
    Box::new(step_fn("needs_review_step", |_, _| {
        StepOutcome::needs_review("needs review")
    }))
}

fn unknown_step() -> Box<dyn Step> {
    Box::new(step_fn("unknown_step", |_, _| StepOutcome::unknown("unknown")))
}

/// Applies the change registered under `name`; passes even when the change was not applied.
pub fn applying_step(name: &'static str) -> Box<dyn Step> {
    Box::new(step_fn(format!("apply_{name}"), move |target, changes| {
        match changes.get(name) {
            Some(handle) => {
                handle.apply(name, target.clone(), Value::Null);
                StepOutcome::passed("passed")
            }
            None => StepOutcome::unknown(format!("no change named {name}")),
        }
    }))
}

fn assessment(requirement_id: &str, steps: Vec<Box<dyn Step>>) -> Assessment {
    match Assessment::new(
        requirement_id,
        "description placeholder",
        testing_applicability(),
        steps,
    ) {
        Ok(assessment) => assessment,
        Err(err) => panic!("fixture assessment is invalid: {err}"),
    }
}

pub fn passing_assessment() -> Assessment {
    assessment("passing", vec![passing_step()])
}

pub fn failing_assessment() -> Assessment {
    assessment("failing", vec![failing_step(), passing_step()])
}

pub fn needs_review_assessment() -> Assessment {
    assessment(
        "needs-review",
        vec![passing_step(), needs_review_step(), passing_step()],
    )
}

pub fn unknown_assessment() -> Assessment {
    assessment(
        "unknown",
        vec![passing_step(), unknown_step(), passing_step()],
    )
}

pub fn bad_revert_assessment() -> Assessment {
    let mut assessment = assessment(
        "bad-revert",
        vec![passing_step(), applying_step("bad-revert"), passing_step()],
    );
    assessment.add_change("bad-revert", bad_revert_change());
    assessment
}

pub fn control_with(assessments: Vec<Assessment>) -> ControlEvaluation {
    let mut control = ControlEvaluation::new("test family", "CTRL-TEST");
    for assessment in assessments {
        control.push_assessment(assessment);
    }
    control
}

fn requirement(id: &str, text: &str) -> Requirement {
    Requirement {
        id: id.to_string(),
        text: text.to_string(),
        applicability: testing_applicability(),
        recommendation: None,
    }
}

fn control(id: &str, requirements: Vec<Requirement>) -> Control {
    Control {
        id: id.to_string(),
        title: format!("{id} title"),
        objective: String::new(),
        requirements,
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog {
        metadata: Metadata {
            id: "CAT-1".to_string(),
            title: "Sample catalog".to_string(),
            version: "1.0.0".to_string(),
            ..Metadata::default()
        },
        control_families: vec![
            ControlFamily {
                name: "Access Control".to_string(),
                description: String::new(),
                controls: vec![
                    control(
                        "AC-01",
                        vec![
                            requirement("AC-01.01", "Require MFA"),
                            requirement("AC-01.02", "Disable shared accounts"),
                        ],
                    ),
                    control("AC-02", vec![requirement("AC-02.01", "Rotate keys")]),
                ],
            },
            ControlFamily {
                name: "Data Protection".to_string(),
                description: String::new(),
                controls: vec![control("DP-01", Vec::new())],
            },
        ],
    }
}
