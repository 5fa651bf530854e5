//! Compliance evaluation engine (no IO beyond the changes callers plug in).
//!
//! Input: a target value plus assessments wired with steps and changes.
//! Output: outcomes, corruption flags and report records.

#![forbid(unsafe_code)]

pub mod assessment;
pub mod change;
pub mod changes;
pub mod control;
pub mod evaluation;
pub mod interrupt;
pub mod policy;
pub mod step;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use assessment::{Assessment, InvalidAssessment};
pub use change::{
    ApplyAction, ApplyError, ApplyOutcome, Change, ChangeBuilder, ChangeError, ChangeHandle, RevertAction,
    apply_fn, revert_fn,
};
pub use changes::ChangeSet;
pub use control::ControlEvaluation;
pub use evaluation::Evaluation;
pub use interrupt::InterruptGuard;
pub use policy::EvaluationPolicy;
pub use step::{Step, StepOutcome, step_fn};
