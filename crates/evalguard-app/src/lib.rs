//! Use case orchestration for evalguard.
//!
//! This crate provides the application layer: it resolves configuration, drives an
//! [`evalguard_domain::Evaluation`], and wraps the result in a report envelope. Callers own the
//! IO (reading config files, writing reports).

#![forbid(unsafe_code)]

mod report;
mod run;

pub use report::{outcome_exit_code, serialize_report};
pub use run::{RunInput, RunOutput, run_evaluation};
