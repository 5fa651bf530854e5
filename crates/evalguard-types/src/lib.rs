//! Stable DTOs used across the evalguard workspace.
//!
//! This crate is intentionally boring:
//! - the closed `Outcome` enumeration and its aggregation rule
//! - the catalog model supplied by external loaders
//! - data types for the emitted evaluation report

#![forbid(unsafe_code)]

pub mod catalog;
pub mod outcome;
pub mod report;

pub use catalog::{Catalog, Category, Control, ControlFamily, Metadata, Requirement};
pub use outcome::Outcome;
pub use report::{
    AssessmentRecord, ChangeRecord, ControlEvaluationRecord, EvaluationData, EvaluationReport,
    OutcomeCounts, ReportEnvelope, RunMeta, ToolMeta, SCHEMA_CONFIG_V1, SCHEMA_REPORT_V1,
};
