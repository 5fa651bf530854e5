use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a step, an assessment, or a whole control evaluation.
///
/// The set is closed. Reports always carry the label (`"Needs Review"`), never a numeric code.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Outcome {
    #[default]
    #[serde(rename = "Not Run")]
    NotRun,
    #[serde(rename = "Passed")]
    Passed,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Needs Review")]
    NeedsReview,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Outcome {
    pub const ALL: [Outcome; 6] = [
        Outcome::NotRun,
        Outcome::Passed,
        Outcome::Failed,
        Outcome::NeedsReview,
        Outcome::NotApplicable,
        Outcome::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Outcome::NotRun => "Not Run",
            Outcome::Passed => "Passed",
            Outcome::Failed => "Failed",
            Outcome::NeedsReview => "Needs Review",
            Outcome::NotApplicable => "Not Applicable",
            Outcome::Unknown => "Unknown",
        }
    }

    /// Map a raw numeric code (declaration order) to an outcome.
    ///
    /// Codes outside the closed set collapse to `Unknown`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Outcome::NotRun,
            1 => Outcome::Passed,
            2 => Outcome::Failed,
            3 => Outcome::NeedsReview,
            4 => Outcome::NotApplicable,
            _ => Outcome::Unknown,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Outcome::ALL.into_iter().find(|o| o.label() == label)
    }

    /// Fold `incoming` into `previous`, keeping the more severe of the two.
    ///
    /// Severity: `Passed < NeedsReview < Unknown < Failed`. An incoming `NotRun`
    /// contributes nothing. `NotApplicable` ranks with `Passed`.
    pub fn aggregate(previous: Outcome, incoming: Outcome) -> Outcome {
        if incoming == Outcome::NotRun {
            return previous;
        }
        if previous == Outcome::Failed || incoming == Outcome::Failed {
            return Outcome::Failed;
        }
        if previous == Outcome::Unknown || incoming == Outcome::Unknown {
            return Outcome::Unknown;
        }
        if previous == Outcome::NeedsReview || incoming == Outcome::NeedsReview {
            return Outcome::NeedsReview;
        }
        Outcome::Passed
    }

    pub fn is_failed(self) -> bool {
        self == Outcome::Failed
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
