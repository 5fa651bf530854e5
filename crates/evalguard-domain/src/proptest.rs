//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Outcome aggregation (failure dominance, order independence)
//! - Change permission gating
//! - Control evaluation halting

use crate::change::{Change, ChangeHandle};
use crate::control::ControlEvaluation;
use crate::test_support::{
    counting_apply, failing_assessment, good_revert, passing_assessment, testing_applicability,
};
use evalguard_types::Outcome;
use proptest::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Strategies for generating arbitrary values
// ============================================================================

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::NotRun),
        Just(Outcome::Passed),
        Just(Outcome::Failed),
        Just(Outcome::NeedsReview),
        Just(Outcome::NotApplicable),
        Just(Outcome::Unknown),
    ]
}

/// Outcomes a step actually reports; `NotRun` and `NotApplicable` are bookkeeping values.
fn arb_reported_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Passed),
        Just(Outcome::Failed),
        Just(Outcome::NeedsReview),
        Just(Outcome::Unknown),
    ]
}

fn fold(outcomes: impl IntoIterator<Item = Outcome>) -> Outcome {
    outcomes
        .into_iter()
        .fold(Outcome::NotRun, Outcome::aggregate)
}

#[derive(Clone, Copy, Debug)]
enum ChangeOp {
    Apply,
    Revert,
    Settle,
}

fn arb_change_op() -> impl Strategy<Value = ChangeOp> {
    prop_oneof![
        Just(ChangeOp::Apply),
        Just(ChangeOp::Revert),
        Just(ChangeOp::Settle),
    ]
}

// ============================================================================
// Aggregation
// ============================================================================

proptest! {
    /// Once any outcome is Failed, the fold stays Failed.
    #[test]
    fn failed_is_absolute(
        before in prop::collection::vec(arb_outcome(), 0..8),
        after in prop::collection::vec(arb_outcome(), 0..8),
    ) {
        let outcomes = before.into_iter().chain([Outcome::Failed]).chain(after);
        prop_assert_eq!(fold(outcomes), Outcome::Failed);
    }

    /// An incoming NotRun never changes the aggregate.
    #[test]
    fn not_run_is_identity(previous in arb_outcome()) {
        prop_assert_eq!(Outcome::aggregate(previous, Outcome::NotRun), previous);
    }

    /// Reported outcomes fold to the same value in any order.
    #[test]
    fn fold_is_order_independent(outcomes in prop::collection::vec(arb_reported_outcome(), 0..12)) {
        let forward = fold(outcomes.iter().copied());
        let backward = fold(outcomes.iter().rev().copied());
        prop_assert_eq!(forward, backward);
    }

    /// The fold is the most severe outcome seen.
    #[test]
    fn fold_picks_most_severe(outcomes in prop::collection::vec(arb_reported_outcome(), 1..12)) {
        let expected = [Outcome::Failed, Outcome::Unknown, Outcome::NeedsReview]
            .into_iter()
            .find(|o| outcomes.contains(o))
            .unwrap_or(Outcome::Passed);
        prop_assert_eq!(fold(outcomes), expected);
    }
}

// ============================================================================
// Changes
// ============================================================================

proptest! {
    /// No sequence of operations applies a change that was never allowed.
    #[test]
    fn disallowed_change_never_invokes_apply(ops in prop::collection::vec(arb_change_op(), 0..16)) {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ChangeHandle::new(Change::new(
            "target",
            "description placeholder",
            Value::Null,
            counting_apply(calls.clone()),
            good_revert(),
        ));

        for op in ops {
            match op {
                ChangeOp::Apply => {
                    let outcome = handle.apply("target", Value::Null, Value::Null);
                    prop_assert!(!outcome.applied);
                }
                ChangeOp::Revert => handle.revert(Value::Null),
                ChangeOp::Settle => {
                    prop_assert!(handle.settle());
                }
            }
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
        prop_assert!(!handle.is_applied());
    }

    /// An allowed change is applied at most once between reverts.
    #[test]
    fn apply_runs_once_per_revert(ops in prop::collection::vec(arb_change_op(), 0..16)) {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ChangeHandle::new(Change::new(
            "target",
            "description placeholder",
            Value::Null,
            counting_apply(calls.clone()),
            good_revert(),
        ));
        handle.allow();

        let mut expected = 0;
        let mut outstanding = false;
        for op in ops {
            match op {
                ChangeOp::Apply => {
                    if !outstanding {
                        expected += 1;
                        outstanding = true;
                    }
                    handle.apply("target", Value::Null, Value::Null);
                }
                ChangeOp::Revert => handle.revert(Value::Null),
                ChangeOp::Settle => {
                    handle.settle();
                }
            }
            if handle.is_reverted() {
                outstanding = false;
            }
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
    }
}

// ============================================================================
// Control evaluation
// ============================================================================

proptest! {
    /// Nothing after the first failing assessment runs.
    #[test]
    fn control_halts_at_first_failure(pattern in prop::collection::vec(any::<bool>(), 1..8)) {
        let mut control = ControlEvaluation::new("prop family", "CTRL-PROP");
        control.set_interrupt_guard(false);
        for passes in &pattern {
            control.push_assessment(if *passes { passing_assessment() } else { failing_assessment() });
        }

        control.evaluate(&Value::Null, &testing_applicability(), false);

        let first_failure = pattern.iter().position(|passes| !passes);
        let expected = if first_failure.is_some() { Outcome::Failed } else { Outcome::Passed };
        prop_assert_eq!(control.outcome(), expected);

        let cutoff = first_failure.map_or(pattern.len(), |i| i + 1);
        for (index, assessment) in control.assessments().iter().enumerate() {
            prop_assert_eq!(assessment.outcome() != Outcome::NotRun, index < cutoff);
        }
    }
}
