//! Reversible mutations of an assessment target.

use evalguard_types::ChangeRecord;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Terminal error carried by a [`Change`]. Once set, the change is inert.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    #[error(
        "apply and revert actions must be defined for a change, but got apply: {apply}, revert: {revert}"
    )]
    MissingActions { apply: bool, revert: bool },

    #[error(
        "change must have a target name and description defined, but got target name: {target_name:?}, description: {description:?}"
    )]
    MissingIdentity {
        target_name: String,
        description: String,
    },

    #[error("applying change to {target_name} failed: {reason}")]
    ApplyFailed { target_name: String, reason: String },

    #[error("reverting change to {target_name} failed: {reason}")]
    RevertFailed { target_name: String, reason: String },
}

/// Failure of an [`ApplyAction`], with whatever output it produced before failing.
#[derive(Debug)]
pub struct ApplyError {
    pub output: Option<Value>,
    pub error: anyhow::Error,
}

impl ApplyError {
    pub fn with_output(output: Value, error: impl Into<anyhow::Error>) -> Self {
        Self {
            output: Some(output),
            error: error.into(),
        }
    }
}

impl From<anyhow::Error> for ApplyError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            output: None,
            error,
        }
    }
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)
    }
}

/// Performs the mutation. Receives the caller's input and returns an output payload.
pub trait ApplyAction: Send {
    fn apply(&mut self, input: Value) -> Result<Value, ApplyError>;
}

/// Undoes the mutation.
pub trait RevertAction: Send {
    fn revert(&mut self, data: Value) -> anyhow::Result<()>;
}

/// Adapter returned by [`apply_fn`].
pub struct FnApply<F>(F);

/// Adapter returned by [`revert_fn`].
pub struct FnRevert<F>(F);

/// Wrap a closure as an [`ApplyAction`].
pub fn apply_fn<F>(f: F) -> FnApply<F>
where
    F: FnMut(Value) -> Result<Value, ApplyError> + Send,
{
    FnApply(f)
}

/// Wrap a closure as a [`RevertAction`].
pub fn revert_fn<F>(f: F) -> FnRevert<F>
where
    F: FnMut(Value) -> anyhow::Result<()> + Send,
{
    FnRevert(f)
}

impl<F> ApplyAction for FnApply<F>
where
    F: FnMut(Value) -> Result<Value, ApplyError> + Send,
{
    fn apply(&mut self, input: Value) -> Result<Value, ApplyError> {
        (self.0)(input)
    }
}

impl<F> RevertAction for FnRevert<F>
where
    F: FnMut(Value) -> anyhow::Result<()> + Send,
{
    fn revert(&mut self, data: Value) -> anyhow::Result<()> {
        (self.0)(data)
    }
}

/// Result of [`Change::apply`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplyOutcome {
    pub applied: bool,
    /// Output of the apply action. `None` when the action was not invoked, or failed without any.
    pub output: Option<Value>,
}

impl ApplyOutcome {
    fn skipped() -> Self {
        Self::default()
    }

    fn already_applied() -> Self {
        Self {
            applied: true,
            output: None,
        }
    }
}

/// A single reversible mutation applied to an external target.
///
/// Lifecycle: created disallowed, then allowed by its owning assessment, then applied
/// (repeat applications are no-ops), then reverted, after which it may be applied again.
/// Failures never escape as panics or `Err`; they are stored on the change and make it inert.
pub struct Change {
    target_name: String,
    description: String,
    target_object: Value,
    apply_action: Option<Box<dyn ApplyAction>>,
    revert_action: Option<Box<dyn RevertAction>>,
    applied: bool,
    reverted: bool,
    allowed: bool,
    error: Option<ChangeError>,
}

impl Change {
    pub fn new(
        target_name: impl Into<String>,
        description: impl Into<String>,
        target_object: Value,
        apply: impl ApplyAction + 'static,
        revert: impl RevertAction + 'static,
    ) -> Self {
        Change::builder(target_name, description)
            .target_object(target_object)
            .apply(apply)
            .revert(revert)
            .build()
    }

    /// Start a change whose actions may be attached piecemeal.
    ///
    /// A change built without both actions is accepted here and rejected by its first apply or revert.
    pub fn builder(target_name: impl Into<String>, description: impl Into<String>) -> ChangeBuilder {
        ChangeBuilder {
            change: Change {
                target_name: target_name.into(),
                description: description.into(),
                target_object: Value::Null,
                apply_action: None,
                revert_action: None,
                applied: false,
                reverted: false,
                allowed: false,
                error: None,
            },
        }
    }

    pub fn allow(&mut self) {
        self.allowed = true;
    }

    pub fn apply(
        &mut self,
        target_name: impl Into<String>,
        target_object: Value,
        input: Value,
    ) -> ApplyOutcome {
        if !self.allowed {
            return ApplyOutcome::skipped();
        }
        if !self.precheck() {
            return ApplyOutcome::skipped();
        }
        if self.applied && !self.reverted {
            return ApplyOutcome::already_applied();
        }

        self.target_name = target_name.into();
        self.target_object = target_object;

        let Some(action) = self.apply_action.as_mut() else {
            return ApplyOutcome::skipped();
        };
        match action.apply(input) {
            Ok(output) => {
                self.applied = true;
                self.reverted = false;
                debug!(target_name = %self.target_name, "change applied");
                ApplyOutcome {
                    applied: true,
                    output: Some(output),
                }
            }
            Err(ApplyError { output, error }) => {
                let err = ChangeError::ApplyFailed {
                    target_name: self.target_name.clone(),
                    reason: format!("{error:#}"),
                };
                warn!(error = %err, "change could not be applied");
                self.error = Some(err);
                ApplyOutcome {
                    applied: false,
                    output,
                }
            }
        }
    }

    pub fn revert(&mut self, data: Value) {
        if !self.precheck() {
            return;
        }
        if !self.applied {
            return;
        }
        let Some(action) = self.revert_action.as_mut() else {
            return;
        };
        match action.revert(data) {
            Ok(()) => {
                self.reverted = true;
                debug!(target_name = %self.target_name, "change reverted");
            }
            Err(err) => {
                let err = ChangeError::RevertFailed {
                    target_name: self.target_name.clone(),
                    reason: format!("{err:#}"),
                };
                warn!(error = %err, "change could not be reverted");
                self.error = Some(err);
            }
        }
    }

    /// Revert when the change was applied (or failed) and is still outstanding.
    ///
    /// Returns `true` when the change is clean afterwards.
    pub fn settle(&mut self) -> bool {
        if !self.applied && self.error.is_none() {
            return true;
        }
        if !self.reverted {
            self.revert(Value::Null);
        }
        self.error.is_none() && self.reverted
    }

    /// Records the first problem found; a change that already carries an error keeps it.
    fn precheck(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        let problem = if self.apply_action.is_none() || self.revert_action.is_none() {
            ChangeError::MissingActions {
                apply: self.apply_action.is_some(),
                revert: self.revert_action.is_some(),
            }
        } else if self.target_name.is_empty() || self.description.is_empty() {
            ChangeError::MissingIdentity {
                target_name: self.target_name.clone(),
                description: self.description.clone(),
            }
        } else {
            return true;
        };
        warn!(error = %problem, "change rejected");
        self.error = Some(problem);
        false
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn target_object(&self) -> &Value {
        &self.target_object
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn is_reverted(&self) -> bool {
        self.reverted
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn error(&self) -> Option<&ChangeError> {
        self.error.as_ref()
    }

    pub fn record(&self, name: &str) -> ChangeRecord {
        ChangeRecord {
            name: name.to_string(),
            target_name: self.target_name.clone(),
            description: self.description.clone(),
            allowed: self.allowed,
            applied: self.applied,
            reverted: self.reverted,
            error: self.error.as_ref().map(ToString::to_string),
            target_object: self.target_object.clone(),
        }
    }
}

impl fmt::Debug for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Change")
            .field("target_name", &self.target_name)
            .field("description", &self.description)
            .field("target_object", &self.target_object)
            .field("has_apply", &self.apply_action.is_some())
            .field("has_revert", &self.revert_action.is_some())
            .field("applied", &self.applied)
            .field("reverted", &self.reverted)
            .field("allowed", &self.allowed)
            .field("error", &self.error)
            .finish()
    }
}

pub struct ChangeBuilder {
    change: Change,
}

impl ChangeBuilder {
    pub fn target_object(mut self, target_object: Value) -> Self {
        self.change.target_object = target_object;
        self
    }

    pub fn apply(mut self, action: impl ApplyAction + 'static) -> Self {
        self.change.apply_action = Some(Box::new(action));
        self
    }

    pub fn revert(mut self, action: impl RevertAction + 'static) -> Self {
        self.change.revert_action = Some(Box::new(action));
        self
    }

    pub fn build(self) -> Change {
        self.change
    }
}

/// Shared handle to a [`Change`].
///
/// The owning assessment and the interrupt cleanup hook both hold one, so a change can be
/// reverted from the signal listener while the evaluation is mid-step.
///
/// Steps reach handles through a shared [`crate::ChangeSet`]. They can apply, revert and
/// inspect a change, but cannot grant it permission:
///
/// ```compile_fail
/// use evalguard_domain::{ChangeSet, StepOutcome, step_fn};
///
/// let _step = step_fn("self_allow", |_, changes: &ChangeSet| {
///     if let Some(handle) = changes.get("acl") {
///         handle.allow();
///     }
///     StepOutcome::passed("allowed")
/// });
/// ```
#[derive(Clone)]
pub struct ChangeHandle(Arc<Mutex<Change>>);

impl ChangeHandle {
    pub fn new(change: Change) -> Self {
        ChangeHandle(Arc::new(Mutex::new(change)))
    }

    /// A panic inside an action must not stop cleanup, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Change> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Only the owning assessment grants permission; steps see handles without this.
    pub(crate) fn allow(&self) {
        self.lock().allow();
    }

    pub fn apply(
        &self,
        target_name: impl Into<String>,
        target_object: Value,
        input: Value,
    ) -> ApplyOutcome {
        self.lock().apply(target_name, target_object, input)
    }

    pub fn revert(&self, data: Value) {
        self.lock().revert(data);
    }

    pub fn settle(&self) -> bool {
        self.lock().settle()
    }

    pub fn is_applied(&self) -> bool {
        self.lock().is_applied()
    }

    pub fn is_reverted(&self) -> bool {
        self.lock().is_reverted()
    }

    pub fn is_allowed(&self) -> bool {
        self.lock().is_allowed()
    }

    pub fn error(&self) -> Option<ChangeError> {
        self.lock().error().cloned()
    }
}

impl fmt::Debug for ChangeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lock().fmt(f)
    }
}
