use crate::change::{Change, ChangeHandle};
use evalguard_types::ChangeRecord;
use std::collections::BTreeMap;
use tracing::warn;

/// Named changes owned by one assessment.
///
/// Cloning shares the underlying changes; it does not copy them.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    changes: BTreeMap<String, ChangeHandle>,
}

impl ChangeSet {
    /// Register a change under `name`, replacing any previous change with that name.
    pub fn insert(&mut self, name: impl Into<String>, change: Change) -> ChangeHandle {
        let handle = ChangeHandle::new(change);
        self.changes.insert(name.into(), handle.clone());
        handle
    }

    pub fn get(&self, name: &str) -> Option<&ChangeHandle> {
        self.changes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeHandle)> {
        self.changes.iter().map(|(name, handle)| (name.as_str(), handle))
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub(crate) fn allow_all(&self) {
        for handle in self.changes.values() {
            handle.allow();
        }
    }

    /// Attempt to revert every outstanding change.
    ///
    /// Returns `true` (corrupted) if any change is left with an error or unreverted.
    /// Every change gets its attempt even after corruption is detected.
    pub fn revert_all(&self) -> bool {
        let mut corrupted = false;
        for (name, handle) in &self.changes {
            if !handle.settle() {
                warn!(change = %name, "change left in a corrupted state");
                corrupted = true;
            }
        }
        corrupted
    }

    pub fn records(&self) -> Vec<ChangeRecord> {
        self.changes
            .iter()
            .map(|(name, handle)| handle.lock().record(name))
            .collect()
    }
}
