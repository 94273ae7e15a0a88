// Ordered registry of the query groups declared under one fetcher scope
use std::sync::Mutex;

use crate::domain::query::QueryGroup;

/// Handle returned by [`QueryRegistry::register`], used to remove exactly
/// that registration later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationToken(u64);

/// Mutable, ordered collection of [`QueryGroup`]s, scoped to the lifetime of
/// one batch fetcher. Declaring parties register on mount, unregister on
/// unmount, and re-register when their queries, unit, or position change;
/// the registry does no diffing.
///
/// The `&self` API uses a mutex internally, but the intended use is
/// single-threaded cooperative scheduling from the declaring side.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    groups: Vec<(u64, QueryGroup)>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, group: QueryGroup) -> RegistrationToken {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.groups.push((id, group));
        RegistrationToken(id)
    }

    /// Remove the registration behind `token`. A no-op when the token was
    /// already unregistered or the registry has been cleared.
    pub fn unregister(&self, token: RegistrationToken) {
        self.lock().groups.retain(|(id, _)| *id != token.0);
    }

    /// Shallow copy of the current groups in registration order. Taken once
    /// per trigger; later mutations do not affect an in-flight batch.
    pub fn snapshot(&self) -> Vec<QueryGroup> {
        self.lock()
            .groups
            .iter()
            .map(|(_, group)| group.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().groups.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
