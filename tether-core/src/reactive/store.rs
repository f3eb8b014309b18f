//! Dependency Store
//!
//! Maps a [`DependencyKey`] (an observed object's identity plus a field name)
//! to the set of computations that read that field.
//!
//! Sets are created lazily on the first tracked read and keep insertion
//! order, so computations fire in the order they first subscribed. Entries are
//! only removed when a computation is explicitly disposed or the whole store
//! is cleared.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use super::ComputationId;

/// Identity of an observed object or cell.
///
/// Identity is by allocation, never by contents: two records holding equal
/// values are still distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// The unit of tracking granularity: one field of one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyKey {
    pub object: ObjectId,
    pub field: String,
}

impl DependencyKey {
    pub fn new(object: ObjectId, field: impl Into<String>) -> Self {
        Self {
            object,
            field: field.into(),
        }
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.field)
    }
}

/// Registry of dependency sets.
#[derive(Debug, Default)]
pub struct DependencyStore {
    deps: HashMap<DependencyKey, IndexSet<ComputationId>>,
}

impl DependencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `computation` against `key`.
    ///
    /// Returns `true` if this is a new registration.
    pub fn record(&mut self, key: DependencyKey, computation: ComputationId) -> bool {
        self.deps.entry(key).or_default().insert(computation)
    }

    /// Copy of the dependency set for `key`, as it stands right now.
    ///
    /// Firing iterates this copy, so computations registered while the fire
    /// is in progress are not invoked by it.
    pub fn snapshot(&self, key: &DependencyKey) -> Vec<ComputationId> {
        self.deps
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of computations registered against `key`.
    pub fn dependents(&self, key: &DependencyKey) -> usize {
        self.deps.get(key).map_or(0, IndexSet::len)
    }

    /// Whether `computation` is registered against `key`.
    pub fn is_registered(&self, key: &DependencyKey, computation: ComputationId) -> bool {
        self.deps
            .get(key)
            .is_some_and(|set| set.contains(&computation))
    }

    /// Number of keys that have a dependency set.
    pub fn key_count(&self) -> usize {
        self.deps.len()
    }

    /// Number of keys `computation` is registered against.
    pub fn dependency_count(&self, computation: ComputationId) -> usize {
        self.deps
            .values()
            .filter(|set| set.contains(&computation))
            .count()
    }

    /// Remove every registration of `computation`.
    ///
    /// Sets left empty are dropped.
    pub fn remove_computation(&mut self, computation: ComputationId) {
        self.deps.retain(|_, set| {
            set.shift_remove(&computation);
            !set.is_empty()
        });
    }

    /// Drop every dependency set.
    pub fn clear(&mut self) {
        self.deps.clear();
    }
}
