//! Computation types for the reactive system.
//!
//! A Computation is any tracked, side-effecting closure registered with a
//! runtime. Its identity (a [`ComputationId`]) is what dependency sets store,
//! so registering the same computation twice under one key is a no-op.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ReactiveError;

/// Unique identifier for a computation.
///
/// Each computation gets a unique ID when created. Dependency sets hold these
/// IDs rather than the closures themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

impl ComputationId {
    /// Generate a new unique computation ID.
    ///
    /// Uses an atomic counter so IDs stay unique across runtimes.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ComputationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computation#{}", self.0)
    }
}

/// The closure type stored for every computation.
pub(crate) type ComputationFn = dyn Fn() -> Result<(), ReactiveError>;

/// A registered computation.
pub(crate) struct Computation {
    id: ComputationId,
    run: Box<ComputationFn>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
}

impl Computation {
    pub(crate) fn new<F>(run: F) -> Self
    where
        F: Fn() -> Result<(), ReactiveError> + 'static,
    {
        Self {
            id: ComputationId::new(),
            run: Box::new(run),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        }
    }

    pub(crate) fn id(&self) -> ComputationId {
        self.id
    }

    /// Invoke the closure. The caller is responsible for entering a context.
    pub(crate) fn invoke(&self) -> Result<(), ReactiveError> {
        self.run_count.set(self.run_count.get() + 1);
        (self.run)()
    }

    pub(crate) fn run_count(&self) -> usize {
        self.run_count.get()
    }

    pub(crate) fn dispose(&self) {
        self.disposed.set(true);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn computation_ids_are_unique() {
        let id1 = ComputationId::new();
        let id2 = ComputationId::new();
        let id3 = ComputationId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn invoke_counts_runs_and_forwards_result() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();

        let computation = Computation::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            if calls_clone.get() > 1 {
                Err(ReactiveError::aborted("second run"))
            } else {
                Ok(())
            }
        });

        assert_eq!(computation.run_count(), 0);
        assert!(computation.invoke().is_ok());
        assert!(computation.invoke().is_err());
        assert_eq!(computation.run_count(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn display_is_tagged() {
        let id = ComputationId::new();
        assert_eq!(id.to_string(), format!("computation#{}", id.raw()));
    }
}
