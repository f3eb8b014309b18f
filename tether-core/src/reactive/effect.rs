//! Effect Handle
//!
//! [`Runtime::run`](super::Runtime::run) returns an [`Effect`]: a handle to
//! the installed computation. The computation keeps running on every relevant
//! write whether or not the handle is kept, so bindings can be fire-and-forget.
//! Keep the handle to inspect, re-run, or dispose it.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::runtime::WeakRuntime;
use super::subscriber::{Computation, ComputationId};
use crate::error::ReactiveError;

/// A side-effecting computation that re-runs when its dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let count = rt.cell(0);
///
/// let c = count.clone();
/// let effect = rt.run(move || println!("Count is: {}", c.get()))?;
///
/// count.set(5)?;  // Prints: "Count is: 5"
/// effect.dispose();
/// count.set(6)?;  // Prints nothing
/// ```
#[derive(Clone)]
pub struct Effect {
    runtime: WeakRuntime,
    computation: Rc<Computation>,
}

impl Effect {
    pub(crate) fn new(runtime: WeakRuntime, computation: Rc<Computation>) -> Self {
        Self {
            runtime,
            computation,
        }
    }

    /// Get the effect's computation ID.
    pub fn id(&self) -> ComputationId {
        self.computation.id()
    }

    /// Execute the effect again, tracking any new reads.
    ///
    /// Does nothing once disposed. Failures of the effect itself, and of
    /// anything its writes trigger, are returned.
    pub fn execute(&self) -> Result<(), ReactiveError> {
        if self.is_disposed() {
            return Ok(());
        }

        match self.runtime.upgrade() {
            Some(runtime) => runtime.rerun(&self.computation),
            None => self.computation.invoke(),
        }
    }

    /// Dispose of the effect.
    ///
    /// After disposal the effect never runs again and its dependency
    /// registrations are removed.
    pub fn dispose(&self) {
        if self.is_disposed() {
            return;
        }

        match self.runtime.upgrade() {
            Some(runtime) => runtime.dispose_computation(self.id()),
            None => {
                self.computation.dispose();
                debug!(computation = %self.id(), "disposed effect of dropped runtime");
            }
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.computation.is_disposed()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.computation.run_count()
    }

    /// Number of `(object, field)` keys the effect is registered against.
    pub fn dependency_count(&self) -> usize {
        self.runtime
            .upgrade()
            .map_or(0, |runtime| runtime.dependency_count(self.id()))
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::Runtime;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn effect_runs_on_creation() {
        let rt = Runtime::new();
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let effect = rt
            .run(move || run_count_clone.set(run_count_clone.get() + 1))
            .unwrap();

        // Effect should have run once on creation
        assert_eq!(run_count.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_execute_reruns() {
        let rt = Runtime::new();
        let effect = rt.run(|| {}).unwrap();

        effect.execute().unwrap();
        effect.execute().unwrap();
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let rt = Runtime::new();
        let count = rt.cell(0);
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let c = count.clone();
        let effect = rt
            .run(move || {
                c.get();
                run_count_clone.set(run_count_clone.get() + 1);
            })
            .unwrap();
        assert_eq!(effect.dependency_count(), 1);

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(effect.dependency_count(), 0);

        // Neither writes nor manual execution run it
        count.set(1).unwrap();
        effect.execute().unwrap();
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn dropping_the_handle_keeps_the_effect_alive() {
        let rt = Runtime::new();
        let count = rt.cell(0);
        let seen = Rc::new(Cell::new(0));

        {
            let c = count.clone();
            let seen = seen.clone();
            let _effect = rt.run(move || seen.set(c.get())).unwrap();
        }

        count.set(7).unwrap();
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn effect_clone_shares_state() {
        let rt = Runtime::new();
        let effect1 = rt.run(|| {}).unwrap();
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());

        effect1.execute().unwrap();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }

    #[test]
    fn effect_outlives_runtime() {
        let rt = Runtime::new();
        let effect = rt.run(|| {}).unwrap();
        drop(rt);

        // Untracked, but still callable.
        effect.execute().unwrap();
        assert_eq!(effect.run_count(), 2);
        assert_eq!(effect.dependency_count(), 0);
    }
}
