//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects reactive objects,
//! cells, and effects. It owns the dependency store, the active-computation
//! stack, and the registry of computations.
//!
//! # How It Works
//!
//! 1. [`Runtime::run`] registers a computation and executes it once inside a
//!    context, so every tracked read it performs calls [`Runtime::record`].
//!
//! 2. `record` inserts the active computation into the dependency set for
//!    `(object, field)`. Reads outside any computation are not tracked.
//!
//! 3. When a field changes, its owner calls [`Runtime::fire`], which:
//!    a. Snapshots the dependency set for the key
//!    b. Skips computations that are disposed or already on the active chain
//!    c. Re-executes the rest synchronously, in subscription order
//!
//! # Propagation and failures
//!
//! Every `fire` and every first run happens inside a propagation scope.
//! Failures (computation errors, cycles, depth overruns) are collected rather
//! than aborting the batch, and the outermost scope reports them all once the
//! last dependent has run. Nested writes issued by computations return `Ok`
//! for failures deferred to the outermost scope.
//!
//! # Threading
//!
//! A runtime is single-threaded: it is shared through `Rc` and is `!Send`.
//! No store or registry borrow is held while user code runs, so computations
//! are free to read, write, and register further computations.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use super::context::ActiveStack;
use super::effect::Effect;
use super::store::{DependencyKey, DependencyStore, ObjectId};
use super::subscriber::{Computation, ComputationId};
use crate::config::{CyclePolicy, RuntimeConfig};
use crate::error::{ConfigError, ReactiveError};

struct RuntimeInner {
    config: RuntimeConfig,
    store: RefCell<DependencyStore>,
    computations: RefCell<HashMap<ComputationId, Rc<Computation>>>,
    active: ActiveStack,
    /// Nesting of propagation scopes; zero when idle.
    depth: Cell<usize>,
    /// Failures waiting for the outermost scope to report them.
    pending: RefCell<Vec<ReactiveError>>,
}

/// Handle to a reactive runtime.
///
/// Cloning the handle shares the same runtime. Reactive objects and cells
/// hold only a weak reference, so dropping the last handle tears the graph
/// down; values stay readable and writable afterwards but are no longer
/// tracked.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Weak reference to a runtime, held by reactive values and effects.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

/// Restores the propagation depth when a scope ends, even on panic.
struct DepthGuard<'a> {
    inner: &'a RuntimeInner,
}

impl<'a> DepthGuard<'a> {
    fn enter(inner: &'a RuntimeInner) -> Self {
        inner.depth.set(inner.depth.get() + 1);
        Self { inner }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let depth = self.inner.depth.get().saturating_sub(1);
        self.inner.depth.set(depth);

        // A panic unwinding through the outermost scope abandons its batch.
        if depth == 0 && std::thread::panicking() {
            self.inner.pending.borrow_mut().clear();
        }
    }
}

/// Disposes a freshly registered computation unless committed.
struct InstallGuard<'a> {
    runtime: &'a Runtime,
    id: ComputationId,
    committed: bool,
}

impl<'a> InstallGuard<'a> {
    fn new(runtime: &'a Runtime, id: ComputationId) -> Self {
        Self {
            runtime,
            id,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for InstallGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.runtime.dispose_computation(self.id);
        }
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(RuntimeConfig::default())
    }

    /// Create a runtime with a custom configuration.
    pub fn with_config(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                store: RefCell::new(DependencyStore::new()),
                computations: RefCell::new(HashMap::new()),
                active: ActiveStack::new(),
                depth: Cell::new(0),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    /// Register and execute a tracked computation.
    ///
    /// The computation runs once immediately and again whenever a field it
    /// read is written. If the first run (or anything it triggers) fails, the
    /// computation is not installed and the failure is returned.
    pub fn run<F>(&self, f: F) -> Result<Effect, ReactiveError>
    where
        F: Fn() + 'static,
    {
        self.try_run(move || {
            f();
            Ok(())
        })
    }

    /// Like [`Runtime::run`], for computations that can fail.
    ///
    /// A failure on a later re-run is reported to whoever wrote the field
    /// that triggered it; the computation stays installed.
    pub fn try_run<F>(&self, f: F) -> Result<Effect, ReactiveError>
    where
        F: Fn() -> Result<(), ReactiveError> + 'static,
    {
        let computation = Rc::new(Computation::new(f));
        let id = computation.id();
        self.inner
            .computations
            .borrow_mut()
            .insert(id, Rc::clone(&computation));
        debug!(computation = %id, "registered computation");

        // Uninstalls the computation unless the first run completes cleanly,
        // including when it panics.
        let install = InstallGuard::new(self, id);

        // Failures already pending belong to an enclosing propagation.
        let mark = self.inner.pending.borrow().len();

        let mut first_run = Ok(());
        let batch = self.propagate(|| first_run = self.execute(&computation));
        let nested = self.take_pending_since(mark);

        let mut failures = Vec::new();
        if let Err(own) = first_run {
            failures.push(own);
        }
        if let Err(batch) = batch {
            failures.extend(batch.failures().into_iter().cloned());
        }
        failures.extend(nested);

        if let Err(err) = ReactiveError::collect(failures) {
            debug!(computation = %id, error = %err, "first run failed; discarding computation");
            return Err(err);
        }

        install.commit();
        Ok(Effect::new(self.downgrade(), computation))
    }

    /// Attribute a read of `(object, field)` to the running computation.
    ///
    /// No-op when nothing is running.
    pub fn record(&self, object: ObjectId, field: &str) {
        let Some(computation) = self.inner.active.current() else {
            return;
        };

        let inserted = self
            .inner
            .store
            .borrow_mut()
            .record(DependencyKey::new(object, field), computation);

        if inserted {
            trace!(%object, field, %computation, "tracked read");
        }
    }

    /// Re-run every computation that read `(object, field)`.
    pub fn fire(&self, object: ObjectId, field: &str) -> Result<(), ReactiveError> {
        let key = DependencyKey::new(object, field);
        self.propagate(|| self.fire_key(&key))
    }

    /// Execute `computation` manually, inside a propagation scope.
    pub(crate) fn rerun(&self, computation: &Rc<Computation>) -> Result<(), ReactiveError> {
        let id = computation.id();
        if self.inner.active.contains(id) {
            return match self.inner.config.on_cycle {
                CyclePolicy::Report => {
                    warn!(computation = %id, "cyclic dependency detected in execute");
                    Err(ReactiveError::CyclicDependency {
                        computation: id,
                        key: None,
                    })
                }
                CyclePolicy::Skip => {
                    debug!(computation = %id, "skipping re-entrant execute");
                    Ok(())
                }
            };
        }

        let mut own = Ok(());
        let batch = self.propagate(|| own = self.execute(computation));
        own.and(batch)
    }

    fn fire_key(&self, key: &DependencyKey) {
        let snapshot = self.inner.store.borrow().snapshot(key);
        if snapshot.is_empty() {
            return;
        }

        let depth = self.inner.depth.get();
        let limit = self.inner.config.max_depth;
        if depth > limit {
            warn!(%key, depth, limit, "propagation depth exceeded");
            self.report(ReactiveError::DepthExceeded {
                limit,
                key: key.clone(),
            });
            return;
        }

        trace!(%key, dependents = snapshot.len(), depth, "firing");

        for id in snapshot {
            let computation = self.inner.computations.borrow().get(&id).cloned();
            let Some(computation) = computation else {
                continue;
            };
            if computation.is_disposed() {
                continue;
            }

            if self.inner.active.contains(id) {
                match self.inner.config.on_cycle {
                    CyclePolicy::Report => {
                        warn!(computation = %id, %key, "cyclic dependency detected");
                        self.report(ReactiveError::CyclicDependency {
                            computation: id,
                            key: Some(key.clone()),
                        });
                    }
                    CyclePolicy::Skip => {
                        debug!(computation = %id, %key, "skipping re-entrant computation");
                    }
                }
                continue;
            }

            if let Err(source) = self.execute(&computation) {
                self.report(ReactiveError::Computation {
                    computation: id,
                    source: Box::new(source),
                });
            }
        }
    }

    fn execute(&self, computation: &Computation) -> Result<(), ReactiveError> {
        let _ctx = self.inner.active.enter(computation.id());
        trace!(computation = %computation.id(), "executing");
        computation.invoke()
    }

    /// Run `f` inside a propagation scope.
    ///
    /// Only the outermost scope drains and returns collected failures.
    fn propagate<F>(&self, f: F) -> Result<(), ReactiveError>
    where
        F: FnOnce(),
    {
        let guard = DepthGuard::enter(&self.inner);
        let outermost = self.inner.depth.get() == 1;
        f();
        drop(guard);

        if !outermost {
            return Ok(());
        }

        let failures = self.inner.pending.take();
        if !failures.is_empty() {
            debug!(failures = failures.len(), "propagation finished with failures");
        }
        ReactiveError::collect(failures)
    }

    fn report(&self, error: ReactiveError) {
        self.inner.pending.borrow_mut().push(error);
    }

    /// Remove failures reported after the first `mark` pending entries.
    fn take_pending_since(&self, mark: usize) -> Vec<ReactiveError> {
        let mut pending = self.inner.pending.borrow_mut();
        if pending.len() > mark {
            pending.split_off(mark)
        } else {
            Vec::new()
        }
    }

    /// Stop a computation from running again and forget its dependencies.
    pub(crate) fn dispose_computation(&self, id: ComputationId) {
        let removed = self.inner.computations.borrow_mut().remove(&id);
        if let Some(computation) = removed {
            computation.dispose();
        }
        self.inner.store.borrow_mut().remove_computation(id);
        debug!(computation = %id, "disposed computation");
    }

    /// Check if a computation is currently running.
    pub fn is_tracking(&self) -> bool {
        self.inner.active.is_active()
    }

    /// The innermost running computation, if any.
    pub fn current_computation(&self) -> Option<ComputationId> {
        self.inner.active.current()
    }

    /// Number of computations registered against `(object, field)`.
    pub fn dependents(&self, object: ObjectId, field: &str) -> usize {
        self.inner
            .store
            .borrow()
            .dependents(&DependencyKey::new(object, field))
    }

    /// Number of keys `computation` is registered against.
    pub fn dependency_count(&self, computation: ComputationId) -> usize {
        self.inner.store.borrow().dependency_count(computation)
    }

    /// Number of `(object, field)` keys with at least one dependent.
    pub fn tracked_keys(&self) -> usize {
        self.inner.store.borrow().key_count()
    }

    /// Number of installed computations.
    pub fn computation_count(&self) -> usize {
        self.inner.computations.borrow().len()
    }

    /// Tear down every computation and dependency set.
    ///
    /// Existing reactive values keep working but nothing re-runs until new
    /// computations are registered.
    pub fn dispose(&self) {
        let drained: Vec<_> = self.inner.computations.borrow_mut().drain().collect();
        for (_, computation) in &drained {
            computation.dispose();
        }
        self.inner.store.borrow_mut().clear();
        debug!(computations = drained.len(), "runtime disposed");
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("computations", &self.computation_count())
            .field("tracked_keys", &self.tracked_keys())
            .field("depth", &self.inner.depth.get())
            .finish()
    }
}
