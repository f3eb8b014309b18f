//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a reactive field is read,
//! the runtime attributes the read to the computation on top of the stack.
//!
//! # Implementation
//!
//! Each runtime owns an [`ActiveStack`]. Entering a computation pushes its ID
//! and returns a [`ContextGuard`]; dropping the guard pops it. Because the pop
//! happens in `Drop`, the previous marker (including "nothing running") is
//! restored on normal return, on an error return, and while unwinding from a
//! panic.
//!
//! The stack also serves as the active call chain for cycle detection: a
//! computation that is already on the stack must not be re-entered.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::ComputationId;

/// Stack of computations currently executing, innermost last.
#[derive(Debug, Default)]
pub struct ActiveStack {
    stack: RefCell<SmallVec<[ComputationId; 8]>>,
}

impl ActiveStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a context for the given computation.
    ///
    /// While the returned guard lives, tracked reads are attributed to `id`.
    pub fn enter(&self, id: ComputationId) -> ContextGuard<'_> {
        self.stack.borrow_mut().push(id);
        ContextGuard { stack: self, id }
    }

    /// Check if any computation is running.
    pub fn is_active(&self) -> bool {
        !self.stack.borrow().is_empty()
    }

    /// The innermost running computation, if any.
    pub fn current(&self) -> Option<ComputationId> {
        self.stack.borrow().last().copied()
    }

    /// Whether `id` is anywhere on the active call chain.
    pub fn contains(&self, id: ComputationId) -> bool {
        self.stack.borrow().contains(&id)
    }

    /// Number of nested computations currently running.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Guard that pops the context when dropped.
pub struct ContextGuard<'a> {
    stack: &'a ActiveStack,
    id: ComputationId,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.stack.borrow_mut().pop();

        // Guards are strictly nested, so the top must be ours.
        debug_assert_eq!(
            popped,
            Some(self.id),
            "ContextGuard mismatch: expected {:?}, got {:?}",
            self.id,
            popped
        );
    }
}
