//! Reactive Cells
//!
//! A [`ReactiveCell`] is a boxed single value: a reactive object with exactly
//! one implicit field, [`VALUE_FIELD`]. Use it when the observed state is a
//! plain value rather than a record.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{Runtime, WeakRuntime};
use super::store::ObjectId;
use crate::config::ChangePolicy;
use crate::error::ReactiveError;

/// The field name cells are tracked under.
pub const VALUE_FIELD: &str = "value";

/// A reactive single value.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let count = rt.cell(1);
///
/// let c = count.clone();
/// rt.run(move || println!("count = {}", c.get()))?;
///
/// count.set(2)?;  // Prints: "count = 2"
/// ```
pub struct ReactiveCell<T>
where
    T: Clone + PartialEq + 'static,
{
    id: ObjectId,
    value: Rc<RefCell<T>>,
    runtime: WeakRuntime,
}

impl<T> ReactiveCell<T>
where
    T: Clone + PartialEq + 'static,
{
    pub(crate) fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            id: ObjectId::new(),
            value: Rc::new(RefCell::new(value)),
            runtime: runtime.downgrade(),
        }
    }

    /// The cell's identity in dependency keys.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Get the current value, registering the running computation.
    pub fn get(&self) -> T {
        let value = self.value.borrow().clone();
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.record(self.id, VALUE_FIELD);
        }
        value
    }

    /// Get the current value without tracking.
    pub fn peek(&self) -> T {
        self.value.borrow().clone()
    }

    /// Set a new value and notify dependents.
    ///
    /// Equal values are ignored unless the runtime uses
    /// [`ChangePolicy::LegacyTruthy`], under which every write fires.
    pub fn set(&self, value: T) -> Result<(), ReactiveError> {
        let changed = {
            let mut slot = self.value.borrow_mut();
            let changed = *slot != value;
            *slot = value;
            changed
        };

        let Some(runtime) = self.runtime.upgrade() else {
            return Ok(());
        };

        match runtime.config().change_policy {
            ChangePolicy::Inequality if !changed => Ok(()),
            _ => runtime.fire(self.id, VALUE_FIELD),
        }
    }

    /// Update the value using a function of the current one.
    ///
    /// The current value is read untracked.
    pub fn update<F>(&self, f: F) -> Result<(), ReactiveError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value.borrow());
        self.set(next)
    }
}

impl<T> Clone for ReactiveCell<T>
where
    T: Clone + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Rc::clone(&self.value),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> fmt::Debug for ReactiveCell<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("id", &self.id)
            .field("value", &self.peek())
            .finish()
    }
}

impl Runtime {
    /// Create a tracked single value.
    pub fn cell<T>(&self, initial: T) -> ReactiveCell<T>
    where
        T: Clone + PartialEq + 'static,
    {
        ReactiveCell::new(self, initial)
    }
}
