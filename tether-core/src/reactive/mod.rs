//! Reactive Primitives
//!
//! This module implements the core reactive system: reactive objects, cells,
//! and effects, plus the runtime that connects them.
//!
//! # Concepts
//!
//! ## Reactive objects
//!
//! A [`ReactiveObject`] wraps a record with a fixed set of named fields. When
//! a field is read inside a running computation, the computation is registered
//! against `(object, field)`. When the field is written with a different
//! value, every registered computation re-runs.
//!
//! ## Cells
//!
//! A [`ReactiveCell`] is the single-value case: one implicit field named
//! `"value"`.
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting computation installed by
//! [`Runtime::run`]. It runs once immediately and again, synchronously,
//! whenever something it read changes.
//!
//! # Implementation Notes
//!
//! There are no hidden globals. The [`Runtime`] owns the dependency store and
//! the active-computation stack, and every reactive value holds a weak handle
//! to the runtime that created it. Separate runtimes never see each other's
//! dependencies.

mod cell;
mod context;
mod effect;
mod object;
mod runtime;
mod store;
mod subscriber;
mod watch;

pub use cell::{ReactiveCell, VALUE_FIELD};
pub use context::{ActiveStack, ContextGuard};
pub use effect::Effect;
pub use object::{FieldValue, Fields, ReactiveObject};
pub use runtime::Runtime;
pub use store::{DependencyKey, DependencyStore, ObjectId};
pub use subscriber::ComputationId;
pub use watch::FieldPath;
