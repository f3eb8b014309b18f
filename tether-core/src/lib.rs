//! Tether Core
//!
//! Fine-grained reactive state tracking. It implements:
//!
//! - Reactive records and boxed single values
//! - Automatic dependency tracking for effects
//! - Synchronous update propagation with cycle and depth guards
//! - Dotted-path watchers over JSON records
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Reactive primitives, the dependency store, and the runtime
//! - `config`: Runtime configuration (change and cycle policies, depth limit)
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use tether_core::reactive::Runtime;
//!
//! let rt = Runtime::new();
//! let product = rt.reactive_json(json!({ "price": 5, "qty": 2 })).unwrap();
//! let total = rt.cell(0);
//!
//! let (p, t) = (product.clone(), total.clone());
//! rt.try_run(move || {
//!     let price = p.get("price").and_then(|v| v.as_i64()).unwrap_or(0);
//!     let qty = p.get("qty").and_then(|v| v.as_i64()).unwrap_or(0);
//!     t.set(price * qty)
//! })?;
//!
//! product.set("price", json!(10))?;
//! assert_eq!(total.peek(), 20);
//! ```

pub mod config;
pub mod error;
pub mod reactive;

pub use config::{ChangePolicy, CyclePolicy, RuntimeConfig};
pub use error::{ConfigError, ReactiveError};
pub use reactive::{Effect, ReactiveCell, ReactiveObject, Runtime};
