//! Error types for the reactive runtime.

use thiserror::Error;

use crate::reactive::{ComputationId, DependencyKey, ObjectId};

/// Errors raised while reading, writing, or propagating reactive state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A write targeted a field that was not present when the record was wrapped.
    #[error("unknown field `{field}` on {object}")]
    UnknownField { object: ObjectId, field: String },

    /// A computation would have re-triggered itself while still running.
    ///
    /// `key` is the field whose write closed the loop, or `None` when the
    /// computation was executed directly from inside itself.
    #[error("cyclic dependency detected: {computation} re-triggered{}", through(.key))]
    CyclicDependency {
        computation: ComputationId,
        key: Option<DependencyKey>,
    },

    /// Propagation nested deeper than the configured limit.
    #[error("update depth exceeded limit of {limit} while firing {key}")]
    DepthExceeded { limit: usize, key: DependencyKey },

    /// A computation returned an error while being re-run.
    #[error("{computation} failed: {source}")]
    Computation {
        computation: ComputationId,
        #[source]
        source: Box<ReactiveError>,
    },

    /// A computation gave up with a caller-supplied reason.
    #[error("computation aborted: {0}")]
    Aborted(String),

    /// A watch path could not be parsed.
    #[error("invalid watch path `{0}`")]
    InvalidPath(String),

    /// Several failures collected during a single propagation.
    #[error("{} failures during update propagation", .0.len())]
    Propagation(Vec<ReactiveError>),
}

impl ReactiveError {
    /// Shorthand for [`ReactiveError::Aborted`].
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }

    /// Flatten this error into its individual failures.
    ///
    /// A `Propagation` batch yields its members; anything else yields itself.
    pub fn failures(&self) -> Vec<&ReactiveError> {
        match self {
            Self::Propagation(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }

    /// Whether this error (or any member of a batch) is a detected cycle.
    pub fn is_cycle(&self) -> bool {
        self.failures().into_iter().any(|e| match e {
            Self::CyclicDependency { .. } => true,
            Self::Computation { source, .. } => source.is_cycle(),
            _ => false,
        })
    }

    /// Collapse a list of collected failures into a single result.
    pub(crate) fn collect(mut errors: Vec<ReactiveError>) -> Result<(), ReactiveError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Propagation(errors)),
        }
    }
}

fn through(key: &Option<DependencyKey>) -> String {
    key.as_ref()
        .map(|key| format!(" through {key}"))
        .unwrap_or_default()
}

/// Errors raised while loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse runtime config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid runtime config: {0}")]
    Invalid(String),
}
