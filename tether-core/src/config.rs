//! Runtime Configuration
//!
//! Knobs that decide when writes fire and how runaway propagation is handled.
//! Configs are plain serde types so they can be embedded in a host
//! application's own settings file or loaded on their own from JSON.
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_json(r#"{ "max_depth": 16, "on_cycle": "skip" }"#)?;
//! let rt = Runtime::with_config(config)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default limit on nested propagation.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Decides whether a write counts as a change worth firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Fire whenever the new value differs from the old one.
    #[default]
    Inequality,

    /// Legacy behaviour: record writes fire only when the previous value was
    /// truthy and the value changed; cell writes always fire.
    LegacyTruthy,
}

/// What to do when a computation would re-trigger itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Skip the re-entry and report a `CyclicDependency` failure.
    #[default]
    Report,

    /// Skip the re-entry and only log a warning.
    Skip,
}

/// Configuration for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Maximum nesting of propagations before `DepthExceeded` is reported.
    pub max_depth: usize,

    /// When a write fires its dependents.
    pub change_policy: ChangePolicy,

    /// Handling of self-triggering computations.
    pub on_cycle: CyclePolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            change_policy: ChangePolicy::default(),
            on_cycle: CyclePolicy::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        Ok(())
    }

    /// Set the propagation depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set when writes fire their dependents.
    pub fn with_change_policy(mut self, policy: ChangePolicy) -> Self {
        self.change_policy = policy;
        self
    }

    /// Set how self-triggering computations are handled.
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.on_cycle = policy;
        self
    }
}
