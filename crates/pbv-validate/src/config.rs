//! Validator configuration.
//!
//! Defaults suit any schema protoc accepts. Override via environment
//! variables or explicit construction.

use serde::Deserialize;

/// Nesting depth past which a subtree is no longer validated.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Environment variable read by [`ValidatorConfig::from_env`].
pub const MAX_DEPTH_VAR: &str = "PBV_MAX_DEPTH";

/// Tunables of a [`Validator`](crate::Validator).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Maximum depth of nested messages walked below the root. A deeper
    /// subtree is logged and treated as valid.
    pub max_depth: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PBV_MAX_DEPTH` (default: 64, must be at least 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_depth: env_depth(MAX_DEPTH_VAR, DEFAULT_MAX_DEPTH)?,
        })
    }

    /// Replace the depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn env_depth(var: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_depth(var, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_depth(var: &str, raw: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        var: var.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(invalid("must be at least 1")),
        Ok(depth) => Ok(depth),
        Err(e) => Err(invalid(&e.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
}
