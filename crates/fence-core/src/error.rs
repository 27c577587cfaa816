//! Error types for the isolation entry point
//!
//! [`FenceError`] collects every failure a caller of this crate can see.

use fence_client::{CacheError, ClientError};
use fence_model::ModelError;
use fence_rewrite::RewriteError;
use std::path::PathBuf;

/// Result alias for fence operations
pub type Result<T> = std::result::Result<T, FenceError>;

/// Top-level fence error
#[derive(Debug, thiserror::Error)]
pub enum FenceError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scoped handle could not be built
    #[error("scoped client unavailable: {0}")]
    Cache(#[from] CacheError),

    /// Data-access call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Call could not be rewritten
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// Malformed input
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl FenceError {
    /// Check if the failure is a tenant policy violation
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        match self {
            Self::Client(err) => err.is_policy_violation(),
            Self::Rewrite(err) => err.is_policy_violation(),
            _ => false,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File is not valid TOML for the config schema
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override with an unusable value
    #[error("invalid value '{value}' for {var}")]
    Env {
        /// Variable name
        var: String,
        /// Value found
        value: String,
    },

    /// Field value out of range
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field path
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid-field error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
