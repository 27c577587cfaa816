//! Isolation configuration
//!
//! Loaded from an optional TOML file, then overridden by `FENCE_*`
//! environment variables:
//!
//! | variable | field |
//! |---|---|
//! | `FENCE_ISOLATED_ENTITIES` | `isolated_entities` (comma separated) |
//! | `FENCE_TENANT_FIELD` | `tenant_field` |
//! | `FENCE_CACHE_CAPACITY` | `cache.capacity` |
//! | `FENCE_CACHE_TIME_TO_IDLE_SECS` | `cache.time_to_idle_secs` |
//! | `FENCE_LOG_LEVEL` | `log.level` |
//! | `FENCE_LOG_JSON` | `log.json` |

use crate::error::ConfigError;
use fence_client::{CacheSettings, DEFAULT_CAPACITY};
use fence_model::{IsolationPolicy, DEFAULT_TENANT_FIELD, VISITOR_MANAGEMENT_ENTITIES};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "FENCE_";

/// Tenant isolation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IsolationConfig {
    /// Entity types scoped to the caller's tenant
    pub isolated_entities: Vec<String>,
    /// Field holding the tenant id on isolated entities
    pub tenant_field: String,
    /// Scoped client cache
    pub cache: CacheConfig,
    /// Logging
    pub log: LogConfig,
}

/// Scoped client cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached tenants
    pub capacity: u64,
    /// Idle expiry in seconds
    pub time_to_idle_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            isolated_entities: VISITOR_MANAGEMENT_ENTITIES
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
            tenant_field: DEFAULT_TENANT_FIELD.to_string(),
            cache: CacheConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            time_to_idle_secs: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl IsolationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With isolated entity types
    #[must_use]
    pub fn with_isolated_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.isolated_entities = entities.into_iter().map(Into::into).collect();
        self
    }

    /// With tenant field name
    #[inline]
    #[must_use]
    pub fn with_tenant_field(mut self, field: impl Into<String>) -> Self {
        self.tenant_field = field.into();
        self
    }

    /// With cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache.capacity = capacity;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed TOML or unknown fields
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Read` or `ConfigError::Parse`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// File (or defaults), then environment overrides, then validation
    ///
    /// # Errors
    /// Returns the first loading, override or validation failure
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;

        tracing::debug!(
            entities = config.isolated_entities.len(),
            capacity = config.cache.capacity,
            "Loaded isolation configuration"
        );
        Ok(config)
    }

    /// Apply `FENCE_*` overrides read through `lookup`
    ///
    /// # Errors
    /// Returns `ConfigError::Env` for a value that does not parse
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = var("ISOLATED_ENTITIES") {
            self.isolated_entities = value
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some((_, value)) = var("TENANT_FIELD") {
            self.tenant_field = value;
        }
        if let Some((key, value)) = var("CACHE_CAPACITY") {
            self.cache.capacity = parse_env(key, value)?;
        }
        if let Some((key, value)) = var("CACHE_TIME_TO_IDLE_SECS") {
            self.cache.time_to_idle_secs = Some(parse_env(key, value)?);
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            self.log.level = value;
        }
        if let Some((key, value)) = var("LOG_JSON") {
            self.log.json = parse_env(key, value)?;
        }
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::invalid("cache.capacity", "must be at least 1"));
        }
        if self.cache.time_to_idle_secs == Some(0) {
            return Err(ConfigError::invalid(
                "cache.time_to_idle_secs",
                "must be at least 1 when set",
            ));
        }
        if self.tenant_field.trim().is_empty() {
            return Err(ConfigError::invalid("tenant_field", "must not be empty"));
        }
        if let Some(blank) = self.isolated_entities.iter().find(|e| e.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "isolated_entities",
                format!("blank entity name '{blank}'"),
            ));
        }
        if let Err(err) = EnvFilter::try_new(&self.log.level) {
            return Err(ConfigError::invalid("log.level", err.to_string()));
        }
        Ok(())
    }

    /// Isolation policy described by this configuration
    #[must_use]
    pub fn policy(&self) -> IsolationPolicy {
        IsolationPolicy::new(self.isolated_entities.iter().map(String::as_str))
            .with_tenant_field(self.tenant_field.clone())
    }

    /// Cache settings described by this configuration
    #[must_use]
    pub fn cache_settings(&self) -> CacheSettings {
        let settings = CacheSettings::with_capacity(self.cache.capacity);
        match self.cache.time_to_idle_secs {
            Some(secs) => settings.with_time_to_idle(Duration::from_secs(secs)),
            None => settings,
        }
    }
}

fn parse_env<T: FromStr>(var: String, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
