//! Store configuration.
//!
//! A [`FlagStoreConfig`] names the manifest location, its schema and what to
//! do when the first load fails. It is fixed for the lifetime of the store.

use crate::error::LoadError;
use crate::model::{ContainerShape, SourceFormat, SourceSchema};
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable holding the manifest path.
pub const ENV_PATH: &str = "FLAGSTORE_PATH";
/// Environment variable holding the manifest format (`json` or `yaml`).
pub const ENV_FORMAT: &str = "FLAGSTORE_FORMAT";
/// Environment variable holding the container shape (`array` or `keyed`).
pub const ENV_CONTAINER: &str = "FLAGSTORE_CONTAINER";
/// Environment variable holding the startup policy (`strict` or `fallback`).
pub const ENV_STARTUP: &str = "FLAGSTORE_STARTUP";
/// Environment variable overriding the enabled token.
pub const ENV_ENABLED_TOKEN: &str = "FLAGSTORE_ENABLED_TOKEN";

/// Startup policy determines how a failed first load is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Refuse to construct the store (default)
    #[default]
    Strict,
    /// Start with an empty table, every flag disabled, and log a warning
    FallbackClosed,
}

impl FromStr for StartupPolicy {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(StartupPolicy::Strict),
            "fallback" | "fallback-closed" | "fallback_closed" => {
                Ok(StartupPolicy::FallbackClosed)
            }
            other => Err(LoadError::invalid_config(format!(
                "Unknown startup policy '{}', expected 'strict' or 'fallback'",
                other
            ))),
        }
    }
}

/// Configuration for a file-backed [`FlagStore`](crate::FlagStore).
///
/// # Example
///
/// ```
/// use flagstore::config::{FlagStoreConfig, StartupPolicy};
/// use flagstore::model::SourceFormat;
///
/// let config = FlagStoreConfig::new("featureflags.yaml")
///     .with_format(SourceFormat::Yaml)
///     .with_startup_policy(StartupPolicy::FallbackClosed);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagStoreConfig {
    pub path: PathBuf,
    pub schema: SourceSchema,
    pub startup_policy: StartupPolicy,
}

impl FlagStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            schema: SourceSchema::default(),
            startup_policy: StartupPolicy::default(),
        }
    }

    pub fn with_schema(mut self, schema: SourceSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.schema.format = format;
        self
    }

    pub fn with_container(mut self, container: ContainerShape) -> Self {
        self.schema.container = container;
        self
    }

    pub fn with_startup_policy(mut self, policy: StartupPolicy) -> Self {
        self.startup_policy = policy;
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// `FLAGSTORE_PATH` is required; every other variable is optional.
    pub fn from_env() -> Result<Self, LoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup(ENV_PATH)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| LoadError::invalid_config(format!("{} is not set", ENV_PATH)))?;

        let mut config = Self::new(path);
        if let Some(format) = lookup(ENV_FORMAT) {
            config.schema.format = format.parse()?;
        }
        if let Some(container) = lookup(ENV_CONTAINER) {
            config.schema.container = container.parse()?;
        }
        if let Some(policy) = lookup(ENV_STARTUP) {
            config.startup_policy = policy.parse()?;
        }
        if let Some(token) = lookup(ENV_ENABLED_TOKEN) {
            config.schema.enabled_token = token;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values no load could succeed with.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.path.as_os_str().is_empty() {
            return Err(LoadError::invalid_config("Flag file path must not be empty"));
        }
        self.schema.validate()
    }
}
