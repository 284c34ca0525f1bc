//! Description of the flag source document layout.
//!
//! The manifest is an external contract between whoever authors it and the
//! store. [`SourceSchema`] captures that contract so the field names, the
//! container shape and the serialization format are not hard-coded.

use crate::error::LoadError;
use std::fmt;
use std::str::FromStr;

/// Default field carrying the flag name.
pub const DEFAULT_NAME_FIELD: &str = "featureFlagName";
/// Default field carrying the textual flag state.
pub const DEFAULT_STATE_FIELD: &str = "featureFlagState";
/// Default field carrying the owning service.
pub const DEFAULT_SERVICE_FIELD: &str = "serviceName";
/// The only state token that enables a flag by default.
pub const DEFAULT_ENABLED_TOKEN: &str = "enabled";

/// Serialization format of the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceFormat {
    #[default]
    Json,
    Yaml,
}

impl FromStr for SourceFormat {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SourceFormat::Json),
            "yaml" | "yml" => Ok(SourceFormat::Yaml),
            other => Err(LoadError::invalid_config(format!(
                "Unknown source format '{}', expected 'json' or 'yaml'",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Json => f.write_str("json"),
            SourceFormat::Yaml => f.write_str("yaml"),
        }
    }
}

/// Shape of the document root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainerShape {
    /// A sequence of records, each carrying its own name field.
    #[default]
    Array,
    /// A mapping of flag name to record; records need only the state field.
    Keyed,
}

impl FromStr for ContainerShape {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "array" | "list" => Ok(ContainerShape::Array),
            "keyed" | "object" | "map" => Ok(ContainerShape::Keyed),
            other => Err(LoadError::invalid_config(format!(
                "Unknown container shape '{}', expected 'array' or 'keyed'",
                other
            ))),
        }
    }
}

/// Field names, container shape and format of a flag source.
///
/// # Example
///
/// ```
/// use flagstore::model::{ContainerShape, SourceSchema};
///
/// let schema = SourceSchema::default()
///     .with_container(ContainerShape::Keyed)
///     .with_state_field("state");
/// assert_eq!(schema.name_field, "featureFlagName");
/// assert_eq!(schema.state_field, "state");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub name_field: String,
    pub state_field: String,
    /// Optional per-record service field; `None` ignores services entirely.
    pub service_field: Option<String>,
    /// State token that maps to `true`, compared case-insensitively.
    pub enabled_token: String,
    pub format: SourceFormat,
    pub container: ContainerShape,
}

impl Default for SourceSchema {
    fn default() -> Self {
        Self {
            name_field: DEFAULT_NAME_FIELD.to_string(),
            state_field: DEFAULT_STATE_FIELD.to_string(),
            service_field: Some(DEFAULT_SERVICE_FIELD.to_string()),
            enabled_token: DEFAULT_ENABLED_TOKEN.to_string(),
            format: SourceFormat::Json,
            container: ContainerShape::Array,
        }
    }
}

impl SourceSchema {
    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = field.into();
        self
    }

    pub fn with_state_field(mut self, field: impl Into<String>) -> Self {
        self.state_field = field.into();
        self
    }

    pub fn with_service_field(mut self, field: Option<String>) -> Self {
        self.service_field = field;
        self
    }

    pub fn with_enabled_token(mut self, token: impl Into<String>) -> Self {
        self.enabled_token = token.into();
        self
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_container(mut self, container: ContainerShape) -> Self {
        self.container = container;
        self
    }

    /// Normalizes a textual state token to a boolean.
    ///
    /// Exactly the enabled token (ignoring ASCII case) is `true`. Anything
    /// else, including misspellings and the empty string, is `false`.
    pub fn is_enabled_state(&self, state: &str) -> bool {
        state.eq_ignore_ascii_case(&self.enabled_token)
    }

    /// Checks that the schema can describe a usable document.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.state_field.is_empty() {
            return Err(LoadError::invalid_config("State field name must not be empty"));
        }
        if self.container == ContainerShape::Array && self.name_field.is_empty() {
            return Err(LoadError::invalid_config(
                "Name field must not be empty for array sources",
            ));
        }
        if self.enabled_token.is_empty() {
            return Err(LoadError::invalid_config("Enabled token must not be empty"));
        }
        Ok(())
    }
}
