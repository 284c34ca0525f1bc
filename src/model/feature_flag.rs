//! Flag definitions and the structured parser that produces them.
//!
//! Parsing turns cleaned manifest text into an ordered list of
//! [`FlagDefinition`]s. Individual records that are missing a required
//! field are skipped rather than failing the whole document; only a document
//! that cannot be read as the configured container shape is an error.

use crate::error::LoadError;
use crate::model::schema::{ContainerShape, SourceFormat, SourceSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single flag as declared in the source document.
///
/// Definitions are transient: they exist between parsing and building a
/// [`FlagTable`](crate::storage::FlagTable). Duplicate names are allowed here
/// and resolved later, last one wins.
///
/// # Example
///
/// ```
/// use flagstore::model::FlagDefinition;
///
/// let definition = FlagDefinition::new("auth_enable_2fa", true);
/// assert_eq!(definition.name, "auth_enable_2fa");
/// assert!(definition.service.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagDefinition {
    /// The key/name of the feature flag
    pub name: String,

    /// Normalized state; only the enabled token produces `true`
    pub enabled: bool,

    /// Service the flag was declared under, if the source records one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl FlagDefinition {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
            service: None,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Result of parsing a flag source document.
///
/// Contains the definitions in document order and the number of records
/// that were skipped because a required field was missing.
///
/// # Example
///
/// ```
/// use flagstore::model::{ParsedSource, SourceSchema};
///
/// let text = r#"[
///     {"featureFlagName": "a", "featureFlagState": "enabled"},
///     {"featureFlagName": "b"}
/// ]"#;
///
/// let parsed = ParsedSource::parse(text, &SourceSchema::default()).unwrap();
/// assert_eq!(parsed.definitions.len(), 1);
/// assert_eq!(parsed.skipped, 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSource {
    /// Definitions in the order they appear in the document
    pub definitions: Vec<FlagDefinition>,

    /// Records dropped for missing or unusable fields
    pub skipped: usize,
}

impl ParsedSource {
    /// Parse cleaned source text according to a schema.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ParsedSource)` on success, or a `MalformedSource` error
    /// if the text is not valid in the configured format or its root is not
    /// the configured container shape.
    pub fn parse(text: &str, schema: &SourceSchema) -> Result<Self, LoadError> {
        let root = parse_document(text, schema.format)?;

        match schema.container {
            ContainerShape::Array => {
                let records = root.as_array().ok_or_else(|| {
                    LoadError::malformed_source(format!(
                        "Expected the document root to be an array of flag records, found {}",
                        describe_value(&root)
                    ))
                })?;
                Ok(Self::from_records(records, schema))
            }
            ContainerShape::Keyed => {
                let entries = root.as_object().ok_or_else(|| {
                    LoadError::malformed_source(format!(
                        "Expected the document root to be an object keyed by flag name, found {}",
                        describe_value(&root)
                    ))
                })?;
                Ok(Self::from_keyed(entries, schema))
            }
        }
    }

    /// Create an empty ParsedSource.
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_records(records: &[Value], schema: &SourceSchema) -> Self {
        let mut parsed = Self::empty();
        for record in records {
            let definition = record.as_object().and_then(|fields| {
                let name = field_text(fields, &schema.name_field)?;
                let state = state_text(fields, &schema.state_field)?;
                Some(build_definition(name, &state, fields, schema))
            });
            parsed.push(definition);
        }
        parsed
    }

    fn from_keyed(entries: &Map<String, Value>, schema: &SourceSchema) -> Self {
        let mut parsed = Self::empty();
        for (name, entry) in entries {
            let definition = match entry {
                Value::Object(fields) => state_text(fields, &schema.state_field)
                    .map(|state| build_definition(name.clone(), &state, fields, schema)),
                // Anything else is shorthand for the state itself
                other => Some(FlagDefinition {
                    name: name.clone(),
                    enabled: schema.is_enabled_state(&scalar_text(other).unwrap_or_default()),
                    service: None,
                }),
            };
            parsed.push(definition);
        }
        parsed
    }

    fn push(&mut self, definition: Option<FlagDefinition>) {
        match definition {
            Some(definition) if !definition.name.trim().is_empty() => {
                self.definitions.push(definition)
            }
            _ => self.skipped += 1,
        }
    }
}

fn parse_document(text: &str, format: SourceFormat) -> Result<Value, LoadError> {
    match format {
        SourceFormat::Json => serde_json::from_str(text)
            .map_err(|e| LoadError::malformed_source(format!("Failed to parse JSON: {}", e))),
        SourceFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|e| LoadError::malformed_source(format!("Failed to parse YAML: {}", e))),
    }
}

fn build_definition(
    name: String,
    state: &str,
    fields: &Map<String, Value>,
    schema: &SourceSchema,
) -> FlagDefinition {
    let service = schema
        .service_field
        .as_ref()
        .and_then(|field| field_text(fields, field));

    FlagDefinition {
        name,
        enabled: schema.is_enabled_state(state),
        service,
    }
}

/// Reads a field as text. Absent, null and non-scalar fields count as missing.
fn field_text(fields: &Map<String, Value>, field: &str) -> Option<String> {
    fields.get(field).and_then(scalar_text)
}

/// Reads the state field. Only an absent key is missing; a null or
/// non-scalar value reads as an empty token and so normalizes to disabled.
fn state_text(fields: &Map<String, Value>, field: &str) -> Option<String> {
    fields
        .get(field)
        .map(|value| scalar_text(value).unwrap_or_default())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
