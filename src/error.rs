//! Error types for the flagstore library.
//!
//! Loading and reloading a flag table can fail in a small number of ways.
//! All of them are reported through [`LoadError`], which carries a type
//! classification so callers can tell an unreadable source apart from a
//! malformed one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The type of error that occurred while loading a flag source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The source location is missing, unreadable or permission-denied
    SourceUnavailable,
    /// The source was read but is not the expected structured document
    MalformedSource,
    /// The store configuration itself is invalid
    InvalidConfig,
}

/// Represents an error that occurred while loading flags.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{error_type:?}: {message}")]
pub struct LoadError {
    /// Human-readable error message
    pub message: String,
    /// Type classification of the error
    pub error_type: ErrorType,
    /// Description of the source that failed, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl LoadError {
    /// Creates a new source unavailable error.
    ///
    /// # Arguments
    /// * `message` - Description of why the source could not be read
    ///
    /// # Example
    /// ```
    /// use flagstore::error::{ErrorType, LoadError};
    /// let err = LoadError::source_unavailable("No such file or directory");
    /// assert_eq!(err.error_type, ErrorType::SourceUnavailable);
    /// ```
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::SourceUnavailable,
            source_name: None,
        }
    }

    /// Creates a new malformed source error.
    ///
    /// # Arguments
    /// * `message` - Description of what failed to parse
    pub fn malformed_source(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::MalformedSource,
            source_name: None,
        }
    }

    /// Creates a new invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::InvalidConfig,
            source_name: None,
        }
    }

    /// Attaches the description of the source this error refers to.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Returns true if the source could not be read at all.
    pub fn is_source_unavailable(&self) -> bool {
        self.error_type == ErrorType::SourceUnavailable
    }

    /// Returns true if the source was read but could not be parsed.
    pub fn is_malformed_source(&self) -> bool {
        self.error_type == ErrorType::MalformedSource
    }

    /// Converts the error to a JSON string.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error_type":{},"message":"{}"}}"#,
                serde_json::to_string(&self.error_type).unwrap_or_default(),
                self.message
            )
        })
    }
}
