//! Models for flag source parsing.
//!
//! This module provides the data structures produced while reading a flag
//! manifest, together with the schema describing the manifest layout.

mod feature_flag;
mod schema;

pub use feature_flag::{FlagDefinition, ParsedSource};
pub use schema::{
    ContainerShape, SourceFormat, SourceSchema, DEFAULT_ENABLED_TOKEN, DEFAULT_NAME_FIELD,
    DEFAULT_SERVICE_FIELD, DEFAULT_STATE_FIELD,
};
