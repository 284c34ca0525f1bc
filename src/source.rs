//! Flag source loading and preprocessing.
//!
//! A [`FlagSource`] produces the raw manifest text. Before structured
//! parsing the text goes through [`clean_source`], which drops the
//! human-authored annotation lines the strict grammar would reject.

use crate::error::LoadError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Line prefix marking a comment.
pub const COMMENT_MARKER: &str = "//";
/// Line prefix marking a code fence.
pub const FENCE_MARKER: &str = "```";

/// A location that flag manifest text can be read from.
///
/// The location is fixed for the lifetime of the source; every call to
/// [`load`](FlagSource::load) re-reads it.
pub trait FlagSource: Send + Sync {
    /// Reads the raw manifest text.
    ///
    /// # Errors
    ///
    /// Returns a `SourceUnavailable` error if the location cannot be read.
    fn load(&self) -> Result<String, LoadError>;

    /// A human-readable description for logs and error messages.
    fn describe(&self) -> String;
}

impl<S: FlagSource + ?Sized> FlagSource for Arc<S> {
    fn load(&self) -> Result<String, LoadError> {
        (**self).load()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A manifest stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlagSource for FileSource {
    fn load(&self) -> Result<String, LoadError> {
        fs::read_to_string(&self.path).map_err(|e| {
            LoadError::source_unavailable(format!(
                "Failed to read flag file '{}': {}",
                self.path.display(),
                e
            ))
            .with_source_name(self.describe())
        })
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// An in-memory manifest.
///
/// Useful for embedding a manifest in a binary, and for tests that need to
/// change the source between reloads. `None` text behaves like a missing
/// file.
#[derive(Debug, Default)]
pub struct StaticSource {
    text: RwLock<Option<String>>,
}

impl StaticSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(Some(text.into())),
        }
    }

    /// Creates a source that fails every load with `SourceUnavailable`.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Replaces the text returned by subsequent loads.
    pub fn set(&self, text: impl Into<String>) {
        let mut guard = self.text.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(text.into());
    }

    /// Makes subsequent loads fail with `SourceUnavailable`.
    pub fn clear(&self) {
        let mut guard = self.text.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

impl FlagSource for StaticSource {
    fn load(&self) -> Result<String, LoadError> {
        let guard = self.text.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or_else(|| {
            LoadError::source_unavailable("Static flag source has no content")
                .with_source_name(self.describe())
        })
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// Strips comment and code-fence lines from raw manifest text.
///
/// A line is dropped when, after leading whitespace, it starts with `//` or
/// with a triple backtick. Every other line is kept verbatim, so cleaning an
/// already clean document is a no-op apart from line endings being
/// normalized to `\n`.
///
/// # Example
///
/// ```
/// use flagstore::source::clean_source;
///
/// let raw = "```json\n// all services\n[]\n```";
/// assert_eq!(clean_source(raw), "[]\n");
/// ```
pub fn clean_source(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for line in raw.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with(COMMENT_MARKER) || trimmed.starts_with(FENCE_MARKER) {
            continue;
        }
        cleaned.push_str(line);
        cleaned.push('\n');
    }
    cleaned
}
