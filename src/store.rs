//! Instance-based flag store.
//!
//! This module provides the [`FlagStore`] that owns the published flag table.
//! Queries load the current table through `ArcSwap` without taking a lock;
//! reloads build a complete replacement off to the side and publish it with
//! a single pointer swap, so a reader sees either the old table or the new
//! one and never a mix.

use crate::config::{FlagStoreConfig, StartupPolicy};
use crate::error::LoadError;
use crate::model::{ParsedSource, SourceSchema};
use crate::source::{clean_source, FileSource, FlagSource};
use crate::storage::FlagTable;
use arc_swap::{ArcSwap, ArcSwapOption};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Read-only access to flag state.
///
/// Components that gate behavior on flags should depend on this trait
/// rather than on a concrete store.
pub trait FeatureGate: Send + Sync {
    /// Returns `true` only if `name` is declared and enabled.
    fn is_enabled(&self, name: &str) -> bool;
}

impl FeatureGate for FlagTable {
    fn is_enabled(&self, name: &str) -> bool {
        FlagTable::is_enabled(self, name)
    }
}

impl FeatureGate for FlagStore {
    fn is_enabled(&self, name: &str) -> bool {
        FlagStore::is_enabled(self, name)
    }
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    /// Generation of the table that was published
    pub generation: u64,
    /// Number of distinct flags in the new table
    pub flag_count: usize,
    /// Number of those flags that are enabled
    pub enabled_count: usize,
    /// Records dropped for missing fields
    pub skipped: usize,
    /// Flags whose query result changed, sorted by name
    pub changed_flags: Vec<String>,
}

/// Process-wide feature flag store.
///
/// Construct one at startup and share it as `Arc<FlagStore>` with every
/// component that needs to consult flags.
///
/// # Example
///
/// ```
/// use flagstore::config::StartupPolicy;
/// use flagstore::model::SourceSchema;
/// use flagstore::source::StaticSource;
/// use flagstore::FlagStore;
///
/// let source = StaticSource::new(r#"[
///     {"featureFlagName": "auth_enable_2fa", "featureFlagState": "enabled"},
///     {"featureFlagName": "auth_enable_2fa", "featureFlagState": "disabled"},
///     {"featureFlagName": "billing_enable_tax_report", "featureFlagState": "ENABLED"}
/// ]"#);
///
/// let store = FlagStore::with_source(source, SourceSchema::default(), StartupPolicy::Strict)
///     .unwrap();
///
/// assert!(!store.is_enabled("auth_enable_2fa"));
/// assert!(store.is_enabled("billing_enable_tax_report"));
/// assert!(!store.is_enabled("unknown_flag"));
/// ```
pub struct FlagStore {
    table: ArcSwap<FlagTable>,
    source: Box<dyn FlagSource>,
    schema: SourceSchema,
    /// Serializes writers; readers never touch it.
    reload_lock: Mutex<()>,
    last_error: ArcSwapOption<LoadError>,
}

impl FlagStore {
    /// Opens a file-backed store and performs the first load.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unusable configuration. Under
    /// [`StartupPolicy::Strict`] a failed first load is returned as well.
    pub fn open(config: FlagStoreConfig) -> Result<Self, LoadError> {
        config.validate()?;
        Self::with_source(
            FileSource::new(config.path),
            config.schema,
            config.startup_policy,
        )
    }

    /// Creates a store over an arbitrary source and performs the first load.
    ///
    /// The load happens synchronously, so the first query after this returns
    /// already reflects the source.
    pub fn with_source<S>(
        source: S,
        schema: SourceSchema,
        startup_policy: StartupPolicy,
    ) -> Result<Self, LoadError>
    where
        S: FlagSource + 'static,
    {
        schema.validate()?;

        let store = Self {
            table: ArcSwap::from_pointee(FlagTable::empty()),
            source: Box::new(source),
            schema,
            reload_lock: Mutex::new(()),
            last_error: ArcSwapOption::empty(),
        };

        match store.try_publish() {
            Ok(summary) => {
                info!(
                    source = %store.source.describe(),
                    flags = summary.flag_count,
                    enabled = summary.enabled_count,
                    skipped = summary.skipped,
                    "Loaded initial flag table"
                );
                Ok(store)
            }
            Err(e) => match startup_policy {
                StartupPolicy::Strict => Err(e),
                StartupPolicy::FallbackClosed => {
                    warn!(
                        source = %store.source.describe(),
                        error = %e,
                        "Initial flag load failed, starting with all flags disabled"
                    );
                    Ok(store)
                }
            },
        }
    }

    /// Returns the state of `name`, or `false` if it is unknown.
    ///
    /// Never blocks and never fails.
    #[inline]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.table.load().is_enabled(name)
    }

    /// Re-reads the source and publishes a new table.
    ///
    /// The previously published table keeps serving until the new one is
    /// fully built. On failure it is left untouched and the error is
    /// returned.
    pub fn reload(&self) -> Result<ReloadSummary, LoadError> {
        match self.try_publish() {
            Ok(summary) => {
                info!(
                    source = %self.source.describe(),
                    generation = summary.generation,
                    flags = summary.flag_count,
                    changed = summary.changed_flags.len(),
                    "Published flag table"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    source = %self.source.describe(),
                    error = %e,
                    generation = self.generation(),
                    "Flag reload failed, keeping previous table"
                );
                Err(e)
            }
        }
    }

    /// Returns the currently published table.
    ///
    /// Use this to answer several queries against one consistent table.
    pub fn snapshot(&self) -> Arc<FlagTable> {
        self.table.load_full()
    }

    /// Flags declared under `service` in the current table, sorted by name.
    pub fn flags_for_service(&self, service: &str) -> Vec<(String, bool)> {
        self.table.load().flags_for_service(service)
    }

    /// Number of tables published so far. Zero means nothing has loaded.
    ///
    /// Read from the current table, so it never lags behind the table a
    /// concurrent [`snapshot`](Self::snapshot) returns.
    pub fn generation(&self) -> u64 {
        self.table.load().generation()
    }

    /// The most recent failed load, cleared by the next successful one.
    pub fn last_error(&self) -> Option<LoadError> {
        self.last_error.load_full().map(|e| (*e).clone())
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    pub fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    fn load_table(&self) -> Result<(FlagTable, usize), LoadError> {
        let raw = self.source.load()?;
        let cleaned = clean_source(&raw);
        let parsed = ParsedSource::parse(&cleaned, &self.schema)
            .map_err(|e| e.with_source_name(self.source.describe()))?;

        if parsed.skipped > 0 {
            debug!(
                source = %self.source.describe(),
                skipped = parsed.skipped,
                "Skipped flag records with missing fields"
            );
        }

        let skipped = parsed.skipped;
        Ok((FlagTable::from_definitions(parsed.definitions), skipped))
    }

    /// Loads, builds and swaps in a new table under the writer lock.
    ///
    /// Records the outcome in `last_error`; logging is left to the caller.
    fn try_publish(&self) -> Result<ReloadSummary, LoadError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());

        let (table, skipped) = match self.load_table() {
            Ok(loaded) => loaded,
            Err(e) => {
                self.last_error.store(Some(Arc::new(e.clone())));
                return Err(e);
            }
        };

        let (generation, changed_flags) = {
            let current = self.table.load();
            (current.generation() + 1, current.changed_flags(&table))
        };
        let table = table.with_generation(generation);
        let flag_count = table.len();
        let enabled_count = table.enabled_count();

        // Table and generation are published by the same swap
        self.table.store(Arc::new(table));
        self.last_error.store(None);

        Ok(ReloadSummary {
            generation,
            flag_count,
            enabled_count,
            skipped,
            changed_flags,
        })
    }
}

impl fmt::Debug for FlagStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagStore")
            .field("source", &self.source.describe())
            .field("schema", &self.schema)
            .field("generation", &self.generation())
            .field("flags", &self.table.load().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::source::StaticSource;
    use std::io;

    const CONFIG: &str = r#"[
        {"serviceName": "auth-service", "featureFlagName": "auth_enable_sso", "featureFlagState": "enabled"},
        {"serviceName": "auth-service", "featureFlagName": "auth_enable_mfa", "featureFlagState": "disabled"},
        {"serviceName": "shopping-cart", "featureFlagName": "cart_enable_checkout", "featureFlagState": "enabled"}
    ]"#;

    fn shared_store(text: &str) -> (FlagStore, Arc<StaticSource>) {
        let source = Arc::new(StaticSource::new(text));
        let store = FlagStore::with_source(
            Arc::clone(&source),
            SourceSchema::default(),
            StartupPolicy::Strict,
        )
        .unwrap();
        (store, source)
    }

    #[test]
    fn test_initial_load() {
        let (store, _) = shared_store(CONFIG);
        assert!(store.is_enabled("auth_enable_sso"));
        assert!(!store.is_enabled("auth_enable_mfa"));
        assert!(!store.is_enabled("never_declared"));
        assert_eq!(store.generation(), 1);
        assert!(store.last_error().is_none());
    }

    #[test]
    fn test_strict_startup_failure() {
        let err = FlagStore::with_source(
            StaticSource::unavailable(),
            SourceSchema::default(),
            StartupPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(err.error_type, ErrorType::SourceUnavailable);

        let err = FlagStore::with_source(
            StaticSource::new("{not json"),
            SourceSchema::default(),
            StartupPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(err.error_type, ErrorType::MalformedSource);
        assert_eq!(err.source_name.as_deref(), Some("static"));
    }

    #[test]
    fn test_fallback_startup() {
        let store = FlagStore::with_source(
            StaticSource::unavailable(),
            SourceSchema::default(),
            StartupPolicy::FallbackClosed,
        )
        .unwrap();

        assert_eq!(store.generation(), 0);
        assert!(store.snapshot().is_empty());
        assert!(!store.is_enabled("auth_enable_sso"));
        assert!(store.last_error().unwrap().is_source_unavailable());
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let err = FlagStore::with_source(
            StaticSource::new("[]"),
            SourceSchema::default().with_enabled_token(""),
            StartupPolicy::FallbackClosed,
        )
        .unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidConfig);
    }

    #[test]
    fn test_reload_replaces_table() {
        let (store, source) = shared_store(CONFIG);
        source.set(
            r#"[{"featureFlagName": "auth_enable_mfa", "featureFlagState": "enabled"}]"#,
        );

        let summary = store.reload().unwrap();
        assert_eq!(summary.generation, 2);
        assert_eq!(summary.flag_count, 1);
        assert_eq!(summary.enabled_count, 1);
        assert_eq!(
            summary.changed_flags,
            vec![
                "auth_enable_mfa".to_string(),
                "auth_enable_sso".to_string(),
                "cart_enable_checkout".to_string()
            ]
        );
        assert!(store.is_enabled("auth_enable_mfa"));
        assert!(!store.is_enabled("auth_enable_sso"));
    }

    #[test]
    fn test_failed_reload_keeps_table() {
        let (store, source) = shared_store(CONFIG);
        let before = store.snapshot();

        source.set(r#"{"featureFlagName": "x"}"#);
        let err = store.reload().unwrap_err();
        assert!(err.is_malformed_source());
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.generation(), 1);
        assert_eq!(store.last_error(), Some(err));

        source.clear();
        assert!(store.reload().unwrap_err().is_source_unavailable());
        assert!(store.is_enabled("auth_enable_sso"));

        source.set(CONFIG);
        let summary = store.reload().unwrap();
        assert!(summary.changed_flags.is_empty());
        assert!(store.last_error().is_none());
    }

    #[test]
    fn test_snapshot_carries_its_generation() {
        let (store, source) = shared_store(CONFIG);
        let first = store.snapshot();
        assert_eq!(first.generation(), 1);

        source.set("[]");
        let summary = store.reload().unwrap();
        let second = store.snapshot();
        assert_eq!(second.generation(), summary.generation);
        assert_eq!(store.generation(), 2);
        assert_eq!(first.generation(), 1);

        source.clear();
        store.reload().unwrap_err();
        assert_eq!(store.snapshot().generation(), 2);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn with_captured_logs(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.text()
    }

    #[test]
    fn test_startup_logs_once() {
        let logs = with_captured_logs(|| {
            shared_store(CONFIG);
        });
        assert_eq!(logs.matches("Loaded initial flag table").count(), 1);
        assert!(!logs.contains("Published flag table"));

        let logs = with_captured_logs(|| {
            FlagStore::with_source(
                StaticSource::unavailable(),
                SourceSchema::default(),
                StartupPolicy::FallbackClosed,
            )
            .unwrap();
        });
        assert_eq!(logs.matches("WARN").count(), 1);
        assert!(logs.contains("Initial flag load failed"));
        assert!(!logs.contains("keeping previous table"));
    }

    #[test]
    fn test_reload_logs_once() {
        let (store, source) = shared_store(CONFIG);

        let logs = with_captured_logs(|| {
            store.reload().unwrap();
        });
        assert_eq!(logs.matches("Published flag table").count(), 1);

        source.clear();
        let logs = with_captured_logs(|| {
            store.reload().unwrap_err();
        });
        assert_eq!(logs.matches("Flag reload failed").count(), 1);
    }

    #[test]
    fn test_reload_reports_skipped_records() {
        let (store, source) = shared_store("[]");
        source.set(
            r#"[{"featureFlagName": "a"}, {"featureFlagName": "b", "featureFlagState": "enabled"}]"#,
        );
        let summary = store.reload().unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.flag_count, 1);
    }

    #[test]
    fn test_snapshot_is_stable_across_reload() {
        let (store, source) = shared_store(CONFIG);
        let snapshot = store.snapshot();

        source.set("[]");
        store.reload().unwrap();

        assert!(snapshot.is_enabled("auth_enable_sso"));
        assert!(!store.is_enabled("auth_enable_sso"));
    }

    #[test]
    fn test_flags_for_service() {
        let (store, _) = shared_store(CONFIG);
        assert_eq!(
            store.flags_for_service("auth-service"),
            vec![
                ("auth_enable_mfa".to_string(), false),
                ("auth_enable_sso".to_string(), true)
            ]
        );
    }

    #[test]
    fn test_feature_gate_trait_object() {
        let (store, _) = shared_store(CONFIG);
        let gate: &dyn FeatureGate = &store;
        assert!(gate.is_enabled("cart_enable_checkout"));

        let table = store.snapshot();
        let gate: &dyn FeatureGate = &*table;
        assert!(!gate.is_enabled("auth_enable_mfa"));
    }

    #[test]
    fn test_store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FlagStore>();
    }

    #[test]
    fn test_debug_output() {
        let (store, _) = shared_store(CONFIG);
        let debug = format!("{:?}", store);
        assert!(debug.contains("FlagStore"));
        assert!(debug.contains("static"));
    }
}
