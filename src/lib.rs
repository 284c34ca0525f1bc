//! # flagstore
//!
//! A runtime feature-flag store: a table of named boolean toggles loaded from
//! a declarative manifest, queried on every request and reloadable while the
//! process is serving traffic.
//!
//! ## Features
//!
//! - **Lock-free queries**: [`FlagStore::is_enabled`] loads the published
//!   table through `arc-swap`, never blocks and never fails
//! - **Default-closed**: unknown flags and unrecognized state tokens are
//!   disabled
//! - **Atomic reloads**: a replacement table is built off to the side and
//!   published with one pointer swap; a failed reload keeps the last good
//!   table
//! - **Tolerant parsing**: comment and code-fence lines are stripped, records
//!   missing a field are skipped, duplicate names resolve last-write-wins
//! - **Configurable schema**: field names, enabled token, JSON or YAML, array
//!   or keyed container
//!
//! ## Example
//!
//! ```no_run
//! use flagstore::{FlagStore, FlagStoreConfig};
//! use std::sync::Arc;
//!
//! let store = Arc::new(FlagStore::open(FlagStoreConfig::new("featureflags.json"))?);
//!
//! if store.is_enabled("billing_enable_tax_report") {
//!     // ...
//! }
//!
//! // Later, from an admin endpoint or a timer:
//! match store.reload() {
//!     Ok(summary) => println!("{} flags changed", summary.changed_flags.len()),
//!     Err(e) => eprintln!("reload failed, still serving previous flags: {}", e),
//! }
//! # Ok::<(), flagstore::LoadError>(())
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod storage;
pub mod store;

pub use config::{FlagStoreConfig, StartupPolicy};
pub use error::{ErrorType, LoadError};
pub use model::{ContainerShape, FlagDefinition, ParsedSource, SourceFormat, SourceSchema};
pub use source::{clean_source, FileSource, FlagSource, StaticSource};
pub use storage::FlagTable;
pub use store::{FeatureGate, FlagStore, ReloadSummary};
