//! Immutable flag table.
//!
//! A [`FlagTable`] is built in one go from parsed definitions and is never
//! modified afterwards. Reloading produces a new table; the
//! [`FlagStore`](crate::FlagStore) publishes it by swapping an `Arc`.

use crate::model::FlagDefinition;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
struct FlagEntry {
    enabled: bool,
    service: Option<String>,
}

/// Mapping of flag name to boolean state.
///
/// Unknown names are disabled: [`is_enabled`](FlagTable::is_enabled) returns
/// `false` for a name that was never declared.
///
/// # Example
///
/// ```
/// use flagstore::model::FlagDefinition;
/// use flagstore::storage::FlagTable;
///
/// let table = FlagTable::from_definitions(vec![
///     FlagDefinition::new("auth_enable_2fa", true),
///     FlagDefinition::new("auth_enable_2fa", false),
/// ]);
///
/// assert!(!table.is_enabled("auth_enable_2fa"));
/// assert!(!table.is_enabled("unknown_flag"));
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTable {
    flags: HashMap<String, FlagEntry>,
    generation: u64,
}

impl FlagTable {
    /// Create an empty table. Every query against it returns `false`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from definitions in document order.
    ///
    /// When a name appears more than once, the last definition decides both
    /// its state and its service.
    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = FlagDefinition>,
    {
        let mut flags = HashMap::new();
        for definition in definitions {
            flags.insert(
                definition.name,
                FlagEntry {
                    enabled: definition.enabled,
                    service: definition.service,
                },
            );
        }
        Self {
            flags,
            generation: 0,
        }
    }

    /// Stamps the table with the publication it belongs to.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Publication count at which this table went live; zero if it never did.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the state of `name`, or `false` if it is not declared.
    #[inline]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.get(name).is_some_and(|entry| entry.enabled)
    }

    /// Returns the declared state of `name`, or `None` if it is not declared.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.flags.get(name).map(|entry| entry.enabled)
    }

    /// Returns the service `name` was declared under.
    pub fn service_of(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(|entry| entry.service.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of declared flags that are enabled.
    pub fn enabled_count(&self) -> usize {
        self.flags.values().filter(|entry| entry.enabled).count()
    }

    /// All flags sorted by name.
    pub fn sorted_flags(&self) -> Vec<(&str, bool)> {
        let mut flags: Vec<(&str, bool)> = self
            .flags
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.enabled))
            .collect();
        flags.sort_unstable_by(|a, b| a.0.cmp(b.0));
        flags
    }

    /// Flags declared under `service`, sorted by name.
    pub fn flags_for_service(&self, service: &str) -> Vec<(String, bool)> {
        let mut flags: Vec<(String, bool)> = self
            .flags
            .iter()
            .filter(|(_, entry)| entry.service.as_deref() == Some(service))
            .map(|(name, entry)| (name.clone(), entry.enabled))
            .collect();
        flags.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        flags
    }

    /// Number of flags per service. Flags without a service are not counted.
    pub fn service_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for service in self.flags.values().filter_map(|entry| entry.service.as_ref()) {
            *counts.entry(service.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Names whose query result differs between `self` and `other`, sorted.
    ///
    /// Comparison is on [`is_enabled`](Self::is_enabled), so a flag that is
    /// declared `false` on one side and absent on the other is unchanged.
    pub fn changed_flags(&self, other: &FlagTable) -> Vec<String> {
        let names: BTreeSet<&String> = self.flags.keys().chain(other.flags.keys()).collect();
        names
            .into_iter()
            .filter(|name| self.is_enabled(name) != other.is_enabled(name))
            .cloned()
            .collect()
    }
}
