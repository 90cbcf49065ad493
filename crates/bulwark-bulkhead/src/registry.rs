//! A registry of bulkheads keyed by resource name.

use crate::bulkhead::{Bulkhead, BulkheadStats};
use crate::config::BulkheadConfig;
use crate::presets::BulkheadPreset;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Owns one [`Bulkhead`] per resource name.
///
/// Bulkheads are created lazily on first use: a name with a matching
/// [`BulkheadPreset`] gets that preset, anything else gets the registry default.
/// Clones share the same bulkheads.
///
/// ```rust
/// use bulwark_bulkhead::BulkheadRegistry;
///
/// let registry = BulkheadRegistry::new();
/// let llm = registry.get_or_create("llm");
/// assert_eq!(llm.config().max_concurrent(), 20);
///
/// // The same name always resolves to the same bulkhead.
/// let again = registry.get_or_create("llm");
/// assert_eq!(again.stats(), llm.stats());
/// ```
#[derive(Clone, Debug)]
pub struct BulkheadRegistry {
    bulkheads: Arc<RwLock<HashMap<String, Bulkhead>>>,
    fallback_preset: BulkheadPreset,
}

impl BulkheadRegistry {
    /// Creates an empty registry using [`BulkheadPreset::DEFAULT`] for unknown names.
    pub fn new() -> Self {
        Self::with_default_preset(BulkheadPreset::DEFAULT)
    }

    /// Creates an empty registry using `preset` for names without their own preset.
    pub fn with_default_preset(preset: BulkheadPreset) -> Self {
        Self {
            bulkheads: Arc::new(RwLock::new(HashMap::new())),
            fallback_preset: preset,
        }
    }

    /// Returns the bulkhead for `name`, creating it on first use.
    pub fn get_or_create(&self, name: &str) -> Bulkhead {
        if let Some(existing) = self.get(name) {
            return existing;
        }

        let mut bulkheads = self
            .bulkheads
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        bulkheads
            .entry(name.to_string())
            .or_insert_with(|| {
                let preset = BulkheadPreset::for_resource(name).unwrap_or(self.fallback_preset);
                Bulkhead::new(BulkheadConfig::from_preset(name, preset))
            })
            .clone()
    }

    /// Registers a bulkhead built from `config` under its name, replacing any
    /// existing one. Callers already holding the old handle keep using it.
    pub fn register(&self, config: BulkheadConfig) -> Bulkhead {
        let bulkhead = Bulkhead::new(config);
        self.bulkheads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bulkhead.name().to_string(), bulkhead.clone());
        bulkhead
    }

    /// Returns the bulkhead for `name` if it exists.
    pub fn get(&self, name: &str) -> Option<Bulkhead> {
        self.bulkheads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all registered bulkheads, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .bulkheads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Statistics of every registered bulkhead.
    pub fn all_stats(&self) -> BTreeMap<String, BulkheadStats> {
        self.bulkheads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, bulkhead)| (name.clone(), bulkhead.stats()))
            .collect()
    }

    /// Zeroes the counters of every registered bulkhead.
    pub fn reset_all_stats(&self) {
        for bulkhead in self
            .bulkheads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            bulkhead.reset_stats();
        }
    }

    /// Forgets every bulkhead. In-flight calls finish on the handles they hold.
    pub fn clear(&self) {
        self.bulkheads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for BulkheadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
