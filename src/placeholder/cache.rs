//! Compiled template cache.
//!
//! # Design Decisions
//! - Keyed by `namespace/name/inline` or `namespace/name/cm/<config map>`
//! - An entry is valid only for the generation (and config map version)
//!   it was built from; anything else is a miss
//! - Entries are replaced, never evicted
//! - Concurrent misses may both compile; the last write wins

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::placeholder::template::Template;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub template: Arc<Template>,
    pub generation: i64,
    pub config_version: Option<String>,
}

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

pub fn inline_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}/inline")
}

pub fn config_map_key(namespace: &str, name: &str, config_map: &str) -> String {
    format!("{namespace}/{name}/cm/{config_map}")
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached template, if it was built from the same generation and version.
    pub fn get(&self, key: &str, generation: i64, config_version: Option<&str>) -> Option<Arc<Template>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| e.generation == generation && e.config_version.as_deref() == config_version)
            .map(|e| e.template.clone())
    }

    pub fn insert(&self, key: String, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
