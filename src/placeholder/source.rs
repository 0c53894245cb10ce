//! Config maps holding placeholder templates.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

/// A fetched config map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigData {
    pub resource_version: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigSourceError {
    #[error("config map {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("config source unavailable: {0}")]
    Unavailable(String),
}

/// Read access to config maps.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<ConfigData, ConfigSourceError>;
}

/// In-process config map store.
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    maps: DashMap<(String, String), ConfigData>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, namespace: &str, name: &str, data: ConfigData) {
        self.maps.insert((namespace.to_string(), name.to_string()), data);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.maps.remove(&(namespace.to_string(), name.to_string()));
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    async fn get(&self, namespace: &str, name: &str) -> Result<ConfigData, ConfigSourceError> {
        self.maps
            .get(&(namespace.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ConfigSourceError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}
