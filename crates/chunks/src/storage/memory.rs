//! In-memory storage implementation
//!
//! Keeps serialized artifacts in a map. Used by tests and dry runs.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::ChunkStore;
use crate::value::Value;

/// In-memory implementation of ChunkStore
///
/// Stores the same pretty JSON a file store would write, so loads go
/// through the real parser.
#[derive(Default)]
pub struct InMemoryChunkStore {
    chunks: RwLock<BTreeMap<i32, String>>,
}

impl InMemoryChunkStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds placeholder artifacts for `versions`
    pub fn with_versions(versions: impl IntoIterator<Item = i32>) -> Self {
        let chunks = versions
            .into_iter()
            .map(|v| (v, "null".to_string()))
            .collect();
        Self {
            chunks: RwLock::new(chunks),
        }
    }

    /// Number of persisted versions
    pub fn len(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn persisted_versions(&self) -> Result<Vec<i32>> {
        Ok(self.chunks.read().unwrap().keys().copied().collect())
    }

    fn persist(&self, version: i32, value: &Value) -> Result<()> {
        let content = value
            .to_pretty_json()
            .with_context(|| format!("Failed to serialize version {}", version))?;
        self.chunks.write().unwrap().insert(version, content);
        Ok(())
    }

    fn load(&self, version: i32) -> Result<Option<serde_json::Value>> {
        let chunks = self.chunks.read().unwrap();
        match chunks.get(&version) {
            Some(content) => Ok(Some(serde_json::from_str(content)?)),
            None => Ok(None),
        }
    }
}
