//! Storage trait definitions

use anyhow::Result;

use crate::value::Value;

/// Trait for chunk archive operations
///
/// Implementations must make [`ChunkStore::persist`] atomic per version:
/// after a failure or an interruption the version is either fully present
/// or absent.
pub trait ChunkStore: Send + Sync {
    /// Versions that are already persisted, in no particular order
    fn persisted_versions(&self) -> Result<Vec<i32>>;

    /// Durably write the flattened chunk for a version
    fn persist(&self, version: i32, value: &Value) -> Result<()>;

    /// Re-load a persisted version as parsed JSON, key order preserved
    fn load(&self, version: i32) -> Result<Option<serde_json::Value>>;

    /// Check if a version is persisted
    fn has_version(&self, version: i32) -> Result<bool> {
        Ok(self.persisted_versions()?.contains(&version))
    }

    /// Highest persisted version, if any
    fn highest_persisted(&self) -> Result<Option<i32>> {
        Ok(self.persisted_versions()?.into_iter().max())
    }
}
