//! File-based chunk archive
//!
//! Directory structure:
//! ```text
//! data/
//!   3554.json          # flattened chunk for version 3554
//!   3555.json
//!   3556.json.tmp      # in-flight write, never counted as persisted
//!   notebooks.json     # named snapshot, ignored by resume discovery
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use super::ChunkStore;
use crate::value::Value;

const EXTENSION: &str = ".json";

/// Pretty-JSON chunk archive in a single directory
pub struct FileChunkStore {
    root: PathBuf,
}

impl FileChunkStore {
    /// Open (and create if needed) an archive directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create archive directory: {}", root.display()))?;
        Ok(Self { root })
    }

    /// Open an archive directory for reading without creating it
    ///
    /// A missing directory reads as an empty archive.
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Archive directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for a version
    pub fn chunk_path(&self, version: i32) -> PathBuf {
        self.root.join(format!("{}{}", version, EXTENSION))
    }

    /// Write a named, non-versioned snapshot (e.g. `notebooks`)
    pub fn save_snapshot(&self, name: &str, value: &Value) -> Result<PathBuf> {
        let path = self.root.join(format!("{}{}", name, EXTENSION));
        self.write_atomic(&path, value)?;
        info!("Saved snapshot: {}", path.display());
        Ok(path)
    }

    /// Write to a temp file, sync it, rename over the final path, then sync
    /// the directory so the rename itself is durable
    fn write_atomic(&self, path: &Path, value: &Value) -> Result<()> {
        let content = value
            .to_pretty_json()
            .with_context(|| format!("Failed to serialize {}", path.display()))?;

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let written = write_synced(&temp_path, content.as_bytes())
            .and_then(|()| fs::rename(&temp_path, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_context(|| format!("Failed to write {}", path.display()));
        }
        sync_dir(&self.root).with_context(|| format!("Failed to sync {}", self.root.display()))
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

// Directory handles cannot be synced here
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Parse a version out of an artifact file name (`<digits>.json`)
pub(crate) fn parse_version(file_name: &str) -> Option<i32> {
    let stem = file_name.strip_suffix(EXTENSION)?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

impl ChunkStore for FileChunkStore {
    fn persisted_versions(&self) -> Result<Vec<i32>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            if let Some(version) = entry.file_name().to_str().and_then(parse_version) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn persist(&self, version: i32, value: &Value) -> Result<()> {
        let path = self.chunk_path(version);
        self.write_atomic(&path, value)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn load(&self, version: i32) -> Result<Option<serde_json::Value>> {
        let path = self.chunk_path(version);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;
    use tempfile::tempdir;

    fn sample(version: i64) -> Value {
        Value::map_from(vec![
            ("updateCount".to_string(), Value::Number(Number::Int(version))),
            ("contentHash".to_string(), Value::Binary(vec![0xde, 0xad, 0x00, 0xef])),
        ])
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("3554.json"), Some(3554));
        assert_eq!(parse_version("0.json"), Some(0));
        assert_eq!(parse_version("notebooks.json"), None);
        assert_eq!(parse_version("12.json.tmp"), None);
        assert_eq!(parse_version("12.yml"), None);
        assert_eq!(parse_version(".json"), None);
        assert_eq!(parse_version("-3.json"), None);
        assert_eq!(parse_version("99999999999.json"), None);
    }

    #[test]
    fn test_persist_and_load() {
        let dir = tempdir().unwrap();
        let store = FileChunkStore::new(dir.path().join("data")).unwrap();

        store.persist(12, &sample(12)).unwrap();
        let loaded = store.load(12).unwrap().unwrap();

        assert_eq!(loaded["updateCount"], 12);
        assert_eq!(loaded["contentHash"], "3q0A7w==");
        assert!(store.load(13).unwrap().is_none());
    }

    #[test]
    fn test_persisted_versions_ignores_other_files() {
        let dir = tempdir().unwrap();
        let store = FileChunkStore::new(dir.path()).unwrap();

        store.persist(3, &sample(3)).unwrap();
        store.persist(10, &sample(10)).unwrap();
        store.save_snapshot("notebooks", &Value::List(vec![])).unwrap();
        fs::write(dir.path().join("11.json.tmp"), "{").unwrap();
        fs::write(dir.path().join("README"), "hi").unwrap();

        assert_eq!(store.persisted_versions().unwrap(), vec![3, 10]);
        assert_eq!(store.highest_persisted().unwrap(), Some(10));
        assert!(store.has_version(3).unwrap());
        assert!(!store.has_version(11).unwrap());
    }

    #[test]
    fn test_persist_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = FileChunkStore::new(dir.path()).unwrap();

        store.persist(1, &sample(1)).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.json".to_string()]);
    }

    #[test]
    fn test_persist_overwrites_idempotently() {
        let dir = tempdir().unwrap();
        let store = FileChunkStore::new(dir.path()).unwrap();

        store.persist(5, &sample(5)).unwrap();
        store.persist(5, &sample(5)).unwrap();

        assert_eq!(store.persisted_versions().unwrap(), vec![5]);
    }

    #[test]
    fn test_persist_into_missing_directory_fails_cleanly() {
        let dir = tempdir().unwrap();
        let store = FileChunkStore::new(dir.path().join("gone")).unwrap();
        fs::remove_dir_all(store.root()).unwrap();

        assert!(store.persist(1, &sample(1)).is_err());
        assert!(store.persisted_versions().unwrap().is_empty());
    }

    #[test]
    fn test_open_does_not_create_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("not-yet");
        let store = FileChunkStore::open(&missing);

        assert!(store.persisted_versions().unwrap().is_empty());
        assert_eq!(store.load(1).unwrap(), None);
        assert!(!missing.exists());
    }

    #[test]
    fn test_sync_dir() {
        let dir = tempdir().unwrap();
        sync_dir(dir.path()).unwrap();
        assert!(sync_dir(&dir.path().join("missing")).is_err() || cfg!(not(unix)));
    }

    #[test]
    fn test_snapshot_written_and_synced() {
        let dir = tempdir().unwrap();
        let store = FileChunkStore::new(dir.path()).unwrap();

        let path = store.save_snapshot("notebooks", &Value::List(vec![sample(1)])).unwrap();
        assert_eq!(path, dir.path().join("notebooks.json"));
        assert!(!dir.path().join("notebooks.json.tmp").exists());
        assert!(store.persisted_versions().unwrap().is_empty());
    }
}
