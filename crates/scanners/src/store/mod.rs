//! Persisted key→value metadata for surrounding tooling.
//!
//! Incremental-scan bookkeeping lives here; the scan algorithm itself never
//! reads it. The table is opaque external state behind a minimal interface.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub trait MetadataStore: Send + Sync {
    fn ensure_table(&self) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// JSON-file-backed table. Every `set` persists immediately; keys iterate
/// in sorted order on disk so the file diffs cleanly.
pub struct FileMetadataStore {
    path: PathBuf,
    table: Mutex<BTreeMap<String, String>>,
}

impl FileMetadataStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading metadata store {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing metadata store {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    fn persist(&self, table: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(table)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("writing metadata store {}", self.path.display()))
    }
}

impl MetadataStore for FileMetadataStore {
    fn ensure_table(&self) -> Result<()> {
        let table = self.table.lock().expect("store lock");
        if !self.path.exists() {
            self.persist(&table)?;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.table.lock().expect("store lock").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut table = self.table.lock().expect("store lock");
        table.insert(key.to_string(), value.to_string());
        self.persist(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_round_trip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");

        let store = FileMetadataStore::open(&path).unwrap();
        store.ensure_table().unwrap();
        store.set("last_scan", "1722470400").unwrap();
        assert_eq!(store.get("last_scan").unwrap().as_deref(), Some("1722470400"));

        let reopened = FileMetadataStore::open(&path).unwrap();
        assert_eq!(reopened.get("last_scan").unwrap().as_deref(), Some("1722470400"));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn ensure_table_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");

        let store = FileMetadataStore::open(&path).unwrap();
        store.ensure_table().unwrap();
        assert!(path.exists());
    }
}
