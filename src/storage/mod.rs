//! JSON storage layer for knowledge records
//!
//! Records live in a single JSON array per file, keyed by `id`. The same
//! store type reads the incompatibility catalogue and reads and writes the
//! knowledge file. One process writes a file at a time.

mod record;

pub use record::{KnowledgeRecord, NOT_APPLICABLE};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// A JSON file of knowledge records
pub struct KnowledgeStore {
    path: PathBuf,
}

impl KnowledgeStore {
    /// Use the records file at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create the file with an empty array if it doesn't exist
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.write_all(&[])?;
        }
        Ok(())
    }

    /// Read every record. A missing file holds no records.
    pub fn load_all(&self) -> Result<Vec<KnowledgeRecord>> {
        if !self.path.exists() {
            tracing::warn!("File not found: {:?}", self.path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read records file {:?}", self.path))?;
        let records: Vec<KnowledgeRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Error decoding JSON in file: {:?}", self.path))?;

        Ok(records)
    }

    /// Find the record with the given id
    pub fn get(&self, id: &str) -> Result<Option<KnowledgeRecord>> {
        Ok(self.load_all()?.into_iter().find(|record| record.id == id))
    }

    /// Insert a record, or replace the one with the same id in place
    pub fn upsert(&self, record: &KnowledgeRecord) -> Result<()> {
        let mut records = self.load_all()?;

        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        self.write_all(&records)?;
        tracing::debug!(id = %record.id, path = ?self.path, "stored knowledge record");

        Ok(())
    }

    fn write_all(&self, records: &[KnowledgeRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write records file {:?}", self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> KnowledgeRecord {
        let mut record = KnowledgeRecord::new(id);
        record.client = "jsoup".to_string();
        record.lib = "org.jsoup:jsoup".to_string();
        record.test = "ParserTest#testParse".to_string();
        record
    }

    #[test]
    fn test_upsert_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::open(dir.path().join("knowledge.json"));
        store.ensure_exists().unwrap();

        let record = sample("X");
        store.upsert(&record).unwrap();

        assert_eq!(store.get("X").unwrap(), Some(record));
        assert_eq!(store.get("Y").unwrap(), None);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::open(dir.path().join("knowledge.json"));

        store.upsert(&sample("A")).unwrap();
        store.upsert(&sample("X")).unwrap();

        let mut updated = sample("X");
        updated.exception = "java.lang.NoSuchMethodError".to_string();
        updated.line_no = "42".to_string();
        store.upsert(&updated).unwrap();
        store.upsert(&updated).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "A");
        assert_eq!(all[1], updated);
    }

    #[test]
    fn test_missing_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::open(dir.path().join("absent.json"));
        assert!(store.get("X").unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = KnowledgeStore::open(&path);
        assert!(store.get("X").is_err());
    }
}
