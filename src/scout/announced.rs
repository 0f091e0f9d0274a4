//! Durable set of contract addresses that have already been announced.
//!
//! Backed by a JSON array on disk. Keys are only ever added; every new key is
//! written through before `insert` returns.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct AnnouncedSet {
    path: Option<PathBuf>,
    /// Insertion order, as written to disk
    keys: Vec<String>,
    index: HashSet<String>,
}

impl AnnouncedSet {
    /// Load the set from `path`; a missing file is an empty set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let keys: Vec<String> = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read announced set {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Announced set {} is not a JSON list", path.display()))?
        } else {
            Vec::new()
        };

        let mut set = Self {
            path: Some(path),
            ..Default::default()
        };
        for key in keys {
            if set.index.insert(key.clone()) {
                set.keys.push(key);
            }
        }
        info!("Loaded {} announced tokens", set.keys.len());
        Ok(set)
    }

    /// A set that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Add `key` and flush. Returns `false` if it was already present.
    pub fn insert(&mut self, key: &str) -> Result<bool> {
        if self.index.contains(key) {
            return Ok(false);
        }
        self.keys.push(key.to_string());
        self.index.insert(key.to_string());

        if let Err(e) = self.flush() {
            self.keys.pop();
            self.index.remove(key);
            return Err(e);
        }
        debug!(key, "Marked token as announced");
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Write to a sibling temp file, sync, then rename over the target.
    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &self.keys)?;
            writer.flush()?;
            writer
                .get_ref()
                .sync_all()
                .context("Failed to sync announced set")?;
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = AnnouncedSet::load(dir.path().join("notified_tokens.json")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_is_durable_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notified_tokens.json");

        let mut set = AnnouncedSet::load(&path).unwrap();
        assert!(set.insert("0xaaa").unwrap());
        assert!(set.insert("0xbbb").unwrap());

        let reloaded = AnnouncedSet::load(&path).unwrap();
        assert!(reloaded.contains("0xaaa"));
        assert!(reloaded.contains("0xbbb"));
        assert_eq!(reloaded.keys(), &["0xaaa".to_string(), "0xbbb".to_string()]);
    }

    #[test]
    fn test_reinsert_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notified_tokens.json");

        let mut set = AnnouncedSet::load(&path).unwrap();
        assert!(set.insert("0xaaa").unwrap());
        assert!(!set.insert("0xaaa").unwrap());
        assert_eq!(set.len(), 1);
        assert_eq!(AnnouncedSet::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_reads_legacy_list_with_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notified_tokens.json");
        fs::write(&path, r#"["0x1", "0x2", "0x1"]"#).unwrap();

        let set = AnnouncedSet::load(&path).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notified_tokens.json");
        fs::write(&path, "{not json").unwrap();
        assert!(AnnouncedSet::load(&path).is_err());
    }
}
