use anyhow::{Context, Result, anyhow};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::models::{CatalogEntry, CoverRef, PublicationStatus};
use crate::config::AppConfig;

/// Fixed storage key; the backing file is `<key>.json`.
pub const FAVORITES_STORAGE_KEY: &str = "favorites";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub id: String,
    pub title: String,
    pub cover: Option<CoverRef>,
    pub rating: Option<f32>,
    pub status: PublicationStatus,
    pub added_at: Timestamp,
}

impl FavoriteRecord {
    fn from_entry(entry: &CatalogEntry, added_at: Timestamp) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            cover: entry.cover.clone(),
            rating: entry.rating,
            status: entry.status,
            added_at,
        }
    }
}

/// Durable set of favorited works, keyed by id.
///
/// Records are kept in insertion order and written through to disk on every
/// mutation before the call returns. A failed write undoes the in-memory
/// change, so memory and disk never disagree about what the caller saw.
#[derive(Debug, Default)]
pub struct FavoritesStore {
    records: Vec<FavoriteRecord>,
    file_path: Option<PathBuf>,
}

impl FavoritesStore {
    /// A store that is never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from the location the config points at (the OS config directory
    /// unless overridden).
    pub fn load_or_create(config: &AppConfig) -> Result<Self> {
        let path = config
            .favorites_path()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Self::open(path)
    }

    /// Read `path` if it exists; otherwise start empty and create the file on
    /// the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = path.into();

        if !file_path.exists() {
            info!(favorites_file = %file_path.display(), "No favorites file found, starting empty");
            return Ok(Self {
                records: Vec::new(),
                file_path: Some(file_path),
            });
        }

        let content = fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read favorites file {}", file_path.display()))?;
        let loaded: Vec<FavoriteRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse favorites file {}", file_path.display()))?;

        let mut seen = HashSet::new();
        let records: Vec<FavoriteRecord> = loaded
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()))
            .collect();

        info!(
            favorites_file = %file_path.display(),
            count = records.len(),
            "Loaded favorites"
        );
        Ok(Self {
            records,
            file_path: Some(file_path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Add `entry` stamped with the current time. Returns `false` if it was
    /// already a favorite.
    pub fn add(&mut self, entry: &CatalogEntry) -> Result<bool> {
        self.add_at(entry, Timestamp::now())
    }

    pub fn add_at(&mut self, entry: &CatalogEntry, added_at: Timestamp) -> Result<bool> {
        if self.contains(&entry.id) {
            return Ok(false);
        }
        self.records.push(FavoriteRecord::from_entry(entry, added_at));

        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }
        info!(id = %entry.id, "Added favorite");
        Ok(true)
    }

    /// Remove by id. Returns `false` if it was not a favorite.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = self.records.remove(index);

        if let Err(e) = self.persist() {
            self.records.insert(index, removed);
            return Err(e);
        }
        info!(id, "Removed favorite");
        Ok(true)
    }

    /// Flip membership. Returns whether `entry` is a favorite afterwards.
    pub fn toggle(&mut self, entry: &CatalogEntry) -> Result<bool> {
        match self.contains(&entry.id) {
            true => self.remove(&entry.id).map(|_| false),
            false => self.add(entry).map(|_| true),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&FavoriteRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Newest first. Records added at the same instant list the later
    /// insertion first.
    pub fn list(&self) -> Vec<&FavoriteRecord> {
        let mut records: Vec<&FavoriteRecord> = self.records.iter().rev().collect();
        records.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        records
    }

    /// Write the whole set to a sibling temp file, then rename it over the
    /// real one.
    fn persist(&self) -> Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };

        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create favorites directory {}", dir.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(&self.records).context("Failed to serialize favorites")?;
        let tmp_path = path.with_extension("json.tmp");
        let mut tmp = fs::File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.sync_all())
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        drop(tmp);
        if let Err(e) = fs::rename(&tmp_path, path) {
            warn!(favorites_file = %path.display(), error = %e, "Failed to replace favorites file");
            let _ = fs::remove_file(&tmp_path);
            return Err(e)
                .with_context(|| format!("Failed to replace favorites file {}", path.display()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            title: format!("Title {id}"),
            cover: Some(CoverRef {
                manga_id: id.to_string(),
                file_name: "cover.jpg".to_string(),
            }),
            status: PublicationStatus::Ongoing,
            rating: Some(8.5),
            tags: vec!["Action".to_string()],
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("manhwa-reader-test-{}", std::process::id()))
            .join(name)
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_second(secs).unwrap()
    }

    #[test]
    fn test_add_twice_is_idempotent() {
        let mut store = FavoritesStore::in_memory();
        assert!(store.add(&entry("m1")).unwrap());
        assert!(!store.add(&entry("m1")).unwrap());
        assert_eq!(store.list().len(), 1);
        assert!(store.contains("m1"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = FavoritesStore::in_memory();
        store.add(&entry("m1")).unwrap();
        assert!(store.remove("m1").unwrap());
        assert!(!store.remove("m1").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_toggle() {
        let mut store = FavoritesStore::in_memory();
        assert!(store.toggle(&entry("m2")).unwrap());
        assert!(store.contains("m2"));
        assert!(!store.toggle(&entry("m2")).unwrap());
        assert!(!store.contains("m2"));
    }

    #[test]
    fn test_list_newest_first() {
        let mut store = FavoritesStore::in_memory();
        store.add_at(&entry("old"), ts(1_000)).unwrap();
        store.add_at(&entry("new"), ts(3_000)).unwrap();
        store.add_at(&entry("mid"), ts(2_000)).unwrap();
        store.add_at(&entry("mid2"), ts(2_000)).unwrap();

        let ids: Vec<_> = store.list().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid2", "mid", "old"]);
    }

    #[test]
    fn test_record_copies_entry_fields() {
        let mut store = FavoritesStore::in_memory();
        store.add_at(&entry("m3"), ts(42)).unwrap();
        let record = store.get("m3").unwrap();
        assert_eq!(record.title, "Title m3");
        assert_eq!(record.rating, Some(8.5));
        assert_eq!(record.status, PublicationStatus::Ongoing);
        assert_eq!(record.added_at, ts(42));
    }

    #[test]
    fn test_persists_across_reopen() {
        let path = temp_file("favorites_roundtrip.json");
        let _ = fs::remove_file(&path);

        let mut store = FavoritesStore::open(&path).unwrap();
        store.add(&entry("m1")).unwrap();
        store.add(&entry("m2")).unwrap();
        store.remove("m1").unwrap();

        let reopened = FavoritesStore::open(&path).unwrap();
        assert!(reopened.contains("m2"));
        assert!(!reopened.contains("m1"));
        assert_eq!(reopened.len(), 1);

        // stored as a plain JSON array
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.is_array());
        assert!(!path.with_extension("json.tmp").exists());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        // a regular file cannot be used as a directory
        let blocker = temp_file("not_a_dir");
        fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        fs::write(&blocker, "x").unwrap();

        let mut store = FavoritesStore::open(blocker.join("favorites.json")).unwrap();
        assert!(store.add(&entry("m1")).is_err());
        assert!(!store.contains("m1"));

        let _ = fs::remove_file(blocker);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_file("favorites_corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(FavoritesStore::open(&path).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_or_create_uses_config_override() {
        let path = temp_file("favorites_config.json");
        let _ = fs::remove_file(&path);
        let config = AppConfig {
            favorites_file: Some(path.to_string_lossy().into_owned()),
            ..AppConfig::default()
        };
        let store = FavoritesStore::load_or_create(&config).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(store.is_empty());
    }
}
