use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{FundKey, FundSnapshot};

use super::StalenessPolicy;

/// Bump when the persisted entry shape changes; mismatched entries are
/// evicted on read and refetched.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// One persisted cache entry. The wire names (`fetchedAt` as epoch millis,
/// `schemaVersion`) are shared with the other dashboard clients reading the
/// same store, so they are part of the format, not a style choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    #[serde(rename = "fetchedAt", with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            fetched_at: Utc::now(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.fetched_at).num_seconds()
    }

    pub fn age_display(&self) -> String {
        let seconds = self.age_seconds(Utc::now());
        if seconds < 60 {
            // Covers negative ages (clock skew) too
            "just now".to_string()
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else if seconds < 86400 {
            format!("{}h ago", seconds / 3600)
        } else {
            format!("{}d ago", seconds / 86400)
        }
    }
}

/// Owns the persisted fund entries: one JSON file per fund key under the
/// cache directory. All staleness judgments go through the single injected
/// `StalenessPolicy`, and a write failure never propagates to rendering.
///
/// Clone is cheap - the store is just a path and a policy; clones share the
/// same on-disk state.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
    policy: StalenessPolicy,
}

impl CacheStore {
    pub fn new(cache_dir: PathBuf, policy: StalenessPolicy) -> Self {
        Self { cache_dir, policy }
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    fn entry_path(&self, fund: &FundKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", fund))
    }

    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Read the entry for a fund key, applying the staleness policy.
    ///
    /// Returns `None` when the entry is missing, unparseable, carries a
    /// different schema version, or (in TTL mode) has expired. Malformed,
    /// mismatched, and expired entries are deleted as a side effect so the
    /// next read starts clean.
    pub fn get(&self, fund: &FundKey) -> Option<CacheEntry<FundSnapshot>> {
        let path = self.entry_path(fund);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(fund = %fund, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry<FundSnapshot> = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(fund = %fund, error = %e, "Malformed cache entry, evicting");
                self.remove(fund);
                return None;
            }
        };

        if entry.schema_version != CURRENT_SCHEMA_VERSION {
            debug!(
                fund = %fund,
                found = entry.schema_version,
                expected = CURRENT_SCHEMA_VERSION,
                "Cache schema version mismatch, evicting"
            );
            self.remove(fund);
            return None;
        }

        if !self.policy.is_fresh(entry.fetched_at, Utc::now()) {
            debug!(
                fund = %fund,
                age_seconds = entry.age_seconds(Utc::now()),
                "Cache entry expired, evicting"
            );
            self.remove(fund);
            return None;
        }

        debug!(fund = %fund, age_seconds = entry.age_seconds(Utc::now()), "Cache hit");
        Some(entry)
    }

    /// Persist a snapshot for a fund key, overwriting any previous entry.
    ///
    /// On a write failure (storage full, unwritable directory) all fund
    /// entries are evicted and the write retried once; if the retry also
    /// fails the write is dropped. A cache write failure must never block
    /// rendering, so this method cannot fail.
    pub fn put(&self, fund: &FundKey, snapshot: &FundSnapshot) {
        let entry = CacheEntry::new(snapshot);
        let json = match serde_json::to_string_pretty(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(fund = %fund, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(first) = self.write_entry(fund, &json) {
            warn!(
                fund = %fund,
                error = %first,
                "Cache write failed, evicting all entries and retrying"
            );
            self.evict_all();
            if let Err(second) = self.write_entry(fund, &json) {
                warn!(fund = %fund, error = %second, "Cache write failed after eviction, dropping");
                return;
            }
        }
        debug!(fund = %fund, "Cache saved");
    }

    /// Remove the entry for a fund key; used by the hard-reload path to
    /// force a fresh fetch.
    pub fn clear(&self, fund: &FundKey) {
        self.remove(fund);
        debug!(fund = %fund, "Cache cleared");
    }

    /// Age display for the status bar ("just now", "5m ago", ...). Reads
    /// the raw entry without the staleness policy so an expired entry still
    /// reports how old the data on screen is.
    pub fn age_display(&self, fund: &FundKey) -> Option<String> {
        let contents = fs::read_to_string(self.entry_path(fund)).ok()?;
        let entry: CacheEntry<FundSnapshot> = serde_json::from_str(&contents).ok()?;
        Some(entry.age_display())
    }

    fn write_entry(&self, fund: &FundKey, json: &str) -> io::Result<()> {
        self.ensure_dir()?;
        fs::write(self.entry_path(fund), json)
    }

    fn remove(&self, fund: &FundKey) {
        if let Err(e) = fs::remove_file(self.entry_path(fund)) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(fund = %fund, error = %e, "Failed to remove cache entry");
            }
        }
    }

    /// Delete every fund entry in the cache directory. Recovery path for
    /// write failures; also reused by `--reload` for a full reset.
    pub fn evict_all(&self) {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to evict cache entry");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContributionRecord;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_snapshot() -> FundSnapshot {
        FundSnapshot {
            contributions: vec![ContributionRecord {
                member: "Asha".to_string(),
                amount: 500.0,
                date: "2024-01-05T00:00:00.000Z".to_string(),
                category: "Tithe".to_string(),
                notes: String::new(),
            }],
            goal_amount: 10000.0,
        }
    }

    fn ttl_store(ttl_ms: i64) -> (CacheStore, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let store = CacheStore::new(
            dir.path().to_path_buf(),
            StalenessPolicy::ttl(Duration::milliseconds(ttl_ms)),
        );
        (store, dir)
    }

    fn write_raw_entry(store: &CacheStore, fund: &FundKey, entry: &CacheEntry<FundSnapshot>) {
        let json = serde_json::to_string_pretty(entry).unwrap();
        fs::create_dir_all(&store.cache_dir).unwrap();
        fs::write(store.entry_path(fund), json).unwrap();
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let (store, _dir) = ttl_store(60_000);
        let fund = FundKey::new("tech");
        let snapshot = test_snapshot();

        store.put(&fund, &snapshot);

        let entry = store.get(&fund).expect("entry present after put");
        assert_eq!(entry.data, snapshot);
        assert_eq!(entry.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let (store, _dir) = ttl_store(60_000);
        assert!(store.get(&FundKey::new("nonexistent")).is_none());
    }

    #[test]
    fn test_get_is_idempotent() {
        let (store, _dir) = ttl_store(60_000);
        let fund = FundKey::new("tech");
        store.put(&fund, &test_snapshot());

        let first = store.get(&fund).unwrap();
        let second = store.get(&fund).unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(first.fetched_at, second.fetched_at);
    }

    #[test]
    fn test_schema_mismatch_evicts() {
        let (store, _dir) = ttl_store(60_000);
        let fund = FundKey::new("tech");
        let mut entry = CacheEntry::new(test_snapshot());
        entry.schema_version = CURRENT_SCHEMA_VERSION + 1;
        write_raw_entry(&store, &fund, &entry);

        assert!(store.get(&fund).is_none());
        assert!(
            !store.entry_path(&fund).exists(),
            "mismatched entry should be deleted"
        );
    }

    #[test]
    fn test_malformed_entry_evicts() {
        let (store, _dir) = ttl_store(60_000);
        let fund = FundKey::new("tech");
        fs::create_dir_all(&store.cache_dir).unwrap();
        fs::write(store.entry_path(&fund), "{ not json").unwrap();

        assert!(store.get(&fund).is_none());
        assert!(!store.entry_path(&fund).exists());
    }

    #[test]
    fn test_expired_entry_evicts_on_read() {
        let (store, _dir) = ttl_store(5000);
        let fund = FundKey::new("tech");
        let mut entry = CacheEntry::new(test_snapshot());
        entry.fetched_at = Utc::now() - Duration::milliseconds(10_000);
        write_raw_entry(&store, &fund, &entry);

        assert!(store.get(&fund).is_none());
        assert!(
            !store.entry_path(&fund).exists(),
            "expired entry should be deleted"
        );
    }

    #[test]
    fn test_sticky_mode_serves_old_entries() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf(), StalenessPolicy::sticky());
        let fund = FundKey::new("tech");
        let mut entry = CacheEntry::new(test_snapshot());
        entry.fetched_at = Utc::now() - Duration::days(30);
        write_raw_entry(&store, &fund, &entry);

        assert!(store.get(&fund).is_some());
    }

    #[test]
    fn test_clear_removes_entry() {
        let (store, _dir) = ttl_store(60_000);
        let fund = FundKey::new("tech");
        store.put(&fund, &test_snapshot());

        store.clear(&fund);
        assert!(store.get(&fund).is_none());
    }

    #[test]
    fn test_overwrite_is_wholesale() {
        let (store, _dir) = ttl_store(60_000);
        let fund = FundKey::new("tech");
        store.put(&fund, &test_snapshot());

        let empty = FundSnapshot::default();
        store.put(&fund, &empty);

        let entry = store.get(&fund).unwrap();
        assert_eq!(entry.data, empty);
    }

    #[test]
    fn test_put_never_fails_when_directory_is_unwritable() {
        // Point the store at a path occupied by a regular file so that
        // create_dir_all fails, exercising the evict-and-retry path.
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, "not a directory").unwrap();

        let store = CacheStore::new(blocker, StalenessPolicy::ttl(Duration::minutes(5)));
        let fund = FundKey::new("tech");

        // Must return without panicking or erroring
        store.put(&fund, &test_snapshot());
        assert!(store.get(&fund).is_none());
    }

    #[test]
    fn test_wire_format_field_names() {
        let entry = CacheEntry::new(test_snapshot());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"fetchedAt\""));
        assert!(json.contains("\"schemaVersion\""));
        assert!(json.contains("\"goalAmount\""));
    }

    #[test]
    fn test_age_display_just_now() {
        let entry = CacheEntry::new(test_snapshot());
        assert_eq!(entry.age_display(), "just now");
    }

    #[test]
    fn test_age_display_minutes() {
        let mut entry = CacheEntry::new(test_snapshot());
        entry.fetched_at = Utc::now() - Duration::minutes(7);
        assert_eq!(entry.age_display(), "7m ago");
    }
}
