//! Association Checker's 24h persistent scan cache (§4.7/§6): a single
//! JSON file at `<cache_dir>/quality_scan_cache.json`, keyed by a
//! fingerprint of `(entity_type, entity_id, compared fields)` so a write to
//! one entity invalidates only its own row, not the whole cache. Grounded
//! on the teacher's `SeaDexCache`/`is_seadex_fresh` 24h-freshness check,
//! generalized from a store-backed table to the file this system's §6
//! names explicitly.

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

const TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCacheEntry {
    pub entity_type: String,
    pub entity_id: i32,
    pub confidence: i32,
    pub reason: Option<String>,
    pub scanned_at: String,
}

pub struct QualityScanCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, ScanCacheEntry>>,
}

impl QualityScanCache {
    /// Loads the cache file at `path` if it exists, starting empty
    /// otherwise (a missing or unparsable file is not a startup error —
    /// the cache rebuilds itself from scratch on the next scan).
    pub async fn load(path: PathBuf) -> CoreResult<Self> {
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub async fn get_fresh(&self, fingerprint: &str) -> CoreResult<Option<ScanCacheEntry>> {
        let threshold = chrono::Utc::now() - chrono::Duration::hours(TTL_HOURS);
        let guard = self.entries.lock().await;
        Ok(guard.get(fingerprint).filter(|e| {
            chrono::DateTime::parse_from_rfc3339(&e.scanned_at)
                .map(|t| t.with_timezone(&chrono::Utc) > threshold)
                .unwrap_or(false)
        }).cloned())
    }

    pub async fn put(
        &self,
        fingerprint: &str,
        entity_type: &str,
        entity_id: i32,
        confidence: i32,
        reason: Option<&str>,
    ) -> CoreResult<()> {
        let mut guard = self.entries.lock().await;
        guard.insert(
            fingerprint.to_string(),
            ScanCacheEntry {
                entity_type: entity_type.to_string(),
                entity_id,
                confidence,
                reason: reason.map(str::to_string),
                scanned_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        self.persist(&guard).await
    }

    /// Targeted invalidation on write to a single entity (§4.7), not a
    /// wholesale cache flush. Called on re-association so a stale scan
    /// result doesn't outlive the confirmation that superseded it.
    pub async fn invalidate_entity(&self, entity_type: &str, entity_id: i32) -> CoreResult<()> {
        let mut guard = self.entries.lock().await;
        let before = guard.len();
        guard.retain(|_, e| !(e.entity_type == entity_type && e.entity_id == entity_id));
        if guard.len() != before {
            self.persist(&guard).await?;
        }
        Ok(())
    }

    /// Writes the whole table to a temp file adjacent to `path`, then
    /// renames it into place, so a crash mid-write never leaves a
    /// truncated cache file behind.
    async fn persist(&self, entries: &HashMap<String, ScanCacheEntry>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string(entries).map_err(|e| crate::error::CoreError::StoreConsistency(e.to_string()))?;
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, body).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_fresh_round_trips() {
        let dir = tempdir().unwrap();
        let cache = QualityScanCache::load(dir.path().join("quality_scan_cache.json")).await.unwrap();

        cache.put("fp1", "Movie", 1, 80, Some("title drift")).await.unwrap();
        let hit = cache.get_fresh("fp1").await.unwrap();
        assert_eq!(hit.unwrap().confidence, 80);
    }

    #[tokio::test]
    async fn survives_reload_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quality_scan_cache.json");

        let cache = QualityScanCache::load(path.clone()).await.unwrap();
        cache.put("fp1", "Movie", 1, 80, None).await.unwrap();
        drop(cache);

        let reloaded = QualityScanCache::load(path).await.unwrap();
        let hit = reloaded.get_fresh("fp1").await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn invalidate_entity_removes_only_matching_rows() {
        let dir = tempdir().unwrap();
        let cache = QualityScanCache::load(dir.path().join("quality_scan_cache.json")).await.unwrap();

        cache.put("fp1", "Movie", 1, 80, None).await.unwrap();
        cache.put("fp2", "Movie", 2, 80, None).await.unwrap();
        cache.invalidate_entity("Movie", 1).await.unwrap();

        assert!(cache.get_fresh("fp1").await.unwrap().is_none());
        assert!(cache.get_fresh("fp2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_file_loads_empty_without_error() {
        let dir = tempdir().unwrap();
        let cache = QualityScanCache::load(dir.path().join("does-not-exist.json")).await.unwrap();
        assert!(cache.get_fresh("anything").await.unwrap().is_none());
    }
}
