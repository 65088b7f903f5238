//! # Weather Cache
//!
//! Keeps fetched weather series keyed by site, time range and source, with a
//! time-to-live. Entries live in memory and, when a directory is configured,
//! as JSON files so that repeated runs skip the fetch.
//!
//! Readers of different keys never block each other. For a single key only
//! one caller fetches at a time; concurrent callers wait and then reuse the
//! stored result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::WeatherSeries;
use crate::domain::Location;
use crate::error::Result;

pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Identity of a cached series; coordinates are rounded to 1e-4 degrees
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    lat_e4: i64,
    lon_e4: i64,
    start: i64,
    end: i64,
    source: String,
}

impl CacheKey {
    pub fn new(
        location: &Location,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            lat_e4: (location.latitude() * 1e4).round() as i64,
            lon_e4: (location.longitude() * 1e4).round() as i64,
            start: start.timestamp(),
            end: end.timestamp(),
            source: source.into(),
        }
    }

    fn file_name(&self) -> String {
        let source: String = self
            .source
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!(
            "{}_{}_{}_{}_{}.json",
            source, self.lat_e4, self.lon_e4, self.start, self.end
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    series: WeatherSeries,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

pub struct WeatherCache {
    ttl: Duration,
    dir: Option<PathBuf>,
    slots: RwLock<HashMap<CacheKey, Slot>>,
}

impl WeatherCache {
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            ttl,
            dir: None,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn on_disk(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            ttl,
            dir: Some(dir),
            slots: RwLock::new(HashMap::new()),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<WeatherSeries> {
        let slot = self.slot(key);
        let mut guard = slot.lock();
        self.load_fresh(key, &mut guard)
    }

    pub fn insert(&self, key: CacheKey, series: WeatherSeries) -> Result<()> {
        let slot = self.slot(&key);
        let mut guard = slot.lock();
        self.store(&key, &mut guard, series)
    }

    /// Cached series for `key`, running `fetch` only on a miss. Concurrent
    /// callers for the same key wait for the first fetch to finish.
    pub fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> Result<WeatherSeries>
    where
        F: FnOnce() -> Result<WeatherSeries>,
    {
        let slot = self.slot(&key);
        let mut guard = slot.lock();
        if let Some(series) = self.load_fresh(&key, &mut guard) {
            debug!(source = %key.source, "weather cache hit");
            return Ok(series);
        }
        debug!(source = %key.source, "weather cache miss, fetching");
        let series = fetch()?;
        self.store(&key, &mut guard, series.clone())?;
        Ok(series)
    }

    /// Drop expired entries from memory and disk; returns how many went.
    ///
    /// Slots are inspected outside the map lock, and a slot whose fetch is
    /// still running is left alone. Slots left empty by misses are dropped.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        let mut vacant = Vec::new();
        for (key, slot) in self.snapshot() {
            let Some(mut guard) = slot.try_lock() else {
                continue;
            };
            match guard.as_ref().map(|entry| self.is_expired(entry)) {
                Some(true) => {
                    *guard = None;
                    self.remove_file(&key);
                    removed += 1;
                    vacant.push(key);
                }
                Some(false) => {}
                None => vacant.push(key),
            }
        }
        if !vacant.is_empty() {
            let mut slots = self.slots.write();
            for key in vacant {
                // a slot someone else still holds may be refilled
                let unused = slots.get(&key).is_some_and(|slot| {
                    Arc::strong_count(slot) == 1 && slot.try_lock().is_some_and(|g| g.is_none())
                });
                if unused {
                    slots.remove(&key);
                }
            }
        }
        if let Some(dir) = &self.dir {
            removed += self.purge_dir(dir);
        }
        removed
    }

    pub fn clear(&self) {
        let drained: Vec<(CacheKey, Slot)> = self.slots.write().drain().collect();
        for (key, slot) in drained {
            *slot.lock() = None;
            self.remove_file(&key);
        }
        if let Some(dir) = &self.dir {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    if is_cache_file(&entry.path()) {
                        let _ = std::fs::remove_file(entry.path());
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot()
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<(CacheKey, Slot)> {
        self.slots
            .read()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect()
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        if let Some(slot) = self.slots.read().get(key) {
            return slot.clone();
        }
        self.slots.write().entry(key.clone()).or_default().clone()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let age = Utc::now() - entry.stored_at;
        age.to_std().map_or(false, |age| age >= self.ttl)
    }

    fn load_fresh(&self, key: &CacheKey, guard: &mut Option<CacheEntry>) -> Option<WeatherSeries> {
        if guard.is_none() {
            *guard = self.read_file(key);
        }
        match guard.as_ref() {
            Some(entry) if !self.is_expired(entry) => Some(entry.series.clone()),
            Some(_) => {
                *guard = None;
                self.remove_file(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: &CacheKey, guard: &mut Option<CacheEntry>, series: WeatherSeries) -> Result<()> {
        let entry = CacheEntry {
            stored_at: Utc::now(),
            series,
        };
        if let Some(path) = self.path_for(key) {
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, serde_json::to_vec(&entry)?)?;
            std::fs::rename(&tmp, &path)?;
        }
        *guard = Some(entry);
        Ok(())
    }

    fn path_for(&self, key: &CacheKey) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(key.file_name()))
    }

    fn read_file(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.path_for(key)?;
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable cache file");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    fn remove_file(&self, key: &CacheKey) {
        if let Some(path) = self.path_for(key) {
            let _ = std::fs::remove_file(path);
        }
    }

    fn purge_dir(&self, dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        let mut removed = 0;
        for path in entries.flatten().map(|e| e.path()).filter(|p| is_cache_file(p)) {
            let stale = std::fs::read(&path)
                .ok()
                .and_then(|b| serde_json::from_slice::<CacheEntry>(&b).ok())
                .map_or(true, |e| self.is_expired(&e));
            if stale && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

fn is_cache_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
