//! # Sticky Signal Store
//! Durable keyed collection of large past events (contract awards, funding
//! rounds) whose impact outlives the originating fetcher's lookback window.
//!
//! - `add` is idempotent per id.
//! - `active_signals` applies [`crate::decay`] and hides anything whose decayed
//!   impact is not strictly positive.
//! - `cleanup` physically drops records past the 30-day horizon.
//!
//! The map sits behind an `RwLock` held only for the in-memory change. File
//! writes are serialized by a separate mutex and always write a snapshot taken
//! under that mutex, so the file never goes backwards and readers are not held
//! up by disk I/O.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, warn};

use crate::decay::{self, EXPIRY_DAYS};
use crate::error::{StoreError, StoreWrite};
use crate::metrics::{STICKY_ADDED_TOTAL, STICKY_PRUNED_TOTAL, STORE_WRITE_ERRORS_TOTAL};
use crate::persist;
use crate::signal::{ActiveSignal, Component, StickySignal};

#[derive(Debug)]
pub struct StickyStore {
    path: Option<PathBuf>,
    inner: RwLock<BTreeMap<String, StickySignal>>,
    io: Mutex<()>,
}

impl StickyStore {
    /// Open a file-backed store. An unreadable or corrupt file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let records: Vec<StickySignal> = match persist::load_json(&path) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "sticky", error = %e, "sticky store unreadable; starting empty");
                Vec::new()
            }
        };
        debug!(target: "sticky", path = %path.display(), records = records.len(), "sticky store loaded");
        Self {
            path: Some(path),
            inner: RwLock::new(records.into_iter().map(|s| (s.id.clone(), s)).collect()),
            io: Mutex::new(()),
        }
    }

    /// Store without durability (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: RwLock::new(BTreeMap::new()),
            io: Mutex::new(()),
        }
    }

    /// Insert unless a record with the same id exists. `value` is true when inserted.
    pub fn add(&self, signal: StickySignal) -> StoreWrite<bool> {
        let _io = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let snapshot = {
            let mut map = self.write();
            if map.contains_key(&signal.id) {
                return StoreWrite::durable(false);
            }
            debug!(target: "sticky", id = %signal.id, kind = %signal.kind, base_impact = signal.base_impact, "sticky signal added");
            map.insert(signal.id.clone(), signal);
            records_of(&map)
        };
        counter!(STICKY_ADDED_TOTAL).increment(1);
        StoreWrite {
            value: true,
            warning: self.persist(&snapshot),
        }
    }

    /// Records with positive decayed impact as of now, optionally of one type.
    pub fn active_signals(&self, kind: Option<Component>) -> Vec<ActiveSignal> {
        self.active_signals_at(kind, Utc::now())
    }

    pub fn active_signals_at(&self, kind: Option<Component>, now: DateTime<Utc>) -> Vec<ActiveSignal> {
        let map = self.read();
        let mut out: Vec<ActiveSignal> = map
            .values()
            .filter(|s| kind.map_or(true, |k| s.kind == k))
            .filter_map(|s| {
                let days_ago = decay::days_ago(s.timestamp, now);
                let decayed_impact = decay::decayed_impact(s.base_impact, days_ago as f64);
                (decayed_impact > 0.0).then(|| ActiveSignal {
                    record: s.clone(),
                    decayed_impact,
                    days_ago,
                })
            })
            .collect();
        out.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
        out
    }

    /// Remove every record older than the expiry horizon. `value` is the number removed.
    pub fn cleanup(&self) -> StoreWrite<usize> {
        self.cleanup_at(Utc::now())
    }

    pub fn cleanup_at(&self, now: DateTime<Utc>) -> StoreWrite<usize> {
        let _io = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let (removed, snapshot) = {
            let mut map = self.write();
            let before = map.len();
            map.retain(|_, s| !decay::is_expired(s.timestamp, now));
            (before - map.len(), records_of(&map))
        };
        if removed == 0 {
            return StoreWrite::durable(0);
        }
        counter!(STICKY_PRUNED_TOTAL).increment(removed as u64);
        debug!(target: "sticky", removed, horizon_days = EXPIRY_DAYS, "expired sticky signals removed");
        StoreWrite {
            value: removed,
            warning: self.persist(&snapshot),
        }
    }

    pub fn get(&self, id: &str) -> Option<StickySignal> {
        self.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn persist(&self, records: &[StickySignal]) -> Option<StoreError> {
        let path = self.path.as_deref()?;
        match persist::write_json_atomic(path, "sticky signals", records) {
            Ok(()) => None,
            Err(e) => {
                warn!(target: "sticky", error = %e, "sticky store write failed; change kept in memory only");
                counter!(STORE_WRITE_ERRORS_TOTAL, "store" => "sticky").increment(1);
                Some(e)
            }
        }
    }

    // A panic while holding the lock leaves the map itself consistent, so recover it.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, StickySignal>> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, StickySignal>> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

fn records_of(map: &BTreeMap<String, StickySignal>) -> Vec<StickySignal> {
    map.values().cloned().collect()
}
