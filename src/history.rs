//! history.rs: append-only series of composite scores with 365-day retention.
//!
//! Entries older than the retention window are dropped when the store is
//! loaded, on every append, and are never returned by queries.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreWrite};
use crate::metrics::STORE_WRITE_ERRORS_TOTAL;
use crate::persist;
use crate::signal::NarrativeScore;

pub const RETENTION_DAYS: i64 = 365;

#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    retention: Duration,
    inner: RwLock<Vec<NarrativeScore>>,
}

impl HistoryStore {
    /// Open a file-backed history. An unreadable or corrupt file yields an empty series.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut entries: Vec<NarrativeScore> = match persist::load_json(&path) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "history", error = %e, "score history unreadable; starting empty");
                Vec::new()
            }
        };
        let retention = Duration::days(RETENTION_DAYS);
        let dropped = prune(&mut entries, Utc::now() - retention);
        debug!(target: "history", path = %path.display(), entries = entries.len(), dropped, "score history loaded");
        Self {
            path: Some(path),
            retention,
            inner: RwLock::new(entries),
        }
    }

    /// History without durability (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            retention: Duration::days(RETENTION_DAYS),
            inner: RwLock::new(Vec::new()),
        }
    }

    /// Append, prune past retention, persist. `value` is the number of entries pruned.
    pub fn append(&self, score: NarrativeScore) -> StoreWrite<usize> {
        self.append_at(score, Utc::now())
    }

    pub fn append_at(&self, score: NarrativeScore, now: DateTime<Utc>) -> StoreWrite<usize> {
        let mut v = self.write();
        v.push(score);
        let pruned = prune(&mut v, now - self.retention);
        StoreWrite {
            value: pruned,
            warning: self.persist(&v),
        }
    }

    /// Entries from the last `days` days, in storage order.
    pub fn query(&self, days: i64) -> Vec<NarrativeScore> {
        self.query_at(days, Utc::now())
    }

    pub fn query_at(&self, days: i64, now: DateTime<Utc>) -> Vec<NarrativeScore> {
        let window = Duration::try_days(days.max(0)).unwrap_or(self.retention);
        let cutoff = self.cutoff(window, now);
        self.read()
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Most recently appended entry still inside the retention window.
    pub fn latest(&self) -> Option<NarrativeScore> {
        self.latest_within(self.retention, Utc::now())
    }

    /// Most recently appended entry no older than `max_age` at `now`.
    pub fn latest_within(&self, max_age: Duration, now: DateTime<Utc>) -> Option<NarrativeScore> {
        let cutoff = self.cutoff(max_age, now);
        self.read()
            .iter()
            .rev()
            .find(|s| s.timestamp >= cutoff)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Never earlier than the retention floor, whatever the window.
    fn cutoff(&self, window: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = now - self.retention;
        now.checked_sub_signed(window)
            .map_or(floor, |c| c.max(floor))
    }

    fn persist(&self, entries: &[NarrativeScore]) -> Option<StoreError> {
        let path = self.path.as_deref()?;
        match persist::write_json_atomic(path, "score history", entries) {
            Ok(()) => None,
            Err(e) => {
                warn!(target: "history", error = %e, "score history write failed; entry kept in memory only");
                counter!(STORE_WRITE_ERRORS_TOTAL, "store" => "history").increment(1);
                Some(e)
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<NarrativeScore>> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<NarrativeScore>> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

fn prune(entries: &mut Vec<NarrativeScore>, cutoff: DateTime<Utc>) -> usize {
    let before = entries.len();
    entries.retain(|s| s.timestamp >= cutoff);
    before - entries.len()
}
