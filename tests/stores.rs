// tests/stores.rs
// Durability of the sticky-signal and history stores across reopen.

use std::collections::BTreeMap;
use std::fs;

use chrono::{Duration, Utc};
use std::sync::Arc;

use robotics_narrative::{Component, HistoryStore, NarrativeScore, StickySignal, StickyStore, Trend};

fn score(overall: u8, age: Duration) -> NarrativeScore {
    NarrativeScore {
        id: format!("run-{overall}"),
        timestamp: Utc::now() - age,
        overall,
        components: BTreeMap::from([(Component::MarketAlpha, overall)]),
        trend: Trend::Stable,
        confidence: 0.25,
        signals: Vec::new(),
    }
}

#[test]
fn history_survives_reopen_and_prunes_old_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("history.json");

    let h = HistoryStore::open(&path);
    assert!(h.is_empty());
    assert!(h.append(score(61, Duration::days(2))).is_durable());
    assert!(h.append(score(64, Duration::hours(1))).is_durable());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = HistoryStore::open(&path);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.latest().unwrap().overall, 64);
    assert_eq!(reopened.query(1).len(), 1);
    assert_eq!(reopened.query(365).len(), 2);

    // A 400-day-old entry is dropped by the next append.
    let pruned = reopened.append(score(10, Duration::days(400)));
    assert_eq!(pruned.value, 1);
    assert_eq!(HistoryStore::open(&path).len(), 2);
}

#[test]
fn corrupt_files_load_empty() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.json");
    let sticky = dir.path().join("sticky_signals.json");
    fs::write(&history, "[{\"id\": truncated").unwrap();
    fs::write(&sticky, "not json at all").unwrap();

    let h = HistoryStore::open(&history);
    assert!(h.is_empty());
    let s = StickyStore::open(&sticky);
    assert!(s.is_empty());

    // The next write replaces the corrupt file with a valid one.
    assert!(h.append(score(50, Duration::zero())).is_durable());
    assert_eq!(HistoryStore::open(&history).len(), 1);
}

#[test]
fn sticky_signals_survive_reopen_and_expire() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sticky_signals.json");
    let now = Utc::now();

    let store = StickyStore::open(&path);
    let fresh = StickySignal::for_event(
        Component::Funding,
        &["Figure", "675000000", "2025-06-01"],
        "Figure raises $675M",
        5.0,
        now - Duration::days(10),
        now,
    )
    .amount(675e6);
    let stale = StickySignal::for_event(
        Component::Contracts,
        &["official", "Old Award"],
        "Old award",
        3.0,
        now - Duration::days(45),
        now - Duration::days(45),
    );
    assert!(store.add(fresh.clone()).value);
    assert!(!store.add(fresh.clone()).value);
    assert!(store.add(stale).value);
    assert_eq!(store.len(), 2);

    let reopened = StickyStore::open(&path);
    assert_eq!(reopened.len(), 2);
    let active = reopened.active_signals(None);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].record.id, fresh.id);
    // 5.0 at 10 days: 0.10 multiplier
    assert!((active[0].decayed_impact - 0.5).abs() < 1e-9);
    assert_eq!(active[0].days_ago, 10);

    let removed = reopened.cleanup();
    assert_eq!(removed.value, 1);
    assert!(removed.is_durable());
    assert_eq!(StickyStore::open(&path).len(), 1);
}

#[test]
fn write_failure_is_a_warning_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be makes the rename fail.
    let path = dir.path().join("history.json");
    fs::create_dir_all(&path).unwrap();

    let h = HistoryStore::open(&path);
    let out = h.append(score(70, Duration::zero()));
    assert!(!out.is_durable());
    // Kept in memory for the life of the process.
    assert_eq!(h.len(), 1);
    assert_eq!(h.latest().unwrap().overall, 70);
}

#[test]
fn history_drops_entries_past_retention_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let on_disk = vec![score(12, Duration::days(400)), score(58, Duration::days(3))];
    fs::write(&path, serde_json::to_vec(&on_disk).unwrap()).unwrap();

    let h = HistoryStore::open(&path);
    assert_eq!(h.len(), 1);
    assert_eq!(h.latest().unwrap().overall, 58);
    assert_eq!(h.query(i64::MAX).len(), 1);
}

#[test]
fn sticky_write_failure_keeps_the_record_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sticky_signals.json");
    fs::create_dir_all(&path).unwrap();
    let now = Utc::now();

    let store = StickyStore::open(&path);
    let award = StickySignal::for_event(
        Component::Contracts,
        &["official", "Anduril", "2025-06-01"],
        "Anduril wins $250M",
        4.0,
        now - Duration::days(2),
        now,
    );
    let out = store.add(award.clone());
    assert!(out.value);
    assert!(!out.is_durable());
    assert_eq!(store.len(), 1);

    let active = store.active_signals(Some(Component::Contracts));
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].record.id, award.id);
}

#[test]
fn concurrent_sticky_writes_leave_the_file_complete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sticky_signals.json");
    let store = Arc::new(StickyStore::open(&path));
    let now = Utc::now();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..10 {
                    let key = format!("round-{t}-{i}");
                    let s = StickySignal::for_event(
                        Component::Funding,
                        &[key.as_str()],
                        key.clone(),
                        2.0,
                        now - Duration::days(1),
                        now,
                    );
                    assert!(store.add(s).is_durable());
                    let _ = store.active_signals(None);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.len(), 40);
    assert_eq!(StickyStore::open(&path).len(), 40);
}
