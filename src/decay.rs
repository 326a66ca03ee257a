//! # Decay
//! Step-function decay for sticky signals, modelling news cycles rather than
//! a smooth exponential. Pure math, no I/O.
//!
//! | days ago | multiplier |
//! |---|---|
//! | ≤ 0  | 1.00 |
//! | ≤ 1  | 0.85 |
//! | ≤ 3  | 0.60 |
//! | ≤ 7  | 0.30 |
//! | ≤ 14 | 0.10 |
//! | ≤ 30 | 0.05 |
//! | > 30 | 0.00 |
//!
//! The table is a tunable policy; there is no interpolation between rows.
//!
//! Ages are whole elapsed days (`num_days`, truncating), so a record 30 days
//! and 23 hours old is still 30 days old: it keeps the 0.05 multiplier and
//! survives cleanup until it turns 31.

use chrono::{DateTime, Utc};

/// Records older than this many whole days are expired.
pub const EXPIRY_DAYS: i64 = 30;

/// `(upper bound in days, multiplier)`, checked top to bottom.
const DECAY_STEPS: [(f64, f64); 6] = [
    (0.0, 1.00),
    (1.0, 0.85),
    (3.0, 0.60),
    (7.0, 0.30),
    (14.0, 0.10),
    (30.0, 0.05),
];

/// Multiplier in [0,1] for an event `days_ago` old. Non-increasing.
pub fn decay(days_ago: f64) -> f64 {
    DECAY_STEPS
        .iter()
        .find(|(limit, _)| days_ago <= *limit)
        .map(|(_, m)| *m)
        .unwrap_or(0.0)
}

/// `base_impact * decay(days_ago)`.
pub fn decayed_impact(base_impact: f64, days_ago: f64) -> f64 {
    base_impact * decay(days_ago)
}

/// Whole days elapsed from `ts` to `now` (negative for future events).
pub fn days_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(ts).num_days()
}

/// True once an event is past the expiry horizon.
pub fn is_expired(ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    days_ago(ts, now) > EXPIRY_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn table_boundaries() {
        assert_eq!(decay(-2.0), 1.0);
        assert_eq!(decay(0.0), 1.0);
        assert_eq!(decay(1.0), 0.85);
        assert_eq!(decay(2.0), 0.60);
        assert_eq!(decay(3.0), 0.60);
        assert_eq!(decay(5.0), 0.30);
        assert_eq!(decay(10.0), 0.10);
        assert_eq!(decay(14.0), 0.10);
        assert_eq!(decay(30.0), 0.05);
        assert_eq!(decay(31.0), 0.0);
        assert_eq!(decay(400.0), 0.0);
    }

    #[test]
    fn no_interpolation_inside_buckets() {
        assert_eq!(decay(3.5), decay(7.0));
        assert_eq!(decay(0.5), 0.85);
    }

    #[test]
    fn non_increasing() {
        let mut prev = decay(-1.0);
        let mut d = -1.0;
        while d <= 40.0 {
            let m = decay(d);
            assert!(m <= prev, "decay rose at {d}: {m} > {prev}");
            assert!((0.0..=1.0).contains(&m));
            prev = m;
            d += 0.25;
        }
    }

    #[test]
    fn decayed_impact_examples() {
        assert!((decayed_impact(5.0, 10.0) - 0.5).abs() < 1e-12);
        assert_eq!(decayed_impact(5.0, 31.0), 0.0);
        assert_eq!(decayed_impact(3.0, 0.0), 3.0);
    }

    #[test]
    fn nan_age_decays_to_zero() {
        assert_eq!(decay(f64::NAN), 0.0);
    }

    #[test]
    fn whole_day_age_and_expiry() {
        let now = Utc::now();
        assert_eq!(days_ago(now - Duration::hours(23), now), 0);
        assert_eq!(days_ago(now - Duration::hours(49), now), 2);
        assert_eq!(days_ago(now + Duration::days(2), now), -2);
        assert!(!is_expired(now - Duration::days(30) - Duration::hours(20), now));
        assert!(is_expired(now - Duration::days(31), now));
    }
}
