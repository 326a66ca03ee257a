// src/scorers/mod.rs
//! Component scorers. Each turns one upstream category into a 0–100 score and
//! a list of supporting signals, and never fails past its own boundary: any
//! upstream failure becomes score 0 plus a "no data" signal. Zero is strictly
//! worse than neutral on purpose, so a missing feed can never pass for flat
//! activity.

pub mod contracts;
pub mod dev_activity;
pub mod funding;
pub mod market_alpha;
pub mod news;
pub mod prediction;
pub mod releases;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::warn;

use crate::error::StoreWrite;
use crate::metrics::COMPONENT_ZERO_TOTAL;
use crate::signal::{Component, Signal, StickySignal};
use crate::sticky::StickyStore;
use crate::upstream::Fetched;

pub use contracts::ContractsScorer;
pub use dev_activity::DevActivityScorer;
pub use funding::FundingScorer;
pub use market_alpha::MarketAlphaScorer;
pub use news::NewsScorer;
pub use prediction::{PredictionScorer, TrackedMarket};
pub use releases::ReleaseScorer;

#[async_trait]
pub trait ComponentScorer: Send + Sync {
    fn component(&self) -> Component;

    /// Score as of `now`. Must always resolve.
    async fn score(&self, now: DateTime<Utc>) -> ComponentResult;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentResult {
    pub component: Component,
    /// 0–100.
    pub score: u8,
    pub signals: Vec<Signal>,
}

impl ComponentResult {
    /// Round and clamp a raw formula value.
    pub fn new(component: Component, raw: f64, signals: Vec<Signal>) -> Self {
        Self {
            component,
            score: clamp_score(raw),
            signals,
        }
    }

    /// Zero score with an explanatory signal.
    pub fn no_data(component: Component, now: DateTime<Utc>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        counter!(COMPONENT_ZERO_TOTAL, "component" => component.as_str()).increment(1);
        warn!(target: "scorer", component = component.as_str(), %reason, "component zeroed");
        Self {
            component,
            score: 0,
            signals: vec![Signal::no_data(component, now, reason)],
        }
    }

    /// Zero score for a failed upstream fetch.
    pub fn upstream_failed<T>(
        component: Component,
        feed: &str,
        outcome: &Fetched<T>,
        now: DateTime<Utc>,
    ) -> Self {
        let reason = outcome
            .failure_reason()
            .unwrap_or_else(|| "no usable records".to_string());
        Self::no_data(component, now, format!("{feed} {reason}"))
    }
}

/// Round to the nearest integer and clamp into 0..=100. NaN maps to 0.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Base impact for a large award or round, scaled by size.
pub fn materiality_impact(amount_usd: f64) -> f64 {
    match amount_usd {
        a if a >= 500e6 => 5.0,
        a if a >= 100e6 => 3.0,
        a if a >= 50e6 => 2.0,
        a if a >= 10e6 => 1.0,
        _ => 0.5,
    }
}

/// Impact for a summary signal: distance from neutral, −5..+5.
pub fn summary_impact(score: u8) -> f64 {
    (f64::from(score) - 50.0) / 10.0
}

/// `$1.3B`, `$350M`, `$900K`, `$120`.
pub fn format_usd(amount: f64) -> String {
    let a = amount.abs();
    let sign = if amount < 0.0 { "-" } else { "" };
    if a >= 1e9 {
        format!("{sign}${:.1}B", a / 1e9)
    } else if a >= 1e6 {
        format!("{sign}${:.0}M", a / 1e6)
    } else if a >= 1e3 {
        format!("{sign}${:.0}K", a / 1e3)
    } else {
        format!("{sign}${a:.0}")
    }
}

/// Log a sticky-store write that did not persist; the scorer carries on.
pub(crate) fn note_store_write<T>(component: Component, w: &StoreWrite<T>) {
    if let Some(e) = &w.warning {
        warn!(target: "scorer", component = component.as_str(), error = %e, "sticky signal not persisted");
    }
}

/// Add `signals` to the sticky store off the async workers; the file write blocks.
pub(crate) async fn register_sticky(
    component: Component,
    sticky: &Arc<StickyStore>,
    signals: Vec<StickySignal>,
) {
    if signals.is_empty() {
        return;
    }
    let store = sticky.clone();
    let writes = tokio::task::spawn_blocking(move || {
        signals.into_iter().map(|s| store.add(s)).collect::<Vec<_>>()
    })
    .await;
    match writes {
        Ok(writes) => writes.iter().for_each(|w| note_store_write(component, w)),
        Err(e) => warn!(target: "scorer", component = component.as_str(), error = %e, "sticky registration task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_and_round() {
        assert_eq!(clamp_score(71.588), 72);
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(140.2), 100);
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(f64::INFINITY), 100);
    }

    #[test]
    fn materiality_tiers() {
        assert_eq!(materiality_impact(750e6), 5.0);
        assert_eq!(materiality_impact(500e6), 5.0);
        assert_eq!(materiality_impact(120e6), 3.0);
        assert_eq!(materiality_impact(50e6), 2.0);
        assert_eq!(materiality_impact(10e6), 1.0);
        assert_eq!(materiality_impact(9.9e6), 0.5);
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(1_300_000_000.0), "$1.3B");
        assert_eq!(format_usd(350_000_000.0), "$350M");
        assert_eq!(format_usd(900_000.0), "$900K");
        assert_eq!(format_usd(12.0), "$12");
    }

    #[test]
    fn upstream_failure_is_zero_with_reason() {
        let now = Utc::now();
        let r = ComponentResult::upstream_failed::<Vec<u8>>(
            Component::Funding,
            "funding feed",
            &Fetched::Unavailable("timeout".into()),
            now,
        );
        assert_eq!(r.score, 0);
        assert_eq!(r.signals.len(), 1);
        assert!(r.signals[0].description.contains("funding feed unavailable: timeout"));
    }
}
