//! # Aggregator
//! Runs every component scorer concurrently, combines their scores under the
//! fixed weights, derives trend from history and appends the composite record.
//!
//! The pure helpers ([`composite`], [`classify_trend`], [`confidence`],
//! [`top_signals`]) carry the policy and have no I/O.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreWrite;
use crate::history::HistoryStore;
use crate::metrics::{
    ensure_metrics_described, COMPONENT_SCORE, OVERALL_SCORE, RUNS_TOTAL, RUN_MS,
};
use crate::scorers::{clamp_score, ComponentResult, ComponentScorer};
use crate::signal::{Component, NarrativeScore, Signal, Trend};
use crate::sticky::StickyStore;
use crate::weights::Weights;

/// Signals kept on each composite record.
pub const TOP_SIGNALS: usize = 10;
/// Score moves of this size or less read as `stable`.
pub const TREND_DEADBAND: i16 = 2;
/// A previous score older than this is not used for trend.
pub const TREND_LOOKBACK_HOURS: i64 = 24;

pub struct Aggregator {
    scorers: Vec<Arc<dyn ComponentScorer>>,
    weights: Weights,
    history: Arc<HistoryStore>,
    sticky: Option<Arc<StickyStore>>,
}

impl Aggregator {
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self {
            scorers: Vec::new(),
            weights: Weights::default(),
            history,
            sticky: None,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ComponentScorer>) -> Self {
        self.scorers.push(scorer);
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Expire old sticky signals at the start of every run.
    pub fn with_sticky_cleanup(mut self, sticky: Arc<StickyStore>) -> Self {
        self.sticky = Some(sticky);
        self
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub async fn run(&self) -> StoreWrite<NarrativeScore> {
        self.run_at(Utc::now()).await
    }

    /// One full aggregation as of `now`. Always yields a record; a history
    /// write failure comes back as the warning.
    pub async fn run_at(&self, now: DateTime<Utc>) -> StoreWrite<NarrativeScore> {
        ensure_metrics_described();
        let started = Instant::now();

        if let Some(sticky) = self.sticky.clone() {
            match tokio::task::spawn_blocking(move || sticky.cleanup_at(now)).await {
                Ok(pruned) if pruned.value > 0 => {
                    debug!(target: "aggregate", removed = pruned.value, "sticky cleanup");
                }
                Ok(_) => {}
                Err(e) => warn!(target: "aggregate", error = %e, "sticky cleanup task failed"),
            }
        }

        let results = self.score_all(now).await;

        let scores: BTreeMap<Component, u8> =
            results.iter().map(|r| (r.component, r.score)).collect();
        let overall = composite(&scores, &self.weights);
        let previous = self
            .history
            .latest_within(Duration::hours(TREND_LOOKBACK_HOURS), now)
            .map(|s| s.overall);
        let trend = classify_trend(overall, previous);
        let confidence = confidence(&scores, &self.weights);
        let signals = top_signals(
            results.into_iter().flat_map(|r| r.signals).collect(),
            TOP_SIGNALS,
        );

        let record = NarrativeScore {
            id: Uuid::new_v4().to_string(),
            timestamp: now,
            overall,
            components: scores,
            trend,
            confidence,
            signals,
        };

        let appended = self.history.append_at(record.clone(), now);

        let ms = started.elapsed().as_millis() as f64;
        counter!(RUNS_TOTAL).increment(1);
        histogram!(RUN_MS).record(ms);
        gauge!(OVERALL_SCORE).set(f64::from(overall));
        for (c, s) in &record.components {
            gauge!(COMPONENT_SCORE, "component" => c.as_str()).set(f64::from(*s));
        }
        info!(
            target: "aggregate",
            overall,
            trend = %trend,
            confidence,
            previous = ?previous,
            pruned = appended.value,
            ms,
            "narrative score computed"
        );

        StoreWrite {
            value: record,
            warning: appended.warning,
        }
    }

    /// One result per weighted component, in weight order.
    async fn score_all(&self, now: DateTime<Utc>) -> Vec<ComponentResult> {
        let mut spawned = Vec::new();
        for scorer in &self.scorers {
            let c = scorer.component();
            if !self.weights.contains(c) {
                debug!(target: "aggregate", component = c.as_str(), "scorer not weighted; skipped");
                continue;
            }
            let scorer = Arc::clone(scorer);
            spawned.push((c, tokio::spawn(async move { scorer.score(now).await })));
        }

        let (components, handles): (Vec<Component>, Vec<_>) = spawned.into_iter().unzip();
        let mut settled: BTreeMap<Component, ComponentResult> = BTreeMap::new();
        for (c, joined) in components.into_iter().zip(join_all(handles).await) {
            let result = match joined {
                Ok(mut r) => {
                    r.component = c;
                    r
                }
                Err(e) => {
                    warn!(target: "aggregate", component = c.as_str(), error = %e, "scorer task failed");
                    ComponentResult::no_data(c, now, format!("scorer task failed: {e}"))
                }
            };
            settled.insert(c, result);
        }

        self.weights
            .components()
            .map(|c| {
                settled
                    .remove(&c)
                    .unwrap_or_else(|| ComponentResult::no_data(c, now, "no scorer configured"))
            })
            .collect()
    }
}

/// `round(Σ score_i · weight_i)`, clamped to 0..=100.
pub fn composite(scores: &BTreeMap<Component, u8>, weights: &Weights) -> u8 {
    let raw: f64 = weights
        .iter()
        .map(|(c, w)| f64::from(scores.get(&c).copied().unwrap_or(0)) * w)
        .sum();
    clamp_score(raw)
}

pub fn classify_trend(current: u8, previous: Option<u8>) -> Trend {
    let Some(prev) = previous else {
        return Trend::Stable;
    };
    let diff = i16::from(current) - i16::from(prev);
    if diff > TREND_DEADBAND {
        Trend::Up
    } else if diff < -TREND_DEADBAND {
        Trend::Down
    } else {
        Trend::Stable
    }
}

/// Share of presence slots held by nonzero components.
pub fn confidence(scores: &BTreeMap<Component, u8>, weights: &Weights) -> f64 {
    let denominator = weights.confidence_denominator();
    if denominator == 0 {
        return 0.0;
    }
    let present: u32 = weights
        .components()
        .filter(|c| scores.get(c).copied().unwrap_or(0) > 0)
        .map(Component::presence_weight)
        .sum();
    f64::from(present) / f64::from(denominator)
}

/// Strongest `n` signals by |impact|. Ties keep their original order.
pub fn top_signals(mut signals: Vec<Signal>, n: usize) -> Vec<Signal> {
    signals.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    signals.truncate(n);
    signals
}
