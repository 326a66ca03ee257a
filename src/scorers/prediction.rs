//! Prediction-market odds: `round(100 · weighted_average(probability))` over
//! the tracked markets that returned a usable quote.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ComponentResult, ComponentScorer};
use crate::signal::{Component, Signal};
use crate::upstream::{Fetched, PredictionSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedMarket {
    pub token_id: String,
    pub label: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl TrackedMarket {
    pub fn new(token_id: impl Into<String>, label: impl Into<String>, weight: f64) -> Self {
        Self {
            token_id: token_id.into(),
            label: label.into(),
            weight,
        }
    }
}

/// Weighted mean of `(probability, weight)` pairs. Negative weights count as
/// zero; when every weight is zero the plain mean is used.
pub fn weighted_probability(quotes: &[(f64, f64)]) -> Option<f64> {
    if quotes.is_empty() {
        return None;
    }
    let total: f64 = quotes.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return Some(quotes.iter().map(|(p, _)| p).sum::<f64>() / quotes.len() as f64);
    }
    Some(quotes.iter().map(|(p, w)| p * w.max(0.0)).sum::<f64>() / total)
}

pub struct PredictionScorer {
    source: Arc<dyn PredictionSource>,
    markets: Vec<TrackedMarket>,
}

impl PredictionScorer {
    pub fn new(source: Arc<dyn PredictionSource>, markets: Vec<TrackedMarket>) -> Self {
        Self { source, markets }
    }
}

#[async_trait]
impl ComponentScorer for PredictionScorer {
    fn component(&self) -> Component {
        Component::PredictionMarket
    }

    async fn score(&self, now: DateTime<Utc>) -> ComponentResult {
        if self.markets.is_empty() {
            return ComponentResult::no_data(
                Component::PredictionMarket,
                now,
                "no prediction markets configured",
            );
        }

        let quotes = join_all(self.markets.iter().map(|m| self.source.quote(&m.token_id))).await;

        let mut used = Vec::new();
        let mut signals = Vec::new();
        for (market, quote) in self.markets.iter().zip(quotes) {
            let price = match quote {
                Fetched::Ok(q) if q.price.is_finite() && (0.0..=1.0).contains(&q.price) => q.price,
                Fetched::Ok(q) => {
                    debug!(target: "scorer", token = %market.token_id, price = q.price, "quote out of range");
                    continue;
                }
                other => {
                    debug!(
                        target: "scorer",
                        token = %market.token_id,
                        reason = other.failure_reason().unwrap_or_default(),
                        "quote skipped"
                    );
                    continue;
                }
            };
            used.push((price, market.weight));
            signals.push(
                Signal::new(Component::PredictionMarket, market.label.clone(), now)
                    .with_id(format!("prediction_market-{}", market.token_id))
                    .describe(format!("market-implied probability {:.0}%", price * 100.0))
                    .impact((price - 0.5) * 10.0)
                    .source("Prediction market"),
            );
        }

        match weighted_probability(&used) {
            Some(p) => ComponentResult::new(Component::PredictionMarket, 100.0 * p, signals),
            None => ComponentResult::no_data(
                Component::PredictionMarket,
                now,
                format!("none of {} tracked markets returned a usable quote", self.markets.len()),
            ),
        }
    }
}
