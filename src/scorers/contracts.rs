//! Government contracts. Three sub-sources merge additively:
//!
//! 1. curated breaking awards, each registered as a sticky signal on sight;
//! 2. active (decayed) sticky signals of type `contracts`;
//! 3. the lagged official feed for the trailing 30 days.
//!
//! `30·ln(1 + totalUSD/1e7) + min(20, 20·count/10) + min(20, Σ decayedImpact·2)`
//!
//! Losing one sub-source degrades the score rather than zeroing it; only when
//! nothing at all is available does the component fall to zero.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::{
    format_usd, materiality_impact, register_sticky, summary_impact, ComponentResult,
    ComponentScorer,
};
use crate::decay;
use crate::signal::{day_start, ActiveSignal, Component, Signal, StickySignal};
use crate::sticky::StickyStore;
use crate::upstream::{BreakingAward, BreakingAwardsSource, ContractAward, ContractsSource, Fetched};

pub const LOOKBACK_DAYS: i64 = 30;
/// Awards at or above this size become sticky signals.
pub const STICKY_THRESHOLD_USD: f64 = 10e6;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContractTotals {
    pub awarded_usd: f64,
    pub count: usize,
    pub decayed_impact: f64,
}

impl ContractTotals {
    pub fn raw_score(&self) -> f64 {
        let value = 30.0 * (1.0 + self.awarded_usd.max(0.0) / 1e7).ln();
        let volume = (20.0 * self.count as f64 / 10.0).min(20.0);
        let sticky = (self.decayed_impact * 2.0).min(20.0);
        value + volume + sticky
    }
}

pub struct ContractsScorer {
    awards: Arc<dyn ContractsSource>,
    breaking: Arc<dyn BreakingAwardsSource>,
    sticky: Arc<StickyStore>,
}

impl ContractsScorer {
    pub fn new(
        awards: Arc<dyn ContractsSource>,
        breaking: Arc<dyn BreakingAwardsSource>,
        sticky: Arc<StickyStore>,
    ) -> Self {
        Self {
            awards,
            breaking,
            sticky,
        }
    }
}

#[async_trait]
impl ComponentScorer for ContractsScorer {
    fn component(&self) -> Component {
        Component::Contracts
    }

    async fn score(&self, now: DateTime<Utc>) -> ComponentResult {
        let since = now - Duration::days(LOOKBACK_DAYS);
        let (breaking, official) = tokio::join!(
            self.breaking.breaking_awards(),
            self.awards.awards_since(since.date_naive())
        );

        let mut totals = ContractTotals::default();
        let mut notes = Vec::new();
        let mut material = Vec::new();

        // (a) breaking awards
        let breaking: Vec<BreakingAward> = match breaking {
            Fetched::Ok(v) => v,
            Fetched::Empty => Vec::new(),
            other => {
                let reason = other.failure_reason().unwrap_or_default();
                warn!(target: "scorer", component = "contracts", %reason, "breaking awards skipped");
                Vec::new()
            }
        };
        for b in &breaking {
            if !decay::is_expired(day_start(b.announced_date), now) {
                material.push(breaking_sticky(b, now));
            }
            if day_start(b.announced_date) >= since {
                totals.awarded_usd += b.amount;
                totals.count += 1;
            }
        }

        // (c) official feed
        let official_ok = official.is_ok();
        let official: Vec<ContractAward> = match official {
            Fetched::Ok(v) => v,
            other => {
                notes.push(
                    Signal::new(Component::Contracts, "Official award feed degraded", now)
                        .describe(format!(
                            "official contracts feed {}; score uses breaking and sticky awards only",
                            other.failure_reason().unwrap_or_default()
                        ))
                        .impact(-0.5)
                        .source("engine"),
                );
                Vec::new()
            }
        };
        for a in official.iter().filter(|a| day_start(a.award_date) >= since) {
            totals.awarded_usd += a.award_amount;
            totals.count += 1;
            if a.award_amount >= STICKY_THRESHOLD_USD {
                material.push(award_sticky(a, now));
            }
        }

        // (b) decayed sticky awards, including any registered here
        register_sticky(Component::Contracts, &self.sticky, material).await;
        let active = self.sticky.active_signals_at(Some(Component::Contracts), now);
        totals.decayed_impact = active.iter().map(|a| a.decayed_impact).sum();

        if !official_ok && breaking.is_empty() && active.is_empty() {
            return ComponentResult::no_data(
                Component::Contracts,
                now,
                "official contracts feed failed and no breaking or sticky awards are active",
            );
        }

        let result = ComponentResult::new(Component::Contracts, totals.raw_score(), Vec::new());
        let mut signals = vec![Signal::new(Component::Contracts, "Contract awards (30d)", now)
            .describe(format!(
                "{} in {} awards; {} active sticky awards (decayed impact {:.2})",
                format_usd(totals.awarded_usd),
                totals.count,
                active.len(),
                totals.decayed_impact
            ))
            .impact(summary_impact(result.score))
            .source("USAspending")];
        signals.extend(active.iter().map(|a: &ActiveSignal| a.to_signal("Contracts")));
        signals.extend(notes);
        ComponentResult { signals, ..result }
    }
}

fn breaking_sticky(b: &BreakingAward, now: DateTime<Utc>) -> StickySignal {
    let agency = if b.agency.is_empty() {
        String::new()
    } else {
        format!(" from {}", b.agency)
    };
    StickySignal::for_event(
        Component::Contracts,
        &["breaking", &b.id],
        format!("{} wins {}{agency}", b.company, format_usd(b.amount)),
        materiality_impact(b.amount),
        day_start(b.announced_date),
        now,
    )
    .describe(b.description.clone())
    .amount(b.amount)
    .url(b.url.clone())
}

fn award_sticky(a: &ContractAward, now: DateTime<Utc>) -> StickySignal {
    let date = a.award_date.to_string();
    let amount = format!("{:.0}", a.award_amount);
    StickySignal::for_event(
        Component::Contracts,
        &["official", &a.recipient_name, &amount, &date],
        format!("{} awarded {}", a.recipient_name, format_usd(a.award_amount)),
        materiality_impact(a.award_amount),
        day_start(a.award_date),
        now,
    )
    .describe(a.description.clone())
    .amount(a.award_amount)
}
