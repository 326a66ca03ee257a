//! Venture funding flow over a 90-day window.
//!
//! - Rounds are capped at $500M before summing so one mega-round cannot dominate.
//! - `velocity = clamp(10, 45, 40 + 15·log2(monthlyVelocity / $400M))`
//! - `momentum ∈ [−15, +15]`: trailing-30-day run-rate vs. the prior 60 days, six bands.
//! - `recency = min(15, 4·roundsInLast30Days)`
//!
//! Rounds of $100M or more are registered as sticky signals.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{
    format_usd, materiality_impact, register_sticky, summary_impact, ComponentResult,
    ComponentScorer,
};
use crate::decay;
use crate::signal::{day_start, Component, Signal, StickySignal};
use crate::sticky::StickyStore;
use crate::upstream::{Fetched, FundingRound, FundingSource};

pub const ROUND_CAP_USD: f64 = 500e6;
pub const VELOCITY_BASELINE_USD: f64 = 400e6;
pub const STICKY_THRESHOLD_USD: f64 = 100e6;
const WINDOW_DAYS: i64 = 90;
const RECENT_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FundingFlow {
    /// Capped USD over the last 30 days.
    pub recent_usd: f64,
    /// Capped USD over days 31–90.
    pub prior_usd: f64,
    pub recent_rounds: usize,
}

impl FundingFlow {
    pub fn from_rounds(rounds: &[FundingRound], now: DateTime<Utc>) -> Self {
        let mut flow = FundingFlow::default();
        for r in rounds {
            let age = now.signed_duration_since(day_start(r.date));
            if age < Duration::zero() || age > Duration::days(WINDOW_DAYS) {
                continue;
            }
            let capped = r.amount.clamp(0.0, ROUND_CAP_USD);
            if age <= Duration::days(RECENT_DAYS) {
                flow.recent_usd += capped;
                flow.recent_rounds += 1;
            } else {
                flow.prior_usd += capped;
            }
        }
        flow
    }

    pub fn monthly_velocity(&self) -> f64 {
        (self.recent_usd + self.prior_usd) / 3.0
    }

    pub fn velocity_score(&self) -> f64 {
        let v = self.monthly_velocity();
        if v <= 0.0 {
            return 10.0;
        }
        (40.0 + 15.0 * (v / VELOCITY_BASELINE_USD).log2()).clamp(10.0, 45.0)
    }

    /// Trailing 30-day run-rate against the monthly rate of the prior 60 days.
    pub fn momentum_bonus(&self) -> f64 {
        let prior_monthly = self.prior_usd / 2.0;
        if prior_monthly <= 0.0 {
            return if self.recent_usd > 0.0 { 15.0 } else { 0.0 };
        }
        match self.recent_usd / prior_monthly {
            r if r >= 2.0 => 15.0,
            r if r >= 1.5 => 10.0,
            r if r >= 1.1 => 5.0,
            r if r >= 0.9 => 0.0,
            r if r >= 0.5 => -8.0,
            _ => -15.0,
        }
    }

    pub fn recency_bonus(&self) -> f64 {
        (4.0 * self.recent_rounds as f64).min(15.0)
    }

    pub fn raw_score(&self) -> f64 {
        self.velocity_score() + self.momentum_bonus() + self.recency_bonus()
    }
}

pub struct FundingScorer {
    source: Arc<dyn FundingSource>,
    sticky: Arc<StickyStore>,
}

impl FundingScorer {
    pub fn new(source: Arc<dyn FundingSource>, sticky: Arc<StickyStore>) -> Self {
        Self { source, sticky }
    }
}

#[async_trait]
impl ComponentScorer for FundingScorer {
    fn component(&self) -> Component {
        Component::Funding
    }

    async fn score(&self, now: DateTime<Utc>) -> ComponentResult {
        let rounds = match self.source.funding_rounds().await {
            Fetched::Ok(v) => v,
            other => {
                return ComponentResult::upstream_failed(
                    Component::Funding,
                    "funding news feed",
                    &other,
                    now,
                )
            }
        };

        let material = rounds
            .iter()
            .filter(|r| r.amount >= STICKY_THRESHOLD_USD && !decay::is_expired(day_start(r.date), now))
            .map(|r| round_sticky(r, now))
            .collect();
        register_sticky(Component::Funding, &self.sticky, material).await;

        let flow = FundingFlow::from_rounds(&rounds, now);
        let result = ComponentResult::new(Component::Funding, flow.raw_score(), Vec::new());

        let mut signals = vec![Signal::new(Component::Funding, "Funding velocity (90d)", now)
            .describe(format!(
                "{}/month capped velocity; {} in {} rounds over the last 30 days vs {} in the prior 60",
                format_usd(flow.monthly_velocity()),
                format_usd(flow.recent_usd),
                flow.recent_rounds,
                format_usd(flow.prior_usd)
            ))
            .impact(summary_impact(result.score))
            .source("Funding news")];
        signals.extend(
            self.sticky
                .active_signals_at(Some(Component::Funding), now)
                .iter()
                .map(|a| a.to_signal("Funding news")),
        );
        ComponentResult { signals, ..result }
    }
}

fn round_sticky(r: &FundingRound, now: DateTime<Utc>) -> StickySignal {
    let date = r.date.to_string();
    let amount = format!("{:.0}", r.amount);
    let title = if r.title.is_empty() {
        format!("{} raises {}", r.company, format_usd(r.amount))
    } else {
        r.title.clone()
    };
    let description = if r.source.is_empty() {
        format!("{} round", format_usd(r.amount))
    } else {
        format!("{} round reported by {}", format_usd(r.amount), r.source)
    };
    StickySignal::for_event(
        Component::Funding,
        &[&r.company, &amount, &date],
        title,
        materiality_impact(r.amount),
        day_start(r.date),
        now,
    )
    .describe(description)
    .amount(r.amount)
    .url(r.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Fetched<Vec<FundingRound>>);

    #[async_trait]
    impl FundingSource for Fixed {
        async fn funding_rounds(&self) -> Fetched<Vec<FundingRound>> {
            self.0.clone()
        }
    }

    fn round(company: &str, amount: f64, days_ago: i64, now: DateTime<Utc>) -> FundingRound {
        FundingRound {
            company: company.to_string(),
            amount,
            date: (now - Duration::days(days_ago)).date_naive(),
            source: "TechCrunch".into(),
            url: None,
            title: String::new(),
        }
    }

    #[test]
    fn mega_rounds_are_capped() {
        let now = Utc::now();
        let flow = FundingFlow::from_rounds(&[round("Figure", 2_000e6, 5, now)], now);
        assert_eq!(flow.recent_usd, ROUND_CAP_USD);
        assert_eq!(flow.recent_rounds, 1);
    }

    #[test]
    fn velocity_curve_is_clamped() {
        // $400M/month → 40
        let at_baseline = FundingFlow {
            recent_usd: 400e6,
            prior_usd: 800e6,
            recent_rounds: 0,
        };
        assert!((at_baseline.velocity_score() - 40.0).abs() < 1e-9);
        // $800M/month → 55, clamped to 45
        let hot = FundingFlow {
            recent_usd: 800e6,
            prior_usd: 1_600e6,
            recent_rounds: 0,
        };
        assert_eq!(hot.velocity_score(), 45.0);
        assert_eq!(FundingFlow::default().velocity_score(), 10.0);
    }

    #[test]
    fn momentum_bands() {
        let with = |recent: f64, prior: f64| FundingFlow {
            recent_usd: recent,
            prior_usd: prior,
            recent_rounds: 0,
        };
        assert_eq!(with(200.0, 200.0).momentum_bonus(), 15.0); // 2.0x
        assert_eq!(with(150.0, 200.0).momentum_bonus(), 10.0);
        assert_eq!(with(110.0, 200.0).momentum_bonus(), 5.0);
        assert_eq!(with(100.0, 200.0).momentum_bonus(), 0.0);
        assert_eq!(with(60.0, 200.0).momentum_bonus(), -8.0);
        assert_eq!(with(10.0, 200.0).momentum_bonus(), -15.0);
        assert_eq!(with(10.0, 0.0).momentum_bonus(), 15.0);
        assert_eq!(with(0.0, 0.0).momentum_bonus(), 0.0);
    }

    #[test]
    fn recency_bonus_caps_at_fifteen() {
        let f = FundingFlow {
            recent_rounds: 3,
            ..Default::default()
        };
        assert_eq!(f.recency_bonus(), 12.0);
        let f = FundingFlow {
            recent_rounds: 9,
            ..Default::default()
        };
        assert_eq!(f.recency_bonus(), 15.0);
    }

    #[tokio::test]
    async fn large_rounds_become_sticky_and_score_is_in_range() {
        let now = Utc::now();
        let sticky = Arc::new(StickyStore::in_memory());
        let rounds = vec![
            round("Figure", 675e6, 3, now),
            round("Skild", 300e6, 12, now),
            round("Tiny", 5e6, 20, now),
            round("Apptronik", 350e6, 50, now),
        ];
        let s = FundingScorer::new(Arc::new(Fixed(Fetched::Ok(rounds))), sticky.clone());
        let r = s.score(now).await;

        // Apptronik is already past the sticky horizon.
        assert_eq!(sticky.len(), 2);
        // recent capped: 500 + 300 + 5 = 805M; prior 350M; monthly 385M
        // velocity 40 + 15·log2(0.9625) ≈ 39.17; momentum 805/175 → +15; recency 12
        assert_eq!(r.score, 66);
        assert!(r.signals.iter().any(|x| x.title == "Figure raises $675M"));
    }

    #[tokio::test]
    async fn empty_feed_is_zero() {
        let s = FundingScorer::new(
            Arc::new(Fixed(Fetched::Empty)),
            Arc::new(StickyStore::in_memory()),
        );
        let r = s.score(Utc::now()).await;
        assert_eq!(r.score, 0);
    }
}
