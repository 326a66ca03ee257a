//! Developer activity: commit velocity, ecosystem trend momentum, breadth.
//!
//! `20·ln(1 + weeklyCommits/50)` (diminishing returns on raw volume)
//! `+ 20·(up − down)/totalOrgs` (signed momentum, −20..+20)
//! `+ 20·active/totalOrgs` (breadth, 0..20)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{summary_impact, ComponentResult, ComponentScorer};
use crate::signal::{Component, Signal};
use crate::upstream::{ActivityTrend, DevActivitySource, Fetched, OrgActivity};

const MAX_ORG_SIGNALS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityTotals {
    pub weekly_commits: u64,
    pub total_orgs: usize,
    pub active_orgs: usize,
    pub up_orgs: usize,
    pub down_orgs: usize,
}

impl ActivityTotals {
    pub fn from_orgs(orgs: &[OrgActivity]) -> Self {
        let mut t = ActivityTotals {
            total_orgs: orgs.len(),
            ..Default::default()
        };
        for o in orgs {
            t.weekly_commits += o.weekly_commits;
            if o.weekly_commits > 0 {
                t.active_orgs += 1;
            }
            match o.trend {
                ActivityTrend::Up => t.up_orgs += 1,
                ActivityTrend::Down => t.down_orgs += 1,
                ActivityTrend::Stable => {}
            }
        }
        t
    }

    /// Unclamped formula value.
    pub fn raw_score(&self) -> f64 {
        if self.total_orgs == 0 {
            return 0.0;
        }
        let total = self.total_orgs as f64;
        let velocity = 20.0 * (1.0 + self.weekly_commits as f64 / 50.0).ln();
        let momentum = 20.0 * (self.up_orgs as f64 - self.down_orgs as f64) / total;
        let breadth = 20.0 * self.active_orgs as f64 / total;
        velocity + momentum + breadth
    }
}

pub struct DevActivityScorer {
    source: Arc<dyn DevActivitySource>,
}

impl DevActivityScorer {
    pub fn new(source: Arc<dyn DevActivitySource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ComponentScorer for DevActivityScorer {
    fn component(&self) -> Component {
        Component::DevActivity
    }

    async fn score(&self, now: DateTime<Utc>) -> ComponentResult {
        let orgs = match self.source.org_activity().await {
            Fetched::Ok(v) => v,
            other => {
                return ComponentResult::upstream_failed(
                    Component::DevActivity,
                    "developer activity feed",
                    &other,
                    now,
                )
            }
        };

        let totals = ActivityTotals::from_orgs(&orgs);
        let raw = totals.raw_score();
        let mut signals = org_signals(&orgs, now);
        let result = ComponentResult::new(Component::DevActivity, raw, Vec::new());
        signals.insert(
            0,
            Signal::new(Component::DevActivity, "Weekly commit velocity", now)
                .describe(format!(
                    "{} commits this week across {} orgs ({} active, {} trending up, {} down)",
                    totals.weekly_commits,
                    totals.total_orgs,
                    totals.active_orgs,
                    totals.up_orgs,
                    totals.down_orgs
                ))
                .impact(summary_impact(result.score))
                .source("GitHub"),
        );
        ComponentResult { signals, ..result }
    }
}

/// Most active orgs whose trend is moving, strongest first.
fn org_signals(orgs: &[OrgActivity], now: DateTime<Utc>) -> Vec<Signal> {
    let mut moving: Vec<&OrgActivity> = orgs
        .iter()
        .filter(|o| o.trend != ActivityTrend::Stable)
        .collect();
    moving.sort_by(|a, b| b.weekly_commits.cmp(&a.weekly_commits));
    moving
        .into_iter()
        .take(MAX_ORG_SIGNALS)
        .map(|o| {
            let magnitude = (1.0 + o.weekly_commits as f64 / 200.0).min(3.0);
            let (verb, impact) = match o.trend {
                ActivityTrend::Up => ("accelerating", magnitude),
                _ => ("slowing", -magnitude),
            };
            Signal::new(Component::DevActivity, format!("{} activity {verb}", o.org), now)
                .describe(format!(
                    "{} commits this week, {} this month, {} stars",
                    o.weekly_commits, o.monthly_commits, o.stars_total
                ))
                .impact(impact)
                .source("GitHub")
                .url(Some(format!("https://github.com/{}", o.org)))
        })
        .collect()
}
