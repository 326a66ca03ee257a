//! Release velocity over the trailing 30 days.
//!
//! `30·ln(1 + releases/5) + min(30, 10·majorReleases) + 20·(uniqueOrgsReleasing / totalTrackedOrgs)`

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{summary_impact, ComponentResult, ComponentScorer};
use crate::signal::{Component, Signal};
use crate::upstream::{Fetched, Release, ReleaseSource};

pub const LOOKBACK_DAYS: i64 = 30;
const MAX_MAJOR_SIGNALS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReleaseTotals {
    pub releases: usize,
    pub major: usize,
    pub orgs_releasing: usize,
    pub tracked_orgs: usize,
}

impl ReleaseTotals {
    /// `tracked_orgs == 0` falls back to the orgs present in `recent`.
    pub fn from_releases(recent: &[&Release], tracked_orgs: usize) -> Self {
        let orgs: BTreeSet<String> = recent.iter().map(|r| r.org.to_lowercase()).collect();
        Self {
            releases: recent.len(),
            major: recent.iter().filter(|r| r.is_major).count(),
            orgs_releasing: orgs.len(),
            tracked_orgs: if tracked_orgs == 0 {
                orgs.len()
            } else {
                tracked_orgs
            },
        }
    }

    pub fn raw_score(&self) -> f64 {
        let volume = 30.0 * (1.0 + self.releases as f64 / 5.0).ln();
        let major = (10.0 * self.major as f64).min(30.0);
        let breadth = if self.tracked_orgs == 0 {
            0.0
        } else {
            20.0 * (self.orgs_releasing as f64 / self.tracked_orgs as f64).min(1.0)
        };
        volume + major + breadth
    }
}

pub struct ReleaseScorer {
    source: Arc<dyn ReleaseSource>,
    tracked_orgs: usize,
}

impl ReleaseScorer {
    pub fn new(source: Arc<dyn ReleaseSource>, tracked_orgs: usize) -> Self {
        Self {
            source,
            tracked_orgs,
        }
    }
}

#[async_trait]
impl ComponentScorer for ReleaseScorer {
    fn component(&self) -> Component {
        Component::ReleaseVelocity
    }

    async fn score(&self, now: DateTime<Utc>) -> ComponentResult {
        let all = match self.source.releases().await {
            Fetched::Ok(v) => v,
            other => {
                return ComponentResult::upstream_failed(
                    Component::ReleaseVelocity,
                    "release feed",
                    &other,
                    now,
                )
            }
        };

        let since = now - Duration::days(LOOKBACK_DAYS);
        let mut recent: Vec<&Release> = all.iter().filter(|r| r.date >= since && r.date <= now).collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));

        let totals = ReleaseTotals::from_releases(&recent, self.tracked_orgs);
        let result = ComponentResult::new(Component::ReleaseVelocity, totals.raw_score(), Vec::new());

        let mut signals = vec![Signal::new(Component::ReleaseVelocity, "Releases (30d)", now)
            .describe(format!(
                "{} releases ({} major) from {} of {} tracked orgs",
                totals.releases, totals.major, totals.orgs_releasing, totals.tracked_orgs
            ))
            .impact(summary_impact(result.score))
            .source("GitHub")];
        signals.extend(
            recent
                .iter()
                .filter(|r| r.is_major)
                .take(MAX_MAJOR_SIGNALS)
                .map(|r| major_signal(r)),
        );
        ComponentResult { signals, ..result }
    }
}

fn major_signal(r: &Release) -> Signal {
    let what = if r.repo.is_empty() {
        r.org.clone()
    } else {
        format!("{}/{}", r.org, r.repo)
    };
    let title = if r.version.is_empty() {
        format!("{what} major release")
    } else {
        format!("{what} {}", r.version)
    };
    let description = if r.name.is_empty() {
        r.notes.chars().take(200).collect()
    } else {
        r.name.clone()
    };
    Signal::new(Component::ReleaseVelocity, title, r.date)
        .describe(description)
        .impact(2.0)
        .source("GitHub")
        .url(r.url.clone())
}
