//! News sentiment placeholder. There is no measured news feed; the component
//! reports a fixed baseline below neutral and says so in its only signal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ComponentResult, ComponentScorer};
use crate::signal::{Component, Signal};

pub const DEFAULT_BASELINE: u8 = 40;

/// Baselines at or above neutral would read as measured optimism.
pub const NEUTRAL: u8 = 50;

pub struct NewsScorer {
    baseline: u8,
}

impl Default for NewsScorer {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE)
    }
}

impl NewsScorer {
    /// A baseline at or above [`NEUTRAL`] falls back to [`DEFAULT_BASELINE`].
    pub fn new(baseline: u8) -> Self {
        let baseline = if baseline < NEUTRAL {
            baseline
        } else {
            DEFAULT_BASELINE
        };
        Self { baseline }
    }
}

#[async_trait]
impl ComponentScorer for NewsScorer {
    fn component(&self) -> Component {
        Component::News
    }

    async fn score(&self, now: DateTime<Utc>) -> ComponentResult {
        let signal = Signal::new(Component::News, "News sentiment estimated, not measured", now)
            .describe(format!(
                "no news sentiment feed is wired in; using a fixed baseline of {}",
                self.baseline
            ))
            .source("engine");
        ComponentResult::new(Component::News, f64::from(self.baseline), vec![signal])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_reports_baseline_and_says_so() {
        let r = NewsScorer::default().score(Utc::now()).await;
        assert_eq!(r.score, 40);
        assert_eq!(r.signals.len(), 1);
        assert_eq!(r.signals[0].impact, 0.0);
        assert!(r.signals[0].title.contains("estimated, not measured"));
    }

    #[tokio::test]
    async fn baseline_stays_below_neutral() {
        assert_eq!(NewsScorer::new(35).score(Utc::now()).await.score, 35);
        assert_eq!(NewsScorer::new(49).score(Utc::now()).await.score, 49);
        assert_eq!(NewsScorer::new(50).score(Utc::now()).await.score, 40);
        assert_eq!(NewsScorer::new(250).score(Utc::now()).await.score, 40);
    }
}
