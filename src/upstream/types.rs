// src/upstream/types.rs
//! Typed payloads for each upstream feed, the tagged [`Fetched`] result, and
//! the per-feed source traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of one upstream fetch. Scorers must handle every variant, which is
/// what makes zero-on-failure a property of the types rather than a convention.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Ok(T),
    /// The fetch succeeded but carried nothing.
    Empty,
    /// The upstream answered with something that does not parse as `T`.
    Malformed(String),
    /// Transport failure, missing file, non-success status.
    Unavailable(String),
}

impl<T> Fetched<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Fetched::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Fetched::Ok(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Ok(v) => Fetched::Ok(f(v)),
            Fetched::Empty => Fetched::Empty,
            Fetched::Malformed(r) => Fetched::Malformed(r),
            Fetched::Unavailable(r) => Fetched::Unavailable(r),
        }
    }

    /// Human-readable reason for a non-`Ok` outcome.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Fetched::Ok(_) => None,
            Fetched::Empty => Some("returned no records".to_string()),
            Fetched::Malformed(r) => Some(format!("malformed response: {r}")),
            Fetched::Unavailable(r) => Some(format!("unavailable: {r}")),
        }
    }
}

impl<T> Fetched<Vec<T>> {
    /// `Ok(vec![])` becomes `Empty`.
    pub fn non_empty(self) -> Self {
        match self {
            Fetched::Ok(v) if v.is_empty() => Fetched::Empty,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityTrend {
    Up,
    Down,
    #[default]
    #[serde(alias = "flat")]
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgActivity {
    pub org: String,
    #[serde(default)]
    pub weekly_commits: u64,
    #[serde(default)]
    pub monthly_commits: u64,
    #[serde(default)]
    pub stars_total: u64,
    #[serde(default)]
    pub trend: ActivityTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAward {
    pub recipient_name: String,
    pub award_amount: f64,
    #[serde(default)]
    pub description: String,
    pub award_date: NaiveDate,
}

/// Manually curated award announced ahead of the lagged official feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingAward {
    pub id: String,
    pub company: String,
    pub amount: f64,
    #[serde(default)]
    pub agency: String,
    #[serde(default)]
    pub description: String,
    pub announced_date: NaiveDate,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRound {
    pub company: String,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Market-implied probability for one prediction-market token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// 0..1. Some feeds send it as a string.
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub org: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_major: bool,
}

fn number_or_string<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }
    match Raw::deserialize(de)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[async_trait]
pub trait DevActivitySource: Send + Sync {
    async fn org_activity(&self) -> Fetched<Vec<OrgActivity>>;
}

#[async_trait]
pub trait ContractsSource: Send + Sync {
    /// Official (lagged) awards dated on or after `since`.
    async fn awards_since(&self, since: NaiveDate) -> Fetched<Vec<ContractAward>>;
}

#[async_trait]
pub trait BreakingAwardsSource: Send + Sync {
    async fn breaking_awards(&self) -> Fetched<Vec<BreakingAward>>;
}

#[async_trait]
pub trait FundingSource: Send + Sync {
    async fn funding_rounds(&self) -> Fetched<Vec<FundingRound>>;
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Daily closes for `symbol`, any order.
    async fn price_history(&self, symbol: &str) -> Fetched<Vec<PricePoint>>;
}

#[async_trait]
pub trait PredictionSource: Send + Sync {
    async fn quote(&self, token_id: &str) -> Fetched<MarketQuote>;
}

#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn releases(&self) -> Fetched<Vec<Release>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_accepts_number_or_string() {
        let a: MarketQuote = serde_json::from_str(r#"{"price": 0.42}"#).unwrap();
        let b: MarketQuote = serde_json::from_str(r#"{"price": "0.42"}"#).unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<MarketQuote>(r#"{"price": "n/a"}"#).is_err());
    }

    #[test]
    fn camel_case_payloads_parse_with_defaults() {
        let org: OrgActivity =
            serde_json::from_str(r#"{"org":"ros2","weeklyCommits":120,"trend":"up"}"#).unwrap();
        assert_eq!(org.weekly_commits, 120);
        assert_eq!(org.monthly_commits, 0);
        assert_eq!(org.trend, ActivityTrend::Up);

        let rel: Release = serde_json::from_str(
            r#"{"org":"ros2","repo":"rclcpp","version":"v3.0.0","date":"2025-05-01T10:00:00Z","isMajor":true}"#,
        )
        .unwrap();
        assert!(rel.is_major);
    }

    #[test]
    fn fetched_helpers() {
        let empty: Fetched<Vec<u8>> = Fetched::Ok(vec![]);
        assert_eq!(empty.non_empty(), Fetched::Empty);
        let f: Fetched<u8> = Fetched::Unavailable("timeout".into());
        assert_eq!(f.failure_reason().unwrap(), "unavailable: timeout");
        assert_eq!(Fetched::Ok(2).map(|x| x * 2).ok(), Some(4));
    }
}
