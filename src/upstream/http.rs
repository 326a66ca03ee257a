// src/upstream/http.rs
//! JSON-over-HTTP upstream source. Each feed is one configured URL returning
//! the typed payload directly. Templates: `{since}` (YYYY-MM-DD) for contracts,
//! `{symbol}` for market prices, `{token_id}` for prediction quotes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::cache::Cache;
use super::types::*;
use crate::metrics::UPSTREAM_ERRORS_TOTAL;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpEndpoints {
    #[serde(default)]
    pub dev_activity_url: Option<String>,
    #[serde(default)]
    pub contracts_url: Option<String>,
    #[serde(default)]
    pub breaking_awards_url: Option<String>,
    #[serde(default)]
    pub funding_url: Option<String>,
    #[serde(default)]
    pub market_url: Option<String>,
    #[serde(default)]
    pub prediction_url: Option<String>,
    #[serde(default)]
    pub releases_url: Option<String>,
}

pub struct HttpSource {
    http: reqwest::Client,
    endpoints: HttpEndpoints,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl HttpSource {
    pub fn new(endpoints: HttpEndpoints, cache: Arc<dyn Cache>, ttl: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("robotics-narrative/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building upstream http client")?;
        Ok(Self {
            http,
            endpoints,
            cache,
            ttl,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, feed: &'static str, url: &str) -> Fetched<T> {
        if let Some(hit) = self.cache.get(url) {
            if let Ok(v) = serde_json::from_value(hit) {
                debug!(target: "upstream", feed, "cache hit");
                return Fetched::Ok(v);
            }
        }

        let resp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return self.fail(feed, Fetched::Unavailable(e.to_string())),
        };
        let status = resp.status();
        if !status.is_success() {
            return self.fail(feed, Fetched::Unavailable(format!("http status {status}")));
        }
        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => return self.fail(feed, Fetched::Malformed(e.to_string())),
        };
        if body.is_null() {
            return Fetched::Empty;
        }
        match serde_json::from_value::<T>(body.clone()) {
            Ok(v) => {
                self.cache.set(url, body, self.ttl);
                Fetched::Ok(v)
            }
            Err(e) => self.fail(feed, Fetched::Malformed(e.to_string())),
        }
    }

    fn fail<T>(&self, feed: &'static str, outcome: Fetched<T>) -> Fetched<T> {
        if let Some(reason) = outcome.failure_reason() {
            warn!(target: "upstream", feed, %reason, "upstream fetch failed");
        }
        counter!(UPSTREAM_ERRORS_TOTAL, "source" => feed).increment(1);
        outcome
    }
}

fn not_configured<T>(feed: &str) -> Fetched<T> {
    Fetched::Unavailable(format!("no endpoint configured for {feed}"))
}

/// Substitute `{key}` in a URL template with the percent-encoded value.
fn fill(tpl: &str, key: &str, value: &str) -> String {
    tpl.replace(key, &urlencoding::encode(value.trim()))
}

#[async_trait]
impl DevActivitySource for HttpSource {
    async fn org_activity(&self) -> Fetched<Vec<OrgActivity>> {
        match &self.endpoints.dev_activity_url {
            Some(url) => self.get_json("dev_activity", url).await.non_empty(),
            None => not_configured("dev_activity"),
        }
    }
}

#[async_trait]
impl ContractsSource for HttpSource {
    async fn awards_since(&self, since: NaiveDate) -> Fetched<Vec<ContractAward>> {
        match &self.endpoints.contracts_url {
            Some(tpl) => {
                let url = tpl.replace("{since}", &since.format("%Y-%m-%d").to_string());
                self.get_json("contracts", &url).await.non_empty()
            }
            None => not_configured("contracts"),
        }
    }
}

#[async_trait]
impl BreakingAwardsSource for HttpSource {
    async fn breaking_awards(&self) -> Fetched<Vec<BreakingAward>> {
        // Curated feed is optional.
        match &self.endpoints.breaking_awards_url {
            Some(url) => self.get_json("breaking_awards", url).await.non_empty(),
            None => Fetched::Empty,
        }
    }
}

#[async_trait]
impl FundingSource for HttpSource {
    async fn funding_rounds(&self) -> Fetched<Vec<FundingRound>> {
        match &self.endpoints.funding_url {
            Some(url) => self.get_json("funding", url).await.non_empty(),
            None => not_configured("funding"),
        }
    }
}

#[async_trait]
impl MarketSource for HttpSource {
    async fn price_history(&self, symbol: &str) -> Fetched<Vec<PricePoint>> {
        match &self.endpoints.market_url {
            Some(tpl) => {
                let url = fill(tpl, "{symbol}", symbol);
                self.get_json("market", &url).await.non_empty()
            }
            None => not_configured("market"),
        }
    }
}

#[async_trait]
impl PredictionSource for HttpSource {
    async fn quote(&self, token_id: &str) -> Fetched<MarketQuote> {
        match &self.endpoints.prediction_url {
            Some(tpl) => {
                let url = fill(tpl, "{token_id}", token_id);
                self.get_json("prediction", &url).await
            }
            None => not_configured("prediction"),
        }
    }
}

#[async_trait]
impl ReleaseSource for HttpSource {
    async fn releases(&self) -> Fetched<Vec<Release>> {
        match &self.endpoints.releases_url {
            Some(url) => self.get_json("releases", url).await.non_empty(),
            None => not_configured("releases"),
        }
    }
}
