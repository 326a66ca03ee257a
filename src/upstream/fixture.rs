// src/upstream/fixture.rs
//! Reads upstream snapshots from JSON files in one directory:
//!
//! | feed | file |
//! |---|---|
//! | developer activity | `dev_activity.json` |
//! | official contracts | `contracts.json` |
//! | breaking awards | `breaking_awards.json` |
//! | funding news | `funding.json` |
//! | market prices | `market_<symbol>.json` (symbol lowercased) |
//! | prediction quotes | `prediction.json` (object: token id → `{price}`) |
//! | releases | `releases.json` |
//!
//! With an `as_of` date, every dated record is shifted forward by the days
//! between `as_of` and today, so a static snapshot reads as current.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::de::DeserializeOwned;

use super::types::*;

#[derive(Debug, Clone)]
pub struct FixtureSource {
    dir: PathBuf,
    as_of: Option<NaiveDate>,
}

impl FixtureSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            as_of: None,
        }
    }

    /// Treat `date` as the day the snapshot was taken.
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn offset(&self) -> Duration {
        self.as_of
            .map_or(Duration::zero(), |d| Utc::now().date_naive() - d)
    }

    fn day(&self, d: NaiveDate) -> NaiveDate {
        d.checked_add_signed(self.offset()).unwrap_or(d)
    }

    fn instant(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        ts.checked_add_signed(self.offset()).unwrap_or(ts)
    }

    async fn read<T: DeserializeOwned>(&self, file: &str) -> Fetched<T> {
        let path = self.dir.join(file);
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) => return Fetched::Unavailable(format!("{}: {e}", path.display())),
        };
        match serde_json::from_str(&body) {
            Ok(v) => Fetched::Ok(v),
            Err(e) => Fetched::Malformed(format!("{}: {e}", path.display())),
        }
    }
}

#[async_trait]
impl DevActivitySource for FixtureSource {
    async fn org_activity(&self) -> Fetched<Vec<OrgActivity>> {
        self.read("dev_activity.json").await.non_empty()
    }
}

#[async_trait]
impl ContractsSource for FixtureSource {
    async fn awards_since(&self, since: NaiveDate) -> Fetched<Vec<ContractAward>> {
        self.read::<Vec<ContractAward>>("contracts.json")
            .await
            .map(|v| {
                v.into_iter()
                    .map(|a| ContractAward {
                        award_date: self.day(a.award_date),
                        ..a
                    })
                    .filter(|a| a.award_date >= since)
                    .collect::<Vec<_>>()
            })
            .non_empty()
    }
}

#[async_trait]
impl BreakingAwardsSource for FixtureSource {
    async fn breaking_awards(&self) -> Fetched<Vec<BreakingAward>> {
        self.read::<Vec<BreakingAward>>("breaking_awards.json")
            .await
            .map(|v| {
                v.into_iter()
                    .map(|b| BreakingAward {
                        announced_date: self.day(b.announced_date),
                        ..b
                    })
                    .collect()
            })
            .non_empty()
    }
}

#[async_trait]
impl FundingSource for FixtureSource {
    async fn funding_rounds(&self) -> Fetched<Vec<FundingRound>> {
        self.read::<Vec<FundingRound>>("funding.json")
            .await
            .map(|v| {
                v.into_iter()
                    .map(|r| FundingRound {
                        date: self.day(r.date),
                        ..r
                    })
                    .collect()
            })
            .non_empty()
    }
}

#[async_trait]
impl MarketSource for FixtureSource {
    async fn price_history(&self, symbol: &str) -> Fetched<Vec<PricePoint>> {
        let file = format!("market_{}.json", symbol.trim().to_ascii_lowercase());
        self.read::<Vec<PricePoint>>(&file)
            .await
            .map(|v| {
                v.into_iter()
                    .map(|p| PricePoint {
                        date: self.day(p.date),
                        ..p
                    })
                    .collect()
            })
            .non_empty()
    }
}

#[async_trait]
impl PredictionSource for FixtureSource {
    async fn quote(&self, token_id: &str) -> Fetched<MarketQuote> {
        match self.read::<HashMap<String, MarketQuote>>("prediction.json").await {
            Fetched::Ok(mut quotes) => match quotes.remove(token_id) {
                Some(q) => Fetched::Ok(q),
                None => Fetched::Unavailable(format!("no quote for token {token_id}")),
            },
            Fetched::Empty => Fetched::Empty,
            Fetched::Malformed(r) => Fetched::Malformed(r),
            Fetched::Unavailable(r) => Fetched::Unavailable(r),
        }
    }
}

#[async_trait]
impl ReleaseSource for FixtureSource {
    async fn releases(&self) -> Fetched<Vec<Release>> {
        self.read::<Vec<Release>>("releases.json")
            .await
            .map(|v| {
                v.into_iter()
                    .map(|r| Release {
                        date: self.instant(r.date),
                        ..r
                    })
                    .collect()
            })
            .non_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn missing_bad_and_empty_files_map_to_variants() {
        let dir = tempfile::tempdir().unwrap();
        let src = FixtureSource::new(dir.path());

        assert!(matches!(src.org_activity().await, Fetched::Unavailable(_)));

        fs::write(dir.path().join("dev_activity.json"), "{not json").unwrap();
        assert!(matches!(src.org_activity().await, Fetched::Malformed(_)));

        fs::write(dir.path().join("dev_activity.json"), "[]").unwrap();
        assert_eq!(src.org_activity().await, Fetched::Empty);
    }

    #[tokio::test]
    async fn contracts_are_filtered_by_date() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("contracts.json"),
            r#"[
              {"recipientName":"A","awardAmount":1e6,"awardDate":"2025-01-05"},
              {"recipientName":"B","awardAmount":2e6,"awardDate":"2025-02-05"}
            ]"#,
        )
        .unwrap();
        let src = FixtureSource::new(dir.path());
        let since = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let got = src.awards_since(since).await.ok().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].recipient_name, "B");

        let later = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(src.awards_since(later).await, Fetched::Empty);
    }

    #[tokio::test]
    async fn prediction_quotes_by_token() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("prediction.json"),
            r#"{"tok-a": {"price": "0.61"}, "tok-b": {"price": 0.2}}"#,
        )
        .unwrap();
        let src = FixtureSource::new(dir.path());
        assert_eq!(src.quote("tok-a").await.ok().unwrap().price, 0.61);
        assert!(matches!(src.quote("tok-z").await, Fetched::Unavailable(_)));
    }

    #[tokio::test]
    async fn market_file_name_is_lowercased_symbol() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("market_botz.json"),
            r#"[{"date":"2025-01-02","close":30.5}]"#,
        )
        .unwrap();
        let src = FixtureSource::new(dir.path());
        assert_eq!(src.price_history("BOTZ").await.ok().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn as_of_shifts_snapshot_dates_to_today() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("funding.json"),
            r#"[{"company":"Figure","amount":6.75e8,"date":"2025-06-04"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("contracts.json"),
            r#"[{"recipientName":"A","awardAmount":1e6,"awardDate":"2025-06-09"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("releases.json"),
            r#"[{"org":"ros2","date":"2025-06-08T12:00:00Z"}]"#,
        )
        .unwrap();

        let today = Utc::now().date_naive();
        let src = FixtureSource::new(dir.path()).as_of(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());

        let rounds = src.funding_rounds().await.ok().unwrap();
        assert_eq!(rounds[0].date, today - Duration::days(5));

        let awards = src.awards_since(today - Duration::days(30)).await.ok().unwrap();
        assert_eq!(awards.len(), 1);
        assert_eq!(awards[0].award_date, today);

        let releases = src.releases().await.ok().unwrap();
        assert_eq!(releases[0].date.date_naive(), today - Duration::days(1));

        // Without an anchor the dates are read as written.
        let raw = FixtureSource::new(dir.path());
        assert_eq!(
            raw.funding_rounds().await.ok().unwrap()[0].date,
            NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
        );
    }
}
