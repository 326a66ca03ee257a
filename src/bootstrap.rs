// src/bootstrap.rs
//! Wires config → stores → upstream sources → scorers → aggregator, and runs
//! the aggregator once or on a fixed interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::{EngineConfig, UpstreamMode};
use crate::engine::Aggregator;
use crate::history::HistoryStore;
use crate::scorers::{
    ContractsScorer, DevActivityScorer, FundingScorer, MarketAlphaScorer, NewsScorer,
    PredictionScorer, ReleaseScorer,
};
use crate::signal::NarrativeScore;
use crate::sticky::StickyStore;
use crate::upstream::{
    BreakingAwardsSource, ContractsSource, DevActivitySource, FixtureSource, FundingSource,
    HttpSource, MarketSource, PredictionSource, ReleaseSource, TtlCache,
};

/// One handle per upstream feed.
#[derive(Clone)]
pub struct Sources {
    pub dev_activity: Arc<dyn DevActivitySource>,
    pub contracts: Arc<dyn ContractsSource>,
    pub breaking_awards: Arc<dyn BreakingAwardsSource>,
    pub funding: Arc<dyn FundingSource>,
    pub market: Arc<dyn MarketSource>,
    pub prediction: Arc<dyn PredictionSource>,
    pub releases: Arc<dyn ReleaseSource>,
}

impl Sources {
    /// Every feed served by the same value.
    pub fn uniform<S>(source: Arc<S>) -> Self
    where
        S: DevActivitySource
            + ContractsSource
            + BreakingAwardsSource
            + FundingSource
            + MarketSource
            + PredictionSource
            + ReleaseSource
            + 'static,
    {
        Self {
            dev_activity: source.clone(),
            contracts: source.clone(),
            breaking_awards: source.clone(),
            funding: source.clone(),
            market: source.clone(),
            prediction: source.clone(),
            releases: source,
        }
    }
}

pub struct NarrativeRuntime {
    pub cfg: EngineConfig,
    pub history: Arc<HistoryStore>,
    pub sticky: Arc<StickyStore>,
    pub aggregator: Aggregator,
    cache: Option<Arc<TtlCache>>,
}

impl NarrativeRuntime {
    /// Build sources from `cfg.upstream` and open the stores under `cfg.data_dir`.
    pub fn from_config(cfg: EngineConfig) -> Result<Self> {
        let (sources, cache) = match cfg.upstream.mode {
            UpstreamMode::Fixture => {
                let mut fixtures = FixtureSource::new(&cfg.upstream.fixture_dir);
                if let Some(as_of) = cfg.upstream.fixture_as_of {
                    fixtures = fixtures.as_of(as_of);
                }
                info!(
                    dir = %cfg.upstream.fixture_dir.display(),
                    as_of = ?cfg.upstream.fixture_as_of,
                    "upstream: fixture snapshots"
                );
                (Sources::uniform(Arc::new(fixtures)), None)
            }
            UpstreamMode::Http => {
                let cache = Arc::new(TtlCache::new());
                let http = HttpSource::new(
                    cfg.upstream.http.clone(),
                    cache.clone(),
                    Duration::from_secs(cfg.upstream.cache_ttl_secs),
                )?;
                info!(ttl_secs = cfg.upstream.cache_ttl_secs, "upstream: http");
                (Sources::uniform(Arc::new(http)), Some(cache))
            }
        };
        let mut rt = Self::with_sources(cfg, sources);
        rt.cache = cache;
        Ok(rt)
    }

    pub fn with_sources(cfg: EngineConfig, sources: Sources) -> Self {
        let history = Arc::new(HistoryStore::open(cfg.history_path()));
        let sticky = Arc::new(StickyStore::open(cfg.sticky_path()));

        let mut aggregator = Aggregator::new(history.clone())
            .with_weights(cfg.weights())
            .with_sticky_cleanup(sticky.clone())
            .with_scorer(Arc::new(MarketAlphaScorer::new(
                sources.market,
                cfg.market.index_symbol.clone(),
                cfg.market.benchmark_symbol.clone(),
            )))
            .with_scorer(Arc::new(PredictionScorer::new(
                sources.prediction,
                cfg.markets.clone(),
            )))
            .with_scorer(Arc::new(ContractsScorer::new(
                sources.contracts,
                sources.breaking_awards,
                sticky.clone(),
            )))
            .with_scorer(Arc::new(DevActivityScorer::new(sources.dev_activity)))
            .with_scorer(Arc::new(FundingScorer::new(sources.funding, sticky.clone())))
            .with_scorer(Arc::new(ReleaseScorer::new(
                sources.releases,
                cfg.releases.tracked_orgs,
            )));
        if cfg.news.enabled {
            aggregator =
                aggregator.with_scorer(Arc::new(NewsScorer::new(cfg.news.baseline_score())));
        }

        info!(
            data_dir = %cfg.data_dir.display(),
            history = history.len(),
            sticky = sticky.len(),
            news = cfg.news.enabled,
            markets = cfg.markets.len(),
            "narrative runtime ready"
        );

        Self {
            cfg,
            history,
            sticky,
            aggregator,
            cache: None,
        }
    }

    pub async fn run_once(&self) -> NarrativeScore {
        if let Some(cache) = &self.cache {
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(target: "upstream", purged, "expired cache entries dropped");
            }
        }
        let out = self.aggregator.run().await;
        if !out.is_durable() {
            debug!(target: "aggregate", id = %out.value.id, "score kept in memory only");
        }
        out.value
    }

    /// Run every `interval_secs` (first run immediately) until `shutdown` resolves.
    /// `on_score` sees each record as it is produced.
    pub async fn run_scheduled<F, S>(&self, shutdown: S, mut on_score: F) -> usize
    where
        F: FnMut(&NarrativeScore),
        S: Future<Output = ()>,
    {
        let secs = self.cfg.interval_secs.max(1);
        let mut ticker = time::interval(Duration::from_secs(secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut runs = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(runs, "scheduler stopping");
                    return runs;
                }
                _ = ticker.tick() => {
                    let score = self.run_once().await;
                    runs += 1;
                    on_score(&score);
                }
            }
        }
    }
}
