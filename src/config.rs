// src/config.rs
//! Engine configuration (TOML).
//!
//! Lookup order:
//! 1) `$NARRATIVE_CONFIG_PATH` (must exist when set)
//! 2) `config/narrative.toml`
//! 3) built-in defaults
//!
//! Then `NARRATIVE_DATA_DIR`, `NARRATIVE_INTERVAL_SECS` and
//! `NARRATIVE_METRICS_ADDR` override the file.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::scorers::news::{DEFAULT_BASELINE, NEUTRAL};
use crate::scorers::TrackedMarket;
use crate::signal::Component;
use crate::upstream::HttpEndpoints;
use crate::weights::Weights;

pub const ENV_CONFIG_PATH: &str = "NARRATIVE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/narrative.toml";
pub const ENV_DATA_DIR: &str = "NARRATIVE_DATA_DIR";
pub const ENV_INTERVAL_SECS: &str = "NARRATIVE_INTERVAL_SECS";
pub const ENV_METRICS_ADDR: &str = "NARRATIVE_METRICS_ADDR";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const MAX_CACHE_TTL_SECS: u64 = 86_400;
const DEFAULT_INDEX_SYMBOL: &str = "BOTZ";
const DEFAULT_BENCHMARK_SYMBOL: &str = "SPY";

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_fixture_dir() -> PathBuf {
    PathBuf::from("fixtures")
}
fn default_true() -> bool {
    true
}
fn default_baseline() -> u32 {
    u32::from(DEFAULT_BASELINE)
}
fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_index_symbol() -> String {
    DEFAULT_INDEX_SYMBOL.to_string()
}
fn default_benchmark_symbol() -> String {
    DEFAULT_BENCHMARK_SYMBOL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Seconds between runs; 0 runs once and exits.
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub releases: ReleasesConfig,
    #[serde(default)]
    pub markets: Vec<TrackedMarket>,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    /// `false` drops the placeholder and renormalizes the other weights.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_baseline")]
    pub baseline: u32,
}

impl NewsConfig {
    pub fn baseline_score(&self) -> u8 {
        u8::try_from(self.baseline).unwrap_or(DEFAULT_BASELINE)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleasesConfig {
    /// Orgs watched for releases; 0 uses the orgs seen in the feed.
    #[serde(default)]
    pub tracked_orgs: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_index_symbol")]
    pub index_symbol: String,
    #[serde(default = "default_benchmark_symbol")]
    pub benchmark_symbol: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamMode {
    #[default]
    Fixture,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub mode: UpstreamMode,
    #[serde(default = "default_fixture_dir")]
    pub fixture_dir: PathBuf,
    /// Snapshot date of the fixtures; when set, their dates are shifted to today.
    #[serde(default)]
    pub fixture_as_of: Option<NaiveDate>,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub http: HttpEndpoints,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            baseline: default_baseline(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            index_symbol: default_index_symbol(),
            benchmark_symbol: default_benchmark_symbol(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            mode: UpstreamMode::Fixture,
            fixture_dir: default_fixture_dir(),
            fixture_as_of: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            http: HttpEndpoints::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            interval_secs: 0,
            metrics_addr: None,
            news: NewsConfig::default(),
            releases: ReleasesConfig::default(),
            markets: Vec::new(),
            market: MarketConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        let mut cfg: EngineConfig = toml::from_str(&data)
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// File per the lookup order, then env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(dir) = non_empty_var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = non_empty_var(ENV_INTERVAL_SECS) {
            self.interval_secs = v
                .parse()
                .with_context(|| format!("{ENV_INTERVAL_SECS}={v} is not a number of seconds"))?;
        }
        if let Some(v) = non_empty_var(ENV_METRICS_ADDR) {
            let addr = v
                .parse()
                .with_context(|| format!("{ENV_METRICS_ADDR}={v} is not a socket address"))?;
            self.metrics_addr = Some(addr);
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        if self.news.baseline >= u32::from(NEUTRAL) {
            self.news.baseline = default_baseline();
        }
        if self.upstream.cache_ttl_secs == 0 {
            self.upstream.cache_ttl_secs = DEFAULT_CACHE_TTL_SECS;
        }
        self.upstream.cache_ttl_secs = self.upstream.cache_ttl_secs.min(MAX_CACHE_TTL_SECS);
        if self.market.index_symbol.trim().is_empty() {
            self.market.index_symbol = default_index_symbol();
        }
        if self.market.benchmark_symbol.trim().is_empty() {
            self.market.benchmark_symbol = default_benchmark_symbol();
        }
        self.markets.retain(|m| !m.token_id.trim().is_empty());
        for m in self.markets.iter_mut() {
            if !m.weight.is_finite() || m.weight < 0.0 {
                m.weight = 1.0;
            }
        }
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    pub fn sticky_path(&self) -> PathBuf {
        self.data_dir.join("sticky_signals.json")
    }

    pub fn weights(&self) -> Weights {
        if self.news.enabled {
            Weights::default()
        } else {
            Weights::default().without(Component::News)
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
data_dir = "/var/lib/narrative"
interval_secs = 3600

[news]
enabled = false
baseline = 250

[releases]
tracked_orgs = 12

[[markets]]
token_id = "humanoid-2026"
label = "Humanoid robots sold in 2026"
weight = 2.0

[[markets]]
token_id = "optimus"
label = "Optimus ships"
weight = -3.0

[[markets]]
token_id = "  "
label = "blank"

[market]
index_symbol = ""

[upstream]
mode = "http"
cache_ttl_secs = 0

[upstream.http]
market_url = "https://prices.example.test/{symbol}"
"#;

    #[test]
    fn parses_and_sanitizes() {
        let mut cfg: EngineConfig = toml::from_str(SAMPLE).unwrap();
        cfg.sanitize();
        assert_eq!(cfg.interval_secs, 3600);
        assert!(!cfg.news.enabled);
        assert_eq!(cfg.news.baseline_score(), DEFAULT_BASELINE);
        assert_eq!(cfg.releases.tracked_orgs, 12);
        assert_eq!(cfg.markets.len(), 2);
        assert_eq!(cfg.markets[1].weight, 1.0);
        assert_eq!(cfg.market.index_symbol, "BOTZ");
        assert_eq!(cfg.market.benchmark_symbol, "SPY");
        assert_eq!(cfg.upstream.mode, UpstreamMode::Http);
        assert_eq!(cfg.upstream.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
        assert!(cfg.upstream.http.market_url.is_some());
        assert_eq!(cfg.history_path(), PathBuf::from("/var/lib/narrative/history.json"));
        assert!(!cfg.weights().contains(Component::News));
    }

    #[test]
    fn neutral_baseline_and_huge_ttl_are_reset() {
        let mut cfg: EngineConfig = toml::from_str(
            "[news]\nbaseline = 55\n\n[upstream]\ncache_ttl_secs = 9223372036854775807\n",
        )
        .unwrap();
        cfg.sanitize();
        assert_eq!(cfg.news.baseline_score(), DEFAULT_BASELINE);
        assert_eq!(cfg.upstream.cache_ttl_secs, MAX_CACHE_TTL_SECS);

        let mut low: EngineConfig = toml::from_str("[news]\nbaseline = 30\n").unwrap();
        low.sanitize();
        assert_eq!(low.news.baseline_score(), 30);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.interval_secs, 0);
        assert!(cfg.news.enabled);
        assert_eq!(cfg.upstream.mode, UpstreamMode::Fixture);
        assert_eq!(cfg.weights(), Weights::default());
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_path_then_fallbacks_then_overrides() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        for k in [ENV_CONFIG_PATH, ENV_DATA_DIR, ENV_INTERVAL_SECS, ENV_METRICS_ADDR] {
            env::remove_var(k);
        }

        // nothing on disk → defaults
        let cfg = EngineConfig::load().unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));

        // config/narrative.toml
        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_CONFIG_PATH, "interval_secs = 60\n").unwrap();
        assert_eq!(EngineConfig::load().unwrap().interval_secs, 60);

        // explicit path wins
        let custom = tmp.path().join("custom.toml");
        fs::write(&custom, "interval_secs = 900\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, &custom);
        assert_eq!(EngineConfig::load().unwrap().interval_secs, 900);

        // env overrides
        env::set_var(ENV_INTERVAL_SECS, "5");
        env::set_var(ENV_DATA_DIR, "/tmp/narr");
        env::set_var(ENV_METRICS_ADDR, "127.0.0.1:9184");
        let cfg = EngineConfig::load().unwrap();
        assert_eq!(cfg.interval_secs, 5);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/narr"));
        assert_eq!(cfg.metrics_addr, Some("127.0.0.1:9184".parse().unwrap()));

        env::set_var(ENV_INTERVAL_SECS, "soon");
        assert!(EngineConfig::load().is_err());

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(EngineConfig::load().is_err());

        for k in [ENV_CONFIG_PATH, ENV_DATA_DIR, ENV_INTERVAL_SECS, ENV_METRICS_ADDR] {
            env::remove_var(k);
        }
        env::set_current_dir(old).unwrap();
    }
}
