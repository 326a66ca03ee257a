//! Narrative engine binary entrypoint.
//! Loads config, wires sources and stores, then runs the aggregator once
//! (printing the digest) or on the configured interval until Ctrl-C.
//!
//! `--once` forces a single run regardless of `interval_secs`.

use anyhow::Result;
use robotics_narrative::config::EngineConfig;
use robotics_narrative::{digest, metrics, NarrativeRuntime};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("robotics_narrative=info,narrative=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = EngineConfig::load()?;
    if let Some(addr) = cfg.metrics_addr {
        metrics::install_prometheus(addr)?;
    }

    let once = std::env::args().skip(1).any(|a| a == "--once") || cfg.interval_secs == 0;
    let rt = NarrativeRuntime::from_config(cfg)?;

    if once {
        let score = rt.run_once().await;
        print!("{}", digest::render(&score, rt.aggregator.weights()));
        return Ok(());
    }

    info!(interval_secs = rt.cfg.interval_secs, "scheduler started");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler failed: {e:#}");
            std::future::pending::<()>().await;
        }
    };
    let weights = rt.aggregator.weights().clone();
    rt.run_scheduled(shutdown, |score| {
        print!("{}", digest::render(score, &weights));
    })
    .await;
    Ok(())
}
