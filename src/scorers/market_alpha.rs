//! Market alpha: how the tracked index performs against a broad benchmark.
//!
//! `alpha_w = r_w(index) − r_w(benchmark)` for w ∈ {1, 5, 20} trading days,
//! blended `0.40·a1 + 0.35·a5 + 0.25·a20` and mapped through a piecewise
//! linear curve, then nudged by conviction (±5) and acceleration (±3).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{summary_impact, ComponentResult, ComponentScorer};
use crate::signal::{Component, Signal};
use crate::upstream::{Fetched, MarketSource, PricePoint};

pub const WINDOWS: [usize; 3] = [1, 5, 20];
const BLEND: [f64; 3] = [0.40, 0.35, 0.25];

/// Long-run benchmark drift in percent per trading day, used when the
/// benchmark feed is missing.
pub const BENCHMARK_DAILY_PCT: f64 = 0.04;

/// Per-day alphas closer than this count as equal.
const ACCEL_EPSILON: f64 = 1e-9;

/// `(weighted alpha %, score)` knots. Flat below the first knot.
const CURVE: [(f64, f64); 6] = [
    (-5.0, 5.0),
    (-2.0, 25.0),
    (-0.5, 40.0),
    (0.5, 50.0),
    (2.0, 65.0),
    (5.0, 90.0),
];

/// Map blended alpha (percent) onto 0..=100.
pub fn alpha_curve(weighted: f64) -> f64 {
    if !weighted.is_finite() {
        return if weighted > 0.0 { 100.0 } else { CURVE[0].1 };
    }
    let (x0, y0) = CURVE[0];
    if weighted <= x0 {
        return y0;
    }
    for pair in CURVE.windows(2) {
        let ((xa, ya), (xb, yb)) = (pair[0], pair[1]);
        if weighted <= xb {
            return ya + (weighted - xa) * (yb - ya) / (xb - xa);
        }
    }
    let (xl, yl) = CURVE[CURVE.len() - 1];
    (yl + (weighted - xl) * 2.0).min(100.0)
}

/// Percent returns over each window, oldest-first closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Returns {
    pub pct: [f64; 3],
    /// At least one window was extrapolated from the 1-day return.
    pub extrapolated: bool,
}

impl Returns {
    /// `None` with fewer than two usable closes.
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        let n = closes.len();
        if n < 2 {
            return None;
        }
        let last = closes[n - 1];
        let back = |w: usize| (last / closes[n - 1 - w] - 1.0) * 100.0;
        let r1 = back(1);
        let mut extrapolated = false;
        let mut pct = [0.0; 3];
        for (slot, &w) in pct.iter_mut().zip(WINDOWS.iter()) {
            *slot = if n > w {
                back(w)
            } else {
                extrapolated = true;
                r1 * w as f64
            };
        }
        Some(Self { pct, extrapolated })
    }

    pub fn historical_benchmark() -> Self {
        Self {
            pct: WINDOWS.map(|w| BENCHMARK_DAILY_PCT * w as f64),
            extrapolated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaBreakdown {
    /// a1, a5, a20 in percent.
    pub alphas: [f64; 3],
    pub weighted: f64,
    pub base: f64,
    pub conviction: f64,
    pub acceleration: f64,
}

impl AlphaBreakdown {
    pub fn compute(index: &Returns, benchmark: &Returns) -> Self {
        let alphas: [f64; 3] = std::array::from_fn(|i| index.pct[i] - benchmark.pct[i]);
        let weighted: f64 = alphas.iter().zip(BLEND.iter()).map(|(a, w)| a * w).sum();

        let conviction = if alphas.iter().all(|a| *a > 0.0) {
            5.0
        } else if alphas.iter().all(|a| *a < 0.0) {
            -5.0
        } else {
            0.0
        };

        let per_day = [alphas[0], alphas[1] / 5.0, alphas[2] / 20.0];
        let above = |x: f64, y: f64| x - y > ACCEL_EPSILON;
        let acceleration = if above(per_day[0], per_day[1]) && above(per_day[1], per_day[2]) {
            3.0
        } else if above(per_day[1], per_day[0]) && above(per_day[2], per_day[1]) {
            -3.0
        } else {
            0.0
        };

        Self {
            alphas,
            weighted,
            base: alpha_curve(weighted),
            conviction,
            acceleration,
        }
    }

    pub fn raw_score(&self) -> f64 {
        self.base + self.conviction + self.acceleration
    }
}

pub struct MarketAlphaScorer {
    source: Arc<dyn MarketSource>,
    index_symbol: String,
    benchmark_symbol: String,
}

impl MarketAlphaScorer {
    pub fn new(
        source: Arc<dyn MarketSource>,
        index_symbol: impl Into<String>,
        benchmark_symbol: impl Into<String>,
    ) -> Self {
        Self {
            source,
            index_symbol: index_symbol.into(),
            benchmark_symbol: benchmark_symbol.into(),
        }
    }
}

/// Closes sorted by date with non-positive or non-finite values dropped.
fn closes(mut points: Vec<PricePoint>) -> Vec<f64> {
    points.retain(|p| p.close.is_finite() && p.close > 0.0);
    points.sort_by_key(|p| p.date);
    points.into_iter().map(|p| p.close).collect()
}

#[async_trait]
impl ComponentScorer for MarketAlphaScorer {
    fn component(&self) -> Component {
        Component::MarketAlpha
    }

    async fn score(&self, now: DateTime<Utc>) -> ComponentResult {
        let (index, benchmark) = tokio::join!(
            self.source.price_history(&self.index_symbol),
            self.source.price_history(&self.benchmark_symbol)
        );

        let index_returns = match index {
            Fetched::Ok(points) => match Returns::from_closes(&closes(points)) {
                Some(r) => r,
                None => {
                    return ComponentResult::no_data(
                        Component::MarketAlpha,
                        now,
                        format!("{} price history has fewer than two closes", self.index_symbol),
                    )
                }
            },
            other => {
                return ComponentResult::upstream_failed(
                    Component::MarketAlpha,
                    &format!("{} price feed", self.index_symbol),
                    &other,
                    now,
                )
            }
        };

        let mut notes = Vec::new();
        if index_returns.extrapolated {
            notes.push(degraded(
                now,
                "Short index history",
                format!(
                    "{} has under {} closes; longer windows extrapolated from the 1-day return",
                    self.index_symbol,
                    WINDOWS[2] + 1
                ),
            ));
        }

        let bench_returns = match benchmark.ok().map(closes).and_then(|c| Returns::from_closes(&c)) {
            Some(r) => {
                if r.extrapolated {
                    notes.push(degraded(
                        now,
                        "Short benchmark history",
                        format!(
                            "{} longer windows extrapolated from the 1-day return",
                            self.benchmark_symbol
                        ),
                    ));
                }
                r
            }
            None => {
                notes.push(degraded(
                    now,
                    "Benchmark unavailable",
                    format!(
                        "{} missing; using historical average of {BENCHMARK_DAILY_PCT}%/day",
                        self.benchmark_symbol
                    ),
                ));
                Returns::historical_benchmark()
            }
        };

        let b = AlphaBreakdown::compute(&index_returns, &bench_returns);
        let result = ComponentResult::new(Component::MarketAlpha, b.raw_score(), Vec::new());
        let [a1, a5, a20] = b.alphas;
        let mut signals = vec![Signal::new(
            Component::MarketAlpha,
            format!("{} vs {} alpha", self.index_symbol, self.benchmark_symbol),
            now,
        )
        .describe(format!(
            "alpha 1d {a1:+.2}%, 5d {a5:+.2}%, 20d {a20:+.2}% (blended {:+.2}%); conviction {:+}, acceleration {:+}",
            b.weighted, b.conviction, b.acceleration
        ))
        .impact(summary_impact(result.score))
        .source("Market data")];
        signals.extend(notes);
        ComponentResult { signals, ..result }
    }
}

fn degraded(now: DateTime<Utc>, title: &str, description: String) -> Signal {
    Signal::new(Component::MarketAlpha, title, now)
        .describe(description)
        .impact(-0.5)
        .source("engine")
}
