//! # Signals & Scores
//! Value types shared by the scorers, the stores and the aggregator.
//!
//! - [`Component`]: the seven upstream categories feeding the composite.
//! - [`Signal`]: one piece of evidence attached to a run (never persisted alone).
//! - [`StickySignal`]: a large past event whose impact decays over weeks.
//! - [`NarrativeScore`]: the composite record appended to history.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// The seven component categories. Also used as the `type` of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    MarketAlpha,
    PredictionMarket,
    Contracts,
    DevActivity,
    News,
    Funding,
    ReleaseVelocity,
}

impl Component {
    /// All components in weight order (heaviest first).
    pub const ALL: [Component; 7] = [
        Component::MarketAlpha,
        Component::PredictionMarket,
        Component::Contracts,
        Component::DevActivity,
        Component::News,
        Component::Funding,
        Component::ReleaseVelocity,
    ];

    /// Stable machine name (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Component::MarketAlpha => "market_alpha",
            Component::PredictionMarket => "prediction_market",
            Component::Contracts => "contracts",
            Component::DevActivity => "dev_activity",
            Component::News => "news",
            Component::Funding => "funding",
            Component::ReleaseVelocity => "release_velocity",
        }
    }

    /// Human label for digests and signal titles.
    pub fn label(self) -> &'static str {
        match self {
            Component::MarketAlpha => "Market alpha",
            Component::PredictionMarket => "Prediction markets",
            Component::Contracts => "Government contracts",
            Component::DevActivity => "Developer activity",
            Component::News => "News sentiment",
            Component::Funding => "Funding flow",
            Component::ReleaseVelocity => "Release velocity",
        }
    }

    /// Slots this component occupies in the confidence calculation.
    pub fn presence_weight(self) -> u32 {
        match self {
            Component::MarketAlpha => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supporting evidence for a single run. `impact` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Component,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Signed, roughly −10..+10.
    pub impact: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Signal {
    /// New signal with an id derived from `(kind, title, timestamp)`.
    pub fn new(kind: Component, title: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let title = title.into();
        let id = format!(
            "{}-{}",
            kind.as_str(),
            stable_id(&[&title, &timestamp.to_rfc3339()])
        );
        Self {
            id,
            kind,
            title,
            description: String::new(),
            impact: 0.0,
            timestamp,
            source: String::new(),
            url: None,
        }
    }

    /// Explanatory signal attached to a component that produced no usable data.
    pub fn no_data(kind: Component, now: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Signal::new(kind, format!("{}: no data", kind.label()), now)
            .describe(reason)
            .impact(-1.0)
            .source("engine")
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn impact(mut self, impact: f64) -> Self {
        self.impact = if impact.is_finite() { impact } else { 0.0 };
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

/// A large discrete event kept relevant beyond its fetcher's lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickySignal {
    /// Deterministic, derived from the event itself.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Component,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Fixed at insertion.
    pub base_impact: f64,
    /// Raw magnitude, e.g. a dollar figure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// When the real-world event occurred.
    pub timestamp: DateTime<Utc>,
    /// When the engine first observed it.
    pub added_at: DateTime<Utc>,
}

impl StickySignal {
    /// Build a record whose id is derived from `kind` plus the identifying `key` parts.
    pub fn for_event(
        kind: Component,
        key: &[&str],
        title: impl Into<String>,
        base_impact: f64,
        timestamp: DateTime<Utc>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}-{}", kind.as_str(), stable_id(key)),
            kind,
            title: title.into(),
            description: String::new(),
            base_impact,
            amount: None,
            url: None,
            timestamp,
            added_at,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

/// A sticky record as seen by a query: its decayed impact and whole-day age.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSignal {
    #[serde(flatten)]
    pub record: StickySignal,
    pub decayed_impact: f64,
    pub days_ago: i64,
}

impl ActiveSignal {
    /// Render as run evidence carrying the decayed impact.
    pub fn to_signal(&self, source: &str) -> Signal {
        let age = match self.days_ago {
            d if d <= 0 => "today".to_string(),
            1 => "1 day ago".to_string(),
            d => format!("{d} days ago"),
        };
        let description = if self.record.description.is_empty() {
            format!("Sticky event from {age}")
        } else {
            format!("{} ({age})", self.record.description)
        };
        Signal::new(self.record.kind, self.record.title.clone(), self.record.timestamp)
            .with_id(self.record.id.clone())
            .describe(description)
            .impact(self.decayed_impact)
            .source(source)
            .url(self.record.url.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        })
    }
}

/// Composite record produced once per aggregation run. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeScore {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// 0–100.
    pub overall: u8,
    /// Component → 0–100.
    pub components: BTreeMap<Component, u8>,
    pub trend: Trend,
    /// 0.0–1.0.
    pub confidence: f64,
    /// Top signals by |impact|, strongest first.
    #[serde(default)]
    pub signals: Vec<Signal>,
}

impl NarrativeScore {
    pub fn component(&self, c: Component) -> u8 {
        self.components.get(&c).copied().unwrap_or(0)
    }
}

/// Short deterministic hex id from the given parts (12 hex chars of SHA-256).
pub fn stable_id(parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.trim().to_ascii_lowercase().as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Midnight UTC of a calendar date (upstream feeds report dates, not instants).
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
