//! Plain-text briefing for one composite record.

use std::fmt::Write as _;

use crate::signal::{NarrativeScore, Trend};
use crate::weights::Weights;

/// Overall line, per-component breakdown in weight order, then top signals.
pub fn render(score: &NarrativeScore, weights: &Weights) -> String {
    let mut out = String::new();
    let arrow = match score.trend {
        Trend::Up => "▲",
        Trend::Down => "▼",
        Trend::Stable => "▶",
    };
    let _ = writeln!(
        out,
        "Robotics narrative strength: {}/100 {arrow} {} (confidence {:.0}%)",
        score.overall,
        score.trend,
        score.confidence * 100.0
    );
    let _ = writeln!(out, "As of {}", score.timestamp.format("%Y-%m-%d %H:%M UTC"));
    out.push('\n');

    for (c, w) in weights.iter() {
        let value = score.component(c);
        let note = if value == 0 { "  (no data)" } else { "" };
        let _ = writeln!(
            out,
            "  {:<22} {:>3}  x{:.2}{note}",
            c.label(),
            value,
            w
        );
    }

    if !score.signals.is_empty() {
        out.push_str("\nTop signals:\n");
        for s in &score.signals {
            let _ = write!(out, "  {:+.1}  {}", s.impact, s.title);
            if !s.description.is_empty() {
                let _ = write!(out, " · {}", s.description);
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Component, Signal};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    #[test]
    fn renders_breakdown_and_signals() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).unwrap();
        let mut components = BTreeMap::new();
        components.insert(Component::MarketAlpha, 73);
        components.insert(Component::Funding, 66);
        let score = NarrativeScore {
            id: "x".into(),
            timestamp: ts,
            overall: 29,
            components,
            trend: Trend::Up,
            confidence: 0.25,
            signals: vec![Signal::new(Component::Funding, "Figure raises $675M", ts)
                .describe("round reported by TechCrunch")
                .impact(3.0)],
        };
        let text = render(&score, &Weights::default());

        assert!(text.starts_with("Robotics narrative strength: 29/100 ▲ up (confidence 25%)"));
        assert!(text.contains("As of 2025-06-02 14:00 UTC"));
        let market = text.find("Market alpha").unwrap();
        let releases = text.find("Release velocity").unwrap();
        assert!(market < releases);
        assert!(text.contains("(no data)"));
        assert!(text.contains("+3.0  Figure raises $675M · round reported by TechCrunch"));
    }
}
