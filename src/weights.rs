//! Fixed component weights for the composite score.
//!
//! | component | weight |
//! |---|---|
//! | market alpha | 0.30 |
//! | prediction market | 0.15 |
//! | contracts | 0.15 |
//! | dev activity | 0.10 |
//! | news | 0.10 |
//! | funding | 0.10 |
//! | release velocity | 0.10 |

use crate::signal::Component;

#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    entries: Vec<(Component, f64)>,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            entries: vec![
                (Component::MarketAlpha, 0.30),
                (Component::PredictionMarket, 0.15),
                (Component::Contracts, 0.15),
                (Component::DevActivity, 0.10),
                (Component::News, 0.10),
                (Component::Funding, 0.10),
                (Component::ReleaseVelocity, 0.10),
            ],
        }
    }
}

impl Weights {
    /// Weight of `c`, zero if it is not part of the composite.
    pub fn get(&self, c: Component) -> f64 {
        self.entries
            .iter()
            .find(|(k, _)| *k == c)
            .map_or(0.0, |(_, w)| *w)
    }

    /// Drop `c` and rescale the rest so they sum to the previous total.
    pub fn without(&self, c: Component) -> Self {
        let total = self.total();
        let mut entries: Vec<(Component, f64)> =
            self.entries.iter().copied().filter(|(k, _)| *k != c).collect();
        let remaining: f64 = entries.iter().map(|(_, w)| w).sum();
        if remaining > 0.0 {
            for (_, w) in entries.iter_mut() {
                *w *= total / remaining;
            }
        }
        Self { entries }
    }

    /// Components in weight order (heaviest first, then declaration order).
    pub fn components(&self) -> impl Iterator<Item = Component> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Component, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn contains(&self, c: Component) -> bool {
        self.entries.iter().any(|(k, _)| *k == c)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Sum of presence weights of every component in the composite.
    pub fn confidence_denominator(&self) -> u32 {
        self.components().map(Component::presence_weight).sum()
    }
}
