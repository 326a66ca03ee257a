// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod bootstrap;
pub mod config;
pub mod decay;
pub mod digest;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
mod persist;
pub mod scorers;
pub mod signal;
pub mod sticky;
pub mod upstream;
pub mod weights;

// ---- Re-exports for stable public API ----
pub use crate::bootstrap::{NarrativeRuntime, Sources};
pub use crate::config::EngineConfig;
pub use crate::engine::Aggregator;
pub use crate::error::{StoreError, StoreWrite};
pub use crate::history::HistoryStore;
pub use crate::signal::{ActiveSignal, Component, NarrativeScore, Signal, StickySignal, Trend};
pub use crate::sticky::StickyStore;
pub use crate::weights::Weights;
