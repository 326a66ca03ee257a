// src/upstream/mod.rs
//! Narrow interfaces to the upstream fetchers. Everything the scorers consume
//! arrives as a typed [`Fetched`] value.

pub mod cache;
pub mod fixture;
pub mod http;
pub mod types;

pub use cache::{Cache, NoCache, TtlCache};
pub use fixture::FixtureSource;
pub use http::{HttpEndpoints, HttpSource};
pub use types::*;
