//! Persistence errors. None of these are fatal to producing a score: reads
//! fall back to an empty collection and writes keep the in-memory change.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("writing {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a store mutation.
///
/// `value` reflects the in-memory change, which stands for the rest of the
/// process lifetime. `warning` is set when the change could not be persisted.
#[derive(Debug)]
pub struct StoreWrite<T> {
    pub value: T,
    pub warning: Option<StoreError>,
}

impl<T> StoreWrite<T> {
    pub fn durable(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn is_durable(&self) -> bool {
        self.warning.is_none()
    }
}
