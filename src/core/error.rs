// error.rs: error types for feed sync, settings persistence and the asset cache.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while pulling the target list. Caught at the sync-cycle boundary.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed could not be reached.
    #[error("feed unreachable: {0}")]
    Fetch(String),

    /// The feed answered with a non-success status.
    #[error("feed returned HTTP {0}")]
    Status(u16),

    /// The payload was not a valid target list.
    #[error("malformed feed payload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings read/write failures. Never fatal: load falls back to defaults.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Offline asset cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// Network failed and nothing was cached for the url.
    #[error("no cached response for {0}")]
    Miss(String),
}
