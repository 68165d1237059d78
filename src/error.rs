//! Cache persistence error types
//!
//! Structured errors for the backing-file layer. Backend and transform
//! failures are not represented here; they propagate unmodified as
//! `anyhow::Error` from the collaborator that raised them.

use std::path::PathBuf;

/// Errors raised while reading or writing the backing cache file.
///
/// All of these are fatal to the run: a cache that cannot be loaded or
/// persisted must surface immediately rather than silently resetting.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to create cache file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cache file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache file {path} does not contain a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("failed to encode cache store: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}
