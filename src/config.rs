//! Configuration surface
//!
//! Options recognized by the cache layer and the decorators. Every field is
//! optional; the defaults reproduce the out-of-the-box behavior. The struct
//! deserializes from the camelCase JSON shape callers typically keep in
//! their tooling config.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

/// Options accepted by [`crate::CacheEngine::init`] and the CDN decorators.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheOptions {
    /// Backend configuration forwarded to the CDN. Used only for
    /// fingerprinting: the whole cache is invalidated when this differs
    /// structurally from the value recorded by the previous run.
    pub pass_to_cdn: Option<Value>,

    /// Where to keep the backing cache file. May name the file itself or
    /// its directory; the file name is always normalized to `cache.json`.
    /// Falls back to the user cache directory when absent.
    pub cache_location: Option<PathBuf>,

    /// Base directory the location hash is computed relative to, so the
    /// backing file can be shared between checkouts living at different
    /// absolute paths. Defaults to the current directory.
    pub location_root: Option<PathBuf>,

    /// Maximum number of files per backend call in [`crate::ParallelCdn`].
    /// Defaults to 10.
    pub slice_limit: Option<usize>,
}
