//! Cache engine
//!
//! Derives cache keys from (location, content), decides per-file staleness,
//! evicts superseded entries, and persists the store once per run.
//!
//! A cache key is the concatenation of a location hash (prefix) and a
//! content hash (suffix). The split key space answers two questions with one
//! scan: "has this exact file been uploaded?" (prefix and suffix match) and
//! "has this content been uploaded under some other path?" (suffix match
//! only), while either half can go stale and be evicted independently.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::cache::store::{self, CacheStore, FINGERPRINT_KEY};
use crate::config::CacheOptions;
use crate::error::CacheError;

/// Fixed name of the backing file.
const CACHE_FILE_NAME: &str = "cache.json";

/// Per-run cache state: the store image, both configuration fingerprints,
/// and the backing-file location.
///
/// Constructed once per run via [`CacheEngine::init`] and discarded at
/// process exit. The store is exclusively owned by this instance for the
/// duration of the run; concurrent runs sharing one backing file are not
/// coordinated and may overwrite each other.
pub struct CacheEngine {
    store: CacheStore,
    current_fingerprint: Value,
    previous_fingerprint: Option<Value>,
    location: PathBuf,
    hits: u64,
    misses: u64,
}

impl CacheEngine {
    /// Load the backing file and record the configuration fingerprint.
    ///
    /// The current fingerprint is buffered into the store immediately so it
    /// becomes the "previous" value on the next run; it only reaches disk
    /// at the next flush.
    pub fn init(options: &CacheOptions) -> Result<Self, CacheError> {
        let current_fingerprint = options.pass_to_cdn.clone().unwrap_or_else(|| json!({}));
        let location = resolve_location(options.cache_location.as_deref());
        let mut store = store::load(&location)?;
        let previous_fingerprint = store.get(FINGERPRINT_KEY).cloned();
        store.insert(FINGERPRINT_KEY.to_string(), current_fingerprint.clone());

        debug!(
            location = %location.display(),
            entries = store.len(),
            "cache engine ready"
        );

        Ok(Self {
            store,
            current_fingerprint,
            previous_fingerprint,
            location,
            hits: 0,
            misses: 0,
        })
    }

    /// Whether the file described by these hashes must go to the backend.
    ///
    /// Negation of the cache-hit decision. Calling this is what triggers
    /// the eviction and re-keying side effects, so call it exactly once per
    /// file per run.
    pub fn should_upload(&mut self, content_hash: &str, location_hash: &str) -> bool {
        let use_cache = self.should_use_cache(content_hash, location_hash);
        if use_cache {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        !use_cache
    }

    /// The staleness decision.
    ///
    /// A record is valid only if the backend configuration is unchanged
    /// since the run that wrote it AND some stored key carries the same
    /// content digest with a non-empty URL. On a miss, any residual entry
    /// matching either half of the would-be key is evicted so the store
    /// does not accumulate dead keys. On a hit whose key was recorded under
    /// a different location, the entry is re-keyed so a moved-but-unchanged
    /// file keeps its URL.
    fn should_use_cache(&mut self, content_hash: &str, location_hash: &str) -> bool {
        let same_option = match &self.previous_fingerprint {
            Some(previous) => *previous == self.current_fingerprint,
            None => false,
        };

        // Content-addressed lookup: first suffix match in insertion order,
        // regardless of which location it was recorded under.
        let matched = self
            .store
            .iter()
            .find(|(key, _)| key.ends_with(content_hash))
            .map(|(key, value)| (key.clone(), value.clone()));

        let valid_url = matched
            .as_ref()
            .and_then(|(_, value)| value.as_str())
            .map(|url| !url.is_empty())
            .unwrap_or(false);

        if !(same_option && valid_url) {
            trace!(
                content = content_hash,
                location = location_hash,
                same_option = same_option,
                "cache MISS"
            );
            // Two independent evictions: after a change, both a content-keyed
            // and a location-keyed residue may exist.
            self.evict_content_entry(content_hash);
            self.evict_location_entry(location_hash);
            return false;
        }

        if let Some((key, url)) = matched {
            if key.starts_with(location_hash) {
                trace!(key = %key, "cache HIT");
            } else {
                // Same content at a new location: inherit the URL under the
                // new combined key, then drop the entry recorded for the
                // old location.
                debug!(
                    old_key = %key,
                    location = location_hash,
                    "content moved, re-keying cache entry"
                );
                self.store
                    .insert(format!("{}{}", location_hash, content_hash), url);
                self.evict_content_entry(content_hash);
            }
        }
        true
    }

    /// Insert or overwrite a cache entry in memory.
    pub fn update(&mut self, key: impl Into<String>, url: impl Into<String>) {
        self.store.insert(key.into(), Value::String(url.into()));
    }

    /// Look up the URL stored under `key`.
    pub fn get_url(&self, key: &str) -> Option<&str> {
        self.store.get(key).and_then(Value::as_str)
    }

    /// Merge a partial mapping into the store and flush everything to the
    /// backing file.
    ///
    /// Called once per run, after all per-file decisions and uploads have
    /// completed. The flush covers the whole store, so eviction and
    /// re-keying side effects land together with the new pairs.
    pub fn end(&mut self, updates: CacheStore) -> Result<(), CacheError> {
        for (key, value) in updates {
            self.store.insert(key, value);
        }
        store::flush(&self.location, &self.store)?;
        debug!(
            hits = self.hits,
            misses = self.misses,
            "run complete, cache store flushed"
        );
        Ok(())
    }

    /// (hits, misses) counted by [`Self::should_upload`] during this run.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Path of the backing file.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Remove the first entry in insertion order whose key ends with the
    /// content digest. Routine housekeeping, not an error path.
    fn evict_content_entry(&mut self, content_hash: &str) {
        let stale = self
            .store
            .keys()
            .find(|key| key.ends_with(content_hash))
            .cloned();
        if let Some(key) = stale {
            debug!(key = %key, "evicting stale content-keyed entry");
            // shift_remove keeps the insertion order of the surviving keys,
            // which the first-match scans depend on
            self.store.shift_remove(&key);
        }
    }

    /// Remove the first entry in insertion order whose key starts with the
    /// location digest.
    fn evict_location_entry(&mut self, location_hash: &str) {
        let stale = self
            .store
            .keys()
            .find(|key| key.starts_with(location_hash))
            .cloned();
        if let Some(key) = stale {
            debug!(key = %key, "evicting stale location-keyed entry");
            self.store.shift_remove(&key);
        }
    }
}

/// Resolve the backing-file path, normalizing the file name to
/// [`CACHE_FILE_NAME`].
///
/// A configured location may point at the file itself or at its directory;
/// either way the file name ends up fixed, so a location that names some
/// other file is treated as a directory.
fn resolve_location(cache_location: Option<&Path>) -> PathBuf {
    let dir = match cache_location {
        Some(location) if location.file_name() == Some(OsStr::new(CACHE_FILE_NAME)) => {
            location.parent().unwrap_or(Path::new("")).to_path_buf()
        }
        Some(location) => location.to_path_buf(),
        None => dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("cdn-cache"),
    };
    dir.join(CACHE_FILE_NAME)
}
