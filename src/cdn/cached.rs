//! Cached upload orchestrator
//!
//! Wraps a backend with the cache engine: a batch is partitioned into files
//! that need the backend and files whose URL is already known, the backend
//! is invoked at most once per batch, and new pairs are committed in a
//! single flush at the end of the run.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEngine, CacheStore};
use crate::cdn::{Cdn, Transform, UploadResult};
use crate::config::CacheOptions;
use crate::error::CacheError;
use crate::hash::hash_bytes;
use crate::io;

/// Outcome of the per-file read/transform/hash stage.
struct FileDigest {
    file: PathBuf,
    content_hash: String,
    location_hash: String,
}

/// Wraps a backend so unchanged files are answered from the cache.
///
/// The engine sits behind a mutex because its operations are synchronous;
/// the lock is never held across a suspension point.
pub struct CachedCdn<C> {
    inner: C,
    engine: Mutex<CacheEngine>,
    transform: Option<Box<dyn Transform>>,
    location_root: PathBuf,
}

impl<C: Cdn> CachedCdn<C> {
    /// Wrap `inner`, loading the cache store per `options`.
    pub fn new(inner: C, options: &CacheOptions) -> Result<Self, CacheError> {
        let engine = CacheEngine::init(options)?;
        let location_root = match &options.location_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        Ok(Self {
            inner,
            engine: Mutex::new(engine),
            transform: None,
            location_root,
        })
    }

    /// Attach a pre-upload transform, applied to each file before hashing.
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Hash the file's logical location: its path relative to the
    /// configured root, so the backing file can be shared between checkouts
    /// living at different absolute paths.
    fn location_hash(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.location_root).unwrap_or(file);
        hash_bytes(relative.to_string_lossy().as_bytes())
    }

    /// Read, optionally transform, and hash one file.
    ///
    /// A transform that changes the content rewrites the file on disk
    /// before hashing, so the cache key covers the bytes that actually get
    /// uploaded.
    async fn digest_file(&self, file: PathBuf) -> Result<FileDigest> {
        let original = io::read(&file).await?;
        let content = match &self.transform {
            Some(transform) => {
                let processed = transform
                    .process(&original, &file)
                    .await
                    .with_context(|| format!("transform failed for {}", file.display()))?;
                if processed != original {
                    debug!(file = %file.display(), "transform changed content, rewriting file");
                    io::write(&file, &processed).await?;
                }
                processed
            }
            None => original,
        };

        let location_hash = self.location_hash(&file);
        let content_hash = hash_bytes(content.as_bytes());
        Ok(FileDigest {
            file,
            content_hash,
            location_hash,
        })
    }
}

#[async_trait]
impl<C: Cdn> Cdn for CachedCdn<C> {
    async fn upload(&self, files: &[PathBuf]) -> Result<UploadResult> {
        // Read/transform/hash concurrently; the first failure aborts the
        // whole batch before anything reaches the backend or the cache.
        let digests =
            try_join_all(files.iter().cloned().map(|file| self.digest_file(file))).await?;

        let mut to_upload: Vec<PathBuf> = Vec::new();
        let mut upload_keys: Vec<(PathBuf, String)> = Vec::new();
        let mut from_cache = UploadResult::new();
        {
            let mut engine = self.engine.lock().unwrap();
            for digest in &digests {
                let key = format!("{}{}", digest.location_hash, digest.content_hash);
                if engine.should_upload(&digest.content_hash, &digest.location_hash) {
                    upload_keys.push((digest.file.clone(), key));
                    to_upload.push(digest.file.clone());
                } else if let Some(url) = engine.get_url(&key) {
                    from_cache.insert(digest.file.clone(), url.to_string());
                }
            }
        }

        debug!(
            total = files.len(),
            uploads = to_upload.len(),
            cached = from_cache.len(),
            "upload batch partitioned"
        );

        // The backend sees at most one call per batch, and none at all when
        // every file came from the cache.
        let uploaded = if to_upload.is_empty() {
            UploadResult::new()
        } else {
            self.inner.upload(&to_upload).await?
        };

        {
            let mut engine = self.engine.lock().unwrap();
            let mut new_pairs = CacheStore::new();
            for (file, key) in &upload_keys {
                if let Some(url) = uploaded.get(file) {
                    engine.update(key.clone(), url.clone());
                    new_pairs.insert(key.clone(), Value::String(url.clone()));
                }
            }
            engine.end(new_pairs)?;
        }

        let mut result = uploaded;
        result.extend(from_cache);
        Ok(result)
    }
}
