//! Chunked upload decorator
//!
//! Slices a batch into fixed-size chunks and invokes the inner backend once
//! per chunk, merging all chunk results into one mapping. Keeps any single
//! backend call bounded while the caller still sees one `upload`.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::cdn::{Cdn, UploadResult};
use crate::config::CacheOptions;

/// Default number of files per backend call.
const DEFAULT_SLICE_LIMIT: usize = 10;

/// Wraps a backend so each call carries at most `slice_limit` files.
pub struct ParallelCdn<C> {
    inner: C,
    slice_limit: usize,
}

impl<C: Cdn> ParallelCdn<C> {
    /// Wrap `inner`, chunking per `options.slice_limit` (default 10).
    pub fn new(inner: C, options: &CacheOptions) -> Self {
        // chunks() panics on zero
        let slice_limit = options.slice_limit.unwrap_or(DEFAULT_SLICE_LIMIT).max(1);
        Self { inner, slice_limit }
    }
}

#[async_trait]
impl<C: Cdn> Cdn for ParallelCdn<C> {
    async fn upload(&self, files: &[PathBuf]) -> Result<UploadResult> {
        let chunks: Vec<&[PathBuf]> = files.chunks(self.slice_limit).collect();
        debug!(
            files = files.len(),
            chunks = chunks.len(),
            limit = self.slice_limit,
            "slicing upload batch"
        );

        let results = try_join_all(chunks.into_iter().map(|chunk| self.inner.upload(chunk))).await?;

        let mut merged = UploadResult::new();
        for chunk_result in results {
            merged.extend(chunk_result);
        }
        Ok(merged)
    }
}
