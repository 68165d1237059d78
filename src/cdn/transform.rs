//! Pre-upload transform decorator
//!
//! Rewrites each file whose transformed content differs from what is on
//! disk, then delegates the batch to the inner backend. Standalone
//! counterpart of the transform hook on [`crate::CachedCdn`], for callers
//! that want the side effect without the cache.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::cdn::{Cdn, Transform, UploadResult};
use crate::io;

/// Wraps a backend so every file is transformed before upload.
pub struct TransformCdn<C, T> {
    inner: C,
    transform: T,
}

impl<C: Cdn, T: Transform> TransformCdn<C, T> {
    pub fn new(inner: C, transform: T) -> Self {
        Self { inner, transform }
    }

    async fn process_file(&self, file: &Path) -> Result<()> {
        let original = io::read(file).await?;
        let processed = self
            .transform
            .process(&original, file)
            .await
            .with_context(|| format!("transform failed for {}", file.display()))?;
        if processed != original {
            debug!(file = %file.display(), "transform changed content, rewriting file");
            io::write(file, &processed).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Cdn, T: Transform> Cdn for TransformCdn<C, T> {
    async fn upload(&self, files: &[PathBuf]) -> Result<UploadResult> {
        // All files are transformed before any of them is uploaded; the
        // first failure aborts the batch.
        try_join_all(files.iter().map(|file| self.process_file(file))).await?;
        self.inner.upload(files).await
    }
}
