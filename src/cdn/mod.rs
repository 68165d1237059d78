//! Upload backend abstraction and decorators
//!
//! [`Cdn`] is the seam to the real upload backend. The decorators wrap any
//! implementation: [`CachedCdn`] answers unchanged files from the cache,
//! [`ParallelCdn`] slices batches into bounded chunks, and [`TransformCdn`]
//! rewrites file content before upload.

pub mod cached;
pub mod parallel;
pub mod transform;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

pub use cached::CachedCdn;
pub use parallel::ParallelCdn;
pub use transform::TransformCdn;

/// Upload results keyed by the file identifier the caller passed in.
pub type UploadResult = HashMap<PathBuf, String>;

/// An upload backend: takes a batch of files, returns one URL per file.
///
/// Implementations may batch or parallelize internally. Errors propagate
/// unmodified to the caller, and a failed batch commits nothing to the
/// cache.
#[async_trait]
pub trait Cdn: Send + Sync {
    async fn upload(&self, files: &[PathBuf]) -> Result<UploadResult>;
}

/// Pre-upload content transform, invoked once per file.
///
/// When the returned content differs from what was read, the file on disk
/// is rewritten before the batch reaches the backend (and, in
/// [`CachedCdn`], before hashing, so the cache key covers the content that
/// actually gets uploaded).
#[async_trait]
pub trait Transform: Send + Sync {
    async fn process(&self, content: &str, file: &Path) -> Result<String>;
}

/// Plain synchronous closures work as transforms.
#[async_trait]
impl<F> Transform for F
where
    F: Fn(&str, &Path) -> Result<String> + Send + Sync,
{
    async fn process(&self, content: &str, file: &Path) -> Result<String> {
        self(content, file)
    }
}
