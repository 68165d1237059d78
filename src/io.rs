//! Text file I/O helpers
//!
//! Thin async wrappers that attach the offending path to read/write
//! failures. File content is assumed to be UTF-8 text.

use std::path::Path;

use anyhow::{Context, Result};

/// Read a file as UTF-8 text.
pub async fn read(location: &Path) -> Result<String> {
    tokio::fs::read_to_string(location)
        .await
        .with_context(|| format!("failed to read {}", location.display()))
}

/// Overwrite a file with the given text content.
pub async fn write(location: &Path, content: &str) -> Result<()> {
    tokio::fs::write(location, content)
        .await
        .with_context(|| format!("failed to write {}", location.display()))
}
