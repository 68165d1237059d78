//! Persistent cache store
//!
//! The backing file is a single JSON object: cache keys map to upload-result
//! URLs, plus one reserved key holding the configuration fingerprint
//! recorded by the run that wrote the file.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CacheError;

/// Reserved key holding the previous run's configuration fingerprint.
pub const FINGERPRINT_KEY: &str = "passToCdn";

/// In-memory image of the backing file.
///
/// `serde_json` is built with `preserve_order`, so iteration follows
/// insertion order. The suffix/prefix key scans in the engine rely on this
/// for their first-match tie-break.
pub type CacheStore = Map<String, Value>;

/// Load the backing file at `path`, creating an empty one if absent.
///
/// An empty or whitespace-only file parses as an empty store. Malformed
/// JSON is fatal: the caller sees the parse error rather than a silently
/// reset cache.
pub fn load(path: &Path) -> Result<CacheStore, CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CacheError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    }
    if !path.exists() {
        fs::write(path, b"").map_err(|source| CacheError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "created empty cache file");
    }

    let raw = fs::read_to_string(path).map_err(|source| CacheError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    let parsed: Value =
        serde_json::from_str(raw.trim()).map_err(|source| CacheError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    match parsed {
        Value::Object(store) => {
            debug!(path = %path.display(), entries = store.len(), "cache store loaded");
            Ok(store)
        }
        _ => Err(CacheError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// Serialize the full store and overwrite the backing file.
///
/// Plain overwrite, not atomic: a crash mid-write can leave a truncated
/// file, which the next run rejects as malformed instead of misreading.
pub fn flush(path: &Path, store: &CacheStore) -> Result<(), CacheError> {
    let json = serde_json::to_string(store).map_err(|source| CacheError::Encode { source })?;
    fs::write(path, json).map_err(|source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), entries = store.len(), "cache store flushed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let store = load(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_load_empty_and_whitespace_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        fs::write(&path, "").unwrap();
        assert!(load(&path).unwrap().is_empty());

        fs::write(&path, "  \n\t ").unwrap();
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"abc123":"https://cdn/1","passToCdn":{"q":80}}"#).unwrap();

        let store = load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store["abc123"], json!("https://cdn/1"));
        assert_eq!(store[FINGERPRINT_KEY], json!({"q": 80}));
    }

    #[test]
    fn test_load_malformed_json_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, CacheError::Malformed { .. }));
        assert!(err.to_string().contains("cache.json"));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, CacheError::NotAnObject { .. }));
    }

    #[test]
    fn test_flush_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut store = Map::new();
        store.insert("zzz".to_string(), json!("https://cdn/z"));
        store.insert("aaa".to_string(), json!("https://cdn/a"));
        flush(&path, &store).unwrap();

        let reloaded = load(&path).unwrap();
        let keys: Vec<&String> = reloaded.keys().collect();
        assert_eq!(keys, ["zzz", "aaa"]);
    }

    #[test]
    fn test_flush_overwrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"stale":"https://cdn/old"}"#).unwrap();

        let mut store = Map::new();
        store.insert("fresh".to_string(), json!("https://cdn/new"));
        flush(&path, &store).unwrap();

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains_key("fresh"));
    }
}
