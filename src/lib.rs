//! Content-addressed cache in front of CDN-style file upload backends
//!
//! Wraps an arbitrary upload backend so that files whose content and logical
//! location are unchanged since the previous run are answered from a local
//! JSON-backed cache instead of being uploaded again. Also ships the two
//! thin decorators commonly stacked around the backend: chunked uploads and
//! pre-upload content transforms.

pub mod cache;
pub mod cdn;
pub mod config;
pub mod error;
pub mod hash;
pub mod io;

pub use cache::{CacheEngine, CacheStore, FINGERPRINT_KEY};
pub use cdn::{CachedCdn, Cdn, ParallelCdn, Transform, TransformCdn, UploadResult};
pub use config::CacheOptions;
pub use error::CacheError;
