//! The storage seam: everything the resolver knows about remote stores.
//!
//! Backends expose bucket and object listing plus public-URL
//! construction behind the [`StorageBackend`] trait; the resolver never
//! talks to a concrete service directly. [`S3Backend`] is the stock
//! implementation for S3-compatible endpoints.

pub mod s3;

pub use s3::S3Backend;

use async_trait::async_trait;
use thiserror::Error;

/// Error taxonomy for storage backend calls.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The bucket or object does not exist. Phase-1 probing treats this
    /// as a miss and moves on.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend could not be reached or refused the call.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    /// The backend answered with something uninterpretable.
    #[error("unexpected backend response: {0}")]
    Malformed(String),
}

/// A bucket known to the backend.
#[derive(Debug, Clone)]
pub struct BucketInfo {
    pub name: String,
    pub created_at: Option<String>,
}

/// An object directly under the listed folder, named relative to it.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<String>,
    /// Declared content type, when the backend carries one in listings
    pub content_type: Option<String>,
}

/// Result of listing one folder level of a bucket.
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    /// Sub-folder names (with trailing `/`), relative to the listed folder
    pub prefixes: Vec<String>,
    /// Objects directly under the listed folder
    pub objects: Vec<ObjectEntry>,
}

impl ObjectListing {
    /// True when the listing saw neither objects nor sub-folders.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.objects.is_empty()
    }
}

/// Listing order. S3-compatible backends list names ascending natively;
/// descending order is applied to the fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    NameAsc,
    NameDesc,
}

/// Bounds and ordering for a single listing call (one page, no
/// continuation).
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub limit: usize,
    pub sort: SortBy,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            limit: 1000,
            sort: SortBy::NameAsc,
        }
    }
}

impl ListOptions {
    /// Cheapest possible existence probe: one entry, native order.
    pub fn probe() -> Self {
        ListOptions {
            limit: 1,
            ..Default::default()
        }
    }
}

/// Interface to a remote object store.
///
/// Implementations do plain request/response translation and never
/// retry; backoff policy lives with the resolver and its cache.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Provider label attached to the URLs this backend produces.
    fn name(&self) -> &str;

    /// List every bucket the backend exposes.
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError>;

    /// List the entries directly under `folder` in `bucket`.
    ///
    /// An existing bucket with nothing under `folder` yields an empty
    /// listing, not an error. A missing bucket is `NotFound`.
    async fn list_objects(
        &self,
        bucket: &str,
        folder: &str,
        options: ListOptions,
    ) -> Result<ObjectListing, StorageError>;

    /// Public URL for an object, built without checking it exists.
    fn object_url(&self, bucket: &str, file: &str) -> String;

    /// Public URL for an object, verified against the backend.
    async fn public_url(&self, bucket: &str, file: &str) -> Result<String, StorageError>;
}

/// Configuration for constructing a storage backend.
///
/// Consumed only at construction; the resolver and scorer never see
/// credentials or endpoints.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Custom S3-compatible endpoint URL
    pub endpoint_url: Option<String>,
    /// Region override (otherwise the SDK default chain decides)
    pub region: Option<String>,
    /// Path-style addressing, required by most non-AWS endpoints
    pub force_path_style: bool,
    /// Skip credentials entirely for public/anonymous access
    pub anonymous: bool,
    /// Base URL for public object links, e.g. a CDN root
    pub public_base_url: Option<String>,
    /// Provider label attached to backend URLs in candidate alternates
    pub provider_name: Option<String>,
}

impl BackendConfig {
    /// Read configuration from `SHELFMARK_*` environment variables.
    pub fn from_env() -> Self {
        BackendConfig {
            endpoint_url: env_string("SHELFMARK_ENDPOINT"),
            region: env_string("SHELFMARK_REGION"),
            force_path_style: env_flag("SHELFMARK_PATH_STYLE"),
            anonymous: env_flag("SHELFMARK_ANONYMOUS"),
            public_base_url: env_string("SHELFMARK_PUBLIC_URL"),
            provider_name: env_string("SHELFMARK_PROVIDER"),
        }
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    parse_flag(std::env::var(key).ok().as_deref())
}

fn parse_flag(value: Option<&str>) -> bool {
    match value {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_options_defaults() {
        let options = ListOptions::default();
        assert_eq!(options.limit, 1000);
        assert_eq!(options.sort, SortBy::NameAsc);

        let probe = ListOptions::probe();
        assert_eq!(probe.limit, 1);
        assert_eq!(probe.sort, SortBy::NameAsc);
    }

    #[test]
    fn test_listing_is_empty() {
        assert!(ObjectListing::default().is_empty());

        let with_prefix = ObjectListing {
            prefixes: vec!["archive/".to_string()],
            objects: Vec::new(),
        };
        assert!(!with_prefix.is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some("YES")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("off")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_error_messages() {
        let err = StorageError::NotFound("bucket 'docs'".to_string());
        assert_eq!(err.to_string(), "not found: bucket 'docs'");

        let err = StorageError::Unavailable("connection refused".to_string());
        assert!(err.to_string().contains("unavailable"));
    }
}
