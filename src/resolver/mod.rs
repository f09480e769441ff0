//! Two-phase fuzzy search across storage buckets.
//!
//! Phase 1 treats the caller's path components as bucket hints and stops
//! at the first bucket that produces positive-scoring matches. Phase 2 is
//! the global fallback: every bucket's root listing is scored with a
//! bounded fan-out. The resolver also owns the get-URL flow, which runs
//! all public-URL lookups through a shared [`UrlCache`].

pub mod candidate;
pub mod metrics;

pub use candidate::{FileCandidate, ProviderUrl};
pub use metrics::{MetricsSnapshot, ResolveMetrics};

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::cache::UrlCache;
use crate::score::score;
use crate::storage::{
    ListOptions, ObjectEntry, ObjectListing, StorageBackend, StorageError, env_string,
};

/// Errors surfaced by searches and the get-URL flow.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The search completed but nothing scored above zero.
    #[error("no file matched '{0}' - try a different path?")]
    NoMatch(String),
    /// A backend call failed or is being suppressed after a failure.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    /// An unexpected fault not tied to backend health.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ResolveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) | StorageError::Unavailable(msg) => {
                ResolveError::Unavailable(msg)
            }
            StorageError::Malformed(msg) => ResolveError::Internal(msg),
        }
    }
}

/// A mirror that fronts the backend, e.g. a service's own proxy route.
/// Its URL leads the candidate's alternates and becomes the canonical
/// one.
#[derive(Debug, Clone)]
pub struct UrlMirror {
    /// Provider label in candidate alternates
    pub name: String,
    /// Base URL the candidate's file path is appended to
    pub base_url: String,
}

/// Tunables for the search.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Optional mirror listed ahead of the backend's own URL
    pub mirror: Option<UrlMirror>,
    /// Per-listing entry cap (a single page)
    pub list_limit: usize,
    /// Concurrent bucket listings during the global fallback
    pub fanout: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            mirror: None,
            list_limit: 1000,
            fanout: 8,
        }
    }
}

impl ResolverConfig {
    /// Read mirror settings from `SHELFMARK_MIRROR_NAME` and
    /// `SHELFMARK_MIRROR_URL`; the remaining knobs keep their defaults.
    pub fn from_env() -> Self {
        let mirror = match (
            env_string("SHELFMARK_MIRROR_NAME"),
            env_string("SHELFMARK_MIRROR_URL"),
        ) {
            (Some(name), Some(base_url)) => Some(UrlMirror { name, base_url }),
            _ => None,
        };
        ResolverConfig {
            mirror,
            ..Default::default()
        }
    }
}

/// The fuzzy search engine: ranks files across buckets against a path
/// fragment and resolves public URLs through the cache.
pub struct Resolver {
    backend: Arc<dyn StorageBackend>,
    cache: UrlCache,
    config: ResolverConfig,
    metrics: ResolveMetrics,
}

impl Resolver {
    /// Create a resolver over a backend, a shared URL cache and tunables.
    pub fn new(backend: Arc<dyn StorageBackend>, cache: UrlCache, config: ResolverConfig) -> Self {
        Resolver {
            backend,
            cache,
            config,
            metrics: ResolveMetrics::new(),
        }
    }

    /// The URL cache this resolver reads and writes.
    pub fn cache(&self) -> &UrlCache {
        &self.cache
    }

    /// Counters describing resolver activity so far.
    pub fn metrics(&self) -> &ResolveMetrics {
        &self.metrics
    }

    /// Rank every file matching the path fragment, best first.
    ///
    /// The last component is the file-name hint; the components are
    /// tried in order as bucket hints, and the first bucket that exists
    /// and yields positive-scoring matches answers the search outright,
    /// even if a later bucket would score higher. Only when no bucket
    /// hint pans out does the global fallback scan every bucket's root.
    /// An empty result is a valid answer; identical inputs over an
    /// unchanged store produce identically ordered output.
    #[instrument(skip_all, fields(path = %components.join("/")))]
    pub async fn resolve(&self, components: &[String]) -> Result<Vec<FileCandidate>, ResolveError> {
        self.metrics.record_search();

        let hint = match components.last() {
            Some(last) => last.to_lowercase(),
            None => return Ok(Vec::new()),
        };

        if let Some(found) = self.direct_search(components, &hint).await? {
            self.metrics.record_direct_hit();
            return Ok(found);
        }

        self.metrics.record_fallback();
        self.global_search(&hint).await
    }

    /// The top-ranked candidate, or `NoMatch` if nothing scored.
    pub async fn resolve_best(&self, components: &[String]) -> Result<FileCandidate, ResolveError> {
        let mut found = self.resolve(components).await?;
        if found.is_empty() {
            Err(ResolveError::NoMatch(components.join("/")))
        } else {
            Ok(found.remove(0))
        }
    }

    /// Public URL for a candidate, served from cache when fresh.
    ///
    /// On a miss the backend verifies the object and the URL is cached;
    /// a failure is recorded so immediate retries are suppressed for the
    /// failure window. Unverified URLs are never cached.
    pub async fn resolve_url(&self, candidate: &FileCandidate) -> Result<String, ResolveError> {
        if let Some(url) = self.cache.get(&candidate.path) {
            self.metrics.record_cache_hit();
            debug!(path = %candidate.path, "served public URL from cache");
            return Ok(url);
        }
        self.metrics.record_cache_miss();

        if self.cache.recent_failure(&candidate.path) {
            return Err(ResolveError::Unavailable(format!(
                "'{}' failed to resolve recently, retry later",
                candidate.path
            )));
        }

        match self
            .backend
            .public_url(&candidate.folder, &candidate.file)
            .await
        {
            Ok(url) => {
                self.cache.put(&candidate.path, &url);
                debug!(path = %candidate.path, "resolved and cached public URL");
                Ok(url)
            }
            Err(err) => {
                self.metrics.record_failure();
                self.cache.record_failure(&candidate.path);
                warn!(path = %candidate.path, error = %err, "failed to resolve public URL");
                Err(ResolveError::Unavailable(format!(
                    "failed to access file at '{}': {err}",
                    candidate.path
                )))
            }
        }
    }

    /// Phase 1: try the components in order as bucket hints.
    async fn direct_search(
        &self,
        components: &[String],
        hint: &str,
    ) -> Result<Option<Vec<FileCandidate>>, ResolveError> {
        for (index, component) in components.iter().enumerate() {
            self.metrics.record_listing();
            let probe = match self
                .backend
                .list_objects(component, "", ListOptions::probe())
                .await
            {
                Ok(listing) => listing,
                Err(StorageError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };
            if probe.is_empty() {
                continue;
            }

            // All but the last of the remaining components form the
            // folder the hint should live in.
            let rest = &components[index + 1..];
            let folder = match rest.split_last() {
                Some((_, parents)) => parents.join("/"),
                None => String::new(),
            };

            self.metrics.record_listing();
            let listing = match self
                .backend
                .list_objects(component, &folder, self.list_options())
                .await
            {
                Ok(listing) => listing,
                Err(StorageError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };

            let found = self.extract_matches(&listing, component, &folder, hint);
            if !found.is_empty() {
                debug!(bucket = %component, hits = found.len(), "direct bucket hint matched");
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    /// Phase 2: score the root of every bucket, fanning out with a cap.
    async fn global_search(&self, hint: &str) -> Result<Vec<FileCandidate>, ResolveError> {
        let buckets = self.backend.list_buckets().await?;
        debug!(buckets = buckets.len(), "falling back to global scan");

        let options = self.list_options();
        let mut per_bucket: Vec<(usize, String, ObjectListing)> =
            stream::iter(buckets.into_iter().enumerate())
                .map(|(index, bucket)| async move {
                    self.metrics.record_listing();
                    match self.backend.list_objects(&bucket.name, "", options).await {
                        Ok(listing) => Ok((index, bucket.name, listing)),
                        // A bucket that vanished mid-scan counts as empty
                        Err(StorageError::NotFound(_)) => {
                            Ok((index, bucket.name, ObjectListing::default()))
                        }
                        Err(err) => Err(err),
                    }
                })
                .buffer_unordered(self.config.fanout.max(1))
                .try_collect()
                .await
                .map_err(ResolveError::from)?;

        // Reassemble in bucket order so equal scores stay deterministic
        per_bucket.sort_by_key(|(index, ..)| *index);

        let mut results = Vec::new();
        for (_, bucket, listing) in &per_bucket {
            results.extend(self.extract_matches(listing, bucket, "", hint));
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(results)
    }

    fn list_options(&self) -> ListOptions {
        ListOptions {
            limit: self.config.list_limit,
            ..Default::default()
        }
    }

    /// Score a listing's objects against the hint, keeping positives in
    /// descending order. Ties keep their listing order.
    fn extract_matches(
        &self,
        listing: &ObjectListing,
        bucket: &str,
        folder: &str,
        hint: &str,
    ) -> Vec<FileCandidate> {
        let mut found: Vec<FileCandidate> = listing
            .objects
            .iter()
            .filter(|entry| !entry.name.is_empty() && !entry.name.ends_with('/'))
            .filter_map(|entry| {
                let score = score(&entry.name, hint);
                if score > 0.0 {
                    Some(self.candidate(bucket, folder, entry, score))
                } else {
                    None
                }
            })
            .collect();

        found.sort_by(|a, b| b.score.total_cmp(&a.score));
        found
    }

    /// Assemble the public shape for one scored entry.
    fn candidate(
        &self,
        bucket: &str,
        folder: &str,
        entry: &ObjectEntry,
        score: f64,
    ) -> FileCandidate {
        let file = if folder.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", folder.trim_matches('/'), entry.name)
        };
        let path = format!("{bucket}/{file}");

        let extension = match &entry.content_type {
            Some(mime) if !mime.is_empty() => mime.clone(),
            _ => match entry.name.rsplit('.').next() {
                Some(ext) if !ext.is_empty() => ext.to_lowercase(),
                _ => "unknown".to_string(),
            },
        };

        let mut urls = Vec::with_capacity(2);
        if let Some(mirror) = &self.config.mirror {
            urls.push(ProviderUrl {
                provider: mirror.name.clone(),
                url: format!("{}/{}", mirror.base_url.trim_end_matches('/'), file),
            });
        }
        urls.push(ProviderUrl {
            provider: self.backend.name().to_string(),
            url: self.backend.object_url(bucket, &file),
        });

        FileCandidate {
            folder: bucket.to_string(),
            file,
            path,
            extension,
            score,
            url: urls[0].url.clone(),
            urls,
        }
    }
}
