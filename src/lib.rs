//! shelfmark resolves an imprecise path fragment to the best-matching
//! file across S3-compatible storage buckets.
//!
//! The pieces compose left to right: [`score`] ranks a stored file name
//! against a hint, [`storage`] hides the remote store behind the
//! [`storage::StorageBackend`] trait, [`resolver`] runs the two-phase
//! search and [`cache`] keeps resolved public URLs warm between
//! requests.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use shelfmark::{BackendConfig, Resolver, ResolverConfig, S3Backend, UrlCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = S3Backend::connect(BackendConfig::from_env()).await?;
//! let cache = UrlCache::new(1024, Duration::from_secs(3600), Duration::from_secs(30));
//! let resolver = Resolver::new(Arc::new(backend), cache, ResolverConfig::default());
//!
//! let components = vec!["docs".to_string(), "setup-guide".to_string()];
//! for candidate in resolver.resolve(&components).await? {
//!     println!("{:>6.1}  {}", candidate.score, candidate.path);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod resolver;
pub mod score;
pub mod storage;

pub use cache::UrlCache;
pub use resolver::{FileCandidate, ProviderUrl, ResolveError, Resolver, ResolverConfig, UrlMirror};
pub use storage::{BackendConfig, S3Backend, StorageBackend, StorageError};
