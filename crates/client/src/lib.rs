//! Client for the hub's file cache and download engine.
//!
//! The cache is content-addressed and bit-compatible with the reference
//! ecosystem's layout, so every client on a machine shares cached bytes:
//! blobs are stored once per unique etag, per-revision snapshot trees link
//! into them, and `refs/` maps symbolic revisions to commit hashes. The
//! download engine streams files with resumable `Range` requests, bounded
//! retry, cooperative cancellation, and cross-process locking around blob
//! installation.
//!
//! ```no_run
//! use hubcache_client::{DownloadOptions, HubClient, HubConfig};
//! use hubcache_paths::RepoKind;
//!
//! # async fn demo() -> hubcache_client::Result<()> {
//! let client = HubClient::new(HubConfig::from_env());
//! let repo = "bert-base/uncased".parse().unwrap();
//! client
//!     .download(
//!         RepoKind::Model,
//!         &repo,
//!         "main",
//!         "config.json",
//!         "config.json".as_ref(),
//!         &DownloadOptions::default(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use hubcache_paths as paths;

pub use api::{FileMetadata, HubClient, TreeEntry, LINKED_SIZE_HEADER, REPO_COMMIT_HEADER};
pub use blobs::{BlobGuard, BlobStore};
pub use commit::{CommitInfo, CommitOperation, DEFAULT_COMMIT_CONCURRENCY};
pub use config::{HubConfig, DEFAULT_ENDPOINT, HF_ENDPOINT_ENV};
pub use download::DownloadOptions;
pub use error::{HubError, Result};
pub use progress::{ProgressSnapshot, TransferProgress, THROUGHPUT_KEY};
pub use refs::RevisionKind;
pub use snapshot_download::SnapshotOptions;

pub mod api;
pub mod blobs;
pub mod commit;
pub mod config;
pub mod download;
pub mod error;
pub mod pagination;
pub mod progress;
pub mod refs;
pub mod snapshot_download;
pub mod snapshots;
pub mod token;
