//! The resumable download engine.
//!
//! A download streams the remote file into `blobs/<etag>.incomplete`,
//! resuming from an earlier offset when a previous attempt left bytes
//! behind, then promotes the staging file into the blob store, links the
//! snapshot entry, updates the symbolic ref, and copies the resolved bytes
//! to the caller's destination.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rand::Rng;
use reqwest::StatusCode;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;

use hubcache_paths::{NormalizedEtag, RepoDir, RepoId, RepoKind};

use crate::api::{FileMetadata, HubClient};
use crate::blobs::{BlobGuard, BlobStore};
use crate::error::{fs_context, HubError, Result};
use crate::progress::TransferProgress;
use crate::refs::{self, RevisionKind};
use crate::snapshots;

/// Buffered-write granularity for streaming downloads.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Knobs for a single file download.
#[derive(Clone, Debug)]
pub struct DownloadOptions {
    /// Bypass the cache-hit short-circuit and always re-fetch.
    pub force: bool,
    /// Hint that the caller would prefer a background-capable transfer mode.
    /// There is no such facility on this target; semantics are identical.
    pub in_background: bool,
    /// Observer mutated in place as bytes arrive.
    pub progress: Option<Arc<TransferProgress>>,
    /// Total attempts for retryable failures.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Cooperative cancellation signal, honored at every suspension point.
    pub cancel: CancellationToken,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        DownloadOptions {
            force: false,
            in_background: false,
            progress: None,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            cancel: CancellationToken::new(),
        }
    }
}

impl HubClient {
    /// Download one file of `revision` into `destination`, through the
    /// shared cache.
    ///
    /// On success `destination` holds the file's bytes, the blob is
    /// installed under `blobs/`, the snapshot entry links to it, and a
    /// symbolic `revision` has its ref updated to the observed commit.
    /// Cache-write failures after a successful transfer are soft: the bytes
    /// still reach `destination` and the failure is only logged, leaving the
    /// staging file for a later call to finish the job.
    pub async fn download(
        &self,
        kind: RepoKind,
        repo: &RepoId,
        revision: &str,
        filename: &str,
        destination: &Path,
        options: &DownloadOptions,
    ) -> Result<PathBuf> {
        let repo_dir = self.config().cache_root().repo_dir(kind, repo);
        if options.in_background {
            tracing::debug!("background transfer requested; using the foreground engine");
        }

        // Cache hit: a resolvable revision with an existing snapshot entry
        // needs no network at all.
        if !options.force {
            if let Some(commit) = refs::resolve(&repo_dir.refs(), revision) {
                let entry = repo_dir.snapshots().snapshot(&commit).file(filename);
                if entry.exists() {
                    tracing::debug!("cache hit for {repo}@{revision}:{filename}");
                    let delivered = deliver(entry.as_ref(), destination)?;
                    if let Some(progress) = &options.progress {
                        let len = std::fs::metadata(&delivered).map(|m| m.len()).unwrap_or(0);
                        progress.set_total(len);
                        progress.record(len);
                        progress.finish();
                    }
                    return Ok(delivered);
                }
            }
        }

        let mut attempt = 0;
        let source = loop {
            if options.cancel.is_cancelled() {
                return Err(HubError::Cancelled);
            }
            match self
                .download_fresh(kind, repo, revision, filename, options, &repo_dir)
                .await
            {
                Ok(source) => break source,
                Err(HubError::Cancelled) => return Err(HubError::Cancelled),
                Err(e) if attempt + 1 < options.max_retries && e.is_retryable() => {
                    attempt += 1;
                    tracing::warn!("download attempt {attempt} failed, retrying: {e}");
                    tokio::select! {
                        _ = tokio::time::sleep(options.retry_delay) => {}
                        _ = options.cancel.cancelled() => return Err(HubError::Cancelled),
                    }
                }
                Err(e) => return Err(e),
            }
        };

        // Delivery sits outside the retried section: a failed copy to the
        // caller's destination does not warrant a fresh probe and fetch.
        let delivered = deliver(&source, destination)?;
        if let Some(progress) = &options.progress {
            progress.finish();
        }
        Ok(delivered)
    }

    /// Probe, fetch, and promote one file, returning the best on-disk source
    /// of its bytes (snapshot entry, blob, or staging file when cache writes
    /// failed softly).
    async fn download_fresh(
        &self,
        kind: RepoKind,
        repo: &RepoId,
        revision: &str,
        filename: &str,
        options: &DownloadOptions,
        repo_dir: &RepoDir,
    ) -> Result<PathBuf> {
        // Probe for size, etag and the commit this revision resolves to.
        let meta = self.file_metadata(kind, repo, revision, filename).await?;
        let etag = match &meta.etag {
            Some(raw) => NormalizedEtag::new(raw)?,
            // No validator from the server: stage under a fresh unique token.
            None => NormalizedEtag::new(&random_token())?,
        };
        let commit = meta
            .commit
            .clone()
            .unwrap_or_else(|| revision.to_owned());

        let store = BlobStore::new(repo_dir.blobs());
        let blob_path = store.path(&etag);
        let mut delivery_source: PathBuf = blob_path.clone().into();
        let mut cache_intact = true;

        if !store.has(&etag) {
            let guard = acquire_blob_lock(&store, &etag, &options.cancel).await?;
            // The blob may have appeared while we waited on the lock; then
            // the streamed bytes of whoever held it are already installed.
            if !guard.blob_exists() {
                let url = self.file_url(kind, repo, revision, filename);
                self.stream_to_staging(&url, &meta, &guard, options).await?;

                // The transfer itself succeeded. From here on, cache-write
                // failures are soft: the bytes exist and can still reach the
                // caller.
                if let Err(e) = guard.install_from_path(guard.incomplete_path().as_ref()) {
                    tracing::warn!("blob install failed, delivering from staging: {e}");
                    delivery_source = guard.incomplete_path().clone().into();
                    cache_intact = false;
                }
            }
        }

        if cache_intact {
            let snapshot = repo_dir.snapshots().snapshot(&commit);
            match snapshots::install_entry(&snapshot, filename, &etag, &blob_path) {
                Ok(entry) => {
                    delivery_source = entry.into();
                    if refs::classify(revision) == RevisionKind::Symbolic && revision != commit {
                        if let Err(e) = refs::write_ref(&repo_dir.refs(), revision, &commit) {
                            tracing::warn!("failed to update ref {revision}: {e}");
                        }
                    }
                }
                Err(e) => tracing::warn!("failed to install snapshot entry: {e}"),
            }
        }

        Ok(delivery_source)
    }

    /// Steps 3–6: pick the resume offset, fetch with a `Range` header,
    /// stream the body into the staging file, verify the byte count.
    async fn stream_to_staging(
        &self,
        url: &str,
        meta: &FileMetadata,
        guard: &BlobGuard,
        options: &DownloadOptions,
    ) -> Result<()> {
        let staging = guard.incomplete_path();
        let expected = meta.size;

        // Resume only when the staging file holds a strict prefix of the
        // expected content; anything else starts over.
        let existing = std::fs::metadata(staging)
            .map(|m| m.len())
            .unwrap_or(0);
        let mut resume_offset = match expected {
            Some(total) if existing > 0 && existing < total => existing,
            _ => 0,
        };

        let response = self.get_file(url, resume_offset).await?;
        if response.status() != StatusCode::PARTIAL_CONTENT && resume_offset > 0 {
            // The server ignored the range and sent full content: truncate
            // and restart from zero.
            resume_offset = 0;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(staging.as_ref())
            .await
            .map_err(fs_context(format!("opening {}", staging.display())))?;
        file.set_len(resume_offset)
            .await
            .map_err(fs_context(format!("truncating {}", staging.display())))?;
        file.seek(SeekFrom::Start(resume_offset))
            .await
            .map_err(fs_context(format!("seeking in {}", staging.display())))?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        if let Some(progress) = &options.progress {
            progress.set_total(expected.unwrap_or(0));
            progress.record(resume_offset);
        }

        let mut written = resume_offset;
        let mut stream = response.bytes_stream();
        let mut outcome: Result<()> = Ok(());
        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = options.cancel.cancelled() => {
                    outcome = Err(HubError::Cancelled);
                    break;
                }
            };
            let Some(chunk) = chunk else { break };
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    outcome = Err(e.into());
                    break;
                }
            };
            if let Err(e) = writer.write_all(&chunk).await {
                outcome = Err(fs_context(format!("writing {}", staging.display()))(e));
                break;
            }
            written += chunk.len() as u64;
            if let Some(progress) = &options.progress {
                progress.record(written);
            }
        }

        // The staging file is the resume point for the next attempt, so the
        // buffered bytes are kept on every exit, errors included; a dropped
        // BufWriter would discard them.
        let flushed = writer.flush().await;
        if let (Err(e), Err(_)) = (&flushed, &outcome) {
            tracing::warn!("failed to flush {} after stream error: {e}", staging.display());
        }
        outcome?;
        flushed.map_err(fs_context(format!("flushing {}", staging.display())))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(fs_context(format!("syncing {}", staging.display())))?;

        if let Some(expected) = expected {
            if written != expected {
                return Err(HubError::SizeMismatch {
                    expected,
                    actual: written,
                });
            }
        }
        Ok(())
    }
}

/// Take the blob lock off the async reactor, aborting the wait (not the
/// eventual acquisition, which the OS releases on drop) when cancelled.
async fn acquire_blob_lock(
    store: &BlobStore,
    etag: &NormalizedEtag,
    cancel: &CancellationToken,
) -> Result<BlobGuard> {
    let store = store.clone();
    let etag = etag.clone();
    let task = tokio::task::spawn_blocking(move || store.lock(&etag));
    tokio::select! {
        joined = task => match joined {
            Ok(result) => result,
            Err(e) => Err(HubError::Fs {
                context: "blob lock task".to_owned(),
                source: std::io::Error::other(e),
            }),
        },
        _ = cancel.cancelled() => Err(HubError::Cancelled),
    }
}

/// Copy `source` into `destination`, creating parent directories. Snapshot
/// entries are symlinks; the copy reads through them, so the caller receives
/// the resolved bytes rather than a link.
fn deliver(source: &Path, destination: &Path) -> Result<PathBuf> {
    match destination.parent() {
        Some(parent) if parent != Path::new("") => std::fs::create_dir_all(parent)
            .map_err(fs_context(format!("creating {}", parent.display())))?,
        _ => {}
    }
    std::fs::copy(source, destination)
        .map_err(fs_context(format!("copying into {}", destination.display())))?;
    Ok(destination.to_path_buf())
}

fn random_token() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_the_documented_retry_policy() {
        let options = DownloadOptions::default();
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.retry_delay, Duration::from_secs(1));
        assert!(!options.force);
    }

    #[test]
    fn random_tokens_are_fresh_and_well_formed() {
        let a = random_token();
        let b = random_token();
        assert_eq!(a.len(), 32);
        assert!(a.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
