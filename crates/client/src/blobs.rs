//! Content-addressed storage of file bytes under `blobs/<normalized-etag>`.

use std::fs;
use std::path::Path;

use hubcache_fs_utils::Lockfile;
use hubcache_paths::{BlobPath, BlobsDir, IncompletePath, NormalizedEtag};

use crate::error::{fs_context, Result};

/// The blob store of one repo directory.
///
/// Blobs are written once and never mutated. Installation goes through an
/// exclusive advisory lock per blob, so at most one writer across processes
/// materializes a given etag at a time; every other arrival observes the
/// installed blob and discards its own bytes.
#[derive(Clone, Debug)]
pub struct BlobStore {
    dir: BlobsDir,
}

impl BlobStore {
    pub fn new(dir: BlobsDir) -> Self {
        BlobStore { dir }
    }

    pub fn path(&self, etag: &NormalizedEtag) -> BlobPath {
        self.dir.blob(etag)
    }

    pub fn has(&self, etag: &NormalizedEtag) -> bool {
        self.path(etag).exists()
    }

    /// Block until this blob's lock is held, creating the blobs directory on
    /// demand. The returned guard releases the lock when dropped, on every
    /// exit path. Callers needing cancellation wrap the call with their own
    /// deadline.
    pub fn lock(&self, etag: &NormalizedEtag) -> Result<BlobGuard> {
        fs::create_dir_all(&self.dir)
            .map_err(fs_context(format!("creating {}", self.dir.display())))?;
        let blob = self.dir.blob(etag);
        let lock = Lockfile::acquire(blob.lockfile())
            .map_err(fs_context(format!("locking {}", blob.display())))?;
        Ok(BlobGuard {
            incomplete: blob.incomplete(),
            blob,
            _lock: lock,
        })
    }

    /// Install the bytes staged at `staging` as this blob, under its lock.
    pub fn materialize_from_path(&self, staging: &Path, etag: &NormalizedEtag) -> Result<BlobPath> {
        let guard = self.lock(etag)?;
        guard.install_from_path(staging)?;
        Ok(guard.blob_path().clone())
    }

    /// Install literal bytes as this blob, through a temporary file and an
    /// atomic rename, under its lock.
    pub fn materialize_from_bytes(&self, bytes: &[u8], etag: &NormalizedEtag) -> Result<BlobPath> {
        let guard = self.lock(etag)?;
        if !guard.blob_exists() {
            hubcache_fs_utils::atomic_write(guard.blob_path().as_ref(), bytes)
                .map_err(fs_context(format!("writing {}", guard.blob_path().display())))?;
        }
        Ok(guard.blob_path().clone())
    }
}

/// Exclusive access to one blob's installation slot.
#[derive(Debug)]
pub struct BlobGuard {
    blob: BlobPath,
    incomplete: IncompletePath,
    _lock: Lockfile,
}

impl BlobGuard {
    pub fn blob_path(&self) -> &BlobPath {
        &self.blob
    }

    pub fn incomplete_path(&self) -> &IncompletePath {
        &self.incomplete
    }

    pub fn blob_exists(&self) -> bool {
        self.blob.exists()
    }

    /// Move the staged bytes into place by rename. When the blob already
    /// exists the staging file is discarded instead: a later arrival's bytes
    /// are redundant and the installed blob must not be touched.
    pub fn install_from_path(&self, staging: &Path) -> Result<()> {
        if self.blob_exists() {
            if staging.exists() {
                fs::remove_file(staging)
                    .map_err(fs_context(format!("discarding {}", staging.display())))?;
            }
            return Ok(());
        }
        hubcache_fs_utils::install_by_rename(staging, self.blob.as_ref())
            .map_err(fs_context(format!("installing {}", self.blob.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcache_paths::BlobsDir;

    fn store_in(dir: &tempfile::TempDir) -> BlobStore {
        BlobStore::new(BlobsDir(dir.path().join("blobs")))
    }

    fn etag(raw: &str) -> NormalizedEtag {
        NormalizedEtag::new(raw).unwrap()
    }

    #[test]
    fn materialize_from_bytes_installs_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let etag = etag("abc");

        assert!(!store.has(&etag));
        store.materialize_from_bytes(b"payload", &etag).unwrap();
        assert!(store.has(&etag));

        // A second materialization with different bytes is a no-op: blobs are
        // immutable once installed.
        store.materialize_from_bytes(b"other", &etag).unwrap();
        assert_eq!(fs::read(store.path(&etag)).unwrap(), b"payload");
    }

    #[test]
    fn materialize_from_path_moves_the_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let etag = etag("abc");

        fs::create_dir_all(dir.path().join("blobs")).unwrap();
        let staging = dir.path().join("blobs/abc.incomplete");
        fs::write(&staging, b"payload").unwrap();

        store.materialize_from_path(&staging, &etag).unwrap();
        assert!(!staging.exists());
        assert_eq!(fs::read(store.path(&etag)).unwrap(), b"payload");
    }

    #[test]
    fn late_arrival_discards_its_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let etag = etag("abc");

        store.materialize_from_bytes(b"winner", &etag).unwrap();

        let staging = dir.path().join("blobs/abc.incomplete");
        fs::write(&staging, b"loser").unwrap();
        store.materialize_from_path(&staging, &etag).unwrap();

        assert!(!staging.exists());
        assert_eq!(fs::read(store.path(&etag)).unwrap(), b"winner");
    }

    #[test]
    fn guard_paths_share_the_blob_stem() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let guard = store.lock(&etag("abc")).unwrap();
        assert_eq!(
            guard.incomplete_path().as_ref(),
            dir.path().join("blobs/abc.incomplete")
        );
        assert!(guard.blob_path().lockfile().exists());
    }
}
