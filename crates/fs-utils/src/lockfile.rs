use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// A file used as an exclusive advisory lock.
///
/// Acquiring takes an OS-level exclusive lock on `path`, blocking until any
/// competing holder releases it. The lock is cooperative: it excludes other
/// `Lockfile` users in this or another process, not arbitrary writers.
///
/// Dropping a `Lockfile` releases the lock, as does process exit, so a
/// crashed holder cannot wedge the cache. The lockfile itself stays on disk.
#[derive(Debug)]
pub struct Lockfile {
    path: PathBuf,
    file: File,
}

impl Lockfile {
    /// Block until an exclusive lock on `path` can be taken. The file is
    /// created if missing; its parent directory must already exist.
    pub fn acquire(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        file.lock_exclusive()?;
        Ok(Lockfile { path, file })
    }

    /// Take the lock without blocking. Returns `Ok(None)` when it is held
    /// elsewhere.
    pub fn try_acquire(path: impl AsRef<Path>) -> io::Result<Option<Self>> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Lockfile { path, file })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
