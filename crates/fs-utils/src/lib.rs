use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

pub use lockfile::Lockfile;

mod lockfile;

/// Write `contents` to `path` atomically: the bytes land in a temporary file
/// in the same directory, which is then renamed over `path`. Readers observe
/// either the old contents or the new, never a partial write.
pub fn atomic_write(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_ref())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create the parent directory of `path`, if it has one.
pub fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if parent != Path::new("") => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Move `src` to `dst` by rename, falling back to copy + fsync + delete when
/// the rename crosses a filesystem boundary.
pub fn install_by_rename(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if crosses_devices(&e) => {
            fs::copy(src, dst)?;
            File::open(dst)?.sync_all()?;
            fs::remove_file(src)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn crosses_devices(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn crosses_devices(_: &io::Error) -> bool {
    // Windows reports ERROR_NOT_SAME_DEVICE through an unstable kind; retry
    // any rename failure through the copy path and let that surface the real
    // error.
    true
}

/// Create a symbolic link at `link` pointing at `original` (which may be
/// relative to the link's parent directory).
#[cfg(unix)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}
