//! Per-revision snapshot trees: symlinks into the blob store, with file
//! copies where symlinks are unsupported.

use std::fs;

use hubcache_paths::{relative_blob_target, BlobPath, NormalizedEtag, SnapshotDir, SnapshotFilePath};

use crate::error::{fs_context, Result};

/// Install `snapshots/<commit>/<filename>` pointing at `blob`.
///
/// Parent directories are created on demand, an existing entry is removed
/// first, and the link target is relative (`../.../blobs/<etag>`) so the
/// repo directory can be moved wholesale. When the platform refuses the
/// symlink the blob bytes are copied instead; readers resolve either form.
pub fn install_entry(
    snapshot: &SnapshotDir,
    filename: &str,
    etag: &NormalizedEtag,
    blob: &BlobPath,
) -> Result<SnapshotFilePath> {
    let entry = snapshot.file(filename);
    hubcache_fs_utils::create_parent(entry.as_ref())
        .map_err(fs_context(format!("creating parent of {}", entry.display())))?;

    // symlink_metadata rather than exists(): a dangling symlink still needs
    // removing, and exists() would dereference it.
    if fs::symlink_metadata(&entry).is_ok() {
        fs::remove_file(&entry).map_err(fs_context(format!("removing {}", entry.display())))?;
    }

    let target = relative_blob_target(filename, etag);
    if let Err(e) = hubcache_fs_utils::symlink_file(&target, entry.as_ref()) {
        tracing::debug!(
            "symlink at {} unavailable ({e}); copying blob bytes instead",
            entry.display()
        );
        fs::copy(blob, &entry)
            .map_err(fs_context(format!("copying blob into {}", entry.display())))?;
    }
    Ok(entry)
}
