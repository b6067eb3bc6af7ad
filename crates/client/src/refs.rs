//! Per-repo reference files mapping symbolic revisions to commit hashes.

use std::fs;

use hubcache_paths::RefsDir;

use crate::error::{fs_context, Result};

/// Shape of a revision string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisionKind {
    /// Exactly 40 hexadecimal characters.
    Commit,
    /// Anything else: a branch, tag, or PR ref.
    Symbolic,
}

/// Classify a revision by shape alone.
pub fn classify(revision: &str) -> RevisionKind {
    if revision.len() == 40 && revision.bytes().all(|b| b.is_ascii_hexdigit()) {
        RevisionKind::Commit
    } else {
        RevisionKind::Symbolic
    }
}

/// Read `refs/<name>`, trimming surrounding whitespace. Any I/O failure is
/// treated as "no such ref", not an error.
pub fn read_ref(refs: &RefsDir, name: &str) -> Option<String> {
    let contents = fs::read_to_string(refs.ref_path(name)).ok()?;
    let commit = contents.trim();
    (!commit.is_empty()).then(|| commit.to_owned())
}

/// Atomically write `refs/<name> = commit`, creating parent directories for
/// nested refs such as `refs/pr/5`.
pub fn write_ref(refs: &RefsDir, name: &str, commit: &str) -> Result<()> {
    let path = refs.ref_path(name);
    hubcache_fs_utils::create_parent(path.as_ref())
        .map_err(fs_context(format!("creating parent of {}", path.display())))?;
    hubcache_fs_utils::atomic_write(path.as_ref(), commit)
        .map_err(fs_context(format!("writing ref {}", path.display())))
}

/// Resolve `revision` to a commit hash: commit-shaped strings pass through,
/// symbolic refs go through `refs/`.
pub fn resolve(refs: &RefsDir, revision: &str) -> Option<String> {
    match classify(revision) {
        RevisionKind::Commit => Some(revision.to_owned()),
        RevisionKind::Symbolic => read_ref(refs, revision),
    }
}
