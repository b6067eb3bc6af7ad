//! The on-disk layout of the hubcache file cache, represented as a type
//! hierarchy.
//!
//! The layout is shared with the reference ecosystem's client, so any
//! compatible client pointed at the same cache root finds identical paths:
//!
//! ```text
//! <root>/<kind_plural>--<namespace>--<name>/
//!     blobs/<normalized_etag>
//!     blobs/<normalized_etag>.incomplete
//!     blobs/<normalized_etag>.lock
//!     refs/<ref_name>
//!     snapshots/<commit>/<filename>
//! ```
//!
//! Nothing in this crate touches the filesystem beyond reading environment
//! variables; it only computes paths. Directory creation happens at the call
//! sites that write.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub use etag::{EtagError, NormalizedEtag};
pub use repo::{RepoId, RepoIdError, RepoKind};

mod etag;
mod repo;

/// Environment variable naming the cache root directly. Highest precedence
/// after an explicit caller-supplied directory.
pub const HF_HUB_CACHE_ENV: &str = "HF_HUB_CACHE";
/// Environment variable naming the base directory; the cache root is
/// `$HF_HOME/hub`.
pub const HF_HOME_ENV: &str = "HF_HOME";

macro_rules! path_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name(pub PathBuf);

        impl $name {
            pub fn display(&self) -> std::path::Display<'_> {
                self.0.display()
            }

            pub fn exists(&self) -> bool {
                self.0.exists()
            }
        }

        impl AsRef<Path> for $name {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }

        impl From<$name> for PathBuf {
            fn from(path: $name) -> PathBuf {
                path.0
            }
        }
    };
}

path_type!(
    /// The cache root directory. All repo directories live directly under it.
    CacheRoot
);

impl CacheRoot {
    /// Resolve the cache root, stopping at the first defined value:
    ///
    /// 1. an explicit caller-supplied directory,
    /// 2. `$HF_HUB_CACHE`,
    /// 3. `$HF_HOME/hub`,
    /// 4. `~/.cache/huggingface/hub`.
    ///
    /// Paths beginning with `~` expand to the user's home directory. The
    /// resolver never fails: with no override and no determinable home
    /// directory it returns the literal `~`-prefixed fallback, and any
    /// creation failure surfaces later at the write site.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        Self::resolve_with(explicit, |name| env::var_os(name), dirs::home_dir())
    }

    fn resolve_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<OsString>,
        home: Option<PathBuf>,
    ) -> Self {
        let home = home.as_deref();
        if let Some(dir) = explicit {
            return CacheRoot(expand_tilde(dir, home));
        }
        if let Some(dir) = env(HF_HUB_CACHE_ENV).filter(|v| !v.is_empty()) {
            return CacheRoot(expand_tilde(Path::new(&dir), home));
        }
        if let Some(dir) = env(HF_HOME_ENV).filter(|v| !v.is_empty()) {
            return CacheRoot(expand_tilde(Path::new(&dir), home).join("hub"));
        }
        match home {
            Some(home) => CacheRoot(home.join(".cache/huggingface/hub")),
            None => CacheRoot(PathBuf::from("~/.cache/huggingface/hub")),
        }
    }

    pub fn repo_dir(&self, kind: RepoKind, repo: &RepoId) -> RepoDir {
        RepoDir(self.0.join(repo.folder_name(kind)))
    }
}

fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

path_type!(
    /// `<root>/<kind_plural>--<namespace>--<name>`. Any `/` in the repo id is
    /// flattened to `--` in the directory name.
    RepoDir
);

impl RepoDir {
    pub fn blobs(&self) -> BlobsDir {
        BlobsDir(self.0.join("blobs"))
    }

    pub fn refs(&self) -> RefsDir {
        RefsDir(self.0.join("refs"))
    }

    pub fn snapshots(&self) -> SnapshotsDir {
        SnapshotsDir(self.0.join("snapshots"))
    }
}

path_type!(
    /// `<repo>/blobs`, the content-addressed store. The normalized etag is
    /// the blob file name.
    BlobsDir
);

impl BlobsDir {
    pub fn blob(&self, etag: &NormalizedEtag) -> BlobPath {
        BlobPath(self.0.join(etag.as_str()))
    }
}

path_type!(
    /// `blobs/<normalized_etag>`: the only byte-bearing copy of a file.
    BlobPath
);

impl BlobPath {
    /// The staging file accumulating bytes while a download is in flight.
    pub fn incomplete(&self) -> IncompletePath {
        IncompletePath(with_suffix(&self.0, ".incomplete"))
    }

    /// The advisory lockfile guarding writes to this blob and its staging
    /// file.
    pub fn lockfile(&self) -> LockPath {
        LockPath(with_suffix(&self.0, ".lock"))
    }
}

path_type!(IncompletePath);
path_type!(LockPath);

path_type!(
    /// `<repo>/refs`: symbolic revisions mapped to commit hashes, one file
    /// per ref. Nested ref names (`refs/pr/5`) become nested directories.
    RefsDir
);

impl RefsDir {
    pub fn ref_path(&self, name: &str) -> RefPath {
        RefPath(self.0.join(name))
    }
}

path_type!(RefPath);

path_type!(
    /// `<repo>/snapshots`: one directory per commit, reproducing the
    /// repository tree as links into `blobs/`.
    SnapshotsDir
);

impl SnapshotsDir {
    pub fn snapshot(&self, commit: &str) -> SnapshotDir {
        SnapshotDir(self.0.join(commit))
    }
}

path_type!(SnapshotDir);

impl SnapshotDir {
    /// A file entry inside this snapshot. `filename` may contain `/`; the
    /// nesting is preserved on disk.
    pub fn file(&self, filename: &str) -> SnapshotFilePath {
        SnapshotFilePath(self.0.join(filename))
    }
}

path_type!(SnapshotFilePath);

/// The relative symlink target from `snapshots/<commit>/<filename>` back to
/// `blobs/<etag>`: one `../` per component of `filename`, plus one for the
/// commit directory.
pub fn relative_blob_target(filename: &str, etag: &NormalizedEtag) -> PathBuf {
    let depth = filename.split('/').filter(|c| !c.is_empty()).count();
    let mut target = PathBuf::new();
    for _ in 0..depth + 1 {
        target.push("..");
    }
    target.push("blobs");
    target.push(etag.as_str());
    target
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut buf = path.as_os_str().to_os_string();
    buf.push(suffix);
    PathBuf::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<OsString> {
        None
    }

    fn etag(raw: &str) -> NormalizedEtag {
        NormalizedEtag::new(raw).unwrap()
    }

    #[test]
    fn explicit_dir_wins_over_everything() {
        let root = CacheRoot::resolve_with(
            Some(Path::new("/tmp/override")),
            |_| Some(OsString::from("/ignored")),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(root.0, PathBuf::from("/tmp/override"));
    }

    #[test]
    fn hub_cache_env_wins_over_hf_home() {
        let root = CacheRoot::resolve_with(
            None,
            |name| match name {
                HF_HUB_CACHE_ENV => Some(OsString::from("/var/cache/hub")),
                HF_HOME_ENV => Some(OsString::from("/var/hf")),
                _ => None,
            },
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(root.0, PathBuf::from("/var/cache/hub"));
    }

    #[test]
    fn hf_home_gets_hub_appended() {
        let root = CacheRoot::resolve_with(
            None,
            |name| (name == HF_HOME_ENV).then(|| OsString::from("/var/hf")),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(root.0, PathBuf::from("/var/hf/hub"));
    }

    #[test]
    fn empty_env_values_are_skipped() {
        let root = CacheRoot::resolve_with(
            None,
            |_| Some(OsString::new()),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(root.0, PathBuf::from("/home/u/.cache/huggingface/hub"));
    }

    #[test]
    fn fallback_without_home_is_the_literal_path() {
        let root = CacheRoot::resolve_with(None, no_env, None);
        assert_eq!(root.0, PathBuf::from("~/.cache/huggingface/hub"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let root = CacheRoot::resolve_with(
            Some(Path::new("~/my-cache")),
            no_env,
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(root.0, PathBuf::from("/home/u/my-cache"));

        // `~user` style paths are not expanded.
        let root = CacheRoot::resolve_with(
            Some(Path::new("~other/cache")),
            no_env,
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(root.0, PathBuf::from("~other/cache"));
    }

    #[test]
    fn repo_dir_flattens_slashes() {
        let root = CacheRoot(PathBuf::from("/c"));
        let repo: RepoId = "ns/n".parse().unwrap();
        assert_eq!(
            root.repo_dir(RepoKind::Model, &repo).0,
            PathBuf::from("/c/models--ns--n")
        );
        let nested: RepoId = "a/b/c".parse().unwrap();
        assert_eq!(
            root.repo_dir(RepoKind::Dataset, &nested).0,
            PathBuf::from("/c/datasets--a--b--c")
        );
    }

    #[test]
    fn blob_path_variants_append_suffixes() {
        let blobs = BlobsDir(PathBuf::from("/c/models--ns--n/blobs"));
        let blob = blobs.blob(&etag("\"abc.def\""));
        assert_eq!(blob.0, PathBuf::from("/c/models--ns--n/blobs/abc.def"));
        assert_eq!(
            blob.incomplete().0,
            PathBuf::from("/c/models--ns--n/blobs/abc.def.incomplete")
        );
        assert_eq!(
            blob.lockfile().0,
            PathBuf::from("/c/models--ns--n/blobs/abc.def.lock")
        );
    }

    #[test]
    fn relative_target_walks_up_depth_plus_one() {
        assert_eq!(
            relative_blob_target("config.json", &etag("e")),
            PathBuf::from("../../blobs/e")
        );
        assert_eq!(
            relative_blob_target("sub/file", &etag("e")),
            PathBuf::from("../../../blobs/e")
        );
        assert_eq!(
            relative_blob_target("a/b/c/file", &etag("e")),
            PathBuf::from("../../../../../blobs/e")
        );
    }
}
