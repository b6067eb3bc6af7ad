//! Whole-revision downloads: enumerate the tree, filter by glob, fetch each
//! file through the cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use glob::{MatchOptions, Pattern};
use tokio_util::sync::CancellationToken;

use hubcache_paths::{RepoId, RepoKind};

use crate::api::HubClient;
use crate::download::DownloadOptions;
use crate::error::{HubError, Result};
use crate::progress::TransferProgress;

/// Share of the outer progress indicator granted to each file.
const PER_FILE_UNITS: u64 = 10_000;

/// POSIX filename-match behavior: `*` and `?` stop at `/`.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Clone, Debug)]
pub struct SnapshotOptions {
    /// Keep only paths matching one of these patterns. An empty list keeps
    /// every path.
    pub globs: Vec<String>,
    pub progress: Option<Arc<TransferProgress>>,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub cancel: CancellationToken,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        SnapshotOptions {
            globs: Vec::new(),
            progress: None,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            cancel: CancellationToken::new(),
        }
    }
}

impl HubClient {
    /// Download every file of `revision` matched by `options.globs` into
    /// `destination`, preserving relative paths.
    ///
    /// Files are fetched sequentially, each contributing a pro-rata share to
    /// the outer progress. Cancellation mid-list returns the files finished
    /// so far without error.
    pub async fn download_snapshot(
        &self,
        kind: RepoKind,
        repo: &RepoId,
        revision: &str,
        destination: &Path,
        options: &SnapshotOptions,
    ) -> Result<Vec<PathBuf>> {
        let matchers = compile_globs(&options.globs);
        let files: Vec<String> = self
            .list_repo_tree(kind, repo, revision)
            .await?
            .into_iter()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.path)
            .filter(|path| matches_any(&matchers, path))
            .collect();
        tracing::debug!("snapshot of {repo}@{revision}: {} files to fetch", files.len());

        if let Some(progress) = &options.progress {
            progress.set_total(files.len() as u64 * PER_FILE_UNITS);
        }

        let mut downloaded = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            if options.cancel.is_cancelled() {
                return Ok(downloaded);
            }

            let child = TransferProgress::new();
            let file_options = DownloadOptions {
                force: false,
                in_background: false,
                progress: Some(child.clone()),
                max_retries: options.max_retries,
                retry_delay: options.retry_delay,
                cancel: options.cancel.clone(),
            };
            let dest = destination.join(file);

            // Forward the child's fraction into this file's share of the
            // outer indicator while the download runs.
            let download = self.download(kind, repo, revision, file, &dest, &file_options);
            tokio::pin!(download);
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            let result = loop {
                tokio::select! {
                    result = &mut download => break result,
                    _ = ticker.tick() => {
                        if let Some(progress) = &options.progress {
                            let share = (child.fraction() * PER_FILE_UNITS as f64) as u64;
                            progress.record(index as u64 * PER_FILE_UNITS + share.min(PER_FILE_UNITS));
                        }
                    }
                }
            };
            match result {
                Ok(path) => downloaded.push(path),
                Err(HubError::Cancelled) => return Ok(downloaded),
                Err(e) => return Err(e),
            }
            if let Some(progress) = &options.progress {
                progress.record((index as u64 + 1) * PER_FILE_UNITS);
            }
        }

        if let Some(progress) = &options.progress {
            progress.finish();
        }
        Ok(downloaded)
    }
}

enum Matcher {
    Pattern(Pattern),
    Literal(String),
}

/// Compile glob patterns with POSIX filename-match semantics over the whole
/// path: `*` and `?` never cross `/`, character classes work, and `**` is no
/// more special than `*` (star runs are collapsed before compilation).
fn compile_globs(globs: &[String]) -> Vec<Matcher> {
    globs
        .iter()
        .map(|raw| match Pattern::new(&collapse_star_runs(raw)) {
            Ok(pattern) => Matcher::Pattern(pattern),
            // An unparseable pattern degrades to an exact-path comparison.
            Err(_) => Matcher::Literal(raw.clone()),
        })
        .collect()
}

fn matches_any(matchers: &[Matcher], path: &str) -> bool {
    if matchers.is_empty() {
        return true;
    }
    matchers.iter().any(|matcher| match matcher {
        Matcher::Pattern(pattern) => pattern.matches_with(path, MATCH_OPTIONS),
        Matcher::Literal(literal) => literal == path,
    })
}

fn collapse_star_runs(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut in_run = false;
    for c in pattern.chars() {
        if c == '*' {
            if !in_run {
                out.push(c);
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(globs: &[&str], path: &str) -> bool {
        let globs: Vec<String> = globs.iter().map(|g| g.to_string()).collect();
        matches_any(&compile_globs(&globs), path)
    }

    #[test]
    fn empty_glob_list_keeps_everything() {
        assert!(matches(&[], "anything/at/all.bin"));
    }

    #[test]
    fn star_does_not_cross_separators() {
        assert!(matches(&["*.safetensors"], "model.safetensors"));
        assert!(!matches(&["*.safetensors"], "sub/model.safetensors"));
        assert!(matches(&["sub/*.safetensors"], "sub/model.safetensors"));
    }

    #[test]
    fn double_star_is_not_special() {
        assert!(!matches(&["**/*.json"], "a/b/c.json"));
        assert!(matches(&["**/*.json"], "a/c.json"));
        assert!(matches(&["**"], "file"));
        assert!(!matches(&["**"], "a/file"));
    }

    #[test]
    fn question_mark_and_classes_work() {
        assert!(matches(&["config.jso?"], "config.json"));
        assert!(matches(&["shard-[0-9].bin"], "shard-3.bin"));
        assert!(!matches(&["shard-[0-9].bin"], "shard-x.bin"));
    }

    #[test]
    fn any_of_several_globs_suffices() {
        assert!(matches(&["*.json", "*.bin"], "weights.bin"));
        assert!(!matches(&["*.json", "*.bin"], "weights.onnx"));
    }

    #[test]
    fn invalid_patterns_fall_back_to_exact_match() {
        assert!(matches(&["weird[file"], "weird[file"));
        assert!(!matches(&["weird[file"], "other"));
    }
}
