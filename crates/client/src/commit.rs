//! Commit creation against the hub's commit endpoint.

use std::path::PathBuf;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use hubcache_paths::{RepoId, RepoKind};

use crate::api::HubClient;
use crate::error::{fs_context, HubError, Result};

/// Bound on in-flight local file probes while preparing a commit.
pub const DEFAULT_COMMIT_CONCURRENCY: usize = 3;

/// A single operation in a commit.
#[derive(Clone, Debug)]
pub enum CommitOperation {
    /// Upload the file at `source` as `path` in the repo.
    Add { path: String, source: PathBuf },
    /// Delete `path` from the repo.
    Delete { path: String },
}

#[derive(Serialize)]
struct WireOperation<'a> {
    op: &'static str,
    path: &'a str,
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    title: &'a str,
    operations: Vec<WireOperation<'a>>,
}

/// What the server reports about a newly created commit.
#[derive(Debug, Default, Deserialize)]
pub struct CommitInfo {
    /// Commit hash of the new revision, when the server includes it.
    pub oid: Option<String>,
}

impl HubClient {
    /// Create a commit titled `title` from `operations`.
    ///
    /// Local sources of `Add` operations are probed up front, at most
    /// [`DEFAULT_COMMIT_CONCURRENCY`] at a time, so a missing file fails the
    /// commit before the server sees any of it.
    pub async fn create_commit(
        &self,
        kind: RepoKind,
        repo: &RepoId,
        revision: &str,
        title: &str,
        operations: &[CommitOperation],
    ) -> Result<CommitInfo> {
        stream::iter(operations.iter().filter_map(|op| match op {
            CommitOperation::Add { path, source } => Some((path.clone(), source.clone())),
            CommitOperation::Delete { .. } => None,
        }))
        .map(|(path, source)| async move {
            tokio::fs::metadata(&source)
                .await
                .map_err(fs_context(format!("probing commit source for `{path}`")))?;
            Ok::<_, HubError>(())
        })
        .buffer_unordered(DEFAULT_COMMIT_CONCURRENCY)
        .try_collect::<Vec<_>>()
        .await?;

        let body = CommitRequest {
            title,
            operations: operations
                .iter()
                .map(|op| match op {
                    CommitOperation::Add { path, .. } => WireOperation { op: "add", path },
                    CommitOperation::Delete { path } => WireOperation { op: "delete", path },
                })
                .collect(),
        };

        let response = self
            .http()
            .post(self.commit_url(kind, repo, revision))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Http(status));
        }
        Ok(response.json().await.unwrap_or_default())
    }
}
