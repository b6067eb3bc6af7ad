use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{
    AsHeaderName, HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, ETAG,
    LINK, RANGE,
};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use hubcache_paths::{RepoId, RepoKind};

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::pagination;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Commit hash the requested revision resolved to, as reported per file.
pub const REPO_COMMIT_HEADER: &str = "X-Repo-Commit";
/// Size of LFS-backed content; its presence marks the file as LFS.
pub const LINKED_SIZE_HEADER: &str = "X-Linked-Size";

/// Characters kept literal when a revision appears in a URL path segment.
const REVISION_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_');

/// Result of a metadata probe for a single file.
#[derive(Clone, Debug, Default)]
pub struct FileMetadata {
    /// Total size in bytes, when the probe could determine it.
    pub size: Option<u64>,
    /// Raw (un-normalized) etag from the `ETag` header.
    pub etag: Option<String>,
    /// Commit hash from `X-Repo-Commit`.
    pub commit: Option<String>,
    /// Whether the content is LFS-backed.
    pub is_lfs: bool,
}

/// One entry of a repository tree listing.
#[derive(Clone, Debug, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub size: Option<u64>,
    pub oid: Option<String>,
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == "file"
    }
}

/// Typed access to the hub's metadata and content endpoints.
#[derive(Clone, Debug)]
pub struct HubClient {
    config: HubConfig,
    client: Client,
}

fn build_client(token: Option<&str>) -> Client {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
    }
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(headers)
        .build()
        .unwrap()
}

impl HubClient {
    pub fn new(config: HubConfig) -> Self {
        let client = build_client(config.token());
        HubClient { config, client }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// URL a file's bytes resolve at. Models live at the endpoint root;
    /// datasets and spaces under their plural prefix.
    pub(crate) fn file_url(
        &self,
        kind: RepoKind,
        repo: &RepoId,
        revision: &str,
        filename: &str,
    ) -> String {
        format!(
            "{}/{}{}/resolve/{}/{}",
            self.config.endpoint(),
            kind.url_prefix(),
            repo,
            utf8_percent_encode(revision, REVISION_ENCODE_SET),
            filename
        )
    }

    fn tree_url(&self, kind: RepoKind, repo: &RepoId, revision: &str) -> String {
        format!(
            "{}/api/{}/{}/tree/{}?recursive=true",
            self.config.endpoint(),
            kind.plural(),
            repo,
            utf8_percent_encode(revision, REVISION_ENCODE_SET),
        )
    }

    pub(crate) fn commit_url(&self, kind: RepoKind, repo: &RepoId, revision: &str) -> String {
        format!(
            "{}/api/{}/{}/commit/{}",
            self.config.endpoint(),
            kind.plural(),
            repo,
            utf8_percent_encode(revision, REVISION_ENCODE_SET),
        )
    }

    /// Probe one file with a `Range: bytes=0-0` HEAD request.
    ///
    /// 200 and 206 both mean the file exists. On 206 the `Content-Length`
    /// describes the single probed byte, so the total comes from
    /// `Content-Range` when present and is otherwise left for the GET to
    /// determine.
    pub async fn file_metadata(
        &self,
        kind: RepoKind,
        repo: &RepoId,
        revision: &str,
        filename: &str,
    ) -> Result<FileMetadata> {
        let url = self.file_url(kind, repo, revision, filename);
        let response = self
            .client
            .head(&url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HubError::NotFound);
        }
        if !status.is_success() {
            return Err(HubError::Http(status));
        }

        let headers = response.headers();
        let size = if status == StatusCode::PARTIAL_CONTENT {
            content_range_total(headers)
        } else {
            header_u64(headers, CONTENT_LENGTH)
        };
        let etag = header_str(headers, ETAG);
        let commit = header_str(headers, REPO_COMMIT_HEADER);
        let is_lfs = headers.contains_key(LINKED_SIZE_HEADER)
            || header_str(headers, LINK).is_some_and(|v| v.contains("lfs"));

        Ok(FileMetadata {
            size,
            etag,
            commit,
            is_lfs,
        })
    }

    /// GET a file's bytes, optionally resuming at `resume_offset`. The body
    /// is left unconsumed for the caller to stream.
    pub(crate) async fn get_file(&self, url: &str, resume_offset: u64) -> Result<Response> {
        let mut builder = self.client.get(url);
        if resume_offset > 0 {
            builder = builder.header(RANGE, format!("bytes={resume_offset}-"));
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Http(status));
        }
        Ok(response)
    }

    /// List every path in `revision`, following `Link: rel="next"` pagination
    /// until the listing is exhausted.
    pub async fn list_repo_tree(
        &self,
        kind: RepoKind,
        repo: &RepoId,
        revision: &str,
    ) -> Result<Vec<TreeEntry>> {
        let mut url = self.tree_url(kind, repo, revision);
        let mut entries = Vec::new();
        loop {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(HubError::NotFound);
            }
            if !status.is_success() {
                return Err(HubError::Http(status));
            }
            let next = pagination::next_page_url(response.headers());
            let mut page: Vec<TreeEntry> = response.json().await?;
            entries.append(&mut page);
            match next {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(entries)
    }
}

fn header_str(headers: &HeaderMap, name: impl AsHeaderName) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_owned)
}

fn header_u64(headers: &HeaderMap, name: impl AsHeaderName) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Total length from a `Content-Range: bytes 0-0/<total>` header.
fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    value.rsplit('/').next()?.trim().parse().ok()
}
