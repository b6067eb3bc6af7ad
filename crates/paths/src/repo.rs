use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The kind of a hub repository. Determines the plural directory prefix in
/// the cache layout and the URL prefix for file resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepoKind {
    Model,
    Dataset,
    Space,
}

impl RepoKind {
    pub fn plural(self) -> &'static str {
        match self {
            RepoKind::Model => "models",
            RepoKind::Dataset => "datasets",
            RepoKind::Space => "spaces",
        }
    }

    /// URL path prefix for file resolution. Models live at the URL root.
    pub fn url_prefix(self) -> &'static str {
        match self {
            RepoKind::Model => "",
            RepoKind::Dataset => "datasets/",
            RepoKind::Space => "spaces/",
        }
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepoKind::Model => "model",
            RepoKind::Dataset => "dataset",
            RepoKind::Space => "space",
        })
    }
}

impl FromStr for RepoKind {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" | "models" => Ok(RepoKind::Model),
            "dataset" | "datasets" => Ok(RepoKind::Dataset),
            "space" | "spaces" => Ok(RepoKind::Space),
            _ => Err(RepoIdError::UnknownKind(s.to_owned())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoIdError {
    #[error("repo id `{0}` must be of the form `namespace/name`")]
    MissingSeparator(String),
    #[error("repo id `{0}` has an empty namespace or name")]
    EmptyComponent(String),
    #[error("unknown repo kind `{0}`")]
    UnknownKind(String),
}

/// A repository identifier, `namespace/name`.
///
/// The id is split on the *first* `/` only, so the name may itself contain
/// separators: `a/b/c` parses as namespace `a`, name `b/c`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoId {
    namespace: String,
    name: String,
}

impl RepoId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoIdError> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.is_empty() || name.is_empty() {
            return Err(RepoIdError::EmptyComponent(format!("{namespace}/{name}")));
        }
        Ok(RepoId { namespace, name })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory name under the cache root:
    /// `<kind_plural>--<namespace>--<name>`, with any `/` remaining in the
    /// name flattened to `--`.
    pub fn folder_name(&self, kind: RepoKind) -> String {
        format!(
            "{}--{}--{}",
            kind.plural(),
            self.namespace,
            self.name.replace('/', "--")
        )
    }
}

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s
            .split_once('/')
            .ok_or_else(|| RepoIdError::MissingSeparator(s.to_owned()))?;
        if namespace.is_empty() || name.is_empty() {
            return Err(RepoIdError::EmptyComponent(s.to_owned()));
        }
        Ok(RepoId {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
