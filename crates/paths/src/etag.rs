use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EtagError {
    #[error("etag `{0}` normalizes to an empty string")]
    Empty(String),
    #[error("etag `{0}` contains a path separator")]
    Separator(String),
}

/// A server-assigned content identifier, normalized for use as a blob file
/// name.
///
/// Normalization strips one leading `W/` (weak validator marker), then all
/// leading and trailing ASCII double quotes. The result must be non-empty and
/// free of path separators; it is used verbatim as the file name under
/// `blobs/`. Normalization is idempotent: normalizing an already-normalized
/// etag is the identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedEtag(String);

impl NormalizedEtag {
    pub fn new(raw: &str) -> Result<Self, EtagError> {
        let stripped = raw.strip_prefix("W/").unwrap_or(raw);
        let normalized = stripped.trim_matches('"');
        if normalized.is_empty() {
            return Err(EtagError::Empty(raw.to_owned()));
        }
        if normalized.contains('/') {
            return Err(EtagError::Separator(raw.to_owned()));
        }
        Ok(NormalizedEtag(normalized.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedEtag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_weak_marker_and_quotes() {
        assert_eq!(NormalizedEtag::new("\"abc\"").unwrap().as_str(), "abc");
        assert_eq!(NormalizedEtag::new("W/\"abc\"").unwrap().as_str(), "abc");
        assert_eq!(NormalizedEtag::new("abc").unwrap().as_str(), "abc");
        // Quotes inside the value survive; only the edges are trimmed.
        assert_eq!(NormalizedEtag::new("\"a\"b\"").unwrap().as_str(), "a\"b");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["\"abc\"", "W/\"abc\"", "abc", "\"\"a\"\""] {
            let once = NormalizedEtag::new(raw).unwrap();
            let twice = NormalizedEtag::new(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn empty_after_stripping_is_rejected() {
        assert_eq!(NormalizedEtag::new(""), Err(EtagError::Empty(String::new())));
        assert!(matches!(NormalizedEtag::new("\"\""), Err(EtagError::Empty(_))));
        assert!(matches!(NormalizedEtag::new("W/\"\""), Err(EtagError::Empty(_))));
    }

    #[test]
    fn path_separators_are_rejected() {
        assert!(matches!(NormalizedEtag::new("\"a/b\""), Err(EtagError::Separator(_))));
    }
}
