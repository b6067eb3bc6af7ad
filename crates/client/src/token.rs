//! Bearer-token resolution from the environment and well-known token files.

use std::path::{Path, PathBuf};

pub const HF_TOKEN_ENV: &str = "HF_TOKEN";
pub const HF_TOKEN_FALLBACK_ENV: &str = "HUGGING_FACE_HUB_TOKEN";
pub const HF_TOKEN_PATH_ENV: &str = "HF_TOKEN_PATH";

/// Find a bearer token, trying in order: `HF_TOKEN`,
/// `HUGGING_FACE_HUB_TOKEN`, the file named by `HF_TOKEN_PATH`,
/// `$HF_HOME/token`, `~/.cache/huggingface/token`, `~/.huggingface/token`.
/// The first non-empty hit wins; values are stripped of surrounding
/// whitespace.
pub fn find_token() -> Option<String> {
    find_token_with(|name| std::env::var(name).ok(), dirs::home_dir())
}

fn find_token_with(
    env: impl Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Option<String> {
    for name in [HF_TOKEN_ENV, HF_TOKEN_FALLBACK_ENV] {
        let token = env(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        if token.is_some() {
            return token;
        }
    }

    let mut candidates = Vec::new();
    if let Some(path) = env(HF_TOKEN_PATH_ENV).filter(|v| !v.is_empty()) {
        candidates.push(PathBuf::from(path));
    }
    if let Some(hf_home) = env(hubcache_paths::HF_HOME_ENV).filter(|v| !v.is_empty()) {
        candidates.push(PathBuf::from(hf_home).join("token"));
    }
    if let Some(home) = home {
        candidates.push(home.join(".cache/huggingface/token"));
        candidates.push(home.join(".huggingface/token"));
    }
    candidates.iter().find_map(|path| token_from_file(path))
}

fn token_from_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let token = contents.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn env_token_wins_and_is_trimmed() {
        let env = env_of(&[(HF_TOKEN_ENV, "  hf_abc \n"), (HF_TOKEN_FALLBACK_ENV, "other")]);
        assert_eq!(find_token_with(env, None), Some("hf_abc".to_owned()));
    }

    #[test]
    fn empty_env_token_falls_through() {
        let env = env_of(&[(HF_TOKEN_ENV, "   "), (HF_TOKEN_FALLBACK_ENV, "legacy")]);
        assert_eq!(find_token_with(env, None), Some("legacy".to_owned()));
    }

    #[test]
    fn token_path_file_beats_home_files() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit-token");
        fs::write(&explicit, "from-path\n").unwrap();
        fs::create_dir_all(dir.path().join(".cache/huggingface")).unwrap();
        fs::write(dir.path().join(".cache/huggingface/token"), "from-home").unwrap();

        let env = env_of(&[(HF_TOKEN_PATH_ENV, explicit.to_str().unwrap())]);
        assert_eq!(
            find_token_with(env, Some(dir.path().to_path_buf())),
            Some("from-path".to_owned())
        );
    }

    #[test]
    fn falls_back_through_home_token_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".huggingface")).unwrap();
        fs::write(dir.path().join(".huggingface/token"), " legacy-home ").unwrap();

        assert_eq!(
            find_token_with(|_| None, Some(dir.path().to_path_buf())),
            Some("legacy-home".to_owned())
        );
    }

    #[test]
    fn no_token_anywhere_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_token_with(|_| None, Some(dir.path().to_path_buf())), None);
    }
}
