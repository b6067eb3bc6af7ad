use std::path::Path;

use hubcache_paths::CacheRoot;

use crate::token;

/// Environment variable naming the base URL of the metadata/content service.
pub const HF_ENDPOINT_ENV: &str = "HF_ENDPOINT";
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Client configuration: remote endpoint, bearer token, and cache root.
///
/// Everything resolves from the environment by default and can be overridden
/// in code; there is no configuration file, because the on-disk cache
/// contract is shared with other clients and driven by the same environment
/// variables they read.
#[derive(Clone, Debug)]
pub struct HubConfig {
    endpoint: String,
    token: Option<String>,
    cache_root: CacheRoot,
}

impl HubConfig {
    /// Resolve the endpoint (`HF_ENDPOINT`), bearer token (see
    /// [`token::find_token`]) and cache root from the environment.
    pub fn from_env() -> Self {
        let endpoint = std::env::var(HF_ENDPOINT_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        HubConfig {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            token: token::find_token(),
            cache_root: CacheRoot::resolve(None),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = endpoint.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_cache_root(mut self, dir: &Path) -> Self {
        self.cache_root = CacheRoot::resolve(Some(dir));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn cache_root(&self) -> &CacheRoot {
        &self.cache_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let config = HubConfig::from_env().with_endpoint("http://127.0.0.1:9000/");
        assert_eq!(config.endpoint(), "http://127.0.0.1:9000");
    }

    #[test]
    fn overrides_replace_resolved_values() {
        let config = HubConfig::from_env()
            .with_token(Some("secret".to_owned()))
            .with_cache_root(Path::new("/tmp/cache"));
        assert_eq!(config.token(), Some("secret"));
        assert_eq!(config.cache_root().as_ref(), Path::new("/tmp/cache"));
    }
}
