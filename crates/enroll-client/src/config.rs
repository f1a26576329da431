//! Enrollment service client configuration.
//!
//! Defaults point at a locally running backend. Override via environment
//! variables or explicit construction for staging/testing.

use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_READ_RETRIES: u32 = 3;

/// Configuration for connecting to the enrollment service.
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL including the API prefix, e.g. `http://localhost:5000/api`.
    pub base_url: Url,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Extra attempts for read-only lookups. Submissions are never retried.
    pub read_retries: u32,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("read_retries", &self.read_retries)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ENROLL_API_URL` (default: `http://localhost:5000/api`)
    /// - `ENROLL_API_TOKEN` (optional)
    /// - `ENROLL_TIMEOUT_SECS` (default: 30)
    /// - `ENROLL_READ_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_url("ENROLL_API_URL", DEFAULT_API_URL)?,
            api_token: std::env::var("ENROLL_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout_secs: std::env::var("ENROLL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            read_retries: std::env::var("ENROLL_READ_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_READ_RETRIES),
        })
    }

    /// Configuration pointing at a mock server, with a short timeout.
    pub fn local_mock(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            api_token: None,
            timeout_secs: 5,
            read_retries: DEFAULT_READ_RETRIES,
        })
    }

    /// Absolute URL for `path` (which starts with `/`) under the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("ENROLL_API_TOKEN contains characters not allowed in a header")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = ClientConfig::local_mock("http://127.0.0.1:9000/api").unwrap();
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.read_retries, 3);
        assert!(cfg.api_token.is_none());
        assert_eq!(cfg.endpoint("/user/subjects"), "http://127.0.0.1:9000/api/user/subjects");
    }

    #[test]
    fn endpoint_handles_trailing_slash() {
        let cfg = ClientConfig::local_mock("http://127.0.0.1:9000/").unwrap();
        assert_eq!(cfg.endpoint("/user/options"), "http://127.0.0.1:9000/user/options");
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("ENROLL_NONEXISTENT_VAR_12345", DEFAULT_API_URL).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api");
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("ENROLL_TEST_BAD_URL", "not a url");
        let result = env_url("ENROLL_TEST_BAD_URL", DEFAULT_API_URL);
        std::env::remove_var("ENROLL_TEST_BAD_URL");
        assert!(matches!(result, Err(ConfigError::InvalidUrl(var, _)) if var == "ENROLL_TEST_BAD_URL"));
    }

    #[test]
    fn debug_redacts_token() {
        let mut cfg = ClientConfig::local_mock("http://127.0.0.1:9000").unwrap();
        cfg.api_token = Some("s3cret".into());
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("s3cret"));
    }
}
