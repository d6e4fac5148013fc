//! Coordinator configuration. Status codes, the refresh endpoint path and the
//! header scheme live here so no call site hard-codes them.

use reqwest::{
    header::{HeaderName, AUTHORIZATION},
    StatusCode,
};
use std::time::Duration;

pub const DEFAULT_REFRESH_PATH: &str = "/v1/auth/update-tokens";
pub const DEFAULT_AUTH_SCHEME: &str = "Bearer";
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub auth_failure_statuses: Vec<StatusCode>,
    pub refresh_path: String,
    pub auth_header: HeaderName,
    /// Prefix before the token, empty to send the bare token.
    pub auth_scheme: String,
    pub refresh_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            auth_failure_statuses: vec![StatusCode::UNAUTHORIZED],
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            auth_header: AUTHORIZATION,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn with_auth_failure_statuses(mut self, statuses: Vec<StatusCode>) -> Self {
        if !statuses.is_empty() {
            self.auth_failure_statuses = statuses;
        }
        self
    }

    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    #[must_use]
    pub fn with_auth_header(mut self, header: HeaderName, scheme: impl Into<String>) -> Self {
        self.auth_header = header;
        self.auth_scheme = scheme.into();
        self
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn is_auth_failure(&self, status: StatusCode) -> bool {
        self.auth_failure_statuses.contains(&status)
    }

    /// Whether `path` addresses the refresh endpoint, ignoring any query string
    /// and a trailing slash. Absolute URLs are matched on their path.
    #[must_use]
    pub fn is_refresh_path(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match url::Url::parse(path) {
            Ok(url) => url.path().to_string(),
            Err(_) => path.to_string(),
        };
        normalize(&path) == normalize(&self.refresh_path)
    }

    /// Header value for `token`, including the scheme prefix.
    pub(crate) fn auth_value(&self, token: &str) -> String {
        if self.auth_scheme.is_empty() {
            token.to_string()
        } else {
            format!("{} {token}", self.auth_scheme)
        }
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim().trim_end_matches('/');
    trimmed.strip_prefix('/').unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CoordinatorConfig::default();
        assert!(config.is_auth_failure(StatusCode::UNAUTHORIZED));
        assert!(!config.is_auth_failure(StatusCode::FORBIDDEN));
        assert_eq!(config.auth_value("t1"), "Bearer t1");
        assert_eq!(config.refresh_timeout, Duration::from_secs(30));
    }

    #[test]
    fn empty_status_list_keeps_default() {
        let config = CoordinatorConfig::default().with_auth_failure_statuses(vec![]);
        assert_eq!(config.auth_failure_statuses, vec![StatusCode::UNAUTHORIZED]);

        let config = CoordinatorConfig::default()
            .with_auth_failure_statuses(vec![StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN]);
        assert!(config.is_auth_failure(StatusCode::FORBIDDEN));
    }

    #[test]
    fn refresh_path_matching() {
        let config = CoordinatorConfig::default();
        assert!(config.is_refresh_path("/v1/auth/update-tokens"));
        assert!(config.is_refresh_path("v1/auth/update-tokens/"));
        assert!(config.is_refresh_path("/v1/auth/update-tokens?x=1"));
        assert!(config.is_refresh_path("https://api.example.com/v1/auth/update-tokens"));
        assert!(!config.is_refresh_path("/v1/auth/me"));
    }

    #[test]
    fn bare_token_without_scheme() {
        let config =
            CoordinatorConfig::default().with_auth_header(HeaderName::from_static("x-token"), "");
        assert_eq!(config.auth_value("t1"), "t1");
        assert_eq!(config.auth_header.as_str(), "x-token");
    }
}
