use crate::config::{CoordinatorConfig, DEFAULT_REFRESH_PATH};
use reqwest::StatusCode;
use std::{env, path::PathBuf, time::Duration};

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub base_url: Option<String>,
    pub token_file: PathBuf,
    pub refresh_path: String,
    pub auth_failure_statuses: Vec<StatusCode>,
    pub timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(token_file: PathBuf) -> Self {
        Self {
            base_url: None,
            token_file,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            auth_failure_statuses: vec![StatusCode::UNAUTHORIZED],
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_refresh_path(self.refresh_path.clone())
            .with_auth_failure_statuses(self.auth_failure_statuses.clone())
            .with_refresh_timeout(self.timeout * 3)
    }
}

/// `$XDG_CONFIG_HOME/reauth/tokens.json`, else `$HOME/.config/reauth/tokens.json`.
#[must_use]
pub fn default_token_file() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(env!("CARGO_PKG_NAME")).join("tokens.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(PathBuf::from("/tmp/tokens.json"));
        assert_eq!(args.token_file, PathBuf::from("/tmp/tokens.json"));
        assert!(args.base_url.is_none());

        let config = args.coordinator_config();
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
        assert_eq!(config.refresh_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_default_token_file() {
        temp_env::with_vars(
            [
                ("XDG_CONFIG_HOME", Some("/tmp/xdg")),
                ("HOME", Some("/home/ann")),
            ],
            || {
                assert_eq!(
                    default_token_file(),
                    PathBuf::from("/tmp/xdg/reauth/tokens.json")
                );
            },
        );

        temp_env::with_vars(
            [("XDG_CONFIG_HOME", None), ("HOME", Some("/home/ann"))],
            || {
                assert_eq!(
                    default_token_file(),
                    PathBuf::from("/home/ann/.config/reauth/tokens.json")
                );
            },
        );
    }
}
