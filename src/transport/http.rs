//! reqwest-backed transport.
//!
//! Relative paths are joined onto the configured base URL (keeping any path
//! prefix the base carries, e.g. `https://api.example.com/api`); absolute
//! `http(s)://` paths are sent as-is. Timeouts are applied per call so a
//! stalled server surfaces as `TransportError::Timeout` instead of a hang.

use super::Transport;
use crate::{
    error::TransportError,
    request::{RequestSpec, Response},
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// # Errors
    /// Returns an error if `base_url` is not an http(s) URL with a host, or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// # Errors
    /// Same as [`HttpTransport::new`].
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// # Errors
    /// Returns an error if `path` cannot be joined onto the base URL.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, TransportError> {
        endpoint_url(&self.base_url, path)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, TransportError> {
    let url = Url::parse(raw.trim()).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme {scheme}"
            )))
        }
    }

    if url.host().is_none() {
        return Err(TransportError::InvalidUrl(format!(
            "{raw}: no host specified"
        )));
    }

    Ok(url)
}

fn endpoint_url(base: &Url, path: &str) -> Result<Url, TransportError> {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path).map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")));
    }

    // Url::join would drop the base path prefix for paths starting with '/'.
    let mut joined = base.clone();
    joined.set_fragment(None);
    let prefix = base.path().trim_end_matches('/');
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };
    joined.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
    joined.set_query(query);

    debug!("endpoint URL: {}", joined);

    Ok(joined)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RequestSpec) -> Result<Response, TransportError> {
        let url = self.endpoint_url(&request.path)?;
        debug!("request: {} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
