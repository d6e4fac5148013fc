//! Token refresh against the fixed refresh endpoint.
//!
//! The executor is a plain function of the refresh credential. It holds no
//! locks: the coordinator guarantees at most one call is in flight.

use crate::{
    credentials::{AccessCredential, RefreshCredential, TokenGrant},
    error::RefreshError,
    request::{RequestSpec, Response},
    transport::Transport,
};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, COOKIE, SET_COOKIE};
use serde::Deserialize;
use serde_json::json;
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tracing::{debug, instrument};

/// Cookie (and JSON field) the refresh credential travels in.
pub const REFRESH_COOKIE: &str = "refreshToken";

#[async_trait]
pub trait RefreshExecutor: Send + Sync {
    /// # Errors
    /// Returns an error if the server rejects the credential or the call fails.
    async fn refresh(&self, credential: &RefreshCredential) -> Result<TokenGrant, RefreshError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Seconds.
    expires_in: Option<u64>,
}

/// Calls the refresh endpoint through a [`Transport`]. The call never carries
/// an access token and never goes through the coordinator.
#[derive(Clone)]
pub struct HttpRefreshExecutor {
    transport: Arc<dyn Transport>,
    path: String,
}

impl HttpRefreshExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }

    fn build_request(&self, credential: &RefreshCredential) -> Result<RequestSpec, RefreshError> {
        let cookie = HeaderValue::from_str(&format!("{REFRESH_COOKIE}={}", credential.expose()))
            .map_err(|_| {
                RefreshError::InvalidResponse("refresh token is not a valid header value".into())
            })?;

        RequestSpec::post(self.path.clone())
            .header(COOKIE, cookie)
            .json(&json!({ "refreshToken": credential.expose() }))
            .map_err(|err| RefreshError::InvalidResponse(format!("failed to encode request: {err}")))
    }
}

#[async_trait]
impl RefreshExecutor for HttpRefreshExecutor {
    #[instrument(skip(self, credential), fields(path = %self.path))]
    async fn refresh(&self, credential: &RefreshCredential) -> Result<TokenGrant, RefreshError> {
        let request = self.build_request(credential)?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            debug!("refresh rejected: {}", response.status);
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        parse_grant(&response, SystemTime::now())
    }
}

fn parse_grant(response: &Response, now: SystemTime) -> Result<TokenGrant, RefreshError> {
    let body: RefreshResponse = response
        .json()
        .map_err(|err| RefreshError::InvalidResponse(format!("failed to decode response: {err}")))?;

    let access_token = body
        .access_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RefreshError::InvalidResponse("no accessToken found".to_string()))?;

    let mut access = AccessCredential::new(access_token);
    if let Some(expires_in) = body.expires_in {
        access = access.with_expires_at(now + Duration::from_secs(expires_in));
    }

    let refresh = body
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| rotated_cookie(response))
        .map(RefreshCredential::new);

    Ok(TokenGrant { access, refresh })
}

/// Refresh credential rotated through `Set-Cookie`, if any.
fn rotated_cookie(response: &Response) -> Option<String> {
    response
        .headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == REFRESH_COOKIE && !value.trim().is_empty())
                .then(|| value.trim().to_string())
        })
}
