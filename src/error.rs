use crate::request::Response;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure to complete a single transport call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("unable to reach the server: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Why a refresh cycle could not produce a new access credential.
///
/// Cloned once per waiter: every request queued against a failed cycle
/// receives the same value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh credential available")]
    MissingRefreshToken,
    #[error("refresh endpoint rejected the credential ({status})")]
    Rejected { status: StatusCode },
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),
    #[error("refresh transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("refresh timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("token store is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// Outcome of [`crate::Coordinator::execute`] when no usable response exists.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Network(#[from] TransportError),
    /// The call was still unauthorized after its single replay, or it targeted
    /// the refresh endpoint itself.
    #[error("authorization failed ({status})")]
    AuthorizationFailure {
        status: StatusCode,
        response: Box<Response>,
    },
    /// The refresh cycle failed and stored credentials were cleared.
    #[error("session expired: {0}")]
    SessionExpired(#[source] RefreshError),
    /// The stored access credential cannot be sent as a header value.
    #[error("invalid access credential: {0}")]
    InvalidCredential(String),
    /// Internal invariant violation, never produced by expected failures.
    #[error("internal coordinator error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}
