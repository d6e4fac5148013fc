use secrecy::{ExposeSecret, SecretString};
use std::time::SystemTime;

/// Short-lived token attached to every API call.
#[derive(Debug, Clone)]
pub struct AccessCredential {
    pub token: SecretString,
    pub expires_at: Option<SystemTime>,
}

impl AccessCredential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Unknown expiry is never considered expired.
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Longer-lived token used only against the refresh endpoint.
#[derive(Debug, Clone)]
pub struct RefreshCredential {
    pub token: SecretString,
}

impl RefreshCredential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Credential pair as mirrored to the token store.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub access: Option<AccessCredential>,
    pub refresh: Option<RefreshCredential>,
}

impl Credentials {
    #[must_use]
    pub fn new(access: AccessCredential, refresh: Option<RefreshCredential>) -> Self {
        Self {
            access: Some(access),
            refresh,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// Install a refresh result; the refresh credential is kept unless rotated.
    #[must_use]
    pub fn apply(self, grant: TokenGrant) -> Self {
        Self {
            access: Some(grant.access),
            refresh: grant.refresh.or(self.refresh),
        }
    }
}

/// Successful refresh result.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access: AccessCredential,
    /// Present when the server rotated the refresh credential.
    pub refresh: Option<RefreshCredential>,
}
