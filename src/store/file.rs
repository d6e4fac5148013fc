//! JSON file store using the browser client's storage keys, so a token file
//! reads the same as the `accessToken` / `refreshToken` pair it replaces.

use super::TokenStore;
use crate::{
    credentials::{AccessCredential, Credentials, RefreshCredential},
    error::StoreError,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
}

impl From<StoredTokens> for Credentials {
    fn from(stored: StoredTokens) -> Self {
        let access = stored.access_token.filter(|t| !t.is_empty()).map(|token| {
            let access = AccessCredential::new(token);
            match stored.expires_at {
                Some(secs) => access.with_expires_at(UNIX_EPOCH + Duration::from_secs(secs)),
                None => access,
            }
        });
        Self {
            access,
            refresh: stored
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(RefreshCredential::new),
        }
    }
}

impl From<&Credentials> for StoredTokens {
    fn from(credentials: &Credentials) -> Self {
        Self {
            access_token: credentials
                .access
                .as_ref()
                .map(|a| a.expose().to_string()),
            refresh_token: credentials
                .refresh
                .as_ref()
                .map(|r| r.expose().to_string()),
            expires_at: credentials
                .access
                .as_ref()
                .and_then(|a| a.expires_at)
                .and_then(|at| at.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, contents: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension(format!(
            "tmp.{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_nanos())
        ));

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp)?;
        let written = file.write_all(contents).and_then(|()| file.sync_all());
        drop(file);
        if let Err(err) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<Credentials>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let stored: StoredTokens = serde_json::from_slice(&raw)?;
        let credentials = Credentials::from(stored);
        Ok((!credentials.is_empty()).then_some(credentials))
    }

    fn set(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(&StoredTokens::from(credentials))?;
        self.write_atomic(&payload)?;
        debug!("token file updated: {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("token file removed: {}", self.path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
