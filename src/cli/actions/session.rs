use crate::{
    cli::globals::GlobalArgs, AccessCredential, Credentials, FileTokenStore, RefreshCredential,
    TokenStore,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, SystemTime};
use tracing::info;

#[derive(Debug)]
pub struct LoginArgs {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<u64>,
}

impl LoginArgs {
    fn credentials(&self, now: SystemTime) -> Credentials {
        let access = self.access_token.as_ref().map(|token| {
            let access = AccessCredential::new(token.expose_secret());
            match self.expires_in {
                Some(secs) => access.with_expires_at(now + Duration::from_secs(secs)),
                None => access,
            }
        });

        Credentials {
            access,
            refresh: self
                .refresh_token
                .as_ref()
                .map(|token| RefreshCredential::new(token.expose_secret())),
        }
    }
}

/// Write the given credentials to the token file.
/// # Errors
/// Returns an error if the token file can't be written.
pub fn login(args: LoginArgs, globals: &GlobalArgs) -> Result<()> {
    let store = FileTokenStore::new(globals.token_file.clone());
    let credentials = args.credentials(SystemTime::now());

    store
        .set(&credentials)
        .with_context(|| format!("failed to write {}", store.path().display()))?;

    info!(token_file = %store.path().display(), "credentials stored");
    println!("credentials stored in {}", store.path().display());

    Ok(())
}

/// # Errors
/// Returns an error if the token file exists but can't be removed.
pub fn logout(globals: &GlobalArgs) -> Result<()> {
    let store = FileTokenStore::new(globals.token_file.clone());

    store
        .clear()
        .with_context(|| format!("failed to remove {}", store.path().display()))?;

    println!("signed out");

    Ok(())
}

/// Print which credentials are stored. Tokens are never printed.
/// # Errors
/// Returns an error if the token file can't be read.
pub fn status(globals: &GlobalArgs) -> Result<()> {
    let store = FileTokenStore::new(globals.token_file.clone());

    let credentials = store
        .get()
        .with_context(|| format!("failed to read {}", store.path().display()))?;

    println!("{}", describe(credentials.as_ref(), SystemTime::now()));

    Ok(())
}

fn describe(credentials: Option<&Credentials>, now: SystemTime) -> String {
    let Some(credentials) = credentials else {
        return "signed out".to_string();
    };

    let access = match &credentials.access {
        None => "access token: none".to_string(),
        Some(access) => match access.expires_at {
            None => "access token: present".to_string(),
            Some(_) if access.is_expired_at(now) => "access token: expired".to_string(),
            Some(at) => format!(
                "access token: expires in {}s",
                at.duration_since(now).map_or(0, |d| d.as_secs())
            ),
        },
    };

    let refresh = if credentials.refresh.is_some() {
        "refresh token: present"
    } else {
        "refresh token: none"
    };

    format!("{access}\n{refresh}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn login_args(access: Option<&str>, refresh: Option<&str>) -> LoginArgs {
        LoginArgs {
            access_token: access.map(|t| SecretString::from(t.to_string())),
            refresh_token: refresh.map(|t| SecretString::from(t.to_string())),
            expires_in: Some(60),
        }
    }

    fn globals(path: PathBuf) -> GlobalArgs {
        GlobalArgs::new(path)
    }

    #[test]
    fn login_then_logout() {
        let dir = tempfile::tempdir().unwrap();
        let globals = globals(dir.path().join("reauth").join("tokens.json"));

        login(login_args(Some("t1"), Some("r1")), &globals).unwrap();

        let stored = FileTokenStore::new(globals.token_file.clone())
            .get()
            .unwrap()
            .unwrap();
        assert_eq!(stored.access.unwrap().expose(), "t1");
        assert_eq!(stored.refresh.unwrap().expose(), "r1");

        logout(&globals).unwrap();
        assert!(!globals.token_file.exists());

        // already signed out
        logout(&globals).unwrap();
        status(&globals).unwrap();
    }

    #[test]
    fn refresh_only_login() {
        let now = SystemTime::now();
        let credentials = login_args(None, Some("r1")).credentials(now);
        assert!(credentials.access.is_none());
        assert_eq!(credentials.refresh.unwrap().expose(), "r1");
    }

    #[test]
    fn describe_never_prints_tokens() {
        let now = SystemTime::now();
        let credentials = login_args(Some("secret-access"), Some("secret-refresh")).credentials(now);

        let text = describe(Some(&credentials), now);
        assert!(text.contains("access token: expires in 60s"));
        assert!(text.contains("refresh token: present"));
        assert!(!text.contains("secret"));

        assert_eq!(describe(None, now), "signed out");
    }

    #[test]
    fn describe_expired_access() {
        let now = SystemTime::now();
        let credentials = Credentials::new(
            AccessCredential::new("t1").with_expires_at(now - Duration::from_secs(1)),
            None,
        );
        let text = describe(Some(&credentials), now);
        assert!(text.contains("access token: expired"));
        assert!(text.contains("refresh token: none"));
    }
}
