use crate::cli::{
    actions::{request, session, Action},
    globals::{default_token_file, GlobalArgs},
};
use anyhow::{anyhow, Context, Result};
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let globals = globals(matches)?;

    let action = match matches.subcommand() {
        Some(("request", sub_m)) => {
            if globals.base_url.is_none() {
                return Err(anyhow!("missing required argument: --base-url"));
            }
            Action::Request(request_args(sub_m)?)
        }
        Some(("login", sub_m)) => Action::Login(session::LoginArgs {
            access_token: sub_m
                .get_one::<String>("access-token")
                .map(|t| SecretString::from(t.clone())),
            refresh_token: sub_m
                .get_one::<String>("refresh-token")
                .map(|t| SecretString::from(t.clone())),
            expires_in: sub_m.get_one::<u64>("expires-in").copied(),
        }),
        Some(("logout", _)) => Action::Logout,
        Some(("status", _)) => Action::Status,
        _ => return Err(anyhow!("missing subcommand")),
    };

    Ok((action, globals))
}

fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let token_file = matches
        .get_one::<String>("token-file")
        .map_or_else(default_token_file, PathBuf::from);

    let mut globals = GlobalArgs::new(token_file);
    globals.base_url = matches.get_one::<String>("base-url").cloned();

    if let Some(path) = matches.get_one::<String>("refresh-path") {
        globals.refresh_path.clone_from(path);
    }

    if let Some(statuses) = matches.get_many::<u16>("auth-failure-status") {
        globals.auth_failure_statuses = statuses
            .map(|code| {
                StatusCode::from_u16(*code).with_context(|| format!("invalid status code {code}"))
            })
            .collect::<Result<Vec<_>>>()?;
    }

    if let Some(secs) = matches.get_one::<u64>("timeout") {
        globals.timeout = Duration::from_secs(*secs);
    }

    Ok(globals)
}

fn request_args(matches: &clap::ArgMatches) -> Result<request::Args> {
    let path = matches
        .get_one::<String>("path")
        .cloned()
        .context("missing required argument: <PATH>")?;

    let method = matches
        .get_one::<String>("method")
        .map_or("GET", String::as_str);
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("invalid method {method}"))?;

    let headers = matches
        .get_many::<String>("header")
        .map(|values| values.map(|h| parse_header(h)).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    Ok(request::Args {
        method,
        path,
        headers,
        body: matches.get_one::<String>("data").cloned(),
    })
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid header {raw:?}, expected 'Name: value'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("invalid header {raw:?}, empty name"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
