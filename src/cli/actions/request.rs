use crate::{
    cli::globals::GlobalArgs, Coordinator, CoordinatorError, FileTokenStore, HttpRefreshExecutor,
    HttpTransport, RequestSpec, Response,
};
use anyhow::{anyhow, Context, Result};
use reqwest::{
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    Method,
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Send one call through a coordinator backed by the token file.
/// # Errors
/// Returns an error if the call fails or the response is not a success.
pub async fn execute(args: Args, globals: &GlobalArgs) -> Result<()> {
    let base_url = globals
        .base_url
        .as_deref()
        .context("missing required argument: --base-url")?;

    let config = globals.coordinator_config();
    let transport = Arc::new(HttpTransport::with_timeout(base_url, globals.timeout)?);
    let executor = Arc::new(HttpRefreshExecutor::new(
        transport.clone(),
        config.refresh_path.clone(),
    ));
    let store = Arc::new(FileTokenStore::new(globals.token_file.clone()));

    debug!(token_file = %globals.token_file.display(), "using token file");

    let coordinator = Coordinator::new(config, transport, executor, store);

    let response = match coordinator.execute(build_request(args)?).await {
        Ok(response) => response,
        Err(CoordinatorError::SessionExpired(err)) => {
            return Err(anyhow!("session expired ({err}), sign in again with `login`"));
        }
        Err(CoordinatorError::AuthorizationFailure { response, .. }) => {
            print_response(&response);
            return Err(anyhow!("not authorized ({})", response.status));
        }
        Err(err) => return Err(err.into()),
    };

    info!(status = %response.status, "request completed");
    print_response(&response);

    if response.is_success() {
        Ok(())
    } else {
        Err(anyhow!("request failed ({})", response.status))
    }
}

fn build_request(args: Args) -> Result<RequestSpec> {
    let mut request = RequestSpec::new(args.method, args.path);

    for (name, value) in args.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name {name:?}"))?;
        let value = HeaderValue::from_str(&value)
            .with_context(|| format!("invalid value for header {name}"))?;
        request = request.header(name, value);
    }

    if let Some(body) = args.body {
        if !request.headers.contains_key(CONTENT_TYPE)
            && serde_json::from_str::<serde_json::Value>(&body).is_ok()
        {
            request = request.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        request = request.body(body);
    }

    Ok(request)
}

fn print_response(response: &Response) {
    eprintln!("{}", response.status);
    if !response.body.is_empty() {
        println!("{}", response.text());
    }
}
