//! Authenticated request coordinator.
//!
//! Every call goes out with the current access credential. An authorization
//! failure sends the call through the refresh gate (see [`gate`]); once the
//! shared refresh cycle resolves, the call is replayed exactly once with the
//! token that cycle installed. A second authorization failure is terminal.
//!
//! State machine: `Idle --(auth failure)--> Refreshing --(success|failure)--> Idle`.
//!
//! Refresh cycles and transport calls run in spawned tasks. A caller that
//! abandons `execute` therefore never cancels a refresh other callers are
//! waiting on, and a transport call already on the wire finishes with its
//! result discarded.

pub mod gate;

pub use self::gate::RefreshStatus;

use self::gate::{CycleGuard, Gate, Join};
use crate::{
    config::CoordinatorConfig,
    credentials::{AccessCredential, Credentials, RefreshCredential},
    error::{CoordinatorError, RefreshError},
    refresh::RefreshExecutor,
    request::{RequestSpec, Response},
    store::TokenStore,
    transport::Transport,
};
use reqwest::header::HeaderValue;
use std::{fmt, sync::Arc, time::SystemTime};
use tokio::time::timeout;
use tracing::{debug, instrument, warn, Instrument};
use ulid::Ulid;

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: CoordinatorConfig,
    transport: Arc<dyn Transport>,
    executor: Arc<dyn RefreshExecutor>,
    store: Arc<dyn TokenStore>,
    gate: Arc<Gate>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.inner.config)
            .field("refresh", &self.inner.gate.status())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Credentials are read from `store` once, here. An unreadable store is
    /// treated as empty.
    #[must_use]
    pub fn new(
        config: CoordinatorConfig,
        transport: Arc<dyn Transport>,
        executor: Arc<dyn RefreshExecutor>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let credentials = match store.get() {
            Ok(credentials) => credentials.unwrap_or_default(),
            Err(err) => {
                warn!("failed to load stored credentials, starting signed out: {}", err);
                Credentials::default()
            }
        };

        if credentials.is_empty() {
            debug!("no stored credentials");
        }

        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                executor,
                store,
                gate: Arc::new(Gate::new(credentials)),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn refresh_status(&self) -> RefreshStatus {
        self.inner.gate.status()
    }

    /// Current access credential, if any.
    #[must_use]
    pub fn access_credential(&self) -> Option<AccessCredential> {
        self.inner.gate.snapshot().access
    }

    /// Run one call through the refresh gate.
    ///
    /// Non-authorization outcomes of the first attempt (any status other than
    /// the configured authorization-failure codes) are returned unchanged.
    ///
    /// # Errors
    /// - `Network` if the transport could not complete a call.
    /// - `AuthorizationFailure` if the replay was unauthorized too, or the
    ///   call targeted the refresh endpoint.
    /// - `SessionExpired` if the refresh cycle failed.
    #[instrument(
        skip_all,
        fields(
            request_id = %Ulid::new(),
            method = %request.method,
            path = %request.path,
        )
    )]
    pub async fn execute(&self, request: RequestSpec) -> Result<Response, CoordinatorError> {
        let config = &self.inner.config;
        let attempt = self.inner.gate.snapshot();

        if let Some(access) = &attempt.access {
            if access.is_expired_at(SystemTime::now()) {
                debug!("sending with an access token past its recorded expiry");
            }
        }

        let first = self
            .dispatch(self.authorize(&request, attempt.access.as_ref())?)
            .await?;

        if !config.is_auth_failure(first.status) {
            return Ok(first);
        }

        if config.is_refresh_path(&request.path) {
            // Refresh calls never wait on the gate they would have to open.
            return Err(authorization_failure(first));
        }

        debug!(status = %first.status, "authorization failure");

        let access = match self.inner.gate.join(attempt.epoch) {
            Join::Replay(access) => {
                debug!("credentials changed since the attempt was sent, replaying");
                access
            }
            Join::Expired => {
                return Err(CoordinatorError::SessionExpired(
                    RefreshError::MissingRefreshToken,
                ))
            }
            Join::Wait { ticket, cycle } => {
                if let Some(cycle) = cycle {
                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(
                        async move { inner.run_cycle(cycle.id, cycle.refresh).await }
                            .in_current_span(),
                    );
                }

                match ticket.wait().await {
                    Ok(Ok(access)) => access,
                    Ok(Err(err)) => return Err(CoordinatorError::SessionExpired(err)),
                    Err(_) => {
                        return Err(CoordinatorError::Internal(
                            "refresh cycle ended without an outcome".to_string(),
                        ))
                    }
                }
            }
        };

        let replay = self.dispatch(self.authorize(&request, Some(&access))?).await?;

        if config.is_auth_failure(replay.status) {
            debug!(status = %replay.status, "replay still unauthorized");
            return Err(authorization_failure(replay));
        }

        Ok(replay)
    }

    fn authorize(
        &self,
        request: &RequestSpec,
        access: Option<&AccessCredential>,
    ) -> Result<RequestSpec, CoordinatorError> {
        let config = &self.inner.config;
        let value = match access {
            Some(access) => {
                let mut value = HeaderValue::from_str(&config.auth_value(access.expose()))
                    .map_err(|_| {
                        CoordinatorError::InvalidCredential(
                            "access token is not a valid header value".to_string(),
                        )
                    })?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        Ok(request.authorized(&config.auth_header, value))
    }

    /// Send on a detached task; dropping the caller discards the result.
    async fn dispatch(&self, request: RequestSpec) -> Result<Response, CoordinatorError> {
        let transport = Arc::clone(&self.inner.transport);
        let handle =
            tokio::spawn(async move { transport.send(request).await }.in_current_span());

        match handle.await {
            Ok(result) => Ok(result?),
            Err(err) => Err(CoordinatorError::Internal(format!(
                "transport task failed: {err}"
            ))),
        }
    }
}

impl Inner {
    #[instrument(skip(self, refresh))]
    async fn run_cycle(self: Arc<Self>, cycle: u64, refresh: Option<RefreshCredential>) {
        let _guard = CycleGuard::new(Arc::clone(&self.gate), cycle);

        let outcome = match refresh {
            None => Err(RefreshError::MissingRefreshToken),
            Some(credential) => {
                match timeout(self.config.refresh_timeout, self.executor.refresh(&credential))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RefreshError::Timeout),
                }
            }
        };

        self.gate.complete(cycle, outcome, self.store.as_ref());
    }
}

fn authorization_failure(response: Response) -> CoordinatorError {
    CoordinatorError::AuthorizationFailure {
        status: response.status,
        response: Box::new(response),
    }
}
