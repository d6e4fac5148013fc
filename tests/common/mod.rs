#![allow(dead_code)]

use async_trait::async_trait;
use reauth::{
    AccessCredential, Coordinator, CoordinatorConfig, Credentials, MemoryTokenStore,
    RefreshCredential, RefreshError, RefreshExecutor, RequestSpec, Response, StoreError,
    TokenGrant, TokenStore, Transport, TransportError,
};
use reqwest::{header::AUTHORIZATION, StatusCode};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::{Notify, Semaphore};

/// One call as seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct Sent {
    pub path: String,
    pub authorization: Vec<String>,
}

/// Accepts `Bearer <valid>` and answers 401 to anything else.
///
/// Authorized calls get 200 unless a status was scripted for the path. The
/// first call to a held path waits on the [`Notify`] returned by `hold`.
pub struct ScriptedTransport {
    valid: Mutex<String>,
    statuses: Mutex<HashMap<String, StatusCode>>,
    unreachable: Mutex<Vec<String>>,
    held: Mutex<Option<(String, Arc<Notify>)>>,
    sent: Mutex<Vec<Sent>>,
}

impl ScriptedTransport {
    pub fn new(valid: &str) -> Arc<Self> {
        Arc::new(Self {
            valid: Mutex::new(valid.to_string()),
            statuses: Mutex::new(HashMap::new()),
            unreachable: Mutex::new(Vec::new()),
            held: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn set_valid(&self, token: &str) {
        *self.valid.lock().unwrap() = token.to_string();
    }

    pub fn respond(&self, path: &str, status: StatusCode) {
        self.statuses
            .lock()
            .unwrap()
            .insert(path.to_string(), status);
    }

    pub fn unreachable(&self, path: &str) {
        self.unreachable.lock().unwrap().push(path.to_string());
    }

    pub fn hold(&self, path: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.held.lock().unwrap() = Some((path.to_string(), notify.clone()));
        notify
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Calls sent with `Bearer <token>`.
    pub fn sent_with(&self, token: &str) -> usize {
        let expected = format!("Bearer {token}");
        self.sent()
            .iter()
            .filter(|s| s.authorization == [expected.clone()])
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: RequestSpec) -> Result<Response, TransportError> {
        let authorization: Vec<String> = request
            .headers
            .get_all(AUTHORIZATION)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();

        self.sent.lock().unwrap().push(Sent {
            path: request.path.clone(),
            authorization: authorization.clone(),
        });

        let authorized = authorization == [format!("Bearer {}", self.valid.lock().unwrap())];

        // only the first call to a held path waits
        let held = {
            let mut held = self.held.lock().unwrap();
            if held.as_ref().is_some_and(|(path, _)| *path == request.path) {
                held.take().map(|(_, notify)| notify)
            } else {
                None
            }
        };
        if let Some(notify) = held {
            notify.notified().await;
        }

        if self.unreachable.lock().unwrap().contains(&request.path) {
            return Err(TransportError::Network("connection refused".to_string()));
        }

        if !authorized {
            return Ok(Response::new(StatusCode::UNAUTHORIZED).with_body("unauthorized"));
        }

        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(&request.path)
            .copied()
            .unwrap_or(StatusCode::OK);

        Ok(Response::new(status).with_body(request.path))
    }
}

/// Refresh executor that blocks until released and counts invocations.
pub struct GatedExecutor {
    outcome: Result<TokenGrant, RefreshError>,
    gate: Semaphore,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl GatedExecutor {
    /// Blocks every refresh until [`GatedExecutor::release`].
    pub fn gated(outcome: Result<TokenGrant, RefreshError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn open(outcome: Result<TokenGrant, RefreshError>) -> Arc<Self> {
        let executor = Self::gated(outcome);
        executor.release();
        executor
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens the executor was called with.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefreshExecutor for GatedExecutor {
    async fn refresh(&self, credential: &RefreshCredential) -> Result<TokenGrant, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push(credential.expose().to_string());

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| RefreshError::InvalidResponse("gate closed".to_string()))?;

        self.outcome.clone()
    }
}

/// Refresh executor whose task dies without an outcome.
pub struct PanickingExecutor;

#[async_trait]
impl RefreshExecutor for PanickingExecutor {
    async fn refresh(&self, _credential: &RefreshCredential) -> Result<TokenGrant, RefreshError> {
        panic!("refresh task died");
    }
}

/// In-memory store counting writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryTokenStore,
    sets: AtomicUsize,
    clears: AtomicUsize,
}

impl CountingStore {
    pub fn with(credentials: Credentials) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTokenStore::new(Some(credentials)),
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Option<Credentials> {
        self.inner.get().unwrap()
    }
}

impl TokenStore for CountingStore {
    fn get(&self) -> Result<Option<Credentials>, StoreError> {
        self.inner.get()
    }

    fn set(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(credentials)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

pub fn signed_in(access: &str, refresh: &str) -> Credentials {
    Credentials::new(
        AccessCredential::new(access),
        Some(RefreshCredential::new(refresh)),
    )
}

pub fn grant(access: &str) -> Result<TokenGrant, RefreshError> {
    Ok(TokenGrant {
        access: AccessCredential::new(access),
        refresh: None,
    })
}

pub fn coordinator(
    transport: &Arc<ScriptedTransport>,
    executor: &Arc<GatedExecutor>,
    store: &Arc<CountingStore>,
) -> Coordinator {
    coordinator_with(CoordinatorConfig::default(), transport, executor, store)
}

pub fn coordinator_with(
    config: CoordinatorConfig,
    transport: &Arc<ScriptedTransport>,
    executor: &Arc<GatedExecutor>,
    store: &Arc<CountingStore>,
) -> Coordinator {
    Coordinator::new(
        config,
        transport.clone(),
        executor.clone(),
        store.clone(),
    )
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
