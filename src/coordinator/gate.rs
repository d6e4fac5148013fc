//! Single-flight refresh gate.
//!
//! One mutex guards both the credentials and the refresh state, so "is a
//! refresh running?" and "which token is current?" are always answered
//! together. Two authorization failures racing each other can never both
//! decide to start a refresh.
//!
//! Flow Overview:
//! 1. Before its first attempt a request takes a [`Snapshot`]: the current
//!    access credential and the credential epoch.
//! 2. On an authorization failure the request calls [`Gate::join`]:
//!    - `Refreshing`: it is queued behind the running cycle.
//!    - `Idle`, epoch moved on: a cycle already resolved since the attempt was
//!      sent, so it replays with the installed token (or learns the session
//!      expired) without another refresh.
//!    - `Idle`, same epoch: it starts a new cycle and is its first waiter.
//! 3. The cycle task calls [`Gate::complete`], which mirrors the result to the
//!    token store, returns the gate to `Idle` and wakes waiters in FIFO order.
//!
//! Dropping a [`Ticket`] before its cycle resolves removes the waiter from the
//! queue; other waiters are unaffected.

use crate::{
    credentials::{AccessCredential, Credentials, RefreshCredential, TokenGrant},
    error::RefreshError,
    store::TokenStore,
    sync::MutexExt,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{sync::oneshot, time::Instant};
use tracing::{debug, error, info, warn};

/// What every waiter of one cycle receives.
pub(crate) type CycleOutcome = Result<AccessCredential, RefreshError>;

/// Observable gate state, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Idle,
    Refreshing {
        cycle: u64,
        waiters: usize,
        elapsed: Duration,
    },
}

impl RefreshStatus {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn waiters(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Refreshing { waiters, .. } => *waiters,
        }
    }
}

struct Waiter {
    id: u64,
    notify: oneshot::Sender<CycleOutcome>,
}

enum RefreshState {
    Idle,
    Refreshing {
        cycle: u64,
        started_at: Instant,
        waiters: VecDeque<Waiter>,
    },
}

struct GateState {
    credentials: Credentials,
    /// Bumped on every credential change.
    epoch: u64,
    refresh: RefreshState,
    next_cycle: u64,
    next_waiter: u64,
}

pub(crate) struct Gate {
    state: Mutex<GateState>,
}

/// Credentials as seen by one attempt.
pub(crate) struct Snapshot {
    pub epoch: u64,
    pub access: Option<AccessCredential>,
}

/// A refresh cycle the caller must run.
pub(crate) struct Cycle {
    pub id: u64,
    pub refresh: Option<RefreshCredential>,
}

pub(crate) enum Join {
    Replay(AccessCredential),
    Expired,
    Wait {
        ticket: Ticket,
        /// Set only for the request that started the cycle.
        cycle: Option<Cycle>,
    },
}

impl Gate {
    pub(crate) fn new(credentials: Credentials) -> Self {
        Self {
            state: Mutex::new(GateState {
                credentials,
                epoch: 0,
                refresh: RefreshState::Idle,
                next_cycle: 1,
                next_waiter: 1,
            }),
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let state = self.state.lock_or_recover();
        Snapshot {
            epoch: state.epoch,
            access: state.credentials.access.clone(),
        }
    }

    pub(crate) fn status(&self) -> RefreshStatus {
        let state = self.state.lock_or_recover();
        match &state.refresh {
            RefreshState::Idle => RefreshStatus::Idle,
            RefreshState::Refreshing {
                cycle,
                started_at,
                waiters,
            } => RefreshStatus::Refreshing {
                cycle: *cycle,
                waiters: waiters.len(),
                elapsed: started_at.elapsed(),
            },
        }
    }

    /// Called after an authorization failure on an attempt sent at `seen_epoch`.
    pub(crate) fn join(self: &Arc<Self>, seen_epoch: u64) -> Join {
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;

        if matches!(state.refresh, RefreshState::Idle) && state.epoch != seen_epoch {
            return match &state.credentials.access {
                Some(access) => Join::Replay(access.clone()),
                None => Join::Expired,
            };
        }

        let id = state.next_waiter;
        state.next_waiter += 1;
        let (notify, receiver) = oneshot::channel();
        let waiter = Waiter { id, notify };

        let cycle = match &mut state.refresh {
            RefreshState::Refreshing { cycle, waiters, .. } => {
                waiters.push_back(waiter);
                debug!(cycle = *cycle, waiters = waiters.len(), "queued behind refresh");
                None
            }
            RefreshState::Idle => {
                let cycle = state.next_cycle;
                state.next_cycle += 1;
                state.refresh = RefreshState::Refreshing {
                    cycle,
                    started_at: Instant::now(),
                    waiters: VecDeque::from([waiter]),
                };
                debug!(cycle, "refresh cycle started");
                Some(Cycle {
                    id: cycle,
                    refresh: state.credentials.refresh.clone(),
                })
            }
        };

        Join::Wait {
            ticket: Ticket {
                id,
                receiver,
                gate: Arc::clone(self),
            },
            cycle,
        }
    }

    /// Resolve `cycle`: persist, return to `Idle`, then wake waiters in order.
    pub(crate) fn complete(
        &self,
        cycle: u64,
        outcome: Result<TokenGrant, RefreshError>,
        store: &dyn TokenStore,
    ) {
        // The store write happens under the gate lock, which serializes writes
        // and makes them visible before any waiter is woken. A slow store
        // (fsync) stalls concurrent snapshot/join calls for that long.
        let (waiters, delivered) = {
            let mut state = self.state.lock_or_recover();

            let (started_at, waiters) =
                match std::mem::replace(&mut state.refresh, RefreshState::Idle) {
                    RefreshState::Refreshing {
                        cycle: current,
                        started_at,
                        waiters,
                    } if current == cycle => (started_at, waiters),
                    other => {
                        state.refresh = other;
                        error!(cycle, "refresh completed for a cycle the gate is not running");
                        return;
                    }
                };

            state.epoch += 1;

            let delivered = match outcome {
                Ok(grant) => {
                    let access = grant.access.clone();
                    let credentials = std::mem::take(&mut state.credentials).apply(grant);
                    if let Err(err) = store.set(&credentials) {
                        warn!("failed to persist refreshed credentials: {}", err);
                    }
                    state.credentials = credentials;
                    info!(
                        cycle,
                        waiters = waiters.len(),
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        "access token refreshed"
                    );
                    Ok(access)
                }
                Err(err) => {
                    state.credentials = Credentials::default();
                    if let Err(store_err) = store.clear() {
                        warn!("failed to clear stored credentials: {}", store_err);
                    }
                    warn!(
                        cycle,
                        waiters = waiters.len(),
                        "refresh failed, session expired: {}",
                        err
                    );
                    Err(err)
                }
            };

            (waiters, delivered)
        };

        for waiter in waiters {
            // A waiter whose caller went away between dequeue and send is skipped.
            let _ = waiter.notify.send(delivered.clone());
        }
    }

    /// Reset a cycle whose task ended without completing. Waiters observe a
    /// closed channel.
    pub(crate) fn abandon(&self, cycle: u64) {
        let mut state = self.state.lock_or_recover();
        if let RefreshState::Refreshing { cycle: current, .. } = &state.refresh {
            if *current == cycle {
                error!(cycle, "refresh cycle ended without an outcome");
                state.refresh = RefreshState::Idle;
            }
        }
    }

    /// Queued waiter ids, front first.
    #[cfg(test)]
    fn queued(&self) -> Vec<u64> {
        match &self.state.lock_or_recover().refresh {
            RefreshState::Idle => Vec::new(),
            RefreshState::Refreshing { waiters, .. } => waiters.iter().map(|w| w.id).collect(),
        }
    }

    fn cancel(&self, waiter: u64) {
        let mut state = self.state.lock_or_recover();
        if let RefreshState::Refreshing { cycle, waiters, .. } = &mut state.refresh {
            let before = waiters.len();
            waiters.retain(|w| w.id != waiter);
            if waiters.len() != before {
                debug!(cycle = *cycle, waiter, "waiter cancelled");
            }
        }
    }
}

/// A queued waiter. Dropping it unqueues the waiter.
pub(crate) struct Ticket {
    id: u64,
    receiver: oneshot::Receiver<CycleOutcome>,
    gate: Arc<Gate>,
}

impl Ticket {
    /// `Err` means the cycle was abandoned.
    pub(crate) async fn wait(mut self) -> Result<CycleOutcome, oneshot::error::RecvError> {
        (&mut self.receiver).await
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.gate.cancel(self.id);
    }
}

/// Abandons its cycle when dropped; a no-op once the cycle completed.
pub(crate) struct CycleGuard {
    gate: Arc<Gate>,
    cycle: u64,
}

impl CycleGuard {
    pub(crate) fn new(gate: Arc<Gate>, cycle: u64) -> Self {
        Self { gate, cycle }
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.gate.abandon(self.cycle);
    }
}
