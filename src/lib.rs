//! # reauth
//!
//! Authenticated request coordinator: every outbound API call carries the
//! current short-lived access token, and an authorization failure triggers a
//! single shared token refresh followed by one replay of the failed call.
//!
//! Many calls racing the same expiry share one refresh (single-flight). If the
//! refresh fails, all of them receive [`CoordinatorError::SessionExpired`] and
//! the stored credentials are cleared; deciding to sign the user out is left
//! to the caller.
//!
//! ```no_run
//! use reauth::{
//!     Coordinator, CoordinatorConfig, FileTokenStore, HttpRefreshExecutor, HttpTransport,
//!     RequestSpec,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = CoordinatorConfig::default();
//! let transport = Arc::new(HttpTransport::new("https://api.example.com/api")?);
//! let executor = Arc::new(HttpRefreshExecutor::new(
//!     transport.clone(),
//!     config.refresh_path.clone(),
//! ));
//! let store = Arc::new(FileTokenStore::new("/tmp/tokens.json"));
//!
//! let coordinator = Coordinator::new(config, transport, executor, store);
//! let response = coordinator.execute(RequestSpec::get("/v1/users/me")).await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod refresh;
pub mod request;
pub mod store;
mod sync;
pub mod transport;

pub use self::config::CoordinatorConfig;
pub use self::coordinator::{Coordinator, RefreshStatus};
pub use self::credentials::{AccessCredential, Credentials, RefreshCredential, TokenGrant};
pub use self::error::{CoordinatorError, RefreshError, StoreError, TransportError};
pub use self::refresh::{HttpRefreshExecutor, RefreshExecutor};
pub use self::request::{RequestSpec, Response};
pub use self::store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use self::transport::{HttpTransport, Transport};
