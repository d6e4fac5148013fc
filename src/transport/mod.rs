pub mod http;

pub use self::http::HttpTransport;

use crate::{
    error::TransportError,
    request::{RequestSpec, Response},
};
use async_trait::async_trait;

/// Performs exactly one call. Any status code is a completed call; only a
/// failure to obtain a response is an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RequestSpec) -> Result<Response, TransportError>;
}
