use async_trait::async_trait;

use crate::call::{Body, Method};
use crate::error::TransportError;

/// A fully prepared request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
  pub method: Method,
  pub path: String,
  pub bearer_token: Option<String>,
  pub body: Body,
}

/// Status and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  pub status: u16,
  pub body: String,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Sends requests over the wire.
///
/// The dispatcher owns status mapping, timeouts and cancellation; a transport
/// only moves bytes. Implement this to point the dispatcher at something
/// other than a live server.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}
