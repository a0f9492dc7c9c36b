//! The request dispatcher.

use std::sync::Arc;
use std::time::Duration;

use lumen_config::ClientConfig;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::call::Call;
use crate::catalog::AnalysisTypeInfo;
use crate::error::DispatchError;
use crate::reqwest_transport::ReqwestTransport;
use crate::result::AnalysisResult;
use crate::transport::{OutboundRequest, RawResponse, Transport};

/// Message used when a failed response carries no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "network request failed";

const ANALYSIS_TYPES_PATH: &str = "/api/ml/analysis-types";

/// Issues one request per [`Call`] and maps the response.
#[derive(Clone)]
pub struct Dispatcher {
  transport: Arc<dyn Transport>,
  token: Option<String>,
  default_timeout: Option<Duration>,
}

impl Dispatcher {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self {
      transport,
      token: None,
      default_timeout: None,
    }
  }

  /// Build a dispatcher backed by [`ReqwestTransport`] from client config.
  pub fn from_config(config: &ClientConfig) -> Result<Self, DispatchError> {
    let transport = ReqwestTransport::new(config.parsed_base_url()?)?;
    Ok(
      Self::new(Arc::new(transport))
        .with_token(config.token.clone())
        .with_default_timeout(config.request_timeout()),
    )
  }

  pub fn with_token(mut self, token: Option<String>) -> Self {
    self.token = token.filter(|t| !t.trim().is_empty());
    self
  }

  pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.default_timeout = timeout;
    self
  }

  pub fn has_token(&self) -> bool {
    self.token.is_some()
  }

  /// Send `call` once and map the response.
  ///
  /// Returns as soon as `cancel` fires or the call's timeout elapses; the
  /// in-flight request is dropped in both cases.
  #[instrument(
    name = "dispatch",
    skip(self, call, cancel),
    fields(method = %call.method, path = %call.path)
  )]
  pub async fn dispatch(
    &self,
    call: &Call,
    cancel: &CancellationToken,
  ) -> Result<AnalysisResult, DispatchError> {
    if cancel.is_cancelled() {
      return Err(DispatchError::Cancelled);
    }

    let request = OutboundRequest {
      method: call.method,
      path: call.path.clone(),
      bearer_token: self.token.clone(),
      body: call.body.clone(),
    };
    let timeout = call.timeout.or(self.default_timeout);

    debug!(timeout_ms = ?timeout.map(|t| t.as_millis()), "sending request");

    let response = tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!("request cancelled");
        return Err(DispatchError::Cancelled);
      }
      response = self.send_with_timeout(request, timeout) => response?,
    };

    let result = map_response(response);
    match &result {
      Ok(_) => info!("request succeeded"),
      Err(e) => warn!(error = %e, status = ?e.status(), "request failed"),
    }
    result
  }

  async fn send_with_timeout(
    &self,
    request: OutboundRequest,
    timeout: Option<Duration>,
  ) -> Result<RawResponse, DispatchError> {
    let send = self.transport.send(request);
    match timeout {
      Some(limit) => match tokio::time::timeout(limit, send).await {
        Ok(response) => Ok(response?),
        Err(_) => Err(DispatchError::Timeout {
          timeout_ms: limit.as_millis() as u64,
        }),
      },
      None => Ok(send.await?),
    }
  }

  /// Fetch the ML analysis catalog.
  pub async fn fetch_analysis_types(
    &self,
    cancel: &CancellationToken,
  ) -> Result<Vec<AnalysisTypeInfo>, DispatchError> {
    let result = self.dispatch(&Call::get(ANALYSIS_TYPES_PATH), cancel).await?;
    AnalysisTypeInfo::from_result(&result)
  }
}

/// Map a raw response to a result: 2xx bodies are parsed as JSON, anything
/// else becomes [`DispatchError::Server`].
pub(crate) fn map_response(response: RawResponse) -> Result<AnalysisResult, DispatchError> {
  if response.is_success() {
    if response.body.trim().is_empty() {
      return Ok(AnalysisResult::new(Value::Null));
    }
    return serde_json::from_str(&response.body)
      .map(AnalysisResult::new)
      .map_err(|e| DispatchError::InvalidResponse(e.to_string()));
  }

  Err(DispatchError::Server {
    status: response.status,
    message: server_message(&response.body)
      .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
  })
}

/// The server's own explanation, when the body is JSON with a string
/// `message`, `error` or `detail` field.
fn server_message(body: &str) -> Option<String> {
  let value: Value = serde_json::from_str(body).ok()?;
  ["message", "error", "detail"]
    .iter()
    .find_map(|key| value.get(*key).and_then(Value::as_str))
    .map(str::trim)
    .filter(|m| !m.is_empty())
    .map(str::to_string)
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;
  use serde_json::json;

  use super::*;
  use crate::error::TransportError;

  fn raw(status: u16, body: &str) -> RawResponse {
    RawResponse {
      status,
      body: body.to_string(),
    }
  }

  #[test]
  fn test_success_parses_json() {
    let result = map_response(raw(200, r#"{"metrics": {"r2": 0.9}}"#)).unwrap();
    assert_eq!(result.metrics().unwrap()["r2"], 0.9);

    let result = map_response(raw(204, "")).unwrap();
    assert_eq!(result.as_value(), &Value::Null);
  }

  #[test]
  fn test_success_with_garbage_body() {
    let err = map_response(raw(200, "<html>")).unwrap_err();
    assert!(matches!(err, DispatchError::InvalidResponse(_)));
  }

  #[test]
  fn test_error_uses_server_message() {
    let err = map_response(raw(400, r#"{"error": "Join key missing"}"#)).unwrap_err();
    assert!(matches!(
      &err,
      DispatchError::Server { status: 400, message } if message == "Join key missing"
    ));

    let err = map_response(raw(401, r#"{"detail": "Invalid token"}"#)).unwrap_err();
    assert_eq!(err.to_string(), "Invalid token (status 401)");
  }

  #[test]
  fn test_error_without_message_is_generic() {
    for body in ["", "Internal Server Error", r#"{"detail": [{"loc": "x"}]}"#, r#"{"message": "  "}"#] {
      let err = map_response(raw(500, body)).unwrap_err();
      assert!(matches!(
        &err,
        DispatchError::Server { status: 500, message } if message == GENERIC_FAILURE_MESSAGE
      ));
    }
  }

  /// Records requests and answers each with a canned response.
  struct CannedTransport {
    response: RawResponse,
    delay: Option<Duration>,
    seen: Mutex<Vec<OutboundRequest>>,
  }

  #[async_trait]
  impl Transport for CannedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
      self.seen.lock().unwrap().push(request);
      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }
      Ok(self.response.clone())
    }
  }

  fn canned(response: RawResponse, delay: Option<Duration>) -> Arc<CannedTransport> {
    Arc::new(CannedTransport {
      response,
      delay,
      seen: Mutex::new(Vec::new()),
    })
  }

  #[tokio::test]
  async fn test_dispatch_attaches_token() {
    let transport = canned(raw(200, "{}"), None);
    let dispatcher = Dispatcher::new(transport.clone()).with_token(Some("abc".to_string()));

    let call = Call::post_json("/api/ml/run-analysis", json!({ "projectId": "p1" }));
    dispatcher
      .dispatch(&call, &CancellationToken::new())
      .await
      .unwrap();

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].bearer_token.as_deref(), Some("abc"));
    assert_eq!(seen[0].path, "/api/ml/run-analysis");
  }

  #[tokio::test]
  async fn test_blank_token_is_dropped() {
    let dispatcher = Dispatcher::new(canned(raw(200, "{}"), None)).with_token(Some(" ".to_string()));
    assert!(!dispatcher.has_token());
  }

  #[tokio::test]
  async fn test_dispatch_times_out() {
    let transport = canned(raw(200, "{}"), Some(Duration::from_secs(5)));
    let dispatcher = Dispatcher::new(transport);

    let call = Call::post_json("/api/trial-pii-decision", json!({}))
      .with_timeout(Duration::from_millis(20));
    let err = dispatcher
      .dispatch(&call, &CancellationToken::new())
      .await
      .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "processing timeout after 20ms");
  }

  #[tokio::test]
  async fn test_default_timeout_applies() {
    let transport = canned(raw(200, "{}"), Some(Duration::from_secs(5)));
    let dispatcher =
      Dispatcher::new(transport).with_default_timeout(Some(Duration::from_millis(10)));

    let err = dispatcher
      .dispatch(&Call::get("/api/ml/analysis-types"), &CancellationToken::new())
      .await
      .unwrap_err();
    assert!(matches!(err, DispatchError::Timeout { timeout_ms: 10 }));
  }

  #[tokio::test]
  async fn test_dispatch_cancelled() {
    let transport = canned(raw(200, "{}"), Some(Duration::from_secs(5)));
    let dispatcher = Dispatcher::new(transport.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      trigger.cancel();
    });

    let err = dispatcher
      .dispatch(&Call::get("/api/ml/analysis-types"), &cancel)
      .await
      .unwrap_err();
    assert!(matches!(err, DispatchError::Cancelled));

    // Already cancelled: nothing is sent.
    let err = dispatcher
      .dispatch(&Call::get("/api/ml/analysis-types"), &cancel)
      .await
      .unwrap_err();
    assert!(matches!(err, DispatchError::Cancelled));
    assert_eq!(transport.seen.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_fetch_analysis_types() {
    let transport = canned(
      raw(200, r#"{"analysisTypes": [{"id": "clustering", "name": "Clustering"}]}"#),
      None,
    );
    let dispatcher = Dispatcher::new(transport.clone());

    let types = dispatcher
      .fetch_analysis_types(&CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].id, "clustering");
    assert_eq!(transport.seen.lock().unwrap()[0].method, crate::call::Method::Get);
  }
}
