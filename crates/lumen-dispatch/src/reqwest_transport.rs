//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::call::Body;
use crate::error::TransportError;
use crate::transport::{OutboundRequest, RawResponse, Transport};

const USER_AGENT: &str = concat!("lumen/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends requests to a backend rooted at `base_url`.
pub struct ReqwestTransport {
  client: Client,
  base_url: Url,
}

impl ReqwestTransport {
  pub fn new(base_url: Url) -> Result<Self, TransportError> {
    let client = Client::builder()
      .user_agent(USER_AGENT)
      .connect_timeout(CONNECT_TIMEOUT)
      .build()?;
    Ok(Self::with_client(client, base_url))
  }

  pub fn with_client(client: Client, base_url: Url) -> Self {
    Self { client, base_url }
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Resolve `path` under the base url, keeping any path prefix the base
  /// url carries ("https://host/app" + "/api/x" -> "https://host/app/api/x").
  pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
    let mut base = self.base_url.clone();
    if !base.path().ends_with('/') {
      let with_slash = format!("{}/", base.path());
      base.set_path(&with_slash);
    }

    base
      .join(path.trim_start_matches('/'))
      .map_err(|e| TransportError::InvalidPath {
        path: path.to_string(),
        message: e.to_string(),
      })
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
    let url = self.url_for(&request.path)?;
    let mut builder = self.client.request(request.method.as_reqwest(), url.clone());

    if let Some(token) = &request.bearer_token {
      builder = builder.bearer_auth(token);
    }

    builder = match request.body {
      Body::Empty => builder,
      Body::Json(value) => builder.json(&value),
      Body::Multipart { artifact, fields } => {
        let mut form = Form::new();
        for (name, value) in fields {
          form = form.text(name, value);
        }
        let part = Part::bytes(artifact.bytes().to_vec())
          .file_name(artifact.name.clone())
          .mime_str(&artifact.mime_type)?;
        builder.multipart(form.part("file", part))
      }
    };

    let response = builder.send().await.map_err(|e| connect_error(&url, e))?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    Ok(RawResponse { status, body })
  }
}

/// Server unreachable (refused, DNS, TLS handshake) versus a failure on an
/// established connection.
fn connect_error(url: &Url, error: reqwest::Error) -> TransportError {
  if error.is_connect() {
    TransportError::Connection(format!("{}: {}", url, error))
  } else {
    TransportError::Http(error)
  }
}
