use std::fmt;
use std::time::Duration;

use crate::artifact::UploadArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    }
  }

  pub(crate) fn as_reqwest(&self) -> reqwest::Method {
    match self {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
  Empty,
  Json(serde_json::Value),
  /// A file upload plus plain text form fields. The file goes in the `file` part.
  Multipart {
    artifact: UploadArtifact,
    fields: Vec<(String, String)>,
  },
}

/// One outbound call to a named endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
  pub method: Method,
  /// Path relative to the backend base url, e.g. "/api/ml/run-analysis".
  pub path: String,
  pub body: Body,
  /// Abort the call if no response arrives in time. Falls back to the
  /// dispatcher's default when unset.
  pub timeout: Option<Duration>,
}

impl Call {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      path: path.into(),
      body: Body::Empty,
      timeout: None,
    }
  }

  pub fn post_json(path: impl Into<String>, body: serde_json::Value) -> Self {
    Self {
      method: Method::Post,
      path: path.into(),
      body: Body::Json(body),
      timeout: None,
    }
  }

  pub fn post_multipart(
    path: impl Into<String>,
    artifact: UploadArtifact,
    fields: Vec<(String, String)>,
  ) -> Self {
    Self {
      method: Method::Post,
      path: path.into(),
      body: Body::Multipart { artifact, fields },
      timeout: None,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// The JSON body, if this is a JSON call.
  pub fn json(&self) -> Option<&serde_json::Value> {
    match &self.body {
      Body::Json(value) => Some(value),
      _ => None,
    }
  }
}
