//! Lumen Dispatch
//!
//! Turns a [`Call`] (endpoint, body, optional timeout) into exactly one HTTP
//! request and maps the response to an [`AnalysisResult`] or a
//! [`DispatchError`]. There is no retry and no backoff; a failed call is
//! reported and the caller decides what to do.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher
//! ├── dispatch(call, cancel) -> AnalysisResult
//! │     ├── attaches the bearer token
//! │     ├── enforces the call timeout / cancellation
//! │     └── maps status + body to Ok / DispatchError
//! └── Arc<dyn Transport>
//!       └── ReqwestTransport (base url + reqwest::Client)
//! ```

mod artifact;
mod call;
mod catalog;
mod dispatcher;
mod error;
mod reqwest_transport;
mod result;
mod transport;

pub use artifact::{UploadArtifact, mime_for_extension};
pub use call::{Body, Call, Method};
pub use catalog::AnalysisTypeInfo;
pub use dispatcher::{Dispatcher, GENERIC_FAILURE_MESSAGE};
pub use error::{ArtifactError, DispatchError, TransportError};
pub use reqwest_transport::ReqwestTransport;
pub use result::AnalysisResult;
pub use transport::{OutboundRequest, RawResponse, Transport};
