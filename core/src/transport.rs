//! The transport collaborator.
//!
//! The core never performs I/O itself. Callers plug in a `Transport` that
//! executes an `HttpRequest` and returns the response with its JSON body
//! already parsed. Status handling belongs to the transport: anything that is
//! not a success must come back as a `TransportError`.

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse};

/// Failures raised by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
}

/// Executes HTTP requests on behalf of the `DataProvider`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}
