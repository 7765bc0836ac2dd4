//! Error types for the data provider.
//!
//! # Design
//! Every failure the provider can raise lives in `ProviderError`. Transport
//! failures are wrapped in the `Transport` variant exactly as the transport
//! produced them; the provider never retries or reinterprets them.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by `DataProvider::dispatch` and the pure helpers behind it.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The operation name is not one of the supported kinds.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A paginated response arrived without a `Content-Range` header.
    #[error(
        "the Content-Range header is missing in the HTTP response; the API must \
         send it and, for cross-origin requests, list it in Access-Control-Expose-Headers"
    )]
    MissingRangeHeader,

    /// `Content-Range` is present but neither its total nor its range end is an integer.
    #[error("malformed Content-Range header: {0}")]
    MalformedRangeHeader(String),

    /// JSON parameters passed to `dispatch_raw` do not fit the operation kind.
    #[error("invalid parameters for {kind}: {reason}")]
    InvalidParams { kind: &'static str, reason: String },

    /// The response body does not have the shape the operation expects.
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A required configuration value is not set.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
