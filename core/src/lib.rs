//! Data provider core for PostgREST-style tabular REST APIs.
//!
//! # Overview
//! Translates a fixed set of generic data-access operations (list, get one,
//! get many, get many by reference, create, update, delete) into HTTP
//! requests using the dialect's conventions: operator-prefixed filter values,
//! `Range` / `Content-Range` pagination and `Prefer: return=representation`
//! on writes. Responses are decoded back into `RestResult` values.
//!
//! # Design
//! - `build_request` and `decode_response` are pure functions; the only I/O
//!   goes through the caller's `Transport`.
//! - `DataProvider` ties them together and holds no mutable state.
//! - Bearer tokens come from a `TokenProvider` read on every request.

pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod provider;
pub mod request;
pub mod response;
pub mod token;
pub mod transport;
pub mod types;

pub use config::ProviderConfig;
pub use error::ProviderError;
pub use filter::{encode_filter, Filter, FilterValue};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use provider::DataProvider;
pub use request::build_request;
pub use response::{decode_response, parse_content_range};
pub use token::{EnvToken, NoToken, StaticToken, TokenProvider};
pub use transport::{Transport, TransportError};
pub use types::{
    CreateParams, DeleteParams, GetManyParams, GetManyReferenceParams, GetOneParams, Identifier, ListParams,
    Operation, OperationKind, Pagination, Record, RestResult, Sort, SortOrder, UpdateParams,
};
