//! Request building: one `Operation` in, one `HttpRequest` out.
//!
//! # Design
//! Every request starts with `Accept: application/json` and, when the token
//! provider has a usable token, `Authorization: Bearer <token>`. Single-object
//! operations (GET_ONE, CREATE, UPDATE) then replace `Accept` with the
//! singular-object media type and ask for the written row back.
//!
//! Query strings for LIST and GET_MANY_REFERENCE are form-encoded in a fixed
//! order: `order` first, then the filter fields in insertion order. Id-based
//! URLs keep the `eq.` / `in.(..)` syntax literal and form-encode each id, so
//! `in.(1,2,3)` stays readable while a text id cannot add query parameters.

use tracing::debug;
use url::form_urlencoded;

use crate::error::ProviderError;
use crate::filter::{encode_filter, Filter};
use crate::http::{HttpMethod, HttpRequest};
use crate::token::bearer;
use crate::types::{Identifier, Operation, Record, Sort};

pub const JSON: &str = "application/json";
pub const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Build the request for `operation` against `{api_url}/{resource}`.
///
/// `token` is the current value from the token store; an empty or short
/// token leaves the request without an `Authorization` header.
pub fn build_request(
    api_url: &str,
    resource: &str,
    operation: &Operation,
    token: &str,
) -> Result<HttpRequest, ProviderError> {
    let collection = format!("{api_url}/{resource}");
    let mut headers = base_headers(token);

    let request = match operation {
        Operation::List(params) => {
            let (start, end) = params.pagination.item_range().ok_or_else(|| ProviderError::InvalidParams {
                kind: "GET_LIST",
                reason: format!(
                    "page {} with perPage {} is out of range",
                    params.pagination.page, params.pagination.per_page
                ),
            })?;
            set_header(&mut headers, "Range-Unit", "items");
            set_header(&mut headers, "Range", &format!("{start}-{end}"));
            set_header(&mut headers, "Prefer", "count=exact");
            HttpRequest {
                method: HttpMethod::Get,
                url: format!("{collection}?{}", query_string(&params.sort, &params.filter)),
                headers,
                body: None,
            }
        }
        Operation::GetOne(params) => {
            single_object_headers(&mut headers);
            HttpRequest {
                method: HttpMethod::Get,
                url: by_id(&collection, &params.id),
                headers,
                body: None,
            }
        }
        Operation::GetMany(params) => {
            let ids = params.ids.iter().map(encode_id).collect::<Vec<_>>().join(",");
            HttpRequest {
                method: HttpMethod::Get,
                url: format!("{collection}?id=in.({ids})"),
                headers,
                body: None,
            }
        }
        Operation::GetManyReference(params) => {
            let filter = Filter::new().with(params.target.as_str(), params.id.clone());
            HttpRequest {
                method: HttpMethod::Get,
                url: format!("{collection}?{}", query_string(&params.sort, &filter)),
                headers,
                body: None,
            }
        }
        Operation::Update(params) => {
            single_object_headers(&mut headers);
            HttpRequest {
                method: HttpMethod::Patch,
                url: by_id(&collection, &params.id),
                headers,
                body: Some(to_body(&params.data)?),
            }
        }
        Operation::Create(params) => {
            single_object_headers(&mut headers);
            HttpRequest {
                method: HttpMethod::Post,
                url: collection,
                headers,
                body: Some(to_body(&params.data)?),
            }
        }
        Operation::Delete(params) => HttpRequest {
            method: HttpMethod::Delete,
            url: by_id(&collection, &params.id),
            headers,
            body: None,
        },
    };

    debug!(kind = %operation.kind(), method = %request.method, url = %request.url, "built request");
    Ok(request)
}

fn base_headers(token: &str) -> Vec<(String, String)> {
    let mut headers = vec![("Accept".to_string(), JSON.to_string())];
    if let Some(value) = bearer(token) {
        headers.push(("Authorization".to_string(), value));
    }
    headers
}

fn single_object_headers(headers: &mut Vec<(String, String)>) {
    set_header(headers, "Prefer", "return=representation");
    set_header(headers, "Accept", SINGLE_OBJECT);
}

/// Replace the value of `name` in place, or append it.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

fn by_id(collection: &str, id: &Identifier) -> String {
    format!("{collection}?id=eq.{}", encode_id(id))
}

fn encode_id(id: &Identifier) -> String {
    form_urlencoded::byte_serialize(id.to_string().as_bytes()).collect()
}

fn query_string(sort: &Sort, filter: &Filter) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("order", &sort.to_query());
    for (field, value) in encode_filter(filter) {
        query.append_pair(&field, &value);
    }
    query.finish()
}

fn to_body(data: &Record) -> Result<String, ProviderError> {
    serde_json::to_string(data).map_err(|e| ProviderError::SerializationError(e.to_string()))
}
