//! Response decoding: turn the transport's response into a `RestResult`.
//!
//! # Design
//! Paginated operations (LIST, GET_MANY_REFERENCE) read their total from the
//! `Content-Range` header (`<start>-<end>/<total>` or `<start>-<end>/*`).
//! CREATE keeps the submitted fields and adopts only the server's `id`; every
//! other field in the server's answer is dropped. DELETE always acknowledges
//! with an empty record.

use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::http::HttpResponse;
use crate::types::{Operation, RestResult};

pub const CONTENT_RANGE: &str = "Content-Range";

/// Decode `response` for `operation`. `resource` is used for logging only.
pub fn decode_response(
    response: HttpResponse,
    operation: &Operation,
    resource: &str,
) -> Result<RestResult, ProviderError> {
    match operation {
        Operation::List(_) | Operation::GetManyReference(_) => {
            let range = response.header(CONTENT_RANGE).ok_or(ProviderError::MissingRangeHeader)?;
            let total = parse_content_range(range)?;
            let data = match response.json {
                Value::Array(rows) => rows,
                other => {
                    return Err(ProviderError::UnexpectedBody(format!(
                        "expected an array of records, got {}",
                        json_kind(&other)
                    )))
                }
            };
            debug!(kind = %operation.kind(), resource, rows = data.len(), total, "decoded page");
            Ok(RestResult::Page { data, total })
        }
        Operation::Create(params) => {
            let mut data = params.data.clone();
            match response.json.get("id") {
                Some(id) => {
                    data.insert("id".to_string(), id.clone());
                }
                None => {
                    data.remove("id");
                }
            }
            Ok(RestResult::Record { data: Value::Object(data) })
        }
        Operation::Delete(_) => Ok(RestResult::acknowledged()),
        Operation::GetOne(_) | Operation::GetMany(_) | Operation::Update(_) => {
            Ok(RestResult::Record { data: response.json })
        }
    }
}

/// Total item count from a `Content-Range` value.
///
/// Uses the integer after the last `/`; when that is `*` (or otherwise not an
/// integer) the total becomes the range end plus one.
pub fn parse_content_range(value: &str) -> Result<u64, ProviderError> {
    let value = value.trim();
    let (range, total) = value.rsplit_once('/').unwrap_or((value, value));
    if let Ok(total) = total.trim().parse::<u64>() {
        return Ok(total);
    }
    let end = range.rsplit('-').next().unwrap_or(range).trim();
    end.parse::<u64>()
        .ok()
        .and_then(|end| end.checked_add(1))
        .ok_or_else(|| ProviderError::MalformedRangeHeader(value.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
