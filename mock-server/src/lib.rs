//! In-memory server speaking a subset of the PostgREST dialect.
//!
//! Tables are created on first write and addressed as `/{table}`. Supported:
//! `eq`, `ilike`, `is` and `in` filters, `order=field.asc|desc`, `Range`
//! request headers answered with `Content-Range`, `Prefer: count=exact`,
//! `Prefer: return=representation` and the singular-object media type.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub type Row = Map<String, Value>;
pub type Db = Arc<RwLock<HashMap<String, Vec<Row>>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route(
            "/{table}",
            get(select_rows).post(insert_row).patch(update_rows).delete(delete_rows),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type Params = Query<Vec<(String, String)>>;

/// An error answered as `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

/// A parsed `field=op.value` condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String),
    ILike(String),
    Is(String),
    In(Vec<String>),
}

impl Condition {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let (op, value) = raw
            .split_once('.')
            .ok_or_else(|| ApiError::bad_request(format!("missing operator in {raw:?}")))?;
        match op {
            "eq" => Ok(Condition::Eq(value.to_string())),
            "ilike" => Ok(Condition::ILike(value.to_string())),
            "is" => Ok(Condition::Is(value.to_string())),
            "in" => {
                let list = value
                    .strip_prefix('(')
                    .and_then(|v| v.strip_suffix(')'))
                    .ok_or_else(|| ApiError::bad_request(format!("malformed list {value:?}")))?;
                Ok(Condition::In(list.split(',').map(str::to_string).collect()))
            }
            other => Err(ApiError::bad_request(format!("unsupported operator {other:?}"))),
        }
    }

    pub fn matches(&self, value: Option<&Value>) -> bool {
        let text = value.and_then(as_text);
        match self {
            Condition::Eq(expected) => text.as_deref() == Some(expected.as_str()),
            Condition::ILike(pattern) => text.is_some_and(|t| like(pattern, &t)),
            Condition::Is(expected) => match (expected.as_str(), value) {
                ("null", None | Some(Value::Null)) => true,
                ("true", Some(Value::Bool(true))) => true,
                ("false", Some(Value::Bool(false))) => true,
                _ => false,
            },
            Condition::In(options) => text.is_some_and(|t| options.contains(&t)),
        }
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Case-insensitive match where `*` stands for any run of characters.
fn like(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return true,
    };
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part) {
            Some(at) => remaining = &remaining[at + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

/// Query parameters split into filters and an optional ordering.
#[derive(Debug, Default)]
struct Selection {
    conditions: Vec<(String, Condition)>,
    order: Option<(String, bool)>,
}

impl Selection {
    fn parse(params: &[(String, String)]) -> Result<Self, ApiError> {
        let mut selection = Selection::default();
        for (key, value) in params {
            if key == "order" {
                let (field, direction) = value.rsplit_once('.').unwrap_or((value.as_str(), "asc"));
                selection.order = Some((field.to_string(), direction.eq_ignore_ascii_case("desc")));
            } else {
                selection.conditions.push((key.clone(), Condition::parse(value)?));
            }
        }
        Ok(selection)
    }

    fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(row.get(field)))
    }

    fn sort(&self, rows: &mut [Row]) {
        if let Some((field, descending)) = &self.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(field), b.get(field));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Greater,
        (_, Some(Value::Null) | None) => Ordering::Less,
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
    }
}

fn prefers(headers: &HeaderMap, preference: &str) -> bool {
    headers
        .get_all("prefer")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|p| p.trim() == preference)
}

fn wants_single_object(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(SINGLE_OBJECT))
}

/// Inclusive `start-end` from the `Range` request header.
fn requested_range(headers: &HeaderMap) -> Result<Option<(usize, usize)>, ApiError> {
    let Some(raw) = headers.get(header::RANGE) else {
        return Ok(None);
    };
    let raw = raw.to_str().map_err(|_| ApiError::bad_request("non-ascii Range header"))?;
    let parsed: Option<(usize, usize)> = raw
        .split_once('-')
        .and_then(|(start, end)| Some((start.trim().parse().ok()?, end.trim().parse().ok()?)));
    match parsed {
        Some((start, end)) if start <= end => Ok(Some((start, end))),
        _ => Err(ApiError::new(StatusCode::RANGE_NOT_SATISFIABLE, format!("invalid range {raw:?}"))),
    }
}

/// Rows as a JSON body, or the single row when the singular media type was requested.
fn representation(headers: &HeaderMap, rows: Vec<Row>) -> Result<Value, ApiError> {
    if wants_single_object(headers) {
        let [row] = <[Row; 1]>::try_from(rows).map_err(|rows| {
            ApiError::new(
                StatusCode::NOT_ACCEPTABLE,
                format!("JSON object requested, multiple (or no) rows returned: {}", rows.len()),
            )
        })?;
        Ok(Value::Object(row))
    } else {
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}

fn parse_row(body: &Bytes) -> Result<Row, ApiError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(_) => Err(ApiError::bad_request("body must be a JSON object")),
        Err(e) => Err(ApiError::bad_request(format!("invalid JSON: {e}"))),
    }
}

async fn select_rows(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(params): Params,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let selection = Selection::parse(&params)?;
    let mut rows: Vec<Row> = {
        let db = db.read().await;
        db.get(&table)
            .map(|rows| rows.iter().filter(|row| selection.matches(row)).cloned().collect())
            .unwrap_or_default()
    };
    selection.sort(&mut rows);

    let total = rows.len();
    let (start, page) = match requested_range(&headers)? {
        Some((start, end)) => {
            let page: Vec<Row> = rows.into_iter().skip(start).take((end - start).saturating_add(1)).collect();
            (start, page)
        }
        None => (0, rows),
    };

    let total_text = if prefers(&headers, "count=exact") {
        total.to_string()
    } else {
        "*".to_string()
    };
    let content_range = if page.is_empty() {
        format!("*/{total_text}")
    } else {
        format!("{start}-{}/{total_text}", start + page.len() - 1)
    };
    debug!(%table, total, returned = page.len(), %content_range, "select");

    let body = representation(&headers, page)?;
    let mut response = Json(body).into_response();
    let value = HeaderValue::from_str(&content_range)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    response.headers_mut().insert(header::CONTENT_RANGE, value);
    Ok(response)
}

async fn insert_row(
    State(db): State<Db>,
    Path(table): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut row = parse_row(&body)?;
    {
        let mut db = db.write().await;
        let rows = db.entry(table.clone()).or_default();
        if !row.contains_key("id") {
            let next = rows
                .iter()
                .filter_map(|r| r.get("id").and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
                + 1;
            row.insert("id".to_string(), json!(next));
        }
        rows.push(row.clone());
    }
    debug!(%table, id = ?row.get("id"), "insert");

    if prefers(&headers, "return=representation") {
        let body = representation(&headers, vec![row])?;
        Ok((StatusCode::CREATED, Json(body)).into_response())
    } else {
        Ok(StatusCode::CREATED.into_response())
    }
}

async fn update_rows(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(params): Params,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let selection = Selection::parse(&params)?;
    let patch = parse_row(&body)?;
    let updated: Vec<Row> = {
        let mut db = db.write().await;
        let rows = db.entry(table.clone()).or_default();
        rows.iter_mut()
            .filter(|row| selection.matches(row))
            .map(|row| {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                row.clone()
            })
            .collect()
    };
    debug!(%table, updated = updated.len(), "update");

    if prefers(&headers, "return=representation") {
        let body = representation(&headers, updated)?;
        Ok(Json(body).into_response())
    } else {
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

async fn delete_rows(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(params): Params,
) -> Result<StatusCode, ApiError> {
    let selection = Selection::parse(&params)?;
    let mut db = db.write().await;
    if let Some(rows) = db.get_mut(&table) {
        let before = rows.len();
        rows.retain(|row| !selection.matches(row));
        debug!(%table, deleted = before - rows.len(), "delete");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_handles_wildcards() {
        assert!(like("*ell*", "Hello"));
        assert!(like("he*", "HELLO"));
        assert!(like("*lo", "hello"));
        assert!(like("hello", "hello"));
        assert!(!like("hello", "hello world"));
        assert!(!like("*xyz*", "hello"));
        assert!(like("**", ""));
    }

    #[test]
    fn conditions_parse_operators() {
        assert_eq!(Condition::parse("eq.5").unwrap(), Condition::Eq("5".to_string()));
        assert_eq!(Condition::parse("ilike.*a*").unwrap(), Condition::ILike("*a*".to_string()));
        assert_eq!(
            Condition::parse("in.(1,2)").unwrap(),
            Condition::In(vec!["1".to_string(), "2".to_string()])
        );
        assert!(Condition::parse("gt.5").is_err());
        assert!(Condition::parse("nodot").is_err());
    }

    #[test]
    fn eq_compares_textual_forms() {
        assert!(Condition::Eq("5".to_string()).matches(Some(&json!(5))));
        assert!(Condition::Eq("abc".to_string()).matches(Some(&json!("abc"))));
        assert!(!Condition::Eq("5".to_string()).matches(None));
    }

    #[test]
    fn is_null_matches_missing_and_null() {
        let cond = Condition::Is("null".to_string());
        assert!(cond.matches(None));
        assert!(cond.matches(Some(&Value::Null)));
        assert!(!cond.matches(Some(&json!(0))));
        assert!(Condition::Is("true".to_string()).matches(Some(&json!(true))));
    }

    #[test]
    fn nulls_sort_last() {
        assert_eq!(compare(Some(&json!(1)), None), Ordering::Less);
        assert_eq!(compare(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
    }
}
