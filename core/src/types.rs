//! Operations, their parameters and the results the provider hands back.
//!
//! # Design
//! `Operation` is a closed enum: each variant carries exactly the parameters
//! its kind needs, so request building and response decoding match on it
//! exhaustively. String operation names coming from outside are parsed through
//! `OperationKind::from_str`, which is the only place an unknown kind can show up.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::filter::Filter;

/// A record as a JSON object.
pub type Record = Map<String, Value>;

/// Primary key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(id) => write!(f, "{id}"),
            Identifier::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Int(id)
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Identifier::Text(id.to_string())
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Identifier::Text(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Lowercase form used in the `order` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortOrder::Desc)
        } else {
            Err(format!("unknown sort order: {s}"))
        }
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// `<field>.<order>` as sent in the `order` query parameter.
    pub fn to_query(&self) -> String {
        format!("{}.{}", self.field, self.order.as_query())
    }
}

/// One-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    /// Inclusive zero-based item range for the `Range` header.
    ///
    /// `page` and `per_page` are expected to be at least 1; zero values are
    /// clamped to 1 rather than underflowing. `None` when the range end does
    /// not fit in a `u64`.
    pub fn item_range(&self) -> Option<(u64, u64)> {
        let page = self.page.max(1);
        let per_page = self.per_page.max(1);
        let start = (page - 1).checked_mul(per_page)?;
        let end = page.checked_mul(per_page)? - 1;
        Some((start, end))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListParams {
    pub pagination: Pagination,
    pub sort: Sort,
    #[serde(default)]
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOneParams {
    pub id: Identifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetManyParams {
    pub ids: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetManyReferenceParams {
    pub target: String,
    pub id: Identifier,
    pub sort: Sort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateParams {
    pub data: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateParams {
    pub id: Identifier,
    pub data: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteParams {
    pub id: Identifier,
}

/// Names of the supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    List,
    GetOne,
    GetMany,
    GetManyReference,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::List,
        OperationKind::GetOne,
        OperationKind::GetMany,
        OperationKind::GetManyReference,
        OperationKind::Create,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "GET_LIST",
            OperationKind::GetOne => "GET_ONE",
            OperationKind::GetMany => "GET_MANY",
            OperationKind::GetManyReference => "GET_MANY_REFERENCE",
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ProviderError;

    /// Accepts the canonical names plus `LIST` as an alias for `GET_LIST`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET_LIST" | "LIST" => Ok(OperationKind::List),
            "GET_ONE" => Ok(OperationKind::GetOne),
            "GET_MANY" => Ok(OperationKind::GetMany),
            "GET_MANY_REFERENCE" => Ok(OperationKind::GetManyReference),
            "CREATE" => Ok(OperationKind::Create),
            "UPDATE" => Ok(OperationKind::Update),
            "DELETE" => Ok(OperationKind::Delete),
            other => Err(ProviderError::UnsupportedOperation(other.to_string())),
        }
    }
}

/// A generic data-access operation together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    List(ListParams),
    GetOne(GetOneParams),
    GetMany(GetManyParams),
    GetManyReference(GetManyReferenceParams),
    Create(CreateParams),
    Update(UpdateParams),
    Delete(DeleteParams),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::List(_) => OperationKind::List,
            Operation::GetOne(_) => OperationKind::GetOne,
            Operation::GetMany(_) => OperationKind::GetMany,
            Operation::GetManyReference(_) => OperationKind::GetManyReference,
            Operation::Create(_) => OperationKind::Create,
            Operation::Update(_) => OperationKind::Update,
            Operation::Delete(_) => OperationKind::Delete,
        }
    }

    /// Build an operation from a kind name and JSON parameters.
    ///
    /// Fails with `UnsupportedOperation` for unknown names and with
    /// `InvalidParams` when `params` does not have the kind's shape.
    pub fn from_json(kind: &str, params: Value) -> Result<Self, ProviderError> {
        let kind: OperationKind = kind.parse()?;
        let operation = match kind {
            OperationKind::List => Operation::List(params_as(kind, params)?),
            OperationKind::GetOne => Operation::GetOne(params_as(kind, params)?),
            OperationKind::GetMany => Operation::GetMany(params_as(kind, params)?),
            OperationKind::GetManyReference => Operation::GetManyReference(params_as(kind, params)?),
            OperationKind::Create => Operation::Create(params_as(kind, params)?),
            OperationKind::Update => Operation::Update(params_as(kind, params)?),
            OperationKind::Delete => Operation::Delete(params_as(kind, params)?),
        };
        Ok(operation)
    }
}

fn params_as<T: serde::de::DeserializeOwned>(kind: OperationKind, params: Value) -> Result<T, ProviderError> {
    serde_json::from_value(params).map_err(|e| ProviderError::InvalidParams {
        kind: kind.as_str(),
        reason: e.to_string(),
    })
}

/// Result shape handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RestResult {
    /// A page of records and the total number of matching records.
    Page { data: Vec<Value>, total: u64 },
    /// A single record, or whatever body the server returned for the operation.
    Record { data: Value },
    /// Acknowledgement of a delete; `data` is always an empty object.
    Acknowledged { data: Map<String, Value> },
}

impl RestResult {
    pub fn acknowledged() -> Self {
        RestResult::Acknowledged { data: Map::new() }
    }

    /// The `total` of a page result.
    pub fn total(&self) -> Option<u64> {
        match self {
            RestResult::Page { total, .. } => Some(*total),
            RestResult::Record { .. } | RestResult::Acknowledged { .. } => None,
        }
    }

    /// The result as `{"data": ..., "total"?: ...}`.
    pub fn to_json(&self) -> Value {
        match self {
            RestResult::Page { data, total } => serde_json::json!({ "data": data, "total": total }),
            RestResult::Record { data } => serde_json::json!({ "data": data }),
            RestResult::Acknowledged { data } => serde_json::json!({ "data": data }),
        }
    }
}
