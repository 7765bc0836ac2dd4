//! Filter encoding for the `field=operator.value` query syntax.
//!
//! # Rules
//! - text: `ilike.*<text>*`, with the first `:` removed
//! - boolean: `is.true` / `is.false`
//! - unset: `is.null`
//! - number: `eq.<number>`
//! - anything else: textual form, first `:` removed, wrapped like text
//!
//! Only the first colon is removed from text values. Callers rely on the
//! exact output, so `"a:b:c"` encodes as `ilike.*ab:c*`.
//!
//! An unset value is different from a field missing from the `Filter`: the
//! former produces `is.null`, the latter produces no query parameter at all.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::types::Identifier;

/// A single filter criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Bool(bool),
    Number(Number),
    /// The field is present in the filter with no value.
    Unset,
    /// Arrays and objects; encoded through their textual form.
    Other(Value),
}

impl FilterValue {
    /// The operator-prefixed query value for this criterion.
    pub fn encode(&self) -> String {
        match self {
            FilterValue::Text(text) => ilike(text),
            FilterValue::Bool(flag) => format!("is.{flag}"),
            FilterValue::Unset => "is.null".to_string(),
            FilterValue::Number(number) => format!("eq.{number}"),
            FilterValue::Other(value) => ilike(&to_text(value)),
        }
    }
}

fn ilike(text: &str) -> String {
    format!("ilike.*{}*", text.replacen(':', "", 1))
}

/// Plain textual form of a JSON value: strings unquoted, arrays joined by commas.
fn to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

impl From<Value> for FilterValue {
    /// JSON `null` is treated as unset.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FilterValue::Unset,
            Value::Bool(flag) => FilterValue::Bool(flag),
            Value::Number(number) => FilterValue::Number(number),
            Value::String(text) => FilterValue::Text(text),
            other => FilterValue::Other(other),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(text: &str) -> Self {
        FilterValue::Text(text.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(text: String) -> Self {
        FilterValue::Text(text)
    }
}

impl From<bool> for FilterValue {
    fn from(flag: bool) -> Self {
        FilterValue::Bool(flag)
    }
}

impl From<i32> for FilterValue {
    fn from(number: i32) -> Self {
        FilterValue::Number(number.into())
    }
}

impl From<i64> for FilterValue {
    fn from(number: i64) -> Self {
        FilterValue::Number(number.into())
    }
}

impl From<u64> for FilterValue {
    fn from(number: u64) -> Self {
        FilterValue::Number(number.into())
    }
}

impl From<Number> for FilterValue {
    fn from(number: Number) -> Self {
        FilterValue::Number(number)
    }
}

impl From<Identifier> for FilterValue {
    fn from(id: Identifier) -> Self {
        match id {
            Identifier::Int(id) => id.into(),
            Identifier::Text(id) => FilterValue::Text(id),
        }
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FilterValue::Unset, Into::into)
    }
}

impl Serialize for FilterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FilterValue::Text(text) => serializer.serialize_str(text),
            FilterValue::Bool(flag) => serializer.serialize_bool(*flag),
            FilterValue::Number(number) => number.serialize(serializer),
            FilterValue::Unset => serializer.serialize_none(),
            FilterValue::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FilterValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FilterValue::from)
    }
}

/// Field criteria in insertion order. Inserting a field twice replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: Vec<(String, FilterValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filter = Filter::new();
        for (field, value) in iter {
            filter.insert(field, value);
        }
        filter
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FilterVisitor;

        impl<'de> Visitor<'de> for FilterVisitor {
            type Value = Filter;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to filter values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Filter, A::Error> {
                let mut filter = Filter::new();
                while let Some((field, value)) = access.next_entry::<String, FilterValue>()? {
                    filter.insert(field, value);
                }
                Ok(filter)
            }
        }

        deserializer.deserialize_map(FilterVisitor)
    }
}

/// Encode every criterion of `filter`, keeping field order.
pub fn encode_filter(filter: &Filter) -> Vec<(String, String)> {
    filter
        .iter()
        .map(|(field, value)| (field.to_string(), value.encode()))
        .collect()
}
