//! Field-equality filter sets

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::document::PointPayload;

/// An exact-match filter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean match
    Bool(bool),
    /// Integer match
    Integer(i64),
    /// Keyword match
    Text(String),
}

impl FilterValue {
    /// JSON form of the value
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Bool(b) => Value::Bool(*b),
            FilterValue::Integer(i) => Value::from(*i),
            FilterValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// Conjunction of field-equality constraints, ordered by field name
///
/// The ordering makes [`FilterSet::canonical`] stable, which the answer
/// cache relies on for key collisions between identical filter sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, FilterValue>);

impl FilterSet {
    /// Empty filter set (no restriction)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint, builder style
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Add or replace a constraint
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Constraints in field-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Canonical JSON serialization (`{}` when empty)
    pub fn canonical(&self) -> String {
        let mut out = String::from("{");
        for (i, (field, value)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&Value::String(field.clone()).to_string());
            out.push(':');
            out.push_str(&value.to_json().to_string());
        }
        out.push('}');
        out
    }

    /// Whether a payload satisfies every constraint
    pub fn matches(&self, payload: &PointPayload) -> bool {
        self.0
            .iter()
            .all(|(field, value)| payload.field(field).as_ref() == Some(&value.to_json()))
    }
}
