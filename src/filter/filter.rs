use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{Condition, FilterOp, ID_FIELD};
use crate::types::Id;

/// Exact-match filter over top-level document fields. All conditions must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Id) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// `field` equals `value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            operator: FilterOp::Eq,
            data: value.into(),
        });
        self
    }

    /// `field` is a member of `values`
    pub fn is_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.conditions.push(Condition {
            field: field.into(),
            operator: FilterOp::In,
            data: Value::Array(values.into_iter().map(Into::into).collect()),
        });
        self
    }

    /// Array `field` contains `value`
    pub fn contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            operator: FilterOp::Contains,
            data: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for condition in &self.conditions {
            validate_field_name(&condition.field)?;
            if condition.operator == FilterOp::In && !condition.data.is_array() {
                return Err(FilterError::InvalidOperatorData(format!(
                    "$in on '{}' requires an array",
                    condition.field
                )));
            }
        }
        Ok(())
    }

    /// Evaluate against a stored document. A missing field compares equal to null.
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|condition| {
            let actual = doc.get(&condition.field).unwrap_or(&Value::Null);
            match condition.operator {
                FilterOp::Eq => actual == &condition.data,
                FilterOp::In => match &condition.data {
                    Value::Array(values) => values.iter().any(|v| v == actual),
                    _ => false,
                },
                FilterOp::Contains => match actual {
                    Value::Array(items) => items.iter().any(|v| v == &condition.data),
                    _ => false,
                },
            }
        })
    }
}

pub fn validate_field_name(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidField(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc(json!({"a": 1}))));
        assert!(Filter::new().matches(&Map::new()));
    }

    #[test]
    fn equality_is_exact() {
        let d = doc(json!({"title": "Run", "count": 3}));
        assert!(Filter::new().eq("title", "Run").matches(&d));
        assert!(!Filter::new().eq("title", "Ru").matches(&d));
        assert!(!Filter::new().eq("title", "run").matches(&d));
        assert!(Filter::new().eq("title", "Run").eq("count", 3).matches(&d));
        assert!(!Filter::new().eq("title", "Run").eq("count", 4).matches(&d));
    }

    #[test]
    fn missing_field_equals_null() {
        let d = doc(json!({"title": "Run"}));
        assert!(Filter::new().eq("deadline", Value::Null).matches(&d));
        assert!(!Filter::new().eq("deadline", "").matches(&d));
    }

    #[test]
    fn membership_and_containment() {
        let d = doc(json!({"owner": "a", "shared": ["b", "c"]}));
        assert!(Filter::new().is_in("owner", ["x", "a"]).matches(&d));
        assert!(!Filter::new().is_in("owner", Vec::<String>::new()).matches(&d));
        assert!(Filter::new().contains("shared", "c").matches(&d));
        assert!(!Filter::new().contains("shared", "a").matches(&d));
        assert!(!Filter::new().contains("owner", "a").matches(&d));
    }

    #[test]
    fn rejects_unsafe_field_names() {
        assert!(Filter::new().eq("ok_field", 1).validate().is_ok());
        assert!(Filter::new().eq("_id", 1).validate().is_ok());
        assert!(Filter::new().eq("bad'field", 1).validate().is_err());
        assert!(Filter::new().eq("1abc", 1).validate().is_err());
        assert!(Filter::new().eq("", 1).validate().is_err());
    }
}
