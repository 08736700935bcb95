use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

use crate::filter::error::FilterError;
use crate::filter::filter::validate_field_name;
use crate::filter::types::{RESERVED_FIELDS, UPDATED_FIELD};
use crate::types::Id;

/// A stored record: identity and timestamps maintained by the collection, plus the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(rename = "dateCreated", with = "timestamp")]
    pub date_created: DateTime<Utc>,
    #[serde(rename = "dateUpdated", with = "timestamp")]
    pub date_updated: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: T,
}

impl<T> Document<T> {
    pub fn into_fields(self) -> T {
        self.fields
    }
}

impl<T> Deref for Document<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.fields
    }
}

impl<T> DerefMut for Document<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.fields
    }
}

/// One entry of a partial update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch {
    Set(Value),
    Unset,
}

/// Explicit partial update. A field is either named with an action or left untouched;
/// an absent field and a field set to `null` are different things.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Vec<(String, FieldPatch)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field.into(), FieldPatch::Set(value.into()))
    }

    pub fn set_serialized<V: Serialize>(self, field: impl Into<String>, value: &V) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        Ok(self.with(field.into(), FieldPatch::Set(value)))
    }

    /// Set `field` only when a value is supplied
    pub fn set_if_present<V: Into<Value>>(self, field: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(field, v),
            None => self,
        }
    }

    pub fn unset(self, field: impl Into<String>) -> Self {
        self.with(field.into(), FieldPatch::Unset)
    }

    /// Build a patch from a serializable value whose absent fields are skipped during
    /// serialization (`skip_serializing_if = "Option::is_none"`). Every key that is
    /// serialized becomes a `Set`, including explicit nulls.
    pub fn from_present<V: Serialize>(value: &V) -> Result<Self, FilterError> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(map.into_iter().fold(Self::new(), |patch, (k, v)| patch.set(k, v))),
            Ok(_) => Err(FilterError::InvalidOperatorData("patch must serialize to an object".to_string())),
            Err(e) => Err(FilterError::InvalidOperatorData(e.to_string())),
        }
    }

    fn with(mut self, field: String, action: FieldPatch) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|(name, _)| *name == field) {
            existing.1 = action;
        } else {
            self.fields.push((field, action));
        }
        self
    }

    pub fn fields(&self) -> &[(String, FieldPatch)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for (field, _) in &self.fields {
            validate_field_name(field)?;
            if RESERVED_FIELDS.contains(&field.as_str()) {
                return Err(FilterError::ReservedField(field.clone()));
            }
        }
        Ok(())
    }

    /// Fields to merge, as one JSON object
    pub fn merge_object(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(k, action)| match action {
                FieldPatch::Set(v) => Some((k.clone(), v.clone())),
                FieldPatch::Unset => None,
            })
            .collect()
    }

    pub fn unset_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, action)| matches!(action, FieldPatch::Unset))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Apply to a stored document and refresh its modification timestamp.
    pub fn apply(&self, doc: &mut Map<String, Value>) {
        for (field, action) in &self.fields {
            match action {
                FieldPatch::Set(v) => {
                    doc.insert(field.clone(), v.clone());
                }
                FieldPatch::Unset => {
                    doc.remove(field);
                }
            }
        }
        let previous = doc
            .get(UPDATED_FIELD)
            .and_then(Value::as_str)
            .and_then(timestamp::parse);
        let stamp = timestamp::next_after(previous);
        doc.insert(UPDATED_FIELD.to_string(), Value::String(timestamp::format(&stamp)));
    }
}

/// Timestamps are stored as RFC 3339 UTC strings with fixed microsecond precision, so
/// their lexical order is their chronological order.
pub mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    /// Current time, or one microsecond past `previous` if the clock has not moved past it.
    pub fn next_after(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let now = now();
        match previous {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        }
    }

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s)))
    }
}
