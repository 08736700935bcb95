use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names maintained by the collection itself
pub const ID_FIELD: &str = "_id";
pub const CREATED_FIELD: &str = "dateCreated";
pub const UPDATED_FIELD: &str = "dateUpdated";

pub const RESERVED_FIELDS: &[&str] = &[ID_FIELD, CREATED_FIELD, UPDATED_FIELD];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$in")] In,
    #[serde(rename = "$contains")] Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Missing fields come first in ascending order, as in the in-memory backend
    pub fn nulls_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "NULLS FIRST",
            SortDirection::Desc => "NULLS LAST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// Options accepted by `read_many`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<SortSpec>,
}

impl FindOptions {
    pub fn sorted(sort: SortSpec) -> Self {
        Self { sort: Some(sort) }
    }
}
