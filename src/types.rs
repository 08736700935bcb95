/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of a stored document. Assigned by the collection, never by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Id(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Id(uuid)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Id)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Id> for serde_json::Value {
    fn from(id: Id) -> Self {
        serde_json::Value::String(id.to_string())
    }
}

/// Content categories. The discriminant order is the index order used by activity summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Lifestyle,
    HealthAndFitness,
    Entertainment,
    FoodAndCooking,
    FashionAndBeauty,
    EducationAndDIY,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Lifestyle,
        Category::HealthAndFitness,
        Category::Entertainment,
        Category::FoodAndCooking,
        Category::FashionAndBeauty,
        Category::EducationAndDIY,
    ];

    pub const NAMES: &'static [&'static str] = &[
        "Lifestyle",
        "HealthAndFitness",
        "Entertainment",
        "FoodAndCooking",
        "FashionAndBeauty",
        "EducationAndDIY",
    ];

    pub fn name(&self) -> &'static str {
        Self::NAMES[self.index()]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Lifestyle
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .position(|name| *name == s)
            .and_then(Self::from_index)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Category> for serde_json::Value {
    fn from(category: Category) -> Self {
        serde_json::Value::String(category.name().to_string())
    }
}

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    RegularUser,
    ContentCreator,
}

impl Role {
    pub const NAMES: &'static [&'static str] = &["RegularUser", "ContentCreator"];

    pub fn name(&self) -> &'static str {
        match self {
            Role::RegularUser => "RegularUser",
            Role::ContentCreator => "ContentCreator",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RegularUser" => Ok(Role::RegularUser),
            "ContentCreator" => Ok(Role::ContentCreator),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Role> for serde_json::Value {
    fn from(role: Role) -> Self {
        serde_json::Value::String(role.name().to_string())
    }
}
