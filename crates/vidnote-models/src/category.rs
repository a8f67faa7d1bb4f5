//! Category records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a category record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CategoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A content category. Created lazily by the categorization stage when a
/// label is first seen; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryRecord {
    /// Unique category ID
    pub id: CategoryId,

    /// Category name (unique, lowercase for auto-created categories)
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Display color, `#RRGGBB`
    pub color: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CategoryRecord {
    /// Create a new category record.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            description: description.into(),
            color: color.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_creation() {
        let cat = CategoryRecord::new("education", "Videos about education", "#EF4444");
        assert_eq!(cat.name, "education");
        assert_eq!(cat.color, "#EF4444");
        assert!(!cat.id.as_str().is_empty());
    }
}
