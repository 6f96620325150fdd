//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::Slug;
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    /// A blank slug is re-derived from the (possibly new) name.
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl Category {
    /// Builds a category, deriving the slug from the name when none is given.
    pub fn create(name: &str, slug: Option<&str>, description: Option<String>) -> Result<Self> {
        let name = required_name(name)?;
        let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Slug::new(s)?,
            None => Slug::derive(&name)?,
        };
        let now = Utc::now();
        Ok(Self { id: Uuid::now_v7(), name, slug, description: description.unwrap_or_default(), created_at: now, updated_at: now })
    }

    pub fn apply(&mut self, patch: CategoryPatch) -> Result<()> {
        let name = match patch.name.as_deref() {
            Some(n) => required_name(n)?,
            None => self.name.clone(),
        };
        let slug = match patch.slug.as_deref().map(str::trim) {
            Some("") => Slug::derive(&name)?,
            Some(s) => Slug::new(s)?,
            None => self.slug.clone(),
        };
        self.name = name;
        self.slug = slug;
        if let Some(description) = patch.description { self.description = description; }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// True when the two categories would collide on name or slug.
    pub fn clashes_with(&self, other: &Category) -> bool {
        self.id != other.id && (self.name == other.name || self.slug == other.slug)
    }
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() { return Err(Error::validation("Category name is required")); }
    Ok(name.to_string())
}
