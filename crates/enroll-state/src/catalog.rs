//! # Subject Catalog
//!
//! Read-only display data for the subjects a student can register for.
//! The catalog is replaced wholesale on every load and never patched.

use serde::{Deserialize, Serialize};

use enroll_core::SubjectId;

/// Colors assigned to subjects by catalog position.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#3b82f6", "#8b5cf6", "#10b981", "#f59e0b", "#ef4444", "#06b6d4", "#ec4899", "#6366f1",
];

/// Color used for registrations whose subject no longer exists.
pub const DELETED_SUBJECT_COLOR: &str = "#6b7280";

/// Name used for registrations whose subject no longer exists.
pub const DELETED_SUBJECT_NAME: &str = "Deleted Subject";

const DEFAULT_META: &str = "Groups available";

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    /// Single-glyph icon.
    pub icon: String,
    pub meta: String,
    pub color: String,
}

impl Subject {
    /// Derive display data for the `position`-th subject of a listing.
    pub fn from_listing(id: SubjectId, name: &str, position: usize, palette: &[String]) -> Self {
        let color = if palette.is_empty() {
            DEFAULT_PALETTE[position % DEFAULT_PALETTE.len()].to_string()
        } else {
            palette[position % palette.len()].clone()
        };
        Self {
            id,
            name: name.trim().to_string(),
            icon: icon_for(name),
            meta: DEFAULT_META.to_string(),
            color,
        }
    }
}

/// First character of `name`, upper-cased; `?` for an empty name.
pub fn icon_for(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// In-memory subject catalog, in listing order.
#[derive(Debug, Clone, Default)]
pub struct SubjectCatalog {
    subjects: Vec<Subject>,
}

impl SubjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire catalog. Duplicate identifiers keep the first entry.
    pub fn load(&mut self, subjects: Vec<Subject>) {
        let mut deduped: Vec<Subject> = Vec::with_capacity(subjects.len());
        for subject in subjects {
            if deduped.iter().any(|s| s.id == subject.id) {
                tracing::warn!(subject_id = %subject.id, "duplicate subject in catalog listing, ignoring");
                continue;
            }
            deduped.push(subject);
        }
        tracing::debug!(count = deduped.len(), "subject catalog loaded");
        self.subjects = deduped;
    }

    pub fn get(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| &s.id == id)
    }

    /// Look a subject up by identifier or, failing that, by case-insensitive name.
    pub fn resolve(&self, id_or_name: &str) -> Option<&Subject> {
        let needle = id_or_name.trim();
        self.subjects
            .iter()
            .find(|s| s.id.as_str() == needle)
            .or_else(|| self.subjects.iter().find(|s| s.name.eq_ignore_ascii_case(needle)))
    }

    pub fn all(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}
