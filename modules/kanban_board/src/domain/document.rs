//! Hierarchical document namespace: collection/document paths, the document
//! shape stored by backends, and the query ordering used by live queries.
//!
//! Board layout:
//!
//! ```text
//! boards/{user_id}                                   (derived, never stored)
//! boards/{user_id}/columns/{column_id}               { title }
//! boards/{user_id}/columns/{column_id}/tasks/{id}    { text }
//! ```

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

use crate::contract::model::{DocumentId, UserId};
use crate::domain::error::StoreError;

/// Free-form document payload.
pub type Fields = serde_json::Map<String, serde_json::Value>;

const BOARDS: &str = "boards";
const COLUMNS: &str = "columns";
const TASKS: &str = "tasks";

/// Path of a collection: an odd number of segments (`boards/u1/columns`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Path of a single document: an even number of segments (`boards/u1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Path of the document `id` inside this collection.
    pub fn doc(&self, id: &DocumentId) -> DocumentPath {
        let mut segments = self.segments.clone();
        segments.push(id.as_str().to_owned());
        DocumentPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Document owning this collection, `None` for root collections.
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() < 3 {
            return None;
        }
        Some(DocumentPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_segments(&self.segments, self)?;
        if self.segments.len() % 2 == 0 {
            return Err(StoreError::invalid_path(
                self.to_string(),
                "collection paths need an odd number of segments",
            ));
        }
        Ok(())
    }
}

impl DocumentPath {
    pub fn id(&self) -> DocumentId {
        DocumentId::new(self.segments.last().cloned().unwrap_or_default())
    }

    /// Collection holding this document.
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len().saturating_sub(1)].to_vec(),
        }
    }

    /// Subcollection `name` under this document.
    pub fn collection(&self, name: impl Into<String>) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        CollectionPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_segments(&self.segments, self)?;
        if self.segments.len() % 2 != 0 {
            return Err(StoreError::invalid_path(
                self.to_string(),
                "document paths need an even number of segments",
            ));
        }
        Ok(())
    }
}

fn validate_segments(segments: &[String], display: &dyn fmt::Display) -> Result<(), StoreError> {
    if segments.is_empty() {
        return Err(StoreError::invalid_path(display.to_string(), "empty path"));
    }
    for s in segments {
        if s.trim().is_empty() {
            return Err(StoreError::invalid_path(display.to_string(), "empty segment"));
        }
        if s.contains('/') {
            return Err(StoreError::invalid_path(
                display.to_string(),
                format!("segment '{s}' contains '/'"),
            ));
        }
    }
    Ok(())
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// The user's board. There is exactly one per user and it only exists as
/// the parent of the `columns` collection.
pub fn board_path_of(user_id: &UserId) -> DocumentPath {
    CollectionPath::root(BOARDS).doc(&DocumentId::new(user_id.as_str()))
}

pub fn columns_path(user_id: &UserId) -> CollectionPath {
    board_path_of(user_id).collection(COLUMNS)
}

pub fn column_path(user_id: &UserId, column_id: &DocumentId) -> DocumentPath {
    columns_path(user_id).doc(column_id)
}

pub fn tasks_path(user_id: &UserId, column_id: &DocumentId) -> CollectionPath {
    column_path(user_id, column_id).collection(TASKS)
}

pub fn task_path(user_id: &UserId, column_id: &DocumentId, task_id: &DocumentId) -> DocumentPath {
    tasks_path(user_id, column_id).doc(task_id)
}

/// A stored document. `created_at` is assigned by the store at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    pub fields: Fields,
}

impl Document {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// Query ordering. Documents sharing a timestamp are ordered by id so that
/// every reader sees the same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    CreatedAtAsc,
    CreatedAtDesc,
}

impl OrderBy {
    pub fn compare(self, a: &Document, b: &Document) -> Ordering {
        let asc = a
            .created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id));
        match self {
            OrderBy::CreatedAtAsc => asc,
            OrderBy::CreatedAtDesc => asc.reverse(),
        }
    }

    pub fn sort(self, docs: &mut [Document]) {
        docs.sort_by(|a, b| self.compare(a, b));
    }
}

/// Complete, ordered result of a live query at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}
