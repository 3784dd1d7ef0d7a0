use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Provider-issued, stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signed-in user as returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: DocumentId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: DocumentId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// What the presentation layer renders: columns in creation order and the
/// live task list of every column that currently has a task subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    pub columns: Vec<Column>,
    pub tasks_by_column: BTreeMap<DocumentId, Vec<Task>>,
}

impl BoardView {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.tasks_by_column.is_empty()
    }

    pub fn column_titles(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.title.as_str()).collect()
    }

    pub fn tasks_of(&self, column_id: &DocumentId) -> &[Task] {
        self.tasks_by_column
            .get(column_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// User intents forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardIntent {
    AddColumn {
        title: String,
    },
    AddTask {
        column_id: DocumentId,
        text: String,
    },
    DeleteColumn {
        column_id: DocumentId,
    },
    DeleteTask {
        column_id: DocumentId,
        task_id: DocumentId,
    },
    Logout,
}
