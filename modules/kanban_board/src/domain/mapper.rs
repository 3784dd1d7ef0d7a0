use serde_json::Value;
use tracing::warn;

use crate::contract::model::{Column, Task};
use crate::domain::document::{Document, Fields};

pub const TITLE_FIELD: &str = "title";
pub const TEXT_FIELD: &str = "text";

pub fn column_fields(title: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(TITLE_FIELD.to_owned(), Value::String(title.to_owned()));
    fields
}

pub fn task_fields(text: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(TEXT_FIELD.to_owned(), Value::String(text.to_owned()));
    fields
}

/// Documents without a string `title` are skipped.
pub fn column_from_document(doc: &Document) -> Option<Column> {
    match doc.str_field(TITLE_FIELD) {
        Some(title) => Some(Column {
            id: doc.id.clone(),
            title: title.to_owned(),
            created_at: doc.created_at,
        }),
        None => {
            warn!(document_id = %doc.id, "column document has no title, skipping");
            None
        }
    }
}

/// Documents without a string `text` are skipped.
pub fn task_from_document(doc: &Document) -> Option<Task> {
    match doc.str_field(TEXT_FIELD) {
        Some(text) => Some(Task {
            id: doc.id.clone(),
            text: text.to_owned(),
            created_at: doc.created_at,
        }),
        None => {
            warn!(document_id = %doc.id, "task document has no text, skipping");
            None
        }
    }
}

pub fn columns_from_documents(docs: &[Document]) -> Vec<Column> {
    docs.iter().filter_map(column_from_document).collect()
}

pub fn tasks_from_documents(docs: &[Document]) -> Vec<Task> {
    docs.iter().filter_map(task_from_document).collect()
}
