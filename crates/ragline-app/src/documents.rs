// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document context panel for the active conversation.
//!
//! Tracks the uploaded documents, the list projection the user sees
//! (filter plus sort), per-document preview failures, and the retrieval
//! context budget. Pure state; network calls live in
//! [`crate::controller`].

use std::collections::HashMap;

use ragline_core::{Document, DocumentId};
use strum::Display;

/// Column the visible document list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DocumentSortKey {
    Filename,
    Size,
    #[default]
    UploadDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// How much of the retrieval context budget the conversation's documents
/// occupy. Advisory only: the limit is not enforced client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextUsage {
    pub used_bytes: u64,
    pub max_bytes: u64,
}

impl ContextUsage {
    pub fn is_over_budget(&self) -> bool {
        self.used_bytes > self.max_bytes
    }
}

/// Documents attached to the active conversation, plus presentation state.
#[derive(Debug, Default)]
pub struct DocumentPanel {
    documents: Vec<Document>,
    filter: String,
    sort_key: DocumentSortKey,
    sort_order: SortOrder,
    preview_errors: HashMap<DocumentId, String>,
}

impl DocumentPanel {
    /// Replace the document list after a fetch. Stale preview errors are
    /// dropped with the old list.
    pub fn replace_all(&mut self, documents: Vec<Document>) {
        self.documents = documents;
        self.preview_errors.clear();
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.preview_errors.clear();
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| &d.uid == id)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_sort(&mut self, key: DocumentSortKey, order: SortOrder) {
        self.sort_key = key;
        self.sort_order = order;
    }

    pub fn sort(&self) -> (DocumentSortKey, SortOrder) {
        (self.sort_key, self.sort_order)
    }

    /// The list as the user sees it: filtered by case-insensitive filename
    /// substring, then sorted. The underlying list keeps server order.
    pub fn visible(&self) -> Vec<Document> {
        let needle = self.filter.trim().to_lowercase();
        let mut visible: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| needle.is_empty() || d.filename.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        visible.sort_by(|a, b| {
            let ordering = match self.sort_key {
                DocumentSortKey::Filename => a.filename.to_lowercase().cmp(&b.filename.to_lowercase()),
                DocumentSortKey::Size => a.size.cmp(&b.size),
                DocumentSortKey::UploadDate => a.upload_date.cmp(&b.upload_date),
            };
            match self.sort_order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        visible
    }

    /// Flip or set a document's retrieval flag. Returns the previous value,
    /// or `None` for an unknown id.
    pub fn set_active_flag(&mut self, id: &DocumentId, active: bool) -> Option<bool> {
        let document = self.documents.iter_mut().find(|d| &d.uid == id)?;
        let previous = document.is_active;
        document.is_active = active;
        Some(previous)
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let index = self.documents.iter().position(|d| &d.uid == id)?;
        self.preview_errors.remove(id);
        Some(self.documents.remove(index))
    }

    /// Total size of every document in the conversation, active or not.
    /// The server indexes inactive documents too; disabling only excludes
    /// them from retrieval.
    pub fn total_bytes(&self) -> u64 {
        self.documents.iter().map(|d| d.size).sum()
    }

    pub fn usage(&self, max_bytes: u64) -> ContextUsage {
        ContextUsage {
            used_bytes: self.total_bytes(),
            max_bytes,
        }
    }

    pub fn set_preview_error(&mut self, id: &DocumentId, message: impl Into<String>) {
        self.preview_errors.insert(id.clone(), message.into());
    }

    pub fn clear_preview_error(&mut self, id: &DocumentId) {
        self.preview_errors.remove(id);
    }

    pub fn preview_error(&self, id: &DocumentId) -> Option<&str> {
        self.preview_errors.get(id).map(String::as_str)
    }
}
