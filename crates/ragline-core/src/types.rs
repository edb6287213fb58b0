// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the ragline workspace.
//!
//! The wire-facing structs mirror the chat service's JSON models. Field
//! names follow the service verbatim, including `update_at` (sic) on
//! [`Conversation`]. Unknown wire fields (e.g. `user_uid`) are ignored on
//! deserialization.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix shared by all locally-generated temporary message ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Maximum accepted conversation title length, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Length at which auto-generated titles are truncated, in characters.
pub const AUTO_TITLE_CHARS: usize = 30;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Unique identifier for a message.
///
/// Server-assigned ids are UUIDs; optimistic messages use locally generated
/// `temp-prompt-*` / `temp-response-*` ids until the post-stream reload
/// replaces them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Unique identifier for a context document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl MessageId {
    /// Fresh temporary id for an optimistic user prompt.
    pub fn temp_prompt() -> Self {
        Self(format!("{TEMP_ID_PREFIX}prompt-{}", Uuid::new_v4()))
    }

    /// Fresh temporary id for an optimistic assistant response.
    pub fn temp_response() -> Self {
        Self(format!("{TEMP_ID_PREFIX}response-{}", Uuid::new_v4()))
    }

    /// True if this id was generated locally and has not been persisted.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }
}

/// A conversation as listed by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub uid: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Last-modification timestamp. The wire field is named `update_at` by
    /// the service; absent on conversations that were never touched.
    #[serde(default)]
    pub update_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Effective recency used for ordering: `update_at` when present,
    /// otherwise `created_at`.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.update_at.unwrap_or(self.created_at)
    }

    /// Derives an auto-generated title from the first prompt: the leading
    /// [`AUTO_TITLE_CHARS`] characters, with `...` appended when truncated.
    /// Character-based, so multi-byte text never splits mid scalar.
    pub fn title_from_prompt(prompt: &str) -> String {
        let mut title: String = prompt.chars().take(AUTO_TITLE_CHARS).collect();
        if prompt.chars().count() > AUTO_TITLE_CHARS {
            title.push_str("...");
        }
        title
    }
}

/// A prompt/response message pair within a conversation.
///
/// The service stores both halves of an exchange in one row: `prompt` holds
/// the user's text, `response` the assistant's. Either may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub uid: MessageId,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Local-only marker for an optimistic response still being streamed.
    /// Never sent to or received from the service.
    #[serde(skip)]
    pub is_loading: bool,
}

impl Message {
    /// Optimistic user-prompt entry inserted before the stream opens.
    pub fn optimistic_prompt(text: impl Into<String>) -> Self {
        Self {
            uid: MessageId::temp_prompt(),
            prompt: Some(text.into()),
            response: None,
            created_at: Utc::now(),
            is_loading: false,
        }
    }

    /// Optimistic empty assistant-response entry that streamed chunks are
    /// appended to.
    pub fn optimistic_response() -> Self {
        Self {
            uid: MessageId::temp_response(),
            prompt: None,
            response: Some(String::new()),
            created_at: Utc::now(),
            is_loading: true,
        }
    }
}

/// A document attached to a conversation's retrieval context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub uid: DocumentId,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    /// Size in bytes.
    pub size: u64,
    pub mime_type: String,
    /// Whether the document participates in retrieval. Older service
    /// versions omit the field; absent means active.
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

/// Decoded preview content for a context document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentPreview {
    /// Raw PDF bytes, for an embedded viewer.
    Pdf(Vec<u8>),
    /// Raw image bytes.
    Image(Vec<u8>),
    /// Text content decoded as UTF-8 (lossy).
    Text(String),
    /// Preview is not offered for this mime type; no download happens.
    Unsupported { mime_type: String },
}

/// Service response to a document upload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadReport {
    #[serde(default)]
    pub message: String,
    /// Documents accepted and ingested.
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Per-file failures, in the service's loosely structured form.
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}
