// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the ragline RAG chat client.
//!
//! This crate provides the domain types and the error taxonomy used
//! throughout the ragline workspace. Everything wire-facing lives here so
//! the transport and application crates agree on one model.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RaglineError;
pub use types::{
    AUTO_TITLE_CHARS, Conversation, ConversationId, Document, DocumentId, DocumentPreview,
    MAX_TITLE_CHARS, Message, MessageId, TEMP_ID_PREFIX, UploadReport,
};
