// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application core for a Ragline chat client.
//!
//! This crate owns the client-side state of a chat session against a
//! Ragline backend and keeps it consistent through optimistic updates:
//!
//! - [`ConversationStore`]: the conversation list and active selection,
//! - [`Transcript`]: the messages of the active conversation,
//! - [`DocumentPanel`]: the retrieval context documents,
//! - [`ChatController`]: the operations tying them to the HTTP client,
//!   including the streaming send/edit transactions with rollback.
//!
//! Hosts (a desktop shell, a TUI, tests) hold one [`ChatController`],
//! call its async operations, and render from its snapshot accessors.
//! User-visible outcomes arrive through a [`NoticeSink`].

pub mod controller;
pub mod documents;
pub mod notify;
pub mod reconciler;
mod state;
pub mod store;
pub mod transcript;

pub use controller::ChatController;
pub use documents::{ContextUsage, DocumentPanel, DocumentSortKey, SortOrder};
pub use notify::{Notice, NoticeLevel, NoticeSink};
pub use ragline_client::UploadFile;
pub use reconciler::StreamPhase;
pub use state::OpFlags;
pub use store::ConversationStore;
pub use transcript::Transcript;
