// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for ragline integration tests.
//!
//! Provides [`MockBackend`], a wiremock-based stand-in for the chat
//! service, plus JSON and stream-body builders so tests stay short and
//! deterministic without a real service.

pub mod backend;

pub use backend::{
    MockBackend, conversation_json, document_json, message_json, sse_body, sse_body_with_error,
};
