// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport layer for the ragline RAG chat client.
//!
//! This crate owns everything that touches the network:
//! - [`Session`]: the shared bearer-token handle with an injectable
//!   on-unauthorized hook
//! - [`ApiClient`]: typed calls to the service's `/api/v1` REST surface,
//!   including the streaming endpoints
//! - [`FrameDecoder`]: the pure decoder that turns streamed bytes into
//!   `data: ` frames
//!
//! Application state and optimistic-update semantics live in
//! `ragline-app`; nothing here mutates local state beyond the session.

pub mod client;
pub mod session;
pub mod sse;

pub use client::{ApiClient, ByteStream, UploadFile};
pub use session::Session;
pub use sse::{Frame, FrameDecoder};
