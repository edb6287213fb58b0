// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the ragline client library.

use thiserror::Error;

/// The primary error type used across all ragline crates.
#[derive(Debug, Error)]
pub enum RaglineError {
    /// Local input validation failures (empty prompt, empty or oversized title).
    /// These are raised before any network traffic happens.
    #[error("validation error: {0}")]
    Validation(String),

    /// Another mutating operation is already in progress and this one was
    /// refused. Surfaced to users as an informational notice, not a failure.
    #[error("{operation} already in progress")]
    Busy { operation: &'static str },

    /// The service answered 401 or 403; the session token has been cleared.
    #[error("session is no longer authorized")]
    Unauthorized,

    /// Non-success HTTP response, with the service's `detail` text when the
    /// body carried one.
    #[error("api error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// A streamed response reported an error frame or broke mid-flight.
    #[error("stream error: {message}")]
    Stream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection-level failures (DNS, TLS, refused, timed out).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An in-flight operation was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration errors (invalid TOML, unknown keys, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RaglineError {
    /// True for errors that should be presented as informational rather than
    /// failures (busy rejections and user-initiated cancellations).
    pub fn is_informational(&self) -> bool {
        matches!(self, RaglineError::Busy { .. } | RaglineError::Cancelled)
    }
}
