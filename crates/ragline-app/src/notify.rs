// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transient user-facing notifications.
//!
//! Every operation outcome a user should see (success confirmations,
//! failures, busy rejections) is emitted as a [`Notice`] to an injected
//! sink. Hosts route notices to their snackbar/toast surface; the default
//! sink logs them through `tracing` so nothing is ever silently dropped.

use std::sync::Arc;

use strum::Display;
use tracing::{error, info, warn};

/// Severity of a notice. Busy rejections are [`NoticeLevel::Info`]; they
/// are expected flow control, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Receiver for notices. Called synchronously from operation code paths;
/// sinks must be cheap and non-blocking.
pub type NoticeSink = Arc<dyn Fn(Notice) + Send + Sync>;

/// Default sink: forward notices to the log at a matching level.
pub(crate) fn log_sink() -> NoticeSink {
    Arc::new(|notice: Notice| match notice.level {
        NoticeLevel::Info | NoticeLevel::Success => info!(notice = %notice.text, "notice"),
        NoticeLevel::Warning => warn!(notice = %notice.text, "notice"),
        NoticeLevel::Error => error!(notice = %notice.text, "notice"),
    })
}
