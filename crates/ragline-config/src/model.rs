// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the ragline client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level ragline configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RaglineConfig {
    /// Chat service endpoint settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Document context budget settings.
    #[serde(default)]
    pub context: ContextConfig,
}

/// Chat service endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Root URL of the chat service. The versioned API prefix (`/api/v1`)
    /// is appended by the client.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds for non-streaming calls. Streaming
    /// responses are exempt and only bounded by the connect timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Document context budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Advisory per-conversation budget for the combined size of context
    /// documents, in bytes. Exceeding it is reported, not enforced.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> u64 {
    5 * 1024 * 1024
}
