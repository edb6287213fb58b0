// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ragline.toml` > `~/.config/ragline/ragline.toml`
//! > `/etc/ragline/ragline.toml` with environment variable overrides via the
//! `RAGLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RaglineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ragline/ragline.toml` (system-wide)
/// 3. `~/.config/ragline/ragline.toml` (user XDG config)
/// 4. `./ragline.toml` (local directory)
/// 5. `RAGLINE_*` environment variables
pub fn load_config() -> Result<RaglineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RaglineConfig::default()))
        .merge(Toml::file("/etc/ragline/ragline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ragline/ragline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ragline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and embedded configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RaglineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RaglineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RaglineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RaglineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `RAGLINE_API_BASE_URL` must map to
/// `api.base_url`, not `api.base.url`.
fn env_provider() -> Env {
    Env::prefixed("RAGLINE_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped.
        // Example: RAGLINE_API_BASE_URL -> "api_base_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("api_", "api.", 1)
            .replacen("context_", "context.", 1);
        mapped.into()
    })
}
