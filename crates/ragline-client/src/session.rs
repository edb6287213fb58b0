// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated session handle shared by all requests.
//!
//! The session owns the bearer token and the reaction to a rejected one.
//! There is no ambient storage: hosts inject an on-unauthorized hook and
//! decide themselves what "logged out" means (clear a keychain entry,
//! prompt for login, etc.).

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// Callback invoked after the service rejects the session token.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Cloneable handle to the authentication state.
///
/// All clones share one token: invalidating the session through any clone
/// is visible to every request in flight after it.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    token: RwLock<Option<SecretString>>,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
}

// Both locks guard single-assignment values, so a writer panicking
// mid-update cannot leave them torn; recover the guard instead of
// propagating the poison.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    /// Creates an unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session holding the given bearer token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(token);
        session
    }

    /// Installs the hook invoked when the service rejects the token.
    /// Builder-style; the hook can also be swapped later on a shared handle.
    pub fn on_unauthorized(self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        *write(&self.inner.on_unauthorized) = Some(Arc::new(hook));
        self
    }

    /// Replaces the current bearer token.
    pub fn set_token(&self, token: impl Into<String>) {
        *write(&self.inner.token) = Some(SecretString::from(token.into()));
    }

    /// Returns a copy of the current bearer token, if any.
    pub fn token(&self) -> Option<SecretString> {
        read(&self.inner.token)
            .as_ref()
            .map(|t| SecretString::from(t.expose_secret().to_owned()))
    }

    /// True when a token is present.
    pub fn is_authenticated(&self) -> bool {
        read(&self.inner.token).is_some()
    }

    /// Drops the stored token without invoking the unauthorized hook.
    pub fn clear(&self) {
        *write(&self.inner.token) = None;
    }

    /// Reaction to a 401/403 response: clear the token, then fire the hook.
    pub(crate) fn handle_unauthorized(&self) {
        warn!("session token rejected by the service; clearing credentials");
        self.clear();
        let hook = read(&self.inner.on_unauthorized).clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
