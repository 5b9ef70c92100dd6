//! Cookie sessions with server-side state.
//!
//! The browser only holds a random token. Everything else (who is signed in,
//! pending flash messages, the Google sign-in `state`) lives in the `sessions`
//! table, keyed by a hash of that token.
//!
//! - [`manage_session`] loads the session before the handler runs and writes
//!   it back afterwards.
//! - [`Session`] is the request scoped handle handlers and gates work with.
//! - [`SessionStore`] is the database side.

mod middleware;
mod store;

pub use middleware::{SESSION_COOKIE_NAME, manage_session, spawn_cleanup_task};
pub use store::{SessionStore, StoredSession};

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-time notice shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn is_error(&self) -> bool {
        self.kind == FlashKind::Error
    }
}

/// What a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub flash: Vec<Flash>,
    /// Anti-forgery value for an in-flight Google sign-in.
    #[serde(default)]
    pub oauth_state: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    data: SessionData,
    /// Something changed and must be written back.
    dirty: bool,
    /// Issue a fresh session id (login, logout).
    renew: bool,
}

/// Request scoped session handle.
///
/// Cloning is cheap; all clones share the same state, so changes made by a
/// handler are visible to [`manage_session`] once the handler returns.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn new(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                data,
                dirty: false,
                renew: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user_id(&self) -> Option<String> {
        self.state().data.user_id.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().data.user_id.is_some()
    }

    /// Bind the session to `user_id`, rotating the session id.
    pub fn login(&self, user_id: &str) {
        let mut state = self.state();
        state.data.user_id = Some(user_id.to_string());
        state.dirty = true;
        state.renew = true;
    }

    /// Drop the signed-in identity. The session itself (and any flash queued
    /// after this call) survives under a fresh id.
    pub fn logout(&self) {
        let mut state = self.state();
        state.data.user_id = None;
        state.data.oauth_state = None;
        state.dirty = true;
        state.renew = true;
    }

    pub fn flash(&self, kind: FlashKind, message: impl Into<String>) {
        let mut state = self.state();
        state.data.flash.push(Flash {
            kind,
            message: message.into(),
        });
        state.dirty = true;
    }

    pub fn flash_error(&self, message: impl Into<String>) {
        self.flash(FlashKind::Error, message);
    }

    pub fn flash_success(&self, message: impl Into<String>) {
        self.flash(FlashKind::Success, message);
    }

    /// Remove and return every pending flash message.
    pub fn take_flashes(&self) -> Vec<Flash> {
        let mut state = self.state();
        if state.data.flash.is_empty() {
            return Vec::new();
        }
        state.dirty = true;
        std::mem::take(&mut state.data.flash)
    }

    pub fn set_oauth_state(&self, value: String) {
        let mut state = self.state();
        state.data.oauth_state = Some(value);
        state.dirty = true;
    }

    /// One-shot: the stored state is cleared whether or not it matches.
    pub fn take_oauth_state(&self) -> Option<String> {
        let mut state = self.state();
        let value = state.data.oauth_state.take();
        if value.is_some() {
            state.dirty = true;
        }
        value
    }

    /// Current data plus the dirty / renew flags.
    pub(crate) fn snapshot(&self) -> (SessionData, bool, bool) {
        let state = self.state();
        (state.data.clone(), state.dirty, state.renew)
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session not found in extensions; is manage_session installed?");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })
    }
}
