//! Session token store.
//!
//! [`SessionState`] holds the bearer/refresh tokens and the logon
//! credentials. It is written by the dispatch path (logon acknowledgement,
//! authorization grant) and read by the request sender when stamping
//! headers; every access goes through the synchronized accessors here, never
//! through a shared field.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::protocol::credential::Credential;
use crate::protocol::response::AuthorizationGrant;

// ============================================================================
// Time
// ============================================================================

/// Current wall-clock time, Unix milliseconds.
#[must_use]
pub(crate) fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ============================================================================
// SessionState
// ============================================================================

#[derive(Default)]
struct SessionInner {
    access_token: String,
    refresh_token: String,
    expire_at_ms: Option<u64>,
    credentials: Vec<Credential>,
}

/// Shared session token store.
///
/// Created empty at client construction, populated by the first
/// authorization grant, updated on each refresh, cleared on logoff.
///
/// # Thread Safety
///
/// `SessionState` is a cheap cloneable handle; clones share the same store.
#[derive(Clone, Default)]
pub struct SessionState {
    inner: Arc<Mutex<SessionInner>>,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SessionState")
            .field("authenticated", &!inner.access_token.is_empty())
            .field("expire_at_ms", &inner.expire_at_ms)
            .field("credential_count", &inner.credentials.len())
            .finish()
    }
}

impl SessionState {
    /// Creates an empty session state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored logon credentials.
    pub fn set_credentials(&self, credentials: Vec<Credential>) {
        self.inner.lock().credentials = credentials;
    }

    /// Returns a copy of the stored logon credentials.
    #[must_use]
    pub fn credentials(&self) -> Vec<Credential> {
        self.inner.lock().credentials.clone()
    }

    /// Returns the current access token; empty before logon.
    #[must_use]
    pub fn access_token(&self) -> String {
        self.inner.lock().access_token.clone()
    }

    /// Returns the current refresh token; empty before logon.
    #[must_use]
    pub fn refresh_token(&self) -> String {
        self.inner.lock().refresh_token.clone()
    }

    /// Returns the access-token expiry, Unix milliseconds.
    #[must_use]
    pub fn expire_at_ms(&self) -> Option<u64> {
        self.inner.lock().expire_at_ms
    }

    /// Returns `true` once an access token has been granted.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.inner.lock().access_token.is_empty()
    }

    /// Stores the tokens from a successful authorization grant.
    ///
    /// Denied grants are ignored here; denial handling (stopping the
    /// refresher) lives in the dispatch path.
    pub fn apply_grant(&self, grant: &AuthorizationGrant) {
        if !grant.success {
            return;
        }
        let mut inner = self.inner.lock();
        inner.access_token = grant.access_token.clone();
        inner.refresh_token = grant.refresh_token.clone();
        inner.expire_at_ms = Some(grant.expire_at_ms);
    }

    /// Clears tokens and credentials.
    ///
    /// Called on logoff and on unrecoverable auth failure.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.access_token.clear();
        inner.refresh_token.clear();
        inner.expire_at_ms = None;
        inner.credentials.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
