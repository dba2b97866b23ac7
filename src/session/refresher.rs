//! Timer-driven bearer-token refresh.
//!
//! After each successful authorization grant the refresher schedules a
//! one-shot timer for shortly before the token expires; when it fires, an
//! authorization-refresh request is enqueued through the normal sender path.
//! The next grant reschedules the cycle.
//!
//! The refresher is not self-healing: if no grant arrives after a refresh
//! request, no further refresh is attempted, and a denied grant is terminal.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::protocol::response::AuthorizationGrant;
use crate::transport::sender::RequestSender;

use super::state::{SessionState, unix_time_ms};

// ============================================================================
// Constants
// ============================================================================

/// Default lead time before expiry at which a refresh is requested.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(20);

// ============================================================================
// RefreshState
// ============================================================================

/// Refresh cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No token held yet.
    Idle,
    /// Timer armed for the current token.
    Waiting {
        /// Expiry of the token the timer guards, Unix milliseconds.
        expire_at_ms: u64,
    },
    /// Refresh request enqueued, grant not yet received.
    RefreshRequested,
    /// Terminal: stopped explicitly or the grant was denied.
    Failed,
}

// ============================================================================
// SessionRefresher
// ============================================================================

/// Schedules authorization refreshes ahead of token expiry.
pub struct SessionRefresher {
    sender: RequestSender,
    session: SessionState,
    safety_margin: Duration,
    state: Arc<Mutex<RefreshState>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRefresher")
            .field("state", &self.state())
            .field("safety_margin", &self.safety_margin)
            .finish_non_exhaustive()
    }
}

impl SessionRefresher {
    /// Creates an idle refresher.
    #[must_use]
    pub(crate) fn new(
        sender: RequestSender,
        session: SessionState,
        safety_margin: Duration,
    ) -> Self {
        Self {
            sender,
            session,
            safety_margin,
            state: Arc::new(Mutex::new(RefreshState::Idle)),
            timer: Mutex::new(None),
        }
    }

    /// Returns the current refresh-cycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> RefreshState {
        *self.state.lock()
    }

    /// Reacts to an authorization grant from the dispatch path.
    ///
    /// A successful grant stores the tokens and (re)arms the timer; a denial
    /// is terminal.
    pub fn on_grant(&self, grant: &AuthorizationGrant) {
        if *self.state.lock() == RefreshState::Failed {
            // stop() already ran; a late grant must not re-arm the timer.
            return;
        }

        if !grant.success {
            warn!(message = %grant.message, "Authorization denied, refresh cycle stopped");
            self.cancel_timer();
            *self.state.lock() = RefreshState::Failed;
            return;
        }

        self.session.apply_grant(grant);
        self.schedule(grant.expire_at_ms);
    }

    /// Cancels any pending timer; idempotent.
    pub fn stop(&self) {
        self.cancel_timer();
        *self.state.lock() = RefreshState::Failed;
    }

    /// Arms a one-shot timer for `expire_at_ms` minus the safety margin.
    fn schedule(&self, expire_at_ms: u64) {
        let wait = compute_wait(expire_at_ms, unix_time_ms(), self.safety_margin);
        debug!(?wait, expire_at_ms, "Authorization refresh scheduled");

        self.cancel_timer();
        *self.state.lock() = RefreshState::Waiting { expire_at_ms };

        let sender = self.sender.clone();
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;

            *state.lock() = RefreshState::RefreshRequested;
            match sender.refresh_authorization() {
                Ok(sent) => {
                    debug!(request_id = %sent.header.request_id, "Authorization refresh enqueued");
                }
                Err(e) => {
                    error!(error = %e, "Failed to enqueue authorization refresh");
                    *state.lock() = RefreshState::Failed;
                }
            }
        });

        *self.timer.lock() = Some(handle);
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for SessionRefresher {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

// ============================================================================
// Wait Computation
// ============================================================================

/// Time until a refresh should be requested: expiry minus now minus the
/// safety margin, clamped to zero.
#[must_use]
pub(crate) fn compute_wait(expire_at_ms: u64, now_ms: u64, safety_margin: Duration) -> Duration {
    let margin_ms = safety_margin.as_millis() as u64;
    Duration::from_millis(expire_at_ms.saturating_sub(now_ms).saturating_sub(margin_ms))
}

// ============================================================================
// Tests
// ============================================================================
