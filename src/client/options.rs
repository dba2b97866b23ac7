//! Client configuration options.
//!
//! All configuration is passed at construction time as plain parameters;
//! there is no CLI or file surface here.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::identifiers::{ClientId, SessionId};
use crate::session::DEFAULT_SAFETY_MARGIN;
use crate::transport::DEFAULT_POLL_TIMEOUT;

// ============================================================================
// Constants
// ============================================================================

/// Default wait for the bridge to reach `Running` during connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// GatewayOptions
// ============================================================================

/// Gateway client configuration.
///
/// `endpoint` selects the transport security by scheme: `ws://` connects in
/// the clear, `wss://` under TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Gateway endpoint URL (`ws://` or `wss://`).
    pub endpoint: String,

    /// Gateway-assigned client identifier.
    pub client_id: ClientId,

    /// Session identifier; generated when `None`.
    pub session_id: Option<SessionId>,

    /// Bounded wait for each worker-loop readiness poll.
    pub poll_timeout: Duration,

    /// Wait for the bridge to reach `Running` during connect.
    pub connect_timeout: Duration,

    /// Lead time before token expiry at which a refresh is requested.
    pub refresh_safety_margin: Duration,
}

impl GatewayOptions {
    /// Creates options with default timeouts.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, client_id: ClientId) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_id,
            session_id: None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            refresh_safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }

    /// Sets an explicit session identifier.
    #[inline]
    #[must_use]
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Sets the worker-loop poll timeout.
    #[inline]
    #[must_use]
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Sets the refresh safety margin.
    #[inline]
    #[must_use]
    pub fn with_refresh_safety_margin(mut self, margin: Duration) -> Self {
        self.refresh_safety_margin = margin;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
