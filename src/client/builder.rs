//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`GatewayClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use gatelink::{ClientId, GatewayClient};
//!
//! # fn example() -> gatelink::Result<()> {
//! let client = GatewayClient::builder()
//!     .endpoint("wss://gateway.example:9000")
//!     .client_id(ClientId::new(12))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::handler::{NoopHandler, ResponseHandler};
use crate::identifiers::{ClientId, SessionId};

use super::core::GatewayClient;
use super::options::GatewayOptions;

// ============================================================================
// GatewayClientBuilder
// ============================================================================

/// Builder for configuring a [`GatewayClient`] instance.
///
/// Use [`GatewayClient::builder()`] to create a new builder.
#[derive(Default)]
pub struct GatewayClientBuilder {
    endpoint: Option<String>,
    client_id: Option<ClientId>,
    session_id: Option<SessionId>,
    handler: Option<Arc<dyn ResponseHandler>>,
    poll_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    refresh_safety_margin: Option<Duration>,
}

impl std::fmt::Debug for GatewayClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("session_id", &self.session_id)
            .field("handler_set", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl GatewayClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gateway endpoint URL (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the gateway-assigned client identifier.
    #[inline]
    #[must_use]
    pub fn client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets an explicit session identifier.
    ///
    /// Generated randomly when not set; must be unique per machine+client.
    #[inline]
    #[must_use]
    pub fn session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Sets the initial response handler.
    ///
    /// Defaults to a no-op handler; can be upgraded later through
    /// [`GatewayClient::set_handler`].
    #[inline]
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn ResponseHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the worker-loop poll timeout.
    #[inline]
    #[must_use]
    pub fn poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = Some(poll_timeout);
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    /// Sets the refresh safety margin.
    #[inline]
    #[must_use]
    pub fn refresh_safety_margin(mut self, margin: Duration) -> Self {
        self.refresh_safety_margin = Some(margin);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if endpoint or client id is not set
    /// - [`Error::Config`] if the endpoint is not a valid `ws`/`wss` URL
    pub fn build(self) -> Result<GatewayClient> {
        let endpoint = self.endpoint.ok_or_else(|| {
            Error::config(
                "Gateway endpoint is required. Use .endpoint() to set it.\n\
                 Example: GatewayClient::builder().endpoint(\"wss://gateway.example:9000\")",
            )
        })?;
        let client_id = self.client_id.ok_or_else(|| {
            Error::config(
                "Client id is required. Use .client_id() to set it.\n\
                 Example: GatewayClient::builder().client_id(ClientId::new(12))",
            )
        })?;

        let mut options = GatewayOptions::new(endpoint, client_id);
        options.session_id = self.session_id;
        if let Some(poll_timeout) = self.poll_timeout {
            options.poll_timeout = poll_timeout;
        }
        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = connect_timeout;
        }
        if let Some(margin) = self.refresh_safety_margin {
            options.refresh_safety_margin = margin;
        }

        let handler = self.handler.unwrap_or_else(|| Arc::new(NoopHandler));
        GatewayClient::with_options(options, handler)
    }
}

// ============================================================================
// Tests
// ============================================================================
