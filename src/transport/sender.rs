//! Outbound queue and request sender.
//!
//! [`RequestSender`] decouples producers (any caller task) from the single
//! socket owner: builders validate, stamp a header, encode, and append the
//! frame to an unbounded FIFO queue. A dedicated forwarding loop drains the
//! queue toward the bridge.
//!
//! The queue is deliberately unbounded: request volume is human/heartbeat
//! scale, and a transport stall already requires caller intervention under
//! the no-reconnect failure model, so backpressure would not aid recovery.
//!
//! # Shutdown
//!
//! The forwarding loop waits at most one polling interval per dequeue, so a
//! stop signal is observed within that interval. Frames still queued at stop
//! time are abandoned, not flushed.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{AccountId, ClientId, RequestId, SessionId};
use crate::protocol::codec;
use crate::protocol::credential::Credential;
use crate::protocol::request::{CancelOrder, NewOrder, ReplaceOrder, Request, RequestHeader};
use crate::session::SessionState;

// ============================================================================
// SentRequest
// ============================================================================

/// A request that has been stamped, encoded and enqueued.
///
/// Returned to the caller for inspection and testing; `frame` is exactly the
/// byte sequence handed to the transport.
#[derive(Debug, Clone)]
pub struct SentRequest {
    /// The stamped header.
    pub header: RequestHeader,

    /// The typed request body.
    pub request: Request,

    /// The encoded wire frame.
    pub frame: Vec<u8>,
}

// ============================================================================
// RequestSender
// ============================================================================

/// Thread-safe handle for building and enqueueing requests.
///
/// Cheap to clone; clones share the queue, the session state and the
/// request-id counter.
#[derive(Clone)]
pub struct RequestSender {
    queue_tx: mpsc::UnboundedSender<Vec<u8>>,
    client_id: ClientId,
    session_id: SessionId,
    session: SessionState,
    next_request_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for RequestSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSender")
            .field("client_id", &self.client_id)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl RequestSender {
    /// Creates a sender handle over the given outbound queue.
    #[must_use]
    pub(crate) fn new(
        client_id: ClientId,
        session_id: SessionId,
        session: SessionState,
        queue_tx: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            queue_tx,
            client_id,
            session_id,
            session,
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Returns the session identifier stamped on outgoing requests.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Appends a pre-encoded frame to the outbound queue.
    ///
    /// Non-blocking; no backpressure is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the runtime has shut down.
    pub fn enqueue(&self, frame: Vec<u8>) -> Result<()> {
        self.queue_tx
            .send(frame)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Stamps the next header.
    ///
    /// Consumes one request id; ids strictly increase per sender instance
    /// regardless of what happens to the request afterwards.
    fn stamp_header(&self) -> RequestHeader {
        RequestHeader {
            client_id: self.client_id,
            session_id: self.session_id.clone(),
            access_token: self.session.access_token(),
            request_id: RequestId::new(self.next_request_id.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// Encodes and enqueues a validated request.
    fn submit(&self, request: Request) -> Result<SentRequest> {
        let header = self.stamp_header();
        let frame = codec::encode_request(&header, &request)?;

        self.enqueue(frame.clone())?;
        trace!(request_id = %header.request_id, kind = request.kind(), "Request enqueued");

        Ok(SentRequest {
            header,
            request,
            frame,
        })
    }
}

// ============================================================================
// RequestSender - Builders
// ============================================================================

impl RequestSender {
    /// Builds and enqueues a logon request with the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if no credentials are stored or any
    /// credential is missing a required field.
    pub fn logon(&self) -> Result<SentRequest> {
        let credentials = self.session.credentials();
        if credentials.is_empty() {
            return Err(Error::invalid_request(
                "logon requires at least one credential",
            ));
        }
        for credential in &credentials {
            credential.validate()?;
        }
        self.submit(Request::Logon { credentials })
    }

    /// Builds and enqueues a logoff request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the runtime has shut down.
    pub fn logoff(&self) -> Result<SentRequest> {
        self.submit(Request::Logoff)
    }

    /// Builds and enqueues a heartbeat.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the runtime has shut down.
    pub fn heartbeat(&self) -> Result<SentRequest> {
        self.submit(Request::Heartbeat)
    }

    /// Builds and enqueues an echo test.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the runtime has shut down.
    pub fn test_echo(&self, payload: impl Into<String>) -> Result<SentRequest> {
        self.submit(Request::TestEcho {
            payload: payload.into(),
        })
    }

    /// Builds and enqueues a server-time query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the runtime has shut down.
    pub fn server_time(&self) -> Result<SentRequest> {
        self.submit(Request::ServerTime)
    }

    /// Builds and enqueues a new order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if a required order field is missing.
    pub fn place_order(&self, order: NewOrder) -> Result<SentRequest> {
        order.validate()?;
        self.submit(Request::PlaceOrder(order))
    }

    /// Builds and enqueues an order amendment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if a required field is missing.
    pub fn replace_order(&self, replace: ReplaceOrder) -> Result<SentRequest> {
        replace.validate()?;
        self.submit(Request::ReplaceOrder(replace))
    }

    /// Builds and enqueues an order cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if a required field is missing.
    pub fn cancel_order(&self, cancel: CancelOrder) -> Result<SentRequest> {
        cancel.validate()?;
        self.submit(Request::CancelOrder(cancel))
    }

    /// Builds and enqueues an account-list query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the runtime has shut down.
    pub fn account_data(&self) -> Result<SentRequest> {
        self.submit(Request::AccountData)
    }

    /// Builds and enqueues a balances query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the account id is empty.
    pub fn account_balances(&self, account_id: AccountId) -> Result<SentRequest> {
        Self::require_account(&account_id)?;
        self.submit(Request::AccountBalances { account_id })
    }

    /// Builds and enqueues an open-positions query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the account id is empty.
    pub fn open_positions(&self, account_id: AccountId) -> Result<SentRequest> {
        Self::require_account(&account_id)?;
        self.submit(Request::OpenPositions { account_id })
    }

    /// Builds and enqueues a working-orders query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the account id is empty.
    pub fn working_orders(&self, account_id: AccountId) -> Result<SentRequest> {
        Self::require_account(&account_id)?;
        self.submit(Request::WorkingOrders { account_id })
    }

    /// Builds and enqueues a completed-orders query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the account id is empty.
    pub fn completed_orders(&self, account_id: AccountId) -> Result<SentRequest> {
        Self::require_account(&account_id)?;
        self.submit(Request::CompletedOrders { account_id })
    }

    /// Builds and enqueues an exchange-properties query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the runtime has shut down.
    pub fn exchange_properties(&self) -> Result<SentRequest> {
        self.submit(Request::ExchangeProperties)
    }

    /// Builds and enqueues an authorization refresh carrying the current
    /// refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if no refresh token is held.
    pub fn refresh_authorization(&self) -> Result<SentRequest> {
        let refresh_token = self.session.refresh_token();
        if refresh_token.is_empty() {
            return Err(Error::invalid_request(
                "no refresh token held; logon must succeed first",
            ));
        }
        self.submit(Request::RefreshAuthorization { refresh_token })
    }

    fn require_account(account_id: &AccountId) -> Result<()> {
        if account_id.is_empty() {
            return Err(Error::invalid_request("query missing account id"));
        }
        Ok(())
    }
}

// ============================================================================
// Forwarding Loop
// ============================================================================

/// Drains the outbound queue toward the bridge leg.
///
/// Dequeues with a bounded wait so the stop signal is observed within one
/// polling interval even when the queue stays empty.
pub(crate) async fn run_sender_loop(
    mut queue_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    bridge_tx: mpsc::UnboundedSender<Vec<u8>>,
    signal: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    loop {
        match timeout(poll_timeout, queue_rx.recv()).await {
            Ok(Some(frame)) => {
                if bridge_tx.send(frame).is_err() {
                    debug!("Bridge leg closed, sender loop exiting");
                    break;
                }
            }
            Ok(None) => {
                debug!("Outbound queue closed, sender loop exiting");
                break;
            }
            Err(_) => {
                if signal.load(Ordering::Relaxed) {
                    debug!("Stop signal observed, sender loop exiting");
                    break;
                }
            }
        }
    }
    // Whatever is still queued is abandoned, not flushed.
}

// ============================================================================
// Tests
// ============================================================================
