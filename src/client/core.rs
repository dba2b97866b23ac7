//! Gateway client coordinator.
//!
//! [`GatewayClient`] ties the runtime together: it owns the connection
//! bridge, the request sender, the response receiver and the session
//! refresher, and wires session bookkeeping into the dispatch path so that
//! logon acknowledgements and authorization grants update [`SessionState`]
//! before the caller's handler sees them.
//!
//! # Example
//!
//! ```no_run
//! use gatelink::{ClientId, Credential, GatewayClient};
//!
//! # async fn example() -> gatelink::Result<()> {
//! let client = GatewayClient::builder()
//!     .endpoint("wss://gateway.example:9000")
//!     .client_id(ClientId::new(12))
//!     .build()?;
//!
//! client.connect().await?;
//! client.logon(vec![Credential::new("ACC-1", "key", "secret")])?;
//! client.sender().heartbeat()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::handler::{DispatchContext, ResponseHandler};
use crate::identifiers::{ClientId, SessionId};
use crate::protocol::credential::Credential;
use crate::protocol::response::{
    AccountBalancesReport, AccountDataReport, AuthorizationGrant, CompletedOrdersReport,
    ExchangePropertiesReport, ExecutionReport, HeartbeatAck, LogoffAck, LogonAck,
    OpenPositionsReport, ServerTime, SystemMessage, TestEchoReply, WorkingOrdersReport,
};
use crate::session::{RefreshState, SessionRefresher, SessionState};
use crate::transport::bridge::{BridgeState, ConnectionBridge};
use crate::transport::receiver::ResponseReceiver;
use crate::transport::sender::{RequestSender, SentRequest};

use super::builder::GatewayClientBuilder;
use super::options::GatewayOptions;

// ============================================================================
// Constants
// ============================================================================

/// Grace period for the best-effort logoff frame to drain during close.
const LOGOFF_GRACE: Duration = Duration::from_millis(50);

// ============================================================================
// SessionDispatcher
// ============================================================================

/// Dispatch-path wrapper that applies session bookkeeping before forwarding
/// each response to the caller's handler.
///
/// This is the single writer of [`SessionState`]: grants and logoff
/// acknowledgements mutate it here, on the receiver's dispatch thread, never
/// concurrently with themselves.
struct SessionDispatcher {
    inner: Arc<dyn ResponseHandler>,
    session: SessionState,
    refresher: Arc<SessionRefresher>,
}

impl SessionDispatcher {
    fn new(
        inner: Arc<dyn ResponseHandler>,
        session: SessionState,
        refresher: Arc<SessionRefresher>,
    ) -> Self {
        Self {
            inner,
            session,
            refresher,
        }
    }
}

impl ResponseHandler for SessionDispatcher {
    fn on_heartbeat(&self, payload: &HeartbeatAck, ctx: &DispatchContext) {
        self.inner.on_heartbeat(payload, ctx);
    }

    fn on_test_echo(&self, payload: &TestEchoReply, ctx: &DispatchContext) {
        self.inner.on_test_echo(payload, ctx);
    }

    fn on_server_time(&self, payload: &ServerTime, ctx: &DispatchContext) {
        self.inner.on_server_time(payload, ctx);
    }

    fn on_system_message(&self, payload: &SystemMessage, ctx: &DispatchContext) {
        self.inner.on_system_message(payload, ctx);
    }

    fn on_logon_ack(&self, payload: &LogonAck, ctx: &DispatchContext) {
        if payload.success {
            info!(session_id = %ctx.session_id, "Logon accepted");
        } else {
            warn!(message = %payload.message, "Logon rejected");
        }
        self.inner.on_logon_ack(payload, ctx);
    }

    fn on_logoff_ack(&self, payload: &LogoffAck, ctx: &DispatchContext) {
        if payload.success {
            self.refresher.stop();
            self.session.clear();
        }
        self.inner.on_logoff_ack(payload, ctx);
    }

    fn on_execution_report(&self, payload: &ExecutionReport, ctx: &DispatchContext) {
        self.inner.on_execution_report(payload, ctx);
    }

    fn on_account_data(&self, payload: &AccountDataReport, ctx: &DispatchContext) {
        self.inner.on_account_data(payload, ctx);
    }

    fn on_account_balances(&self, payload: &AccountBalancesReport, ctx: &DispatchContext) {
        self.inner.on_account_balances(payload, ctx);
    }

    fn on_open_positions(&self, payload: &OpenPositionsReport, ctx: &DispatchContext) {
        self.inner.on_open_positions(payload, ctx);
    }

    fn on_working_orders(&self, payload: &WorkingOrdersReport, ctx: &DispatchContext) {
        self.inner.on_working_orders(payload, ctx);
    }

    fn on_completed_orders(&self, payload: &CompletedOrdersReport, ctx: &DispatchContext) {
        self.inner.on_completed_orders(payload, ctx);
    }

    fn on_exchange_properties(&self, payload: &ExchangePropertiesReport, ctx: &DispatchContext) {
        self.inner.on_exchange_properties(payload, ctx);
    }

    fn on_authorization_grant(&self, payload: &AuthorizationGrant, ctx: &DispatchContext) {
        // Session bookkeeping first so the caller observes the new token.
        self.refresher.on_grant(payload);
        self.inner.on_authorization_grant(payload, ctx);
    }
}

// ============================================================================
// GatewayClient
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    options: GatewayOptions,
    bridge: ConnectionBridge,
    sender: RequestSender,
    receiver: ResponseReceiver,
    session: SessionState,
    refresher: Arc<SessionRefresher>,
    /// Consumed by the bridge at connect time.
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

/// Trading gateway client.
///
/// The client is responsible for:
/// - Maintaining the long-lived gateway connection
/// - Building, stamping and enqueueing requests
/// - Dispatching responses to the caller's handler
/// - Session lifecycle: logon, token refresh, logoff
///
/// Cheap to clone; clones share the same connection and session.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("endpoint", &self.inner.options.endpoint)
            .field("client_id", &self.inner.options.client_id)
            .field("state", &self.state())
            .field("authenticated", &self.inner.session.is_authenticated())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// GatewayClient - Public API
// ============================================================================

impl GatewayClient {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> GatewayClientBuilder {
        GatewayClientBuilder::new()
    }

    /// Connects to the gateway and waits until the runtime is running.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if already connected
    /// - [`Error::Connection`] if the gateway connection fails
    /// - [`Error::ConnectionTimeout`] if `Running` is not reached in time
    pub async fn connect(&self) -> Result<()> {
        let queue_rx = self
            .inner
            .queue_rx
            .lock()
            .take()
            .ok_or_else(|| Error::config("client already connected"))?;

        self.inner
            .bridge
            .start(queue_rx, self.inner.receiver.clone())
            .await?;
        self.inner
            .bridge
            .wait_running(self.inner.options.connect_timeout)
            .await
    }

    /// Stores credentials and enqueues a logon request.
    ///
    /// The acknowledgement and the authorization grant arrive through the
    /// handler; the grant also arms the token refresher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the credential list is empty or
    /// any credential is missing a required field.
    pub fn logon(&self, credentials: Vec<Credential>) -> Result<SentRequest> {
        self.inner.session.set_credentials(credentials);
        self.inner.sender.logon()
    }

    /// Returns the request sender handle.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> &RequestSender {
        &self.inner.sender
    }

    /// Returns a handle to the session token store.
    ///
    /// This is the synchronized accessor for callers that need the current
    /// access token outside the dispatch path.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    /// Returns the session identifier stamped on outgoing requests.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.inner.sender.session_id()
    }

    /// Returns the configured client identifier.
    #[inline]
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.inner.options.client_id
    }

    /// Returns the bridge lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> BridgeState {
        self.inner.bridge.state()
    }

    /// Returns the token refresh-cycle state.
    #[inline]
    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.inner.refresher.state()
    }

    /// Replaces the caller's response handler.
    ///
    /// The new handler is wrapped with the same session bookkeeping as the
    /// one supplied at build time and takes effect at the next dispatch.
    pub fn set_handler(&self, handler: Arc<dyn ResponseHandler>) {
        let dispatcher = SessionDispatcher::new(
            handler,
            self.inner.session.clone(),
            Arc::clone(&self.inner.refresher),
        );
        self.inner.receiver.set_handler(Arc::new(dispatcher));
    }

    /// Shuts the runtime down.
    ///
    /// Stops the refresher, enqueues a best-effort logoff (which may be
    /// abandoned if the transport is already down), stops the bridge and
    /// clears the session. Returns once all worker loops have exited.
    pub async fn close(&self) {
        self.inner.refresher.stop();

        if self.state() == BridgeState::Running {
            match self.inner.sender.logoff() {
                Ok(sent) => {
                    debug!(request_id = %sent.header.request_id, "Logoff enqueued");
                    tokio::time::sleep(LOGOFF_GRACE).await;
                }
                Err(e) => debug!(error = %e, "Logoff not enqueued"),
            }
        }

        self.inner.bridge.stop().await;
        self.inner.session.clear();
        info!("Client closed");
    }
}

// ============================================================================
// GatewayClient - Construction
// ============================================================================

impl GatewayClient {
    /// Creates a client directly from assembled options.
    ///
    /// Equivalent to the builder path; useful when options come from an
    /// outer configuration layer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is not a valid `ws`/`wss`
    /// URL.
    pub fn with_options(options: GatewayOptions, handler: Arc<dyn ResponseHandler>) -> Result<Self> {
        let endpoint = Url::parse(&options.endpoint)
            .map_err(|e| Error::config(format!("invalid endpoint {:?}: {e}", options.endpoint)))?;
        match endpoint.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::config(format!(
                    "endpoint scheme must be ws or wss, got {other:?}"
                )));
            }
        }

        let session_id = options
            .session_id
            .clone()
            .unwrap_or_else(SessionId::generate);
        let session = SessionState::new();

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let sender = RequestSender::new(
            options.client_id,
            session_id,
            session.clone(),
            queue_tx,
        );

        let refresher = Arc::new(SessionRefresher::new(
            sender.clone(),
            session.clone(),
            options.refresh_safety_margin,
        ));

        let dispatcher =
            SessionDispatcher::new(handler, session.clone(), Arc::clone(&refresher));
        let receiver = ResponseReceiver::new(Arc::new(dispatcher));

        let bridge = ConnectionBridge::new(endpoint, options.poll_timeout);

        Ok(Self {
            inner: Arc::new(ClientInner {
                options,
                bridge,
                sender,
                receiver,
                session,
                refresher,
                queue_rx: Mutex::new(Some(queue_rx)),
            }),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::identifiers::RequestId;
    use crate::protocol::codec;
    use crate::protocol::request::Request;
    use crate::protocol::response::{Response, ResponseHeader};
    use crate::session::state::unix_time_ms;
    use crate::transport::mock::MockGateway;

    struct RecordingHandler {
        reports: Mutex<Vec<String>>,
        grants: AtomicUsize,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                reports: Mutex::new(Vec::new()),
                grants: AtomicUsize::new(0),
            })
        }
    }

    impl ResponseHandler for RecordingHandler {
        fn on_execution_report(&self, payload: &ExecutionReport, _ctx: &DispatchContext) {
            self.reports.lock().push(payload.client_order_id.clone());
        }

        fn on_authorization_grant(&self, _payload: &AuthorizationGrant, _ctx: &DispatchContext) {
            self.grants.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn client_for(gateway: &MockGateway, handler: Arc<dyn ResponseHandler>) -> GatewayClient {
        GatewayClient::builder()
            .endpoint(gateway.url())
            .client_id(ClientId::new(1))
            .session_id(SessionId::new("s1"))
            .handler(handler)
            .poll_timeout(Duration::from_millis(100))
            .build()
            .expect("build")
    }

    fn response_header(request_id: u64) -> ResponseHeader {
        ResponseHeader {
            client_id: ClientId::new(1),
            session_id: SessionId::new("s1"),
            request_id: RequestId::new(request_id),
        }
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_heartbeat_reaches_gateway_byte_identical() {
        let mut gateway = MockGateway::spawn().await;
        let client = client_for(&gateway, RecordingHandler::new());
        client.connect().await.expect("connect");

        let sent = client.sender().heartbeat().expect("heartbeat");
        let received = gateway.recv_frame().await;
        assert_eq!(received, sent.frame);

        let (header, request) = codec::decode_request(&received).expect("decode");
        assert_eq!(header.client_id, ClientId::new(1));
        assert_eq!(header.session_id, SessionId::new("s1"));
        assert!(header.access_token.is_empty());
        assert_eq!(header.request_id, RequestId::new(1));
        assert_eq!(request, Request::Heartbeat);

        client.close().await;
    }

    #[tokio::test]
    async fn test_requests_enqueued_before_connect_are_delivered() {
        let mut gateway = MockGateway::spawn().await;
        let client = client_for(&gateway, RecordingHandler::new());

        // Queued while disconnected; flows once the bridge starts.
        client.sender().heartbeat().expect("heartbeat");
        client.connect().await.expect("connect");

        let (_, request) = codec::decode_request(&gateway.recv_frame().await).expect("decode");
        assert_eq!(request, Request::Heartbeat);

        client.close().await;
    }

    #[tokio::test]
    async fn test_logon_grant_updates_session_and_arms_refresher() {
        let mut gateway = MockGateway::spawn().await;
        let handler = RecordingHandler::new();
        let client = client_for(&gateway, handler.clone());
        client.connect().await.expect("connect");

        client
            .logon(vec![Credential::new("ACC-1", "key", "secret")])
            .expect("logon");
        let (_, request) = codec::decode_request(&gateway.recv_frame().await).expect("decode");
        assert!(matches!(request, Request::Logon { .. }));

        let expire_at_ms = unix_time_ms() + 3_600_000;
        gateway.send_frame(
            codec::encode_response(
                &response_header(1),
                &Response::LogonAck(LogonAck {
                    success: true,
                    message: "welcome".to_string(),
                }),
            )
            .expect("encode"),
        );
        gateway.send_frame(
            codec::encode_response(
                &response_header(1),
                &Response::AuthorizationGrant(AuthorizationGrant {
                    success: true,
                    message: "granted".to_string(),
                    access_token: "tok-1".to_string(),
                    refresh_token: "ref-1".to_string(),
                    expire_at_ms,
                }),
            )
            .expect("encode"),
        );

        wait_until(|| client.session().is_authenticated()).await;
        assert_eq!(client.session().access_token(), "tok-1");
        assert_eq!(client.refresh_state(), RefreshState::Waiting { expire_at_ms });
        assert_eq!(handler.grants.load(Ordering::Relaxed), 1);

        // Subsequent requests carry the granted token.
        let sent = client.sender().heartbeat().expect("heartbeat");
        assert_eq!(sent.header.access_token, "tok-1");

        client.close().await;
    }

    #[tokio::test]
    async fn test_unknown_kind_skipped_loop_continues() {
        let gateway = MockGateway::spawn().await;
        let handler = RecordingHandler::new();
        let client = client_for(&gateway, handler.clone());
        client.connect().await.expect("connect");

        gateway.send_frame(
            br#"{"clientId":1,"sessionId":"s1","requestId":5,"kind":"novel","body":{}}"#.to_vec(),
        );
        gateway.send_frame(
            codec::encode_response(
                &response_header(6),
                &Response::ExecutionReport(ExecutionReport {
                    account_id: "ACC-1".into(),
                    client_order_id: "ord-1".to_string(),
                    exchange_order_id: "X-1".to_string(),
                    symbol: "ESZ6".to_string(),
                    status: crate::protocol::response::OrderStatus::New,
                    side: crate::protocol::request::Side::Buy,
                    filled_quantity: 0.0,
                    leaves_quantity: 2.0,
                    price: Some(4512.25),
                    text: String::new(),
                }),
            )
            .expect("encode"),
        );

        wait_until(|| !handler.reports.lock().is_empty()).await;
        assert_eq!(*handler.reports.lock(), vec!["ord-1"]);

        client.close().await;
    }

    #[tokio::test]
    async fn test_set_handler_upgrades_dispatch_target() {
        let gateway = MockGateway::spawn().await;
        let first = RecordingHandler::new();
        let second = RecordingHandler::new();
        let client = client_for(&gateway, first.clone());
        client.connect().await.expect("connect");

        client.set_handler(second.clone());
        gateway.send_frame(
            codec::encode_response(
                &response_header(1),
                &Response::AuthorizationGrant(AuthorizationGrant {
                    success: true,
                    message: String::new(),
                    access_token: "tok".to_string(),
                    refresh_token: "ref".to_string(),
                    expire_at_ms: unix_time_ms() + 3_600_000,
                }),
            )
            .expect("encode"),
        );

        wait_until(|| second.grants.load(Ordering::Relaxed) == 1).await;
        assert_eq!(first.grants.load(Ordering::Relaxed), 0);
        // Session bookkeeping still runs behind the swapped handler.
        assert!(client.session().is_authenticated());

        client.close().await;
    }

    #[tokio::test]
    async fn test_close_is_bounded_and_clears_session() {
        let gateway = MockGateway::spawn().await;
        let client = client_for(&gateway, RecordingHandler::new());
        client.connect().await.expect("connect");

        let started = std::time::Instant::now();
        client.close().await;

        // Poll timeout is 100ms; close must finish well inside 3 intervals
        // plus the logoff grace.
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(client.state(), BridgeState::Stopped);
        assert!(!client.session().is_authenticated());
        assert_eq!(client.refresh_state(), RefreshState::Failed);
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let gateway = MockGateway::spawn().await;
        let client = client_for(&gateway, RecordingHandler::new());
        client.connect().await.expect("connect");

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        client.close().await;
    }

    #[tokio::test]
    async fn test_debug_never_leaks_tokens() {
        let gateway = MockGateway::spawn().await;
        let client = client_for(&gateway, RecordingHandler::new());

        client.session().apply_grant(&AuthorizationGrant {
            success: true,
            message: String::new(),
            access_token: "secret-token".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expire_at_ms: 1,
        });

        let debug_string = format!("{client:?}");
        assert!(!debug_string.contains("secret-token"));
        assert!(!debug_string.contains("secret-refresh"));
    }
}
