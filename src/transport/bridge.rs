//! Connection bridge and relay loop.
//!
//! [`ConnectionBridge`] is the only owner of the external gateway socket.
//! Its relay loop is a pure byte forwarder between that socket and two
//! internal legs: frames from the request sender go out verbatim, frames
//! from the gateway go to the response receiver verbatim. The loop never
//! inspects frame contents, which keeps the single-owner invariant on the
//! external socket intact.
//!
//! # Lifecycle
//!
//! ```text
//! Created → SocketsOpen → WorkersStarted → Running → Stopping → Stopped
//! ```
//!
//! The state is published on a watch channel; [`ConnectionBridge::wait_running`]
//! resolves only at `Running`, and tests can observe intermediate states.
//!
//! # Shutdown
//!
//! Cooperative only: `stop()` raises a shared signal and every loop observes
//! it within one polling interval. Teardown then propagates leg by leg: the
//! sender loop exits and drops its leg, the relay sees the closed leg,
//! closes the external socket and drops the receiver leg, and the receiver
//! loop exits. Transport errors are not retried; a dead gateway socket
//! simply ends the relay, and detection is left to the caller via heartbeat
//! silence.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{Error, Result};

use super::receiver::{ResponseReceiver, run_receiver_loop};
use super::sender::run_sender_loop;

// ============================================================================
// Constants
// ============================================================================

/// Default bounded wait for each readiness poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

// ============================================================================
// Types
// ============================================================================

type GatewaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type GatewaySink = SplitSink<GatewaySocket, Message>;
type GatewayStream = SplitStream<GatewaySocket>;

// ============================================================================
// BridgeState
// ============================================================================

/// Bridge lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Constructed, not yet started.
    Created,
    /// External socket connected.
    SocketsOpen,
    /// Sender and receiver loops spawned.
    WorkersStarted,
    /// Relay loop spawned; traffic flows.
    Running,
    /// Stop requested, loops draining.
    Stopping,
    /// All loops joined.
    Stopped,
}

// ============================================================================
// ConnectionBridge
// ============================================================================

/// Owner of the external gateway socket and of the worker-loop lifecycle.
pub struct ConnectionBridge {
    endpoint: Url,
    poll_timeout: Duration,
    signal: Arc<AtomicBool>,
    state_tx: watch::Sender<BridgeState>,
    state_rx: watch::Receiver<BridgeState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConnectionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionBridge")
            .field("endpoint", &self.endpoint.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ConnectionBridge {
    /// Creates a bridge for the given gateway endpoint.
    ///
    /// `ws://` connects in the clear, `wss://` under TLS.
    #[must_use]
    pub fn new(endpoint: Url, poll_timeout: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(BridgeState::Created);
        Self {
            endpoint,
            poll_timeout,
            signal: Arc::new(AtomicBool::new(false)),
            state_tx,
            state_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> BridgeState {
        *self.state_rx.borrow()
    }

    /// Connects the external socket and starts the three worker loops.
    ///
    /// Sequenced: socket first, then the sender/receiver loops, then the
    /// relay; `Running` is published only once all three are up.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the bridge was already started
    /// - [`Error::Connection`] if the gateway connection fails
    pub async fn start(
        &self,
        queue_rx: mpsc::UnboundedReceiver<Vec<u8>>,
        receiver: ResponseReceiver,
    ) -> Result<()> {
        if self.state() != BridgeState::Created {
            return Err(Error::config("bridge already started"));
        }

        let socket = self.connect().await?;
        self.state_tx.send_replace(BridgeState::SocketsOpen);
        let (sink, stream) = socket.split();

        // Internal legs: sender → bridge, bridge → receiver.
        let (bridge_tx, bridge_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let sender_task = tokio::spawn(run_sender_loop(
            queue_rx,
            bridge_tx,
            Arc::clone(&self.signal),
            self.poll_timeout,
        ));
        let receiver_task = tokio::spawn(run_receiver_loop(
            inbound_rx,
            receiver,
            Arc::clone(&self.signal),
            self.poll_timeout,
        ));
        self.state_tx.send_replace(BridgeState::WorkersStarted);

        let relay_task = tokio::spawn(run_relay_loop(
            sink,
            stream,
            bridge_rx,
            inbound_tx,
            Arc::clone(&self.signal),
            self.poll_timeout,
        ));

        self.tasks
            .lock()
            .extend([sender_task, receiver_task, relay_task]);
        self.state_tx.send_replace(BridgeState::Running);
        info!(endpoint = %self.endpoint, "Bridge running");

        Ok(())
    }

    /// Waits until the bridge publishes `Running`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if `Running` is not reached in time
    /// - [`Error::ConnectionClosed`] if the bridge stops first
    pub async fn wait_running(&self, wait_timeout: Duration) -> Result<()> {
        let mut state_rx = self.state_rx.clone();

        let wait = async move {
            loop {
                match *state_rx.borrow_and_update() {
                    BridgeState::Running => return Ok(()),
                    BridgeState::Stopping | BridgeState::Stopped => {
                        return Err(Error::ConnectionClosed);
                    }
                    _ => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(Error::ConnectionClosed);
                }
            }
        };

        match timeout(wait_timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(Error::connection_timeout(wait_timeout.as_millis() as u64)),
        }
    }

    /// Stops all worker loops and joins them.
    ///
    /// Each loop observes the signal within one polling interval, so this
    /// returns within a small multiple of it. Idempotent.
    pub async fn stop(&self) {
        match self.state() {
            BridgeState::Stopped => return,
            BridgeState::Created => {
                // Never started; nothing to join.
                self.state_tx.send_replace(BridgeState::Stopped);
                return;
            }
            _ => {}
        }

        self.state_tx.send_replace(BridgeState::Stopping);
        self.signal.store(true, Ordering::Relaxed);

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Worker task panicked during shutdown");
            }
        }

        self.state_tx.send_replace(BridgeState::Stopped);
        debug!("Bridge stopped");
    }

    async fn connect(&self) -> Result<GatewaySocket> {
        let (socket, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| Error::connection(format!("{}: {e}", self.endpoint)))?;
        debug!(endpoint = %self.endpoint, "Gateway socket connected");
        Ok(socket)
    }
}

// ============================================================================
// Relay Loop
// ============================================================================

/// Forwards bytes between the external socket and the internal legs.
///
/// Frame contents are never inspected here. The loop exits on the stop
/// signal, on a closed leg, or on a transport error; transport errors are
/// not retried.
async fn run_relay_loop(
    mut sink: GatewaySink,
    mut stream: GatewayStream,
    mut bridge_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    signal: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    loop {
        tokio::select! {
            frame = bridge_rx.recv() => match frame {
                Some(bytes) => {
                    if let Err(e) = sink.send(Message::Binary(bytes.into())).await {
                        error!(error = %e, "Gateway send failed, relay exiting");
                        break;
                    }
                }
                None => {
                    debug!("Request leg closed, relay exiting");
                    break;
                }
            },

            message = stream.next() => match message {
                Some(Ok(Message::Binary(bytes))) => {
                    if inbound_tx.send(bytes.to_vec()).is_err() {
                        debug!("Response leg closed, relay exiting");
                        break;
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    // Some gateway builds emit text frames; relay the raw bytes.
                    if inbound_tx.send(text.as_bytes().to_vec()).is_err() {
                        debug!("Response leg closed, relay exiting");
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("Gateway closed the connection");
                    break;
                }
                Some(Ok(_)) => {} // Ping/Pong handled by the protocol layer
                Some(Err(e)) => {
                    error!(error = %e, "Gateway socket error, relay exiting");
                    break;
                }
                None => {
                    debug!("Gateway stream ended");
                    break;
                }
            },

            _ = tokio::time::sleep(poll_timeout) => {
                if signal.load(Ordering::Relaxed) {
                    debug!("Stop signal observed, relay exiting");
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
    // Dropping `inbound_tx` here closes the receiver leg last.
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::handler::{DispatchContext, ResponseHandler};
    use crate::identifiers::{ClientId, RequestId, SessionId};
    use crate::protocol::codec;
    use crate::protocol::response::{Response, ResponseHeader, ServerTime};
    use crate::transport::mock::MockGateway;

    struct RecordingHandler {
        times: Mutex<Vec<u64>>,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                times: Mutex::new(Vec::new()),
            })
        }
    }

    impl ResponseHandler for RecordingHandler {
        fn on_server_time(&self, payload: &ServerTime, _ctx: &DispatchContext) {
            self.times.lock().push(payload.server_time_ms);
        }
    }

    fn response_frame(server_time_ms: u64) -> Vec<u8> {
        let header = ResponseHeader {
            client_id: ClientId::new(1),
            session_id: SessionId::new("s1"),
            request_id: RequestId::new(1),
        };
        codec::encode_response(&header, &Response::ServerTime(ServerTime { server_time_ms }))
            .expect("encode")
    }

    fn bridge_for(url: &str) -> ConnectionBridge {
        ConnectionBridge::new(
            Url::parse(url).expect("url"),
            Duration::from_millis(100),
        )
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_lifecycle_reaches_running() {
        let gateway = MockGateway::spawn().await;
        let bridge = bridge_for(gateway.url());
        assert_eq!(bridge.state(), BridgeState::Created);

        let (_queue_tx, queue_rx) = mpsc::unbounded_channel();
        let receiver = ResponseReceiver::new(RecordingHandler::new());

        bridge.start(queue_rx, receiver).await.expect("start");
        assert_eq!(bridge.state(), BridgeState::Running);
        bridge
            .wait_running(Duration::from_secs(1))
            .await
            .expect("running");

        bridge.stop().await;
        assert_eq!(bridge.state(), BridgeState::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let gateway = MockGateway::spawn().await;
        let bridge = bridge_for(gateway.url());

        let (_queue_tx, queue_rx) = mpsc::unbounded_channel();
        bridge
            .start(queue_rx, ResponseReceiver::new(RecordingHandler::new()))
            .await
            .expect("start");

        let (_queue_tx2, queue_rx2) = mpsc::unbounded_channel();
        let err = bridge
            .start(queue_rx2, ResponseReceiver::new(RecordingHandler::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces() {
        // Nothing is listening on this port.
        let bridge = bridge_for("ws://127.0.0.1:1");
        let (_queue_tx, queue_rx) = mpsc::unbounded_channel();

        let err = bridge
            .start(queue_rx, ResponseReceiver::new(RecordingHandler::new()))
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(bridge.state(), BridgeState::Created);
    }

    #[tokio::test]
    async fn test_outbound_frames_relayed_verbatim() {
        let mut gateway = MockGateway::spawn().await;
        let bridge = bridge_for(gateway.url());
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        bridge
            .start(queue_rx, ResponseReceiver::new(RecordingHandler::new()))
            .await
            .expect("start");

        let frame = b"\x00opaque payload\xff".to_vec();
        queue_tx.send(frame.clone()).expect("enqueue");

        assert_eq!(gateway.recv_frame().await, frame);
        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_inbound_frames_dispatched_in_order() {
        let gateway = MockGateway::spawn().await;
        let bridge = bridge_for(gateway.url());
        let handler = RecordingHandler::new();
        let (_queue_tx, queue_rx) = mpsc::unbounded_channel();

        bridge
            .start(queue_rx, ResponseReceiver::new(handler.clone()))
            .await
            .expect("start");

        for i in 0..6 {
            gateway.send_frame(response_frame(i));
        }
        wait_until(|| handler.times.lock().len() == 6).await;
        assert_eq!(*handler.times.lock(), vec![0, 1, 2, 3, 4, 5]);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_stop_within_bounded_time() {
        let gateway = MockGateway::spawn().await;
        let poll = Duration::from_millis(100);
        let bridge = ConnectionBridge::new(Url::parse(gateway.url()).expect("url"), poll);
        let (_queue_tx, queue_rx) = mpsc::unbounded_channel();

        bridge
            .start(queue_rx, ResponseReceiver::new(RecordingHandler::new()))
            .await
            .expect("start");

        let started = std::time::Instant::now();
        bridge.stop().await;
        assert!(started.elapsed() < poll * 3);
        assert_eq!(bridge.state(), BridgeState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let bridge = bridge_for("ws://127.0.0.1:1");
        bridge.stop().await;
        assert_eq!(bridge.state(), BridgeState::Stopped);
        // Idempotent.
        bridge.stop().await;
        assert_eq!(bridge.state(), BridgeState::Stopped);
    }
}
