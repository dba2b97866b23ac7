//! Inbound frame decoding and dispatch.
//!
//! [`ResponseReceiver`] decodes each frame arriving from the bridge and
//! invokes exactly one handler method per decoded frame, synchronously and
//! in arrival order. Malformed frames and unrecognized kinds are logged and
//! dropped; they never stop the loop.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::handler::{DispatchContext, ResponseHandler};
use crate::protocol::codec;
use crate::protocol::response::{Response, ResponseHeader};

// ============================================================================
// ResponseReceiver
// ============================================================================

/// Decodes inbound frames and dispatches them by response kind.
///
/// Cheap to clone; clones share the handler slot, so a swap through any
/// clone takes effect at the next dispatch.
#[derive(Clone)]
pub struct ResponseReceiver {
    handler: Arc<Mutex<Arc<dyn ResponseHandler>>>,
}

impl std::fmt::Debug for ResponseReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseReceiver").finish_non_exhaustive()
    }
}

impl ResponseReceiver {
    /// Creates a receiver dispatching to the given handler.
    #[must_use]
    pub fn new(handler: Arc<dyn ResponseHandler>) -> Self {
        Self {
            handler: Arc::new(Mutex::new(handler)),
        }
    }

    /// Swaps the dispatch target.
    ///
    /// Takes effect at the next dispatch; used to upgrade the handler once
    /// session context becomes available after logon.
    pub fn set_handler(&self, handler: Arc<dyn ResponseHandler>) {
        *self.handler.lock() = handler;
    }

    /// Decodes one frame and dispatches it.
    ///
    /// Exactly one of the following happens per frame: one handler
    /// invocation, or one warning for a dropped frame.
    pub(crate) fn process_frame(&self, frame: &[u8]) {
        match codec::decode_response(frame) {
            Ok((header, response)) => self.dispatch(&header, &response),
            Err(e) => warn!(error = %e, len = frame.len(), "Dropping undecodable frame"),
        }
    }

    /// Invokes the handler method matching the response kind.
    fn dispatch(&self, header: &ResponseHeader, response: &Response) {
        let ctx = DispatchContext::from(header);
        // Clone the target out of the slot so a swap never blocks on an
        // in-flight dispatch.
        let handler = Arc::clone(&*self.handler.lock());

        match response {
            Response::Heartbeat(p) => handler.on_heartbeat(p, &ctx),
            Response::TestEcho(p) => handler.on_test_echo(p, &ctx),
            Response::ServerTime(p) => handler.on_server_time(p, &ctx),
            Response::SystemMessage(p) => handler.on_system_message(p, &ctx),
            Response::LogonAck(p) => handler.on_logon_ack(p, &ctx),
            Response::LogoffAck(p) => handler.on_logoff_ack(p, &ctx),
            Response::ExecutionReport(p) => handler.on_execution_report(p, &ctx),
            Response::AccountData(p) => handler.on_account_data(p, &ctx),
            Response::AccountBalances(p) => handler.on_account_balances(p, &ctx),
            Response::OpenPositions(p) => handler.on_open_positions(p, &ctx),
            Response::WorkingOrders(p) => handler.on_working_orders(p, &ctx),
            Response::CompletedOrders(p) => handler.on_completed_orders(p, &ctx),
            Response::ExchangeProperties(p) => handler.on_exchange_properties(p, &ctx),
            Response::AuthorizationGrant(p) => handler.on_authorization_grant(p, &ctx),
            Response::Unknown { kind, .. } => {
                warn!(%kind, request_id = %ctx.request_id, "Unrecognized response kind, frame dropped");
            }
        }
    }
}

// ============================================================================
// Receiving Loop
// ============================================================================

/// Drains the bridge leg, decoding and dispatching each frame.
///
/// Receives with a bounded wait so the stop signal is observed within one
/// polling interval even when no traffic arrives.
pub(crate) async fn run_receiver_loop(
    mut inbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    receiver: ResponseReceiver,
    signal: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    loop {
        match timeout(poll_timeout, inbound_rx.recv()).await {
            Ok(Some(frame)) => receiver.process_frame(&frame),
            Ok(None) => {
                debug!("Bridge leg closed, receiver loop exiting");
                break;
            }
            Err(_) => {
                if signal.load(Ordering::Relaxed) {
                    debug!("Stop signal observed, receiver loop exiting");
                    break;
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::{ClientId, RequestId, SessionId};
    use crate::protocol::response::{HeartbeatAck, ServerTime, SystemMessage};

    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    impl ResponseHandler for RecordingHandler {
        fn on_heartbeat(&self, _payload: &HeartbeatAck, ctx: &DispatchContext) {
            self.seen.lock().push(format!("heartbeat:{}", ctx.request_id));
        }

        fn on_server_time(&self, payload: &ServerTime, _ctx: &DispatchContext) {
            self.seen
                .lock()
                .push(format!("serverTime:{}", payload.server_time_ms));
        }

        fn on_system_message(&self, payload: &SystemMessage, _ctx: &DispatchContext) {
            self.seen.lock().push(format!("system:{}", payload.text));
        }
    }

    fn header(request_id: u64) -> ResponseHeader {
        ResponseHeader {
            client_id: ClientId::new(1),
            session_id: SessionId::new("s1"),
            request_id: RequestId::new(request_id),
        }
    }

    fn frame(request_id: u64, response: &Response) -> Vec<u8> {
        codec::encode_response(&header(request_id), response).expect("encode")
    }

    #[test]
    fn test_dispatch_routes_by_kind() {
        let handler = RecordingHandler::new();
        let receiver = ResponseReceiver::new(handler.clone());

        receiver.process_frame(&frame(
            7,
            &Response::Heartbeat(HeartbeatAck { server_time_ms: 1 }),
        ));
        receiver.process_frame(&frame(
            8,
            &Response::ServerTime(ServerTime { server_time_ms: 99 }),
        ));

        assert_eq!(handler.seen(), vec!["heartbeat:7", "serverTime:99"]);
    }

    #[test]
    fn test_malformed_frame_dropped_without_dispatch() {
        let handler = RecordingHandler::new();
        let receiver = ResponseReceiver::new(handler.clone());

        receiver.process_frame(b"\x00\x01 not json");
        assert!(handler.seen().is_empty());

        // The loop keeps working afterwards.
        receiver.process_frame(&frame(
            1,
            &Response::Heartbeat(HeartbeatAck { server_time_ms: 1 }),
        ));
        assert_eq!(handler.seen().len(), 1);
    }

    #[test]
    fn test_unknown_kind_not_dispatched() {
        let handler = RecordingHandler::new();
        let receiver = ResponseReceiver::new(handler.clone());

        let unknown =
            br#"{"clientId":1,"sessionId":"s1","requestId":2,"kind":"novel","body":{}}"#;
        receiver.process_frame(unknown);
        assert!(handler.seen().is_empty());
    }

    #[test]
    fn test_dispatch_in_arrival_order() {
        let handler = RecordingHandler::new();
        let receiver = ResponseReceiver::new(handler.clone());

        for i in 0..6 {
            receiver.process_frame(&frame(
                i,
                &Response::SystemMessage(SystemMessage {
                    severity: "info".to_string(),
                    text: format!("m{i}"),
                }),
            ));
        }

        assert_eq!(
            handler.seen(),
            vec!["system:m0", "system:m1", "system:m2", "system:m3", "system:m4", "system:m5"]
        );
    }

    #[test]
    fn test_set_handler_swaps_target() {
        let first = RecordingHandler::new();
        let second = RecordingHandler::new();
        let receiver = ResponseReceiver::new(first.clone());

        receiver.process_frame(&frame(
            1,
            &Response::Heartbeat(HeartbeatAck { server_time_ms: 1 }),
        ));
        receiver.set_handler(second.clone());
        receiver.process_frame(&frame(
            2,
            &Response::Heartbeat(HeartbeatAck { server_time_ms: 2 }),
        ));

        assert_eq!(first.seen(), vec!["heartbeat:1"]);
        assert_eq!(second.seen(), vec!["heartbeat:2"]);
    }

    #[tokio::test]
    async fn test_receiver_loop_stops_within_poll_interval() {
        let (_inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let receiver = ResponseReceiver::new(RecordingHandler::new());
        let signal = Arc::new(AtomicBool::new(false));
        let poll = Duration::from_millis(50);

        let task = tokio::spawn(run_receiver_loop(
            inbound_rx,
            receiver,
            Arc::clone(&signal),
            poll,
        ));

        signal.store(true, Ordering::Relaxed);
        let started = std::time::Instant::now();
        task.await.expect("join");
        assert!(started.elapsed() < poll * 3);
    }

    #[tokio::test]
    async fn test_receiver_loop_dispatches_frames() {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let handler = RecordingHandler::new();
        let receiver = ResponseReceiver::new(handler.clone());
        let signal = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_receiver_loop(
            inbound_rx,
            receiver,
            Arc::clone(&signal),
            Duration::from_millis(50),
        ));

        inbound_tx
            .send(frame(
                1,
                &Response::Heartbeat(HeartbeatAck { server_time_ms: 1 }),
            ))
            .expect("send");
        drop(inbound_tx);
        task.await.expect("join");

        assert_eq!(handler.seen(), vec!["heartbeat:1"]);
    }
}
