//! Gatelink - Asynchronous trading gateway client runtime.
//!
//! This library maintains a long-lived connection to a remote trading
//! gateway, serializes typed requests into the gateway's framed wire format,
//! deserializes typed responses, routes each response to caller-supplied
//! handlers by message kind, and manages session lifecycle (logon,
//! heartbeat, logoff, bearer-token refresh) without blocking the caller.
//!
//! # Architecture
//!
//! Exactly three long-lived worker loops run per connection, each the sole
//! owner of its endpoint:
//!
//! - **Bridge**: owns the external gateway socket; a pure byte relay
//! - **Sender**: drains the outbound request queue toward the bridge
//! - **Receiver**: decodes inbound frames and dispatches them by kind
//!
//! Cross-task handoff is message-passing only; callers interact through the
//! thread-safe [`RequestSender`] handle and a [`ResponseHandler`]
//! implementation.
//!
//! Deliberate non-goals: no automatic reconnect on transport failure, no
//! message persistence or replay, no exactly-once delivery. Connection loss
//! surfaces as heartbeat silence; recovery is the caller's decision.
//!
//! # Quick Start
//!
//! ```no_run
//! use gatelink::{ClientId, Credential, GatewayClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = GatewayClient::builder()
//!         .endpoint("wss://gateway.example:9000")
//!         .client_id(ClientId::new(12))
//!         .build()?;
//!
//!     client.connect().await?;
//!     client.logon(vec![Credential::new("ACC-1", "api-key", "api-secret")])?;
//!
//!     // Responses arrive through the handler; requests never block.
//!     client.sender().heartbeat()?;
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`GatewayClient`] coordinator and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`handler`] | Per-kind response callbacks |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Message types and wire codec |
//! | [`session`] | Token store and refresh state machine |
//! | [`transport`] | Bridge, sender and receiver loops (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Gateway client coordinator and configuration.
///
/// Use [`GatewayClient::builder()`] to create a configured client instance.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Response handler contract.
///
/// One callback per response kind, each defaulted to a no-op.
pub mod handler;

/// Type-safe identifiers for gateway entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Gateway protocol message types and wire codec.
pub mod protocol;

/// Session lifecycle: token store and timer-driven refresh.
pub mod session;

/// Connection runtime: bridge, sender and receiver loops.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{DEFAULT_CONNECT_TIMEOUT, GatewayClient, GatewayClientBuilder, GatewayOptions};

// Error types
pub use error::{Error, Result};

// Handler types
pub use handler::{DispatchContext, NoopHandler, ResponseHandler};

// Identifier types
pub use identifiers::{AccountId, ClientId, RequestId, SessionId};

// Protocol types
pub use protocol::{
    AccountBalancesReport, AccountDataReport, AccountRecord, AuthorizationGrant, Balance,
    CancelOrder, CompletedOrdersReport, Credential, ExchangePropertiesReport, ExecutionReport,
    HeartbeatAck, LogoffAck, LogonAck, NewOrder, OpenPositionsReport, OrderRecord, OrderStatus,
    OrderType, Position, ReplaceOrder, Request, RequestHeader, Response, ResponseHeader,
    ServerTime, Side, SymbolProperties, SystemMessage, TestEchoReply, TimeInForce,
    WorkingOrdersReport,
};

// Session types
pub use session::{DEFAULT_SAFETY_MARGIN, RefreshState, SessionRefresher, SessionState};

// Transport types
pub use transport::{
    BridgeState, ConnectionBridge, DEFAULT_POLL_TIMEOUT, RequestSender, ResponseReceiver,
    SentRequest,
};
