//! Gateway protocol message types and wire codec.
//!
//! This module defines the message format exchanged with the trading
//! gateway: a header identifying the client/session/request, plus a tagged
//! body whose kind selects the payload schema.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Request`] | Client → Gateway | Session, order and query operations |
//! | [`Response`] | Gateway → Client | Acknowledgements, reports, notices |
//!
//! Frames are opaque bytes to the relay layer; only the [`codec`] functions
//! interpret them.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Frame encode/decode |
//! | `credential` | Per-account API credentials |
//! | `request` | Request header and tagged request kinds |
//! | `response` | Response header, tagged response kinds, report payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Wire frame codec.
pub mod codec;

/// Per-account API credentials.
pub mod credential;

/// Request message types.
pub mod request;

/// Response message types.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use credential::Credential;
pub use request::{
    CancelOrder, NewOrder, OrderType, ReplaceOrder, Request, RequestHeader, Side, TimeInForce,
};
pub use response::{
    AccountBalancesReport, AccountDataReport, AccountRecord, AuthorizationGrant, Balance,
    CompletedOrdersReport, ExchangePropertiesReport, ExecutionReport, HeartbeatAck, LogoffAck,
    LogonAck, OpenPositionsReport, OrderRecord, OrderStatus, Position, Response, ResponseHeader,
    ServerTime, SymbolProperties, SystemMessage, TestEchoReply, WorkingOrdersReport,
};
