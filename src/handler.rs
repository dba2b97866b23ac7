//! Response handler contract.
//!
//! Callers receive gateway responses by implementing [`ResponseHandler`]:
//! one method per response kind, every method defaulted to a no-op, so an
//! implementation overrides only the kinds it cares about.
//!
//! Dispatch is synchronous and single-threaded: the receiver invokes exactly
//! one method per decoded frame, in arrival order. Handlers must not block
//! for long; a stalled handler stalls the whole inbound path.
//!
//! # Example
//!
//! ```ignore
//! use gatelink::{DispatchContext, ExecutionReport, ResponseHandler};
//!
//! struct FillPrinter;
//!
//! impl ResponseHandler for FillPrinter {
//!     fn on_execution_report(&self, report: &ExecutionReport, ctx: &DispatchContext) {
//!         println!("[{}] {} {:?}", ctx.request_id, report.symbol, report.status);
//!     }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::{ClientId, RequestId, SessionId};
use crate::protocol::response::{
    AccountBalancesReport, AccountDataReport, AuthorizationGrant, CompletedOrdersReport,
    ExchangePropertiesReport, ExecutionReport, HeartbeatAck, LogoffAck, LogonAck,
    OpenPositionsReport, ResponseHeader, ServerTime, SystemMessage, TestEchoReply,
    WorkingOrdersReport,
};

// ============================================================================
// DispatchContext
// ============================================================================

/// Header fields passed to every handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    /// Gateway-assigned client identifier.
    pub client_id: ClientId,

    /// Session the response belongs to.
    pub session_id: SessionId,

    /// Correlating request identifier.
    pub request_id: RequestId,
}

impl From<&ResponseHeader> for DispatchContext {
    fn from(header: &ResponseHeader) -> Self {
        Self {
            client_id: header.client_id,
            session_id: header.session_id.clone(),
            request_id: header.request_id,
        }
    }
}

// ============================================================================
// ResponseHandler
// ============================================================================

/// Per-kind response callbacks.
///
/// All methods default to no-ops; implement the ones you need.
#[allow(unused_variables)]
pub trait ResponseHandler: Send + Sync {
    /// Heartbeat acknowledgement.
    fn on_heartbeat(&self, payload: &HeartbeatAck, ctx: &DispatchContext) {}

    /// Echo reply.
    fn on_test_echo(&self, payload: &TestEchoReply, ctx: &DispatchContext) {}

    /// Gateway clock reading.
    fn on_server_time(&self, payload: &ServerTime, ctx: &DispatchContext) {}

    /// Unsolicited operator notice.
    fn on_system_message(&self, payload: &SystemMessage, ctx: &DispatchContext) {}

    /// Logon acknowledgement; `payload.success` distinguishes rejection.
    fn on_logon_ack(&self, payload: &LogonAck, ctx: &DispatchContext) {}

    /// Logoff acknowledgement.
    fn on_logoff_ack(&self, payload: &LogoffAck, ctx: &DispatchContext) {}

    /// Order state change.
    fn on_execution_report(&self, payload: &ExecutionReport, ctx: &DispatchContext) {}

    /// Accounts visible to the session.
    fn on_account_data(&self, payload: &AccountDataReport, ctx: &DispatchContext) {}

    /// Balances for one account.
    fn on_account_balances(&self, payload: &AccountBalancesReport, ctx: &DispatchContext) {}

    /// Open positions for one account.
    fn on_open_positions(&self, payload: &OpenPositionsReport, ctx: &DispatchContext) {}

    /// Working orders for one account.
    fn on_working_orders(&self, payload: &WorkingOrdersReport, ctx: &DispatchContext) {}

    /// Completed orders for one account.
    fn on_completed_orders(&self, payload: &CompletedOrdersReport, ctx: &DispatchContext) {}

    /// Properties of all tradable symbols.
    fn on_exchange_properties(&self, payload: &ExchangePropertiesReport, ctx: &DispatchContext) {}

    /// Bearer-token grant; `payload.success` distinguishes denial.
    fn on_authorization_grant(&self, payload: &AuthorizationGrant, ctx: &DispatchContext) {}
}

// ============================================================================
// NoopHandler
// ============================================================================

/// Handler that ignores every response.
///
/// The receiver's initial dispatch target until the caller installs a real
/// handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ResponseHandler for NoopHandler {}

// ============================================================================
// Tests
// ============================================================================
