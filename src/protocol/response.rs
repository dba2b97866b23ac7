//! Response message types.
//!
//! Every inbound frame carries a [`ResponseHeader`] plus a kind tag and a
//! kind-specific body. Known kinds parse into typed payloads; anything else
//! lands in [`Response::Unknown`] since the wire format is externally
//! versioned and novel kinds can arrive at any time.
//!
//! # Format
//!
//! ```json
//! {
//!   "clientId": 1,
//!   "sessionId": "s1",
//!   "requestId": 3,
//!   "kind": "executionReport",
//!   "body": { ... }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{AccountId, ClientId, RequestId, SessionId};

use super::request::{OrderType, Side};

// ============================================================================
// ResponseHeader
// ============================================================================

/// Header decoded from every inbound frame.
///
/// `request_id` echoes the request that triggered the response; unsolicited
/// responses (system messages, execution reports) carry the gateway's own
/// sequence value there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Gateway-assigned client identifier.
    #[serde(rename = "clientId")]
    pub client_id: ClientId,

    /// Session the response belongs to.
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,

    /// Correlating request identifier.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

// ============================================================================
// Payloads
// ============================================================================

/// Heartbeat acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    /// Gateway clock at acknowledgement, Unix milliseconds.
    pub server_time_ms: u64,
}

/// Echo reply carrying the request payload unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEchoReply {
    /// Echoed payload.
    pub payload: String,
}

/// Gateway clock reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    /// Gateway clock, Unix milliseconds.
    pub server_time_ms: u64,
}

/// Unsolicited operator notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMessage {
    /// Severity: `info`, `warning` or `error`.
    pub severity: String,

    /// Human-readable text.
    pub text: String,
}

/// Logon acknowledgement.
///
/// A successful logon is followed by an [`AuthorizationGrant`] carrying the
/// session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogonAck {
    /// Whether the logon was accepted.
    pub success: bool,

    /// Acceptance or rejection detail.
    pub message: String,
}

/// Logoff acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoffAck {
    /// Whether the logoff was accepted.
    pub success: bool,

    /// Acceptance or rejection detail.
    pub message: String,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// Accepted, resting.
    New,
    /// Partially executed.
    PartiallyFilled,
    /// Fully executed.
    Filled,
    /// Cancelled.
    Cancelled,
    /// Amended.
    Replaced,
    /// Rejected by the gateway or venue.
    Rejected,
}

/// Order state change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Account the order trades for.
    pub account_id: AccountId,

    /// Caller-assigned order identifier.
    pub client_order_id: String,

    /// Venue-assigned order identifier.
    pub exchange_order_id: String,

    /// Tradable symbol.
    pub symbol: String,

    /// Current order status.
    pub status: OrderStatus,

    /// Buy or sell.
    pub side: Side,

    /// Quantity executed so far.
    pub filled_quantity: f64,

    /// Quantity still working.
    pub leaves_quantity: f64,

    /// Limit price, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Free-form gateway annotation, e.g. a rejection reason.
    #[serde(default)]
    pub text: String,
}

/// One account visible to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Account identifier.
    pub account_id: AccountId,

    /// Operator-assigned display name.
    pub display_name: String,
}

/// Accounts visible to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDataReport {
    /// Visible accounts.
    pub accounts: Vec<AccountRecord>,
}

/// Balance in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Currency code.
    pub currency: String,

    /// Total balance.
    pub total: f64,

    /// Balance available for new orders.
    pub available: f64,
}

/// Balances for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalancesReport {
    /// Account queried.
    pub account_id: AccountId,

    /// Per-currency balances.
    pub balances: Vec<Balance>,
}

/// One open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Tradable symbol.
    pub symbol: String,

    /// Signed position quantity; negative is short.
    pub quantity: f64,

    /// Volume-weighted average entry price.
    pub average_price: f64,
}

/// Open positions for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPositionsReport {
    /// Account queried.
    pub account_id: AccountId,

    /// Open positions.
    pub positions: Vec<Position>,
}

/// One order in a working- or completed-orders report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Caller-assigned order identifier.
    pub client_order_id: String,

    /// Venue-assigned order identifier.
    pub exchange_order_id: String,

    /// Tradable symbol.
    pub symbol: String,

    /// Buy or sell.
    pub side: Side,

    /// Market or limit.
    pub order_type: OrderType,

    /// Order quantity.
    pub quantity: f64,

    /// Quantity executed so far.
    pub filled_quantity: f64,

    /// Limit price, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Current order status.
    pub status: OrderStatus,
}

/// Working orders for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingOrdersReport {
    /// Account queried.
    pub account_id: AccountId,

    /// Orders currently working.
    pub orders: Vec<OrderRecord>,
}

/// Completed orders for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedOrdersReport {
    /// Account queried.
    pub account_id: AccountId,

    /// Orders no longer working.
    pub orders: Vec<OrderRecord>,
}

/// Trading properties for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolProperties {
    /// Tradable symbol.
    pub symbol: String,

    /// Minimum price increment.
    pub tick_size: f64,

    /// Minimum quantity increment.
    pub lot_size: f64,

    /// Decimal places in prices.
    pub price_precision: u32,
}

/// Properties of all tradable symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePropertiesReport {
    /// Per-symbol properties.
    pub symbols: Vec<SymbolProperties>,
}

/// Bearer-token grant, issued after logon and after each refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGrant {
    /// Whether the grant was issued.
    pub success: bool,

    /// Grant or denial detail.
    pub message: String,

    /// Bearer token for subsequent request headers.
    #[serde(default)]
    pub access_token: String,

    /// Token to present on the next refresh.
    #[serde(default)]
    pub refresh_token: String,

    /// Access-token expiry, Unix milliseconds.
    #[serde(default)]
    pub expire_at_ms: u64,
}

// ============================================================================
// Response
// ============================================================================

/// All response kinds, one variant per known kind plus an `Unknown` fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Heartbeat acknowledgement.
    Heartbeat(HeartbeatAck),
    /// Echo reply.
    TestEcho(TestEchoReply),
    /// Gateway clock reading.
    ServerTime(ServerTime),
    /// Unsolicited operator notice.
    SystemMessage(SystemMessage),
    /// Logon acknowledgement.
    LogonAck(LogonAck),
    /// Logoff acknowledgement.
    LogoffAck(LogoffAck),
    /// Order state change.
    ExecutionReport(ExecutionReport),
    /// Accounts visible to the session.
    AccountData(AccountDataReport),
    /// Balances for one account.
    AccountBalances(AccountBalancesReport),
    /// Open positions for one account.
    OpenPositions(OpenPositionsReport),
    /// Working orders for one account.
    WorkingOrders(WorkingOrdersReport),
    /// Completed orders for one account.
    CompletedOrders(CompletedOrdersReport),
    /// Properties of all tradable symbols.
    ExchangeProperties(ExchangePropertiesReport),
    /// Bearer-token grant.
    AuthorizationGrant(AuthorizationGrant),
    /// Kind not recognized by this client version.
    Unknown {
        /// The unrecognized kind tag.
        kind: String,
        /// Raw body, preserved for diagnostics.
        body: Value,
    },
}

impl Response {
    /// Parses a kind tag and raw body into a typed response.
    ///
    /// Unrecognized kinds yield [`Response::Unknown`]; a malformed body for a
    /// known kind is a decode error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body does not match the kind's schema.
    pub fn parse(kind: &str, body: Value) -> Result<Self> {
        fn typed<T: serde::de::DeserializeOwned>(kind: &str, body: Value) -> Result<T> {
            serde_json::from_value(body)
                .map_err(|e| Error::decode(format!("{kind} body: {e}")))
        }

        let response = match kind {
            "heartbeat" => Self::Heartbeat(typed(kind, body)?),
            "testEcho" => Self::TestEcho(typed(kind, body)?),
            "serverTime" => Self::ServerTime(typed(kind, body)?),
            "systemMessage" => Self::SystemMessage(typed(kind, body)?),
            "logonAck" => Self::LogonAck(typed(kind, body)?),
            "logoffAck" => Self::LogoffAck(typed(kind, body)?),
            "executionReport" => Self::ExecutionReport(typed(kind, body)?),
            "accountDataReport" => Self::AccountData(typed(kind, body)?),
            "accountBalancesReport" => Self::AccountBalances(typed(kind, body)?),
            "openPositionsReport" => Self::OpenPositions(typed(kind, body)?),
            "workingOrdersReport" => Self::WorkingOrders(typed(kind, body)?),
            "completedOrdersReport" => Self::CompletedOrders(typed(kind, body)?),
            "exchangePropertiesReport" => Self::ExchangeProperties(typed(kind, body)?),
            "authorizationGrant" => Self::AuthorizationGrant(typed(kind, body)?),
            _ => Self::Unknown {
                kind: kind.to_string(),
                body,
            },
        };

        Ok(response)
    }

    /// Returns the wire kind tag for this response.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Heartbeat(_) => "heartbeat",
            Self::TestEcho(_) => "testEcho",
            Self::ServerTime(_) => "serverTime",
            Self::SystemMessage(_) => "systemMessage",
            Self::LogonAck(_) => "logonAck",
            Self::LogoffAck(_) => "logoffAck",
            Self::ExecutionReport(_) => "executionReport",
            Self::AccountData(_) => "accountDataReport",
            Self::AccountBalances(_) => "accountBalancesReport",
            Self::OpenPositions(_) => "openPositionsReport",
            Self::WorkingOrders(_) => "workingOrdersReport",
            Self::CompletedOrders(_) => "completedOrdersReport",
            Self::ExchangeProperties(_) => "exchangePropertiesReport",
            Self::AuthorizationGrant(_) => "authorizationGrant",
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Serializes the payload back to a raw body value.
    ///
    /// Used when a gateway-side peer (or a test double) produces frames.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if payload serialization fails.
    pub fn body_value(&self) -> Result<Value> {
        let value = match self {
            Self::Heartbeat(p) => serde_json::to_value(p)?,
            Self::TestEcho(p) => serde_json::to_value(p)?,
            Self::ServerTime(p) => serde_json::to_value(p)?,
            Self::SystemMessage(p) => serde_json::to_value(p)?,
            Self::LogonAck(p) => serde_json::to_value(p)?,
            Self::LogoffAck(p) => serde_json::to_value(p)?,
            Self::ExecutionReport(p) => serde_json::to_value(p)?,
            Self::AccountData(p) => serde_json::to_value(p)?,
            Self::AccountBalances(p) => serde_json::to_value(p)?,
            Self::OpenPositions(p) => serde_json::to_value(p)?,
            Self::WorkingOrders(p) => serde_json::to_value(p)?,
            Self::CompletedOrders(p) => serde_json::to_value(p)?,
            Self::ExchangeProperties(p) => serde_json::to_value(p)?,
            Self::AuthorizationGrant(p) => serde_json::to_value(p)?,
            Self::Unknown { body, .. } => body.clone(),
        };

        Ok(value)
    }

    /// Returns `true` for the `Unknown` fallback variant.
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_logon_ack() {
        let body = json!({ "success": true, "message": "welcome" });
        let response = Response::parse("logonAck", body).expect("parse");

        match response {
            Response::LogonAck(ack) => {
                assert!(ack.success);
                assert_eq!(ack.message, "welcome");
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_parse_execution_report() {
        let body = json!({
            "accountId": "ACC-1",
            "clientOrderId": "ord-1",
            "exchangeOrderId": "X-99",
            "symbol": "ESZ6",
            "status": "partiallyFilled",
            "side": "buy",
            "filledQuantity": 1.0,
            "leavesQuantity": 1.0,
            "price": 4512.25
        });
        let response = Response::parse("executionReport", body).expect("parse");

        match response {
            Response::ExecutionReport(report) => {
                assert_eq!(report.status, OrderStatus::PartiallyFilled);
                assert_eq!(report.leaves_quantity, 1.0);
                assert!(report.text.is_empty());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_kind() {
        let body = json!({ "foo": "bar" });
        let response = Response::parse("novelKind", body.clone()).expect("parse");

        assert!(response.is_unknown());
        assert_eq!(response.kind(), "novelKind");
        assert_eq!(response.body_value().expect("body"), body);
    }

    #[test]
    fn test_parse_known_kind_bad_body() {
        let body = json!({ "success": "not-a-bool" });
        let err = Response::parse("logonAck", body).unwrap_err();

        assert!(err.is_recoverable());
        assert!(err.to_string().contains("logonAck"));
    }

    #[test]
    fn test_kind_roundtrip_through_body_value() {
        let response = Response::AuthorizationGrant(AuthorizationGrant {
            success: true,
            message: "granted".to_string(),
            access_token: "tok".to_string(),
            refresh_token: "ref".to_string(),
            expire_at_ms: 1_700_000_000_000,
        });

        let body = response.body_value().expect("body");
        let reparsed = Response::parse(response.kind(), body).expect("parse");
        assert_eq!(reparsed, response);
    }

    #[test]
    fn test_grant_defaults_on_denial() {
        let body = json!({ "success": false, "message": "bad credentials" });
        let response = Response::parse("authorizationGrant", body).expect("parse");

        match response {
            Response::AuthorizationGrant(grant) => {
                assert!(!grant.success);
                assert!(grant.access_token.is_empty());
                assert_eq!(grant.expire_at_ms, 0);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
