//! Request message types.
//!
//! Every outbound frame carries a [`RequestHeader`] followed by a tagged
//! [`Request`] body.
//!
//! # Format
//!
//! ```json
//! {
//!   "clientId": 1,
//!   "sessionId": "s1",
//!   "accessToken": "",
//!   "requestId": 1,
//!   "kind": "placeOrder",
//!   "body": { ... }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::{AccountId, ClientId, RequestId, SessionId};

use super::Credential;

// ============================================================================
// RequestHeader
// ============================================================================

/// Header stamped on every outbound request.
///
/// `request_id` strictly increases per sender instance. `access_token` is
/// empty during logon and carries the current bearer token afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Gateway-assigned client identifier.
    #[serde(rename = "clientId")]
    pub client_id: ClientId,

    /// Caller-generated session identifier.
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,

    /// Current bearer token; empty during logon.
    #[serde(rename = "accessToken")]
    pub access_token: String,

    /// Monotonically increasing request identifier.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

// ============================================================================
// Request
// ============================================================================

/// All request kinds understood by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "camelCase")]
pub enum Request {
    /// Start a session with the supplied account credentials.
    Logon {
        /// Ordered per-account credentials.
        credentials: Vec<Credential>,
    },

    /// End the session.
    Logoff,

    /// Keep-alive probe.
    Heartbeat,

    /// Echo test; the gateway returns the payload unchanged.
    TestEcho {
        /// Arbitrary payload to echo.
        payload: String,
    },

    /// Query the gateway clock.
    ServerTime,

    /// Submit a new order.
    PlaceOrder(NewOrder),

    /// Amend quantity/price of a working order.
    ReplaceOrder(ReplaceOrder),

    /// Cancel a working order.
    CancelOrder(CancelOrder),

    /// List accounts visible to this session.
    AccountData,

    /// Query balances for one account.
    AccountBalances {
        /// Account to query.
        #[serde(rename = "accountId")]
        account_id: AccountId,
    },

    /// Query open positions for one account.
    OpenPositions {
        /// Account to query.
        #[serde(rename = "accountId")]
        account_id: AccountId,
    },

    /// Query working orders for one account.
    WorkingOrders {
        /// Account to query.
        #[serde(rename = "accountId")]
        account_id: AccountId,
    },

    /// Query completed orders for one account.
    CompletedOrders {
        /// Account to query.
        #[serde(rename = "accountId")]
        account_id: AccountId,
    },

    /// Query tradable-symbol properties.
    ExchangeProperties,

    /// Exchange the refresh token for a fresh access token.
    RefreshAuthorization {
        /// Refresh token from the last authorization grant.
        #[serde(rename = "refreshToken")]
        refresh_token: String,
    },
}

impl Request {
    /// Returns the wire kind tag for this request.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Logon { .. } => "logon",
            Self::Logoff => "logoff",
            Self::Heartbeat => "heartbeat",
            Self::TestEcho { .. } => "testEcho",
            Self::ServerTime => "serverTime",
            Self::PlaceOrder(_) => "placeOrder",
            Self::ReplaceOrder(_) => "replaceOrder",
            Self::CancelOrder(_) => "cancelOrder",
            Self::AccountData => "accountData",
            Self::AccountBalances { .. } => "accountBalances",
            Self::OpenPositions { .. } => "openPositions",
            Self::WorkingOrders { .. } => "workingOrders",
            Self::CompletedOrders { .. } => "completedOrders",
            Self::ExchangeProperties => "exchangeProperties",
            Self::RefreshAuthorization { .. } => "refreshAuthorization",
        }
    }
}

// ============================================================================
// Order Payloads
// ============================================================================

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute immediately at the best available price.
    Market,
    /// Rest at the limit price or better.
    Limit,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Valid for the trading day.
    Day,
    /// Good until cancelled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
}

/// A new order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Account the order trades for.
    #[serde(rename = "accountId")]
    pub account_id: AccountId,

    /// Caller-assigned order identifier.
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,

    /// Tradable symbol.
    pub symbol: String,

    /// Buy or sell.
    pub side: Side,

    /// Market or limit.
    #[serde(rename = "orderType")]
    pub order_type: OrderType,

    /// Order quantity; must be positive.
    pub quantity: f64,

    /// Limit price; required for limit orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Time in force.
    #[serde(rename = "timeInForce")]
    pub time_in_force: TimeInForce,
}

impl NewOrder {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.is_empty() {
            return Err(Error::invalid_request("order missing account id"));
        }
        if self.client_order_id.is_empty() {
            return Err(Error::invalid_request("order missing client order id"));
        }
        if self.symbol.is_empty() {
            return Err(Error::invalid_request("order missing symbol"));
        }
        if self.quantity <= 0.0 {
            return Err(Error::invalid_request("order quantity must be positive"));
        }
        if self.order_type == OrderType::Limit && self.price.is_none() {
            return Err(Error::invalid_request("limit order missing price"));
        }
        Ok(())
    }
}

/// An amendment of a working order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceOrder {
    /// Account the order trades for.
    #[serde(rename = "accountId")]
    pub account_id: AccountId,

    /// Identifier of the order being amended.
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,

    /// New quantity; must be positive.
    pub quantity: f64,

    /// New limit price, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl ReplaceOrder {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.is_empty() {
            return Err(Error::invalid_request("replace missing account id"));
        }
        if self.client_order_id.is_empty() {
            return Err(Error::invalid_request("replace missing client order id"));
        }
        if self.quantity <= 0.0 {
            return Err(Error::invalid_request("replace quantity must be positive"));
        }
        Ok(())
    }
}

/// A cancellation of a working order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    /// Account the order trades for.
    #[serde(rename = "accountId")]
    pub account_id: AccountId,

    /// Identifier of the order being cancelled.
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
}

impl CancelOrder {
    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.is_empty() {
            return Err(Error::invalid_request("cancel missing account id"));
        }
        if self.client_order_id.is_empty() {
            return Err(Error::invalid_request("cancel missing client order id"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_order() -> NewOrder {
        NewOrder {
            account_id: AccountId::new("ACC-1"),
            client_order_id: "ord-1".to_string(),
            symbol: "ESZ6".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            quantity: 2.0,
            price: Some(4512.25),
            time_in_force: TimeInForce::Day,
        }
    }

    #[test]
    fn test_request_serialization_tagged() {
        let request = Request::PlaceOrder(limit_order());
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(json.contains("\"kind\":\"placeOrder\""));
        assert!(json.contains("\"clientOrderId\":\"ord-1\""));
        assert!(json.contains("\"timeInForce\":\"day\""));
    }

    #[test]
    fn test_unit_request_has_no_body() {
        let json = serde_json::to_string(&Request::Heartbeat).expect("serialize");
        assert_eq!(json, "{\"kind\":\"heartbeat\"}");
    }

    #[test]
    fn test_kind_tags_match_serde() {
        let requests = [
            Request::Logoff,
            Request::Heartbeat,
            Request::ServerTime,
            Request::AccountData,
            Request::ExchangeProperties,
            Request::TestEcho {
                payload: "ping".to_string(),
            },
            Request::AccountBalances {
                account_id: AccountId::new("ACC-1"),
            },
        ];

        for request in requests {
            let json = serde_json::to_value(&request).expect("serialize");
            assert_eq!(json["kind"], request.kind(), "tag mismatch for {request:?}");
        }
    }

    #[test]
    fn test_new_order_validate_ok() {
        assert!(limit_order().validate().is_ok());
    }

    #[test]
    fn test_limit_order_requires_price() {
        let mut order = limit_order();
        order.price = None;
        let err = order.validate().unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_market_order_without_price_ok() {
        let mut order = limit_order();
        order.order_type = OrderType::Market;
        order.price = None;
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_order_rejects_nonpositive_quantity() {
        let mut order = limit_order();
        order.quantity = 0.0;
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_replace_validate() {
        let replace = ReplaceOrder {
            account_id: AccountId::new("ACC-1"),
            client_order_id: "ord-1".to_string(),
            quantity: 3.0,
            price: None,
        };
        assert!(replace.validate().is_ok());

        let bad = ReplaceOrder {
            client_order_id: String::new(),
            ..replace
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_cancel_validate() {
        let cancel = CancelOrder {
            account_id: AccountId::new("ACC-1"),
            client_order_id: "ord-1".to_string(),
        };
        assert!(cancel.validate().is_ok());

        let bad = CancelOrder {
            account_id: AccountId::new(""),
            client_order_id: "ord-1".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_logon_carries_credentials() {
        let request = Request::Logon {
            credentials: vec![Credential::new("ACC-1", "key", "secret")],
        };
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(json.contains("\"kind\":\"logon\""));
        assert!(json.contains("\"accountId\":\"ACC-1\""));
    }
}
