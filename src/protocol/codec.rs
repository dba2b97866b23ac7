//! Wire frame codec.
//!
//! Converts typed requests and responses to and from the gateway's framed
//! wire format. Frames are JSON envelopes carried as opaque binary messages;
//! the relay layer never looks inside them, only this codec does.
//!
//! The schema is versioned by the gateway operator: decoding tolerates
//! unrecognized response kinds (see [`Response::Unknown`]) but treats a
//! malformed body for a known kind as a decode error.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

use super::request::{Request, RequestHeader};
use super::response::{Response, ResponseHeader};

// ============================================================================
// Wire Envelopes
// ============================================================================

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(flatten)]
    header: &'a RequestHeader,
    #[serde(flatten)]
    request: &'a Request,
}

#[derive(Deserialize)]
struct WireRequestOwned {
    #[serde(flatten)]
    header: RequestHeader,
    #[serde(flatten)]
    request: Request,
}

#[derive(Serialize)]
struct WireResponse<'a> {
    #[serde(flatten)]
    header: &'a ResponseHeader,
    kind: &'a str,
    body: Value,
}

#[derive(Deserialize)]
struct WireResponseOwned {
    #[serde(flatten)]
    header: ResponseHeader,
    kind: String,
    #[serde(default)]
    body: Value,
}

// ============================================================================
// Request Encoding
// ============================================================================

/// Encodes a stamped request into a wire frame.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_request(header: &RequestHeader, request: &Request) -> Result<Vec<u8>> {
    let frame = serde_json::to_vec(&WireRequest { header, request })?;
    Ok(frame)
}

/// Decodes a request frame back into its header and typed body.
///
/// Used by gateway-side peers and test doubles.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the frame is malformed.
pub fn decode_request(frame: &[u8]) -> Result<(RequestHeader, Request)> {
    let wire: WireRequestOwned =
        serde_json::from_slice(frame).map_err(|e| Error::decode(e.to_string()))?;
    Ok((wire.header, wire.request))
}

// ============================================================================
// Response Encoding
// ============================================================================

/// Encodes a response into a wire frame.
///
/// Used by gateway-side peers and test doubles.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_response(header: &ResponseHeader, response: &Response) -> Result<Vec<u8>> {
    let frame = serde_json::to_vec(&WireResponse {
        header,
        kind: response.kind(),
        body: response.body_value()?,
    })?;
    Ok(frame)
}

/// Decodes a response frame into its header and typed body.
///
/// Unrecognized kinds decode to [`Response::Unknown`]; a malformed frame or
/// a malformed body for a known kind is a decode error.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the frame or body is malformed.
pub fn decode_response(frame: &[u8]) -> Result<(ResponseHeader, Response)> {
    let wire: WireResponseOwned =
        serde_json::from_slice(frame).map_err(|e| Error::decode(e.to_string()))?;
    let response = Response::parse(&wire.kind, wire.body)?;
    Ok((wire.header, response))
}

// ============================================================================
// Tests
// ============================================================================
