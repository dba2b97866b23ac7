//! Connection runtime: bridge, sender and receiver loops.
//!
//! This module owns all of the crate's concurrency. Exactly three long-lived
//! worker loops run per connection, each the sole owner of its endpoint, and
//! every cross-task handoff is message-passing:
//!
//! ```text
//! caller ──enqueue──► OutboundQueue ──► sender loop ──► relay loop ──► gateway
//!                                                          │
//! handler ◄──dispatch── receiver loop ◄────────────────────┘
//! ```
//!
//! The relay loop ([`bridge`]) is the only code that touches the external
//! socket; it forwards opaque bytes in both directions and never inspects
//! frame contents. Decoding happens in the receiver loop, encoding in the
//! request builders, both at the codec boundary.
//!
//! # Shutdown
//!
//! Cancellation is cooperative: a shared stop signal plus bounded waits at
//! every blocking point, so `stop()` is observed within one polling interval
//! per loop. There is no hard cancel of in-flight operations.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | External socket owner, byte relay, lifecycle state machine |
//! | `sender` | Outbound queue, request builders, forwarding loop |
//! | `receiver` | Frame decoding and per-kind dispatch |

// ============================================================================
// Submodules
// ============================================================================

/// Connection bridge and relay loop.
pub mod bridge;

/// Inbound frame decoding and dispatch.
pub mod receiver;

/// Outbound queue and request sender.
pub mod sender;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::{BridgeState, ConnectionBridge, DEFAULT_POLL_TIMEOUT};
pub use receiver::ResponseReceiver;
pub use sender::{RequestSender, SentRequest};

// ============================================================================
// Test Support
// ============================================================================
