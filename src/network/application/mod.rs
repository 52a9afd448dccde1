//! # Application Layer Network Protocols
//!
//! Protocols layered on top of a [`Connection`](crate::network::Connection).
//! Each one is connection agnostic, `no_std` compatible and works out of
//! fixed-size buffers.

/// MQTT 3.1.1 client session engine.
///
/// Provides packet framing, the wire codec, keep-alive scheduling and
/// acknowledgement correlation for a subscribing client.
pub mod mqtt;
