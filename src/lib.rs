//! # libmqtt - MQTT client session engine
//!
//! A `no_std` MQTT 3.1.1 client core for devices that subscribe to a broker
//! over any reliable byte stream. It establishes a session, authenticates,
//! subscribes to topics, keeps the connection alive and decodes incoming
//! application messages, all while tolerating partial reads from the
//! transport.
//!
//! ## Features
//!
//! - **Packet framing**: reassembly out of arbitrarily fragmented reads into a
//!   fixed-capacity, reused receive buffer
//! - **Wire codec**: CONNECT, SUBSCRIBE, PUBLISH, PINGREQ and DISCONNECT
//!   encoding, zero-copy decoding of CONNACK, SUBACK and PUBLISH
//! - **Session state machine**: connect, subscribe, steady-state receive and
//!   disconnect, with explicit events for every outcome
//! - **Keep-alive** scheduling and message-id correlation
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libmqtt = "0.1.0"
//! ```
//!
//! ### Subscriber Example
//!
//! ```rust,no_run
//! use core::time::Duration;
//! use libmqtt::network::application::mqtt::{Clock, Event, Options, Session};
//! # use libmqtt::network::Connection;
//! # struct MockConnection;
//! # impl Connection for MockConnection {}
//! # impl libmqtt::network::Read for MockConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl libmqtt::network::Write for MockConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl libmqtt::network::Close for MockConnection {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Uptime;
//! # impl Clock for Uptime {
//! #     fn now(&self) -> Duration { Duration::ZERO }
//! # }
//!
//! let options = Options::new("my_device").with_keep_alive(60);
//! let mut session: Session<'_, _, _> = Session::new(options, Uptime);
//!
//! session.establish(MockConnection, Duration::from_secs(1)).unwrap();
//! session.subscribe("sensors/temperature").unwrap();
//! if let Event::MessagePublished { topic, payload } = session.poll(Duration::from_secs(1)) {
//!     let _ = (topic, payload);
//! }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable the `std::net` transport and the `Instant` based clock
//! - `log`: Emit diagnostics through the `log` facade
//! - `defmt`: Emit diagnostics through `defmt` for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

/// Transport abstraction layer and the protocols built on it.
///
/// This module contains the byte-stream traits the session runs over and the
/// MQTT client session engine itself.
pub mod network;
