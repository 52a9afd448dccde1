//! MQTT 3.1.1 client session engine for embedded systems.
//!
//! This module turns any reliable byte stream implementing
//! [`Connection`](crate::network::Connection) into an MQTT client session:
//! it connects and authenticates, subscribes, answers the keep-alive
//! obligation and decodes incoming application messages. It tolerates
//! arbitrarily fragmented reads and correlates acknowledgements with the
//! requests that caused them.
//!
//! # Components
//!
//! - [`framer`]: reassembles packets from the byte stream into a reused,
//!   fixed-capacity receive buffer
//! - [`codec`]: encodes outgoing control packets and decodes incoming ones
//!   without copying
//! - [`ids`]: allocates message ids and tracks pending acknowledgements
//! - [`keep_alive`]: decides when a PINGREQ is owed
//! - [`session`]: the state machine tying the above to a transport
//!
//! Only at-most-once delivery is requested. Brokers downgrade deliveries to
//! the granted QoS, so no PUBACK bookkeeping is needed.
//!
//! # Usage
//!
//! ```rust,no_run
//! use core::sync::atomic::AtomicBool;
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
//! static SHUTDOWN: AtomicBool = AtomicBool::new(false);
//!
//! let options = Options::new("iot_device_123").with_keep_alive(5);
//! let mut session: Session<'_, _, _> = Session::new(options, Uptime);
//!
//! session.establish(MockConnection, Duration::from_secs(1)).unwrap();
//! session.subscribe("sensors/temperature").unwrap();
//! session.run(Duration::from_secs(1), &SHUTDOWN, |event| {
//!     if let Event::MessagePublished { topic, payload } = event {
//!         let _ = (topic, payload);
//!     }
//! });
//! ```

/// Wire codec for connect, subscribe, publish, ping and disconnect.
pub mod codec;

/// Session error kinds.
pub mod error;

/// Packet reassembly from a byte stream.
pub mod framer;

/// Message-id allocation.
pub mod ids;

/// Keep-alive scheduling and clocks.
pub mod keep_alive;

/// Session configuration.
pub mod options;

/// Control packet types.
pub mod packet;

/// The client session state machine.
pub mod session;


pub use codec::ConnectResult;
pub use error::{Error, RejectReason, Violation};
pub use framer::Framer;
pub use ids::{MessageIds, PendingOp};
#[cfg(feature = "std")]
pub use keep_alive::StdClock;
pub use keep_alive::{Clock, KeepAlive};
pub use options::{Credentials, Options};
pub use packet::{LengthEncoding, MessageType, Packet, QoS};
pub use session::{Event, Session, State};
