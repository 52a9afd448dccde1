//! The client session state machine.
//!
//! A [`Session`] owns its transport for as long as it is connected and drives
//! the framer, codec, message-id allocator and keep-alive scheduler against
//! it. Everything is synchronous and single-threaded: the caller runs a loop
//! that calls [`Session::poll`], and each poll either sends a due ping or
//! waits a bounded time for one packet and turns it into an [`Event`].
//!
//! ```text
//! Disconnected --connect--> Connecting --CONNACK ok--> Connected
//!      ^                        |                          |
//!      |                        +--CONNACK refused---------+--subscribe--> Subscribing
//!      |                                                                      |
//!      +---- Disconnecting <--disconnect-- Active <--------SUBACK-------------+
//! ```
//!
//! A refused SUBSCRIBE goes back to `Connected`, or to `Active` when an
//! earlier subscription on the same connection was granted.

use super::codec::{self, ConnectResult};
use super::error::{Error, RejectReason, Violation};
use super::framer::{DEFAULT_BUFFER_SIZE, Framer};
use super::ids::{MessageIds, PendingOp};
use super::keep_alive::{Clock, KeepAlive};
use super::options::Options;
use super::packet::{MessageType, Packet, QoS};
use crate::network::error::Error as TransportError;
use crate::network::{Close, Connect, Connection, write_all};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

/// Pending-acknowledgement slots used when none are given.
pub const DEFAULT_PENDING: usize = 4;

/// Where the session is in its lifecycle.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    /// No transport held.
    Disconnected,
    /// CONNECT sent, waiting for CONNACK.
    Connecting,
    /// The broker accepted the connection.
    Connected,
    /// SUBSCRIBE sent, waiting for SUBACK.
    Subscribing,
    /// Subscribed and receiving messages.
    Active,
    /// DISCONNECT being sent; the transport is released right after.
    Disconnecting,
}

impl State {
    /// Whether the broker has accepted the connection and not yet been left.
    pub fn is_established(self) -> bool {
        matches!(self, State::Connected | State::Subscribing | State::Active)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for State {
    fn format(&self, f: defmt::Formatter) {
        match self {
            State::Disconnected => defmt::write!(f, "Disconnected"),
            State::Connecting => defmt::write!(f, "Connecting"),
            State::Connected => defmt::write!(f, "Connected"),
            State::Subscribing => defmt::write!(f, "Subscribing"),
            State::Active => defmt::write!(f, "Active"),
            State::Disconnecting => defmt::write!(f, "Disconnecting"),
        }
    }
}

/// The outcome of one step of the session.
///
/// Borrowed data points into the session's receive buffer and is only valid
/// until the next call that reads from the transport.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event<'a> {
    /// The broker accepted the CONNECT.
    Connected {
        /// The broker resumed a stored session.
        session_present: bool,
    },
    /// The broker refused the CONNECT; the session is disconnected.
    ConnectRejected(RejectReason),
    /// The SUBSCRIBE with this message id was acknowledged.
    Subscribed(u16),
    /// The broker refused the SUBSCRIBE with this message id.
    SubscribeRejected(u16),
    /// An application message arrived.
    MessagePublished {
        /// The topic it was published to.
        topic: &'a [u8],
        /// The message body.
        payload: &'a [u8],
    },
    /// A PINGREQ went out.
    KeepAliveSent,
    /// The broker answered a ping.
    PingResponse,
    /// Nothing arrived within the poll timeout.
    Idle,
    /// The session left the broker and released its transport.
    Disconnected,
    /// Something went wrong. Fatal kinds leave the session disconnected.
    Error(Error),
}

#[cfg(feature = "defmt")]
impl defmt::Format for Event<'_> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Event::Connected { session_present } => {
                defmt::write!(f, "Connected(session_present={})", session_present)
            }
            Event::ConnectRejected(reason) => defmt::write!(f, "ConnectRejected({})", reason),
            Event::Subscribed(id) => defmt::write!(f, "Subscribed({})", id),
            Event::SubscribeRejected(id) => defmt::write!(f, "SubscribeRejected({})", id),
            Event::MessagePublished { topic, payload } => defmt::write!(
                f,
                "MessagePublished({} byte topic, {} bytes)",
                topic.len(),
                payload.len()
            ),
            Event::KeepAliveSent => defmt::write!(f, "KeepAliveSent"),
            Event::PingResponse => defmt::write!(f, "PingResponse"),
            Event::Idle => defmt::write!(f, "Idle"),
            Event::Disconnected => defmt::write!(f, "Disconnected"),
            Event::Error(err) => defmt::write!(f, "Error({})", err),
        }
    }
}

/// An MQTT client session.
///
/// # Type Parameters
///
/// * `C` - The transport, owned exclusively while connected
/// * `K` - The [`Clock`] driving keep-alive
/// * `N` - Receive buffer capacity in bytes
/// * `P` - Maximum outstanding acknowledgements
///
/// # Examples
///
/// ```rust,no_run
/// use core::time::Duration;
/// use libmqtt::network::application::mqtt::{Clock, Event, Options, Session};
/// # use libmqtt::network::Connection;
/// # struct TcpConnection;
/// # impl Connection for TcpConnection {}
/// # impl libmqtt::network::Read for TcpConnection {
/// #     type Error = ();
/// #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
/// # }
/// # impl libmqtt::network::Write for TcpConnection {
/// #     type Error = ();
/// #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
/// #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// # impl libmqtt::network::Close for TcpConnection {
/// #     type Error = ();
/// #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// # struct Uptime;
/// # impl Clock for Uptime {
/// #     fn now(&self) -> Duration { Duration::ZERO }
/// # }
///
/// let options = Options::new("sancho").with_credentials("quijote", Some("rocinante"));
/// let mut session: Session<'_, _, _> = Session::new(options, Uptime);
///
/// session.connect(TcpConnection).unwrap();
/// loop {
///     match session.poll(Duration::from_secs(1)) {
///         Event::Connected { .. } => {
///             session.subscribe("hello/emqtt").unwrap();
///         }
///         Event::MessagePublished { topic, payload } => {
///             // Hand the message to the application
///             let _ = (topic, payload);
///         }
///         Event::Error(err) if err.is_fatal() => break,
///         _ => {}
///     }
/// }
/// ```
pub struct Session<
    'o,
    C: Connection,
    K: Clock,
    const N: usize = DEFAULT_BUFFER_SIZE,
    const P: usize = DEFAULT_PENDING,
> {
    framer: Framer<N>,
    link: Link<'o, C, K, P>,
}

/// Everything but the receive buffer, so packets borrowed from the framer
/// can be dispatched against the rest of the session.
struct Link<'o, C: Connection, K: Clock, const P: usize> {
    options: Options<'o>,
    clock: K,
    state: State,
    connection: Option<C>,
    ids: MessageIds<P>,
    keep_alive: KeepAlive,
    /// At least one SUBACK granted a subscription on this connection.
    subscribed: bool,
}

impl<C: Connection, K: Clock, const N: usize, const P: usize> core::fmt::Debug
    for Session<'_, C, K, N, P>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.link.options.client_id)
            .field("state", &self.link.state)
            .field("pending", &self.link.ids.pending_count())
            .field("keep_alive", &self.link.keep_alive)
            .finish_non_exhaustive()
    }
}

impl<'o, C: Connection, K: Clock, const N: usize, const P: usize> Session<'o, C, K, N, P> {
    /// A disconnected session configured by `options`.
    pub fn new(options: Options<'o>, clock: K) -> Self {
        let keep_alive = KeepAlive::from_secs(options.keep_alive_seconds, clock.now());
        Self {
            framer: Framer::new(options.length_encoding),
            link: Link {
                options,
                clock,
                state: State::Disconnected,
                connection: None,
                ids: MessageIds::new(),
                keep_alive,
                subscribed: false,
            },
        }
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.link.state
    }

    /// The options the session connects with.
    pub fn options(&self) -> &Options<'o> {
        &self.link.options
    }

    /// Replace the options used by the next [`Session::connect`].
    pub fn set_options(&mut self, options: Options<'o>) -> Result<(), Error> {
        if self.link.state != State::Disconnected {
            return Err(Error::InvalidState(self.link.state));
        }
        self.framer.set_encoding(options.length_encoding);
        self.link.options = options;
        Ok(())
    }

    /// Number of requests waiting for an acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.link.ids.pending_count()
    }

    /// Whether a SUBSCRIBE with `id` is awaiting its SUBACK.
    pub fn is_pending(&self, id: u16) -> bool {
        self.link.ids.is_pending(id)
    }

    /// The keep-alive schedule.
    pub fn keep_alive(&self) -> &KeepAlive {
        &self.link.keep_alive
    }

    /// Take ownership of `connection` and send CONNECT.
    ///
    /// Returns as soon as CONNECT is written; the CONNACK arrives through
    /// [`Session::poll`]. A session that already holds a transport refuses
    /// with [`Error::InvalidState`] and closes the one passed in.
    pub fn connect(&mut self, connection: C) -> Result<(), Error> {
        self.link.connect(connection)
    }

    /// Open a transport to `remote` through `connector`, then [`Session::connect`].
    pub fn open<T>(&mut self, connector: &mut T, remote: &str) -> Result<(), Error>
    where
        T: Connect<Connection = C>,
    {
        if self.link.state != State::Disconnected {
            return Err(Error::InvalidState(self.link.state));
        }
        let connection = connector.connect(remote).map_err(|_| {
            warn!("could not reach {}", remote);
            Error::Transport(TransportError::ConnectionRefused)
        })?;
        self.link.connect(connection)
    }

    /// Connect and wait up to `timeout` for the CONNACK.
    ///
    /// Returns whether the broker resumed a stored session.
    ///
    /// # Errors
    ///
    /// * [`Error::ConnectRejected`] - the broker refused the connection
    /// * [`Error::Transport`] - the transport failed or no CONNACK came in time
    /// * [`Error::ProtocolViolation`] - the broker answered with something else
    pub fn establish(&mut self, connection: C, timeout: Duration) -> Result<bool, Error> {
        self.connect(connection)?;
        let outcome = match self.poll(timeout) {
            Event::Connected { session_present } => Ok(session_present),
            Event::ConnectRejected(reason) => Err(Error::ConnectRejected(reason)),
            Event::Error(err) => Err(err),
            _ => Err(Error::Transport(TransportError::Timeout)),
        };
        if outcome.is_err() && self.link.state != State::Disconnected {
            self.link.teardown();
        }
        outcome
    }

    /// Send a SUBSCRIBE for `topic` and return its message id.
    ///
    /// Allowed once connected and while no other subscription is awaiting
    /// its SUBACK.
    pub fn subscribe(&mut self, topic: &str) -> Result<u16, Error> {
        self.link.subscribe(topic)
    }

    /// Send a PINGREQ if the keep-alive interval has run out.
    ///
    /// This is the entry point for a timer; [`Session::poll`] calls it too.
    pub fn tick(&mut self) -> Option<Event<'static>> {
        self.link.tick()
    }

    /// Advance the session by one step.
    ///
    /// A due keep-alive ping takes priority. Otherwise waits at most
    /// `timeout` for one packet (zero blocks in the transport) and reports
    /// what it meant. The bound covers the whole packet, so a peer trickling
    /// bytes cannot hold the loop past it. Packets are handled strictly in
    /// arrival order.
    pub fn poll(&mut self, timeout: Duration) -> Event<'_> {
        if let Some(event) = self.link.tick() {
            return event;
        }
        let Some(connection) = self.link.connection.as_mut() else {
            return Event::Error(Error::InvalidState(self.link.state));
        };
        match self
            .framer
            .next_packet(connection, &self.link.clock, timeout)
        {
            Ok(None) => Event::Idle,
            Ok(Some(packet)) => self.link.dispatch(packet),
            Err(err) => self.link.fail(err),
        }
    }

    /// Send DISCONNECT best-effort and release the transport.
    ///
    /// Before the CONNACK the transport is released without DISCONNECT.
    pub fn disconnect(&mut self) -> Event<'static> {
        self.link.disconnect()
    }

    /// Poll until the session drops or `shutdown` is raised.
    ///
    /// `shutdown` is checked before every poll, so a request made from an
    /// interrupt or another thread takes effect within one `timeout`. On
    /// shutdown the session disconnects and `handler` sees
    /// [`Event::Disconnected`] last.
    pub fn run<F>(&mut self, timeout: Duration, shutdown: &AtomicBool, mut handler: F)
    where
        F: FnMut(Event<'_>),
    {
        while !shutdown.load(Ordering::Acquire) {
            if self.link.state == State::Disconnected {
                return;
            }
            handler(self.poll(timeout));
        }
        info!("shutdown requested");
        if self.link.state != State::Disconnected {
            handler(self.link.disconnect());
        }
    }
}

impl<'o, C: Connection, K: Clock, const P: usize> Link<'o, C, K, P> {
    fn connect(&mut self, connection: C) -> Result<(), Error> {
        if self.state != State::Disconnected {
            let _ = connection.close();
            return Err(Error::InvalidState(self.state));
        }
        let encoded = self.options.validate().and_then(|_| {
            codec::encode_connect(&self.options).map_err(|_| Error::InvalidOptions)
        });
        let packet = match encoded {
            Ok(packet) => packet,
            Err(err) => {
                let _ = connection.close();
                return Err(err);
            }
        };

        info!("connecting as '{}'", self.options.client_id);
        self.connection = Some(connection);
        self.state = State::Connecting;
        self.subscribed = false;
        self.send(&packet)?;
        self.keep_alive = KeepAlive::from_secs(self.options.keep_alive_seconds, self.clock.now());
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<u16, Error> {
        if !matches!(self.state, State::Connected | State::Active) {
            return Err(Error::InvalidState(self.state));
        }
        if topic.is_empty() {
            return Err(Error::InvalidTopic);
        }
        let id = self.ids.allocate(PendingOp::Subscribe)?;
        let packet = match codec::encode_subscribe(topic, id, self.options.length_encoding) {
            Ok(packet) => packet,
            Err(err) => {
                warn!("topic of {} bytes cannot be subscribed: {:?}", topic.len(), err);
                self.ids.complete(id);
                return Err(Error::InvalidTopic);
            }
        };
        self.send(&packet)?;
        debug!("subscribing to '{}' with id {}", topic, id);
        self.state = State::Subscribing;
        Ok(id)
    }

    fn tick(&mut self) -> Option<Event<'static>> {
        let now = self.clock.now();
        if !self.state.is_established() || !self.keep_alive.due(now) {
            return None;
        }
        if let Err(err) = self.send(&codec::encode_ping()) {
            return Some(Event::Error(err));
        }
        debug!("keep-alive ping sent");
        Some(Event::KeepAliveSent)
    }

    fn disconnect(&mut self) -> Event<'static> {
        match self.state {
            State::Disconnected | State::Disconnecting => {
                return Event::Error(Error::InvalidState(self.state));
            }
            State::Connecting => {}
            State::Connected | State::Subscribing | State::Active => {
                self.state = State::Disconnecting;
                if let Some(connection) = self.connection.as_mut() {
                    if let Err(err) = write_all(connection, &codec::encode_disconnect()) {
                        warn!("DISCONNECT not delivered: {:?}", err);
                    }
                }
            }
        }
        self.teardown();
        Event::Disconnected
    }

    /// Route one received packet according to the current state.
    fn dispatch<'p>(&mut self, packet: Packet<'p>) -> Event<'p> {
        let message_type = packet.message_type();
        trace!(
            "received {:?} ({} bytes) in {:?}",
            message_type,
            packet.remaining_length(),
            self.state
        );
        match (self.state, message_type) {
            (State::Connecting, MessageType::Connack) => match codec::decode_connack(&packet) {
                Ok(ConnectResult::Accepted { session_present }) => {
                    info!("connection accepted");
                    self.state = State::Connected;
                    Event::Connected { session_present }
                }
                Ok(ConnectResult::Rejected(reason)) => {
                    warn!("connection refused: {:?}", reason);
                    self.teardown();
                    Event::ConnectRejected(reason)
                }
                Err(err) => self.fail(err),
            },
            (State::Subscribing | State::Connected | State::Active, MessageType::Suback) => {
                match codec::decode_suback(&packet) {
                    Ok((id, granted)) => self.acknowledge(id, granted),
                    Err(err) => self.fail(err),
                }
            }
            (State::Subscribing | State::Connected | State::Active, MessageType::Publish) => {
                match codec::decode_publish(&packet) {
                    Ok((topic, payload)) => Event::MessagePublished { topic, payload },
                    Err(err) => self.fail(err),
                }
            }
            (State::Subscribing | State::Connected | State::Active, MessageType::Pingresp) => {
                Event::PingResponse
            }
            (_, message_type) => self.fail(Error::ProtocolViolation(
                Violation::UnexpectedPacket(message_type),
            )),
        }
    }

    /// Correlate a SUBACK with the pending SUBSCRIBE.
    ///
    /// A refusal settles the request too, and the session goes back to
    /// where it was before subscribing.
    fn acknowledge(&mut self, id: u16, granted: Option<QoS>) -> Event<'static> {
        if self.state == State::Subscribing && self.ids.complete(id).is_some() {
            return match granted {
                Some(qos) => {
                    debug!("subscription {} granted at {:?}", id, qos);
                    self.subscribed = true;
                    self.state = State::Active;
                    Event::Subscribed(id)
                }
                None => {
                    warn!("subscription {} refused by the broker", id);
                    self.state = if self.subscribed {
                        State::Active
                    } else {
                        State::Connected
                    };
                    Event::SubscribeRejected(id)
                }
            };
        }
        let expected = self.ids.oldest();
        warn!("SUBACK for unknown id {}, expected {:?}", id, expected);
        Event::Error(Error::CorrelationMismatch {
            expected,
            received: id,
        })
    }

    /// Write one encoded packet, tearing the session down if the transport fails.
    fn send(&mut self, packet: &[u8]) -> Result<(), Error> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(Error::InvalidState(self.state));
        };
        match write_all(connection, packet) {
            Ok(()) => {
                self.keep_alive.record_activity(self.clock.now());
                Ok(())
            }
            Err(err) => {
                error!("send failed in {:?}: {:?}", self.state, err);
                self.teardown();
                Err(Error::Transport(err))
            }
        }
    }

    /// Report `err`, disconnecting first when it is fatal.
    fn fail(&mut self, err: Error) -> Event<'static> {
        if err.is_fatal() {
            error!("session failed in {:?}: {:?}", self.state, err);
            self.teardown();
        }
        Event::Error(err)
    }

    /// Release the transport and forget every pending request.
    fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            if connection.close().is_err() {
                warn!("transport close failed");
            }
        }
        self.ids.clear();
        self.subscribed = false;
        self.state = State::Disconnected;
        info!("disconnected");
    }
}
