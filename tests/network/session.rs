use super::{ManualClock, MockConnection, MockNetwork};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use libmqtt::network::application::mqtt::{
    Error, Event, LengthEncoding, MessageType, Options, RejectReason, Session, State, Violation,
};
use libmqtt::network::error::Error as TransportError;

type TestSession<'a, const N: usize = 1024> = Session<'a, MockConnection, ManualClock, N>;

const TIMEOUT: Duration = Duration::from_millis(100);

const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
const SUBACK_ID_1: [u8; 5] = [0x90, 0x03, 0x00, 0x01, 0x00];
const PINGRESP: [u8; 2] = [0xD0, 0x00];
const PUBLISH_HELLO: [u8; 17] = [
    0x30, 0x0F, 0x00, 0x0B, b'h', b'e', b'l', b'l', b'o', b'/', b'e', b'm', b'q', b't', b't',
    b'h', b'i',
];

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn options() -> Options<'static> {
    Options::new("sancho")
        .with_credentials("quijote", Some("rocinante"))
        .with_keep_alive(5)
}

/// A session that has sent CONNECT and had it accepted.
fn connected(options: Options<'static>) -> (TestSession<'static>, MockConnection, ManualClock) {
    let conn = MockConnection::new();
    let clock = ManualClock::new();
    let mut session: TestSession = Session::new(options, clock.clone());

    session.connect(conn.clone()).unwrap();
    conn.push(&CONNACK_ACCEPTED);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Connected {
            session_present: false
        }
    );
    conn.take_written();
    (session, conn, clock)
}

/// A session subscribed to `hello/emqtt` with id 1 acknowledged.
fn active() -> (TestSession<'static>, MockConnection, ManualClock) {
    let (mut session, conn, clock) = connected(options());
    assert_eq!(session.subscribe("hello/emqtt"), Ok(1));
    conn.push(&SUBACK_ID_1);
    assert_eq!(session.poll(TIMEOUT), Event::Subscribed(1));
    conn.take_written();
    (session, conn, clock)
}

#[test]
fn test_connect_subscribe_receive_disconnect() {
    let conn = MockConnection::new();
    let clock = ManualClock::new();
    let mut session: TestSession = Session::new(options(), clock.clone());
    assert_eq!(session.state(), State::Disconnected);

    session.connect(conn.clone()).unwrap();
    assert_eq!(session.state(), State::Connecting);
    let connect = conn.take_written();
    assert_eq!(connect[0], 0x10);
    assert_eq!(usize::from(connect[1]), connect.len() - 2);

    conn.push(&CONNACK_ACCEPTED);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Connected {
            session_present: false
        }
    );
    assert_eq!(session.state(), State::Connected);

    let id = session.subscribe("hello/emqtt").unwrap();
    assert_eq!(id, 1);
    assert_eq!(session.state(), State::Subscribing);
    assert!(session.is_pending(1));
    let subscribe = conn.take_written();
    assert_eq!(&subscribe[..4], &[0x82, 0x10, 0x00, 0x01]);
    assert_eq!(&subscribe[6..17], b"hello/emqtt");

    conn.push(&SUBACK_ID_1);
    assert_eq!(session.poll(TIMEOUT), Event::Subscribed(1));
    assert_eq!(session.state(), State::Active);
    assert_eq!(session.pending_count(), 0);

    conn.push(&PUBLISH_HELLO);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::MessagePublished {
            topic: b"hello/emqtt",
            payload: b"hi",
        }
    );

    assert_eq!(session.disconnect(), Event::Disconnected);
    assert_eq!(session.state(), State::Disconnected);
    assert_eq!(conn.take_written(), vec![0xE0, 0x00]);
    assert!(conn.is_closed());
}

#[test]
fn test_connect_rejected() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();
    conn.take_written();

    conn.push(&[0x20, 0x02, 0x00, 0x05]);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::ConnectRejected(RejectReason::NotAuthorized)
    );
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.is_closed());
    // No DISCONNECT after a refusal
    assert!(conn.take_written().is_empty());
}

#[test]
fn test_session_present_is_reported() {
    let conn = MockConnection::new();
    let mut session: TestSession =
        Session::new(Options::new("sancho").with_clean_session(false), ManualClock::new());
    conn.push(&[0x20, 0x02, 0x01, 0x00]);
    assert_eq!(session.establish(conn.clone(), TIMEOUT), Ok(true));
    assert_eq!(session.state(), State::Connected);
}

#[test]
fn test_establish_rejected() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    conn.push(&[0x20, 0x02, 0x00, 0x04]);
    assert_eq!(
        session.establish(conn.clone(), TIMEOUT),
        Err(Error::ConnectRejected(RejectReason::BadCredentials))
    );
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.is_closed());
}

#[test]
fn test_establish_without_answer() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    conn.push_silence();
    assert_eq!(
        session.establish(conn.clone(), TIMEOUT),
        Err(Error::Transport(TransportError::Timeout))
    );
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.is_closed());
}

#[test]
fn test_unexpected_packet_while_connecting() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();

    conn.push(&SUBACK_ID_1);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::ProtocolViolation(Violation::UnexpectedPacket(
            MessageType::Suback
        )))
    );
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.is_closed());
}

#[test]
fn test_malformed_connack_is_fatal() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();

    conn.push(&[0x20, 0x02, 0x00, 0x09]);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::ProtocolViolation(Violation::InvalidReturnCode))
    );
    assert_eq!(session.state(), State::Disconnected);
}

#[test]
fn test_unknown_suback_keeps_pending_table() {
    let (mut session, conn, _clock) = connected(options());
    assert_eq!(session.subscribe("hello/emqtt"), Ok(1));

    conn.push(&[0x90, 0x03, 0x00, 0x07, 0x00]);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::CorrelationMismatch {
            expected: Some(1),
            received: 7,
        })
    );
    assert_eq!(session.state(), State::Subscribing);
    assert!(session.is_pending(1));
    assert_eq!(session.pending_count(), 1);
    assert!(!conn.is_closed());

    conn.push(&SUBACK_ID_1);
    assert_eq!(session.poll(TIMEOUT), Event::Subscribed(1));
    assert_eq!(session.state(), State::Active);
}

#[test]
fn test_suback_with_nothing_pending() {
    let (mut session, conn, _clock) = active();

    conn.push(&[0x90, 0x03, 0x00, 0x01, 0x00]);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::CorrelationMismatch {
            expected: None,
            received: 1,
        })
    );
    assert_eq!(session.state(), State::Active);
}

#[test]
fn test_refused_subscription() {
    let (mut session, conn, _clock) = connected(options());
    assert_eq!(session.subscribe("forbidden/topic"), Ok(1));

    conn.push(&[0x90, 0x03, 0x00, 0x01, 0x80]);
    assert_eq!(session.poll(TIMEOUT), Event::SubscribeRejected(1));
    assert_eq!(session.state(), State::Connected);
    assert_eq!(session.pending_count(), 0);
    assert!(!conn.is_closed());

    // The caller can try another topic
    assert_eq!(session.subscribe("hello/emqtt"), Ok(2));
    assert_eq!(session.state(), State::Subscribing);
}

#[test]
fn test_refused_subscription_keeps_earlier_grant() {
    let (mut session, conn, _clock) = active();
    assert_eq!(session.subscribe("forbidden/topic"), Ok(2));

    conn.push(&[0x90, 0x03, 0x00, 0x02, 0x80]);
    assert_eq!(session.poll(TIMEOUT), Event::SubscribeRejected(2));
    assert_eq!(session.state(), State::Active);
    assert_eq!(session.pending_count(), 0);

    conn.push(&PUBLISH_HELLO);
    assert!(matches!(
        session.poll(TIMEOUT),
        Event::MessagePublished { .. }
    ));
}

#[test]
fn test_higher_granted_qos_is_a_grant() {
    let (mut session, conn, _clock) = connected(options());
    session.subscribe("hello/emqtt").unwrap();

    conn.push(&[0x90, 0x03, 0x00, 0x01, 0x01]);
    assert_eq!(session.poll(TIMEOUT), Event::Subscribed(1));
    assert_eq!(session.state(), State::Active);
}

#[test]
fn test_undefined_suback_code_is_fatal() {
    let (mut session, conn, _clock) = connected(options());
    session.subscribe("hello/emqtt").unwrap();

    conn.push(&[0x90, 0x03, 0x00, 0x01, 0x05]);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::ProtocolViolation(Violation::InvalidReturnCode))
    );
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.is_closed());
}

#[test]
fn test_unencodable_topic_is_not_fatal() {
    let (mut session, conn, _clock) = connected(options());

    // Past the single-byte remaining length
    let long = "t".repeat(300);
    let err = session.subscribe(&long).unwrap_err();
    assert_eq!(err, Error::InvalidTopic);
    assert!(!err.is_fatal());
    assert_eq!(session.subscribe(""), Err(Error::InvalidTopic));

    assert_eq!(session.state(), State::Connected);
    assert_eq!(session.pending_count(), 0);
    assert!(conn.take_written().is_empty());
    assert!(!conn.is_closed());

    assert!(session.subscribe("hello/emqtt").is_ok());
    assert_eq!(session.state(), State::Subscribing);
}

#[test]
fn test_topic_past_the_outgoing_buffer() {
    let (mut session, conn, _clock) =
        connected(options().with_length_encoding(LengthEncoding::Variable));

    let long = "t".repeat(2000);
    assert_eq!(session.subscribe(&long), Err(Error::InvalidTopic));
    assert_eq!(session.state(), State::Connected);
    assert!(conn.take_written().is_empty());
}

#[test]
fn test_subscribe_state_rules() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    assert_eq!(
        session.subscribe("a"),
        Err(Error::InvalidState(State::Disconnected))
    );

    session.connect(conn.clone()).unwrap();
    assert_eq!(
        session.subscribe("a"),
        Err(Error::InvalidState(State::Connecting))
    );

    conn.push(&CONNACK_ACCEPTED);
    session.poll(TIMEOUT);
    assert_eq!(session.subscribe("a"), Ok(1));
    assert_eq!(
        session.subscribe("b"),
        Err(Error::InvalidState(State::Subscribing))
    );

    conn.push(&SUBACK_ID_1);
    assert_eq!(session.poll(TIMEOUT), Event::Subscribed(1));
    // Further subscriptions from the steady state
    assert_eq!(session.subscribe("b"), Ok(2));
    assert_eq!(session.state(), State::Subscribing);
}

#[test]
fn test_messages_before_suback_are_delivered() {
    let (mut session, conn, _clock) = connected(options());
    session.subscribe("hello/emqtt").unwrap();

    conn.push(&PUBLISH_HELLO);
    conn.push(&SUBACK_ID_1);
    assert!(matches!(
        session.poll(TIMEOUT),
        Event::MessagePublished { .. }
    ));
    assert_eq!(session.poll(TIMEOUT), Event::Subscribed(1));
}

#[test]
fn test_packets_in_one_read_keep_their_order() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();

    let mut both = CONNACK_ACCEPTED.to_vec();
    both.extend_from_slice(&PUBLISH_HELLO);
    conn.push(&both);

    assert_eq!(
        session.poll(TIMEOUT),
        Event::Connected {
            session_present: false
        }
    );
    assert_eq!(
        session.poll(TIMEOUT),
        Event::MessagePublished {
            topic: b"hello/emqtt",
            payload: b"hi",
        }
    );
}

#[test]
fn test_fragmented_connack() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();

    conn.push_chunked(&CONNACK_ACCEPTED, 1);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Connected {
            session_present: false
        }
    );
}

#[test]
fn test_qos1_publish_is_decoded() {
    let (mut session, conn, _clock) = active();
    conn.push(&[0x32, 0x08, 0x00, 0x01, b't', 0x12, 0x34, b'a', b'b', b'c']);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::MessagePublished {
            topic: b"t",
            payload: b"abc",
        }
    );
    // Nothing is acknowledged
    assert!(conn.take_written().is_empty());
}

#[test]
fn test_idle_poll() {
    let (mut session, conn, _clock) = active();
    conn.push_silence();
    assert_eq!(session.poll(TIMEOUT), Event::Idle);
    assert_eq!(session.state(), State::Active);
}

#[test]
fn test_peer_close_disconnects() {
    let (mut session, conn, _clock) = active();

    conn.push_closed();
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::Transport(TransportError::ConnectionClosed))
    );
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.is_closed());

    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::InvalidState(State::Disconnected))
    );
}

#[test]
fn test_read_failure_disconnects() {
    let (mut session, conn, _clock) = connected(options());
    session.subscribe("hello/emqtt").unwrap();

    conn.push_failure();
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::Transport(TransportError::ReadError))
    );
    assert_eq!(session.state(), State::Disconnected);
    assert_eq!(session.pending_count(), 0);
}

#[test]
fn test_oversized_packet_disconnects() {
    let conn = MockConnection::new();
    let mut session: TestSession<'_, 16> = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();
    conn.push(&CONNACK_ACCEPTED);
    session.poll(TIMEOUT);

    conn.push(&PUBLISH_HELLO);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::ProtocolViolation(Violation::PacketTooLarge))
    );
    assert_eq!(session.state(), State::Disconnected);
}

#[test]
fn test_keep_alive_ping() {
    let (mut session, conn, clock) = active();

    clock.advance(secs(4));
    conn.push_silence();
    assert_eq!(session.poll(TIMEOUT), Event::Idle);
    assert!(conn.take_written().is_empty());

    clock.advance(secs(1));
    assert_eq!(session.poll(TIMEOUT), Event::KeepAliveSent);
    assert_eq!(conn.take_written(), vec![0xC0, 0x00]);

    // Not due again until a full interval after the ping
    conn.push_silence();
    assert_eq!(session.poll(TIMEOUT), Event::Idle);

    clock.advance(secs(4));
    conn.push(&PINGRESP);
    assert_eq!(session.poll(TIMEOUT), Event::PingResponse);

    // The response does not restart the window
    clock.advance(secs(1));
    assert_eq!(session.tick(), Some(Event::KeepAliveSent));
}

#[test]
fn test_sends_restart_keep_alive() {
    let (mut session, conn, clock) = connected(options());

    clock.advance(secs(4));
    session.subscribe("hello/emqtt").unwrap();
    conn.take_written();

    clock.advance(secs(4));
    assert_eq!(session.tick(), None);
    clock.advance(secs(1));
    assert_eq!(session.tick(), Some(Event::KeepAliveSent));
    assert_eq!(session.keep_alive().last_activity(), secs(9));
}

#[test]
fn test_zero_keep_alive_never_pings() {
    let (mut session, conn, clock) = connected(Options::new("sancho").with_keep_alive(0));

    clock.advance(secs(100_000));
    assert_eq!(session.tick(), None);
    conn.push_silence();
    assert_eq!(session.poll(TIMEOUT), Event::Idle);
    assert!(conn.take_written().is_empty());
}

#[test]
fn test_no_ping_before_connack() {
    let conn = MockConnection::new();
    let clock = ManualClock::new();
    let mut session: TestSession = Session::new(options(), clock.clone());
    session.connect(conn.clone()).unwrap();
    conn.take_written();

    clock.advance(secs(60));
    assert_eq!(session.tick(), None);
    assert!(conn.take_written().is_empty());
}

#[test]
fn test_failed_ping_disconnects() {
    let (mut session, conn, clock) = active();
    conn.fail_writes();

    clock.advance(secs(5));
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Error(Error::Transport(TransportError::WriteError))
    );
    assert_eq!(session.state(), State::Disconnected);
}

#[test]
fn test_failed_subscribe_disconnects() {
    let (mut session, conn, _clock) = connected(options());
    conn.fail_writes();

    assert_eq!(
        session.subscribe("hello/emqtt"),
        Err(Error::Transport(TransportError::WriteError))
    );
    assert_eq!(session.state(), State::Disconnected);
    assert_eq!(session.pending_count(), 0);
    assert!(conn.is_closed());
}

#[test]
fn test_short_writes_are_completed() {
    let conn = MockConnection::new();
    conn.limit_writes(3);
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();

    let connect = conn.take_written();
    assert_eq!(usize::from(connect[1]), connect.len() - 2);
    assert_eq!(&connect[connect.len() - 9..], b"rocinante");
}

#[test]
fn test_disconnect_while_connecting() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.connect(conn.clone()).unwrap();
    conn.take_written();

    assert_eq!(session.disconnect(), Event::Disconnected);
    assert!(conn.take_written().is_empty());
    assert!(conn.is_closed());

    assert_eq!(
        session.disconnect(),
        Event::Error(Error::InvalidState(State::Disconnected))
    );
}

#[test]
fn test_disconnect_survives_write_failure() {
    let (mut session, conn, _clock) = active();
    conn.fail_writes();

    assert_eq!(session.disconnect(), Event::Disconnected);
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.is_closed());
}

#[test]
fn test_connect_twice_is_refused() {
    let (mut session, _conn, _clock) = connected(options());

    let second = MockConnection::new();
    assert_eq!(
        session.connect(second.clone()),
        Err(Error::InvalidState(State::Connected))
    );
    assert!(second.is_closed());
    assert_eq!(session.state(), State::Connected);
}

#[test]
fn test_invalid_options_are_refused() {
    let conn = MockConnection::new();
    let mut session: TestSession =
        Session::new(Options::new("").with_clean_session(false), ManualClock::new());

    assert_eq!(session.connect(conn.clone()), Err(Error::InvalidOptions));
    assert_eq!(session.state(), State::Disconnected);
    assert!(conn.take_written().is_empty());
    assert!(conn.is_closed());
}

#[test]
fn test_reconnect_after_disconnect() {
    let (mut session, _conn, _clock) = active();
    assert_eq!(session.disconnect(), Event::Disconnected);

    let conn = MockConnection::new();
    session.connect(conn.clone()).unwrap();
    assert_eq!(session.state(), State::Connecting);
    conn.push(&CONNACK_ACCEPTED);
    assert_eq!(
        session.poll(TIMEOUT),
        Event::Connected {
            session_present: false
        }
    );

    let id = session.subscribe("hello/emqtt").unwrap();
    assert_ne!(id, 0);
    assert!(session.is_pending(id));
}

#[test]
fn test_set_options_only_while_disconnected() {
    let (mut session, _conn, _clock) = connected(options());
    assert_eq!(
        session.set_options(Options::new("other")),
        Err(Error::InvalidState(State::Connected))
    );
    session.disconnect();

    let variable = Options::new("other").with_length_encoding(LengthEncoding::Variable);
    assert_eq!(session.set_options(variable), Ok(()));
    assert_eq!(session.options().client_id, "other");
}

#[test]
fn test_variable_length_session() {
    let conn = MockConnection::new();
    let mut session: TestSession = Session::new(
        Options::new("sancho").with_length_encoding(LengthEncoding::Variable),
        ManualClock::new(),
    );
    session.connect(conn.clone()).unwrap();
    conn.push(&CONNACK_ACCEPTED);
    session.poll(TIMEOUT);

    let mut publish = vec![0x30, 0x83, 0x01, 0x00, 0x01, b't'];
    publish.extend_from_slice(&[0x5A; 128]);
    conn.push(&publish);
    match session.poll(TIMEOUT) {
        Event::MessagePublished { topic, payload } => {
            assert_eq!(topic, b"t");
            assert_eq!(payload.len(), 128);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_open_through_connector() {
    let conn = MockConnection::new();
    let mut network = MockNetwork {
        connection: Some(conn.clone()),
    };
    let mut session: TestSession = Session::new(options(), ManualClock::new());
    session.open(&mut network, "mock://broker").unwrap();
    assert_eq!(session.state(), State::Connecting);
    assert_eq!(conn.take_written()[0], 0x10);

    let mut unreachable = MockNetwork { connection: None };
    let mut other: TestSession = Session::new(options(), ManualClock::new());
    assert_eq!(
        other.open(&mut unreachable, "mock://broker"),
        Err(Error::Transport(TransportError::ConnectionRefused))
    );
    assert_eq!(other.state(), State::Disconnected);
}

#[test]
fn test_run_until_shutdown() {
    let (mut session, conn, _clock) = active();
    conn.push(&PUBLISH_HELLO);
    conn.push_silence();
    conn.push(&PUBLISH_HELLO);

    let shutdown = AtomicBool::new(false);
    let mut seen = Vec::new();
    session.run(TIMEOUT, &shutdown, |event| {
        match event {
            Event::MessagePublished { payload, .. } => {
                seen.push(format!("message {}", String::from_utf8_lossy(payload)));
                if seen.len() == 3 {
                    shutdown.store(true, Ordering::Release);
                }
            }
            Event::Idle => seen.push("idle".to_string()),
            Event::Disconnected => seen.push("disconnected".to_string()),
            other => panic!("unexpected event {:?}", other),
        }
    });

    assert_eq!(seen, ["message hi", "idle", "message hi", "disconnected"]);
    assert_eq!(session.state(), State::Disconnected);
    assert_eq!(conn.take_written(), vec![0xE0, 0x00]);
}

#[test]
fn test_run_returns_when_the_peer_leaves() {
    let (mut session, conn, _clock) = active();
    conn.push(&PUBLISH_HELLO);
    conn.push_closed();

    let shutdown = AtomicBool::new(false);
    let mut events = 0;
    let mut last = None;
    session.run(TIMEOUT, &shutdown, |event| {
        events += 1;
        if let Event::Error(err) = event {
            last = Some(err);
        }
    });

    assert_eq!(events, 2);
    assert_eq!(
        last,
        Some(Error::Transport(TransportError::ConnectionClosed))
    );
    assert_eq!(session.state(), State::Disconnected);
}

#[test]
fn test_run_with_shutdown_already_raised() {
    let (mut session, conn, _clock) = active();
    let shutdown = AtomicBool::new(true);

    let mut events = Vec::new();
    session.run(TIMEOUT, &shutdown, |event| {
        events.push(event == Event::Disconnected)
    });
    assert_eq!(events, [true]);
    assert!(conn.is_closed());
}
