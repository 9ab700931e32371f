//! Exercises `client::step` directly against a minimal test-only `State`,
//! independent of any real handshake message's wire format — this is about
//! the driver's dispatch rules (spec §4.10), not any one transition's body.

use tls13_client::client::{step, ClientContext, NextState, NextStateOrError, Signal, State};
use tls13_client::context::{ClientConfig, HandshakeContext, Session};
use tls13_client::error::Error;
use tls13_client::msgs::enums::{CipherSuiteId, HandshakeType, ProtocolVersion};
use tls13_client_test::{FakeCryptoProvider, FakeKeySchedule, FakeRecordChannel};

struct OnlyAcceptsFinished;

impl State for OnlyAcceptsFinished {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::Finished]
    }

    fn handle(
        self: Box<Self>,
        _cx: &mut ClientContext<'_>,
        typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        assert_eq!(typ, Some(HandshakeType::Finished));
        assert_eq!(msg, b"verify-data");
        Ok(NextState::Signal(Signal::HandshakeComplete))
    }
}

struct WriteDriven;

impl State for WriteDriven {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[]
    }

    fn handle(
        self: Box<Self>,
        _cx: &mut ClientContext<'_>,
        typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        assert_eq!(typ, None);
        assert!(msg.is_empty());
        Ok(NextState::Signal(Signal::HandshakeComplete))
    }
}

fn test_config() -> ClientConfig {
    ClientConfig {
        alpn_protocols: Vec::new(),
        psk: None,
        psk_identity: None,
        tls13_kex_modes: Vec::new(),
        early_data_enabled: false,
        group_list: Vec::new(),
        allow_tls12_fallback: false,
        client_identity: None,
    }
}

#[test]
fn step_returns_would_block_with_nothing_queued() {
    let config = test_config();
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
    let mut session = Session::fresh(CipherSuiteId(0xFA00), ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();
    let mut cx = ClientContext {
        config: &config,
        hs: &mut hs,
        session: &mut session,
        record: &mut record,
        crypto: &crypto,
        key_schedule: &mut key_schedule,
    };

    let err = step(&mut cx, Box::new(OnlyAcceptsFinished)).unwrap_err();
    assert_eq!(err, Error::WouldBlock);
}

#[test]
fn step_rejects_a_message_type_the_state_does_not_expect() {
    let config = test_config();
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
    let mut session = Session::fresh(CipherSuiteId(0xFA00), ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    record.push_inbound(HandshakeType::Certificate, b"wrong-type".to_vec());
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();
    let mut cx = ClientContext {
        config: &config,
        hs: &mut hs,
        session: &mut session,
        record: &mut record,
        crypto: &crypto,
        key_schedule: &mut key_schedule,
    };

    let err = step(&mut cx, Box::new(OnlyAcceptsFinished)).unwrap_err();
    assert_eq!(
        err,
        Error::InappropriateMessage {
            expected: &[HandshakeType::Finished],
            got: HandshakeType::Certificate,
        }
    );
}

#[test]
fn step_dispatches_a_matching_message_to_handle() {
    let config = test_config();
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
    let mut session = Session::fresh(CipherSuiteId(0xFA00), ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    record.push_inbound(HandshakeType::Finished, b"verify-data".to_vec());
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();
    let mut cx = ClientContext {
        config: &config,
        hs: &mut hs,
        session: &mut session,
        record: &mut record,
        crypto: &crypto,
        key_schedule: &mut key_schedule,
    };

    let result = step(&mut cx, Box::new(OnlyAcceptsFinished)).unwrap();
    assert!(matches!(result, NextState::Signal(Signal::HandshakeComplete)));
}

#[test]
fn step_drives_a_write_only_state_without_fetching_a_message() {
    let config = test_config();
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
    let mut session = Session::fresh(CipherSuiteId(0xFA00), ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();
    let mut cx = ClientContext {
        config: &config,
        hs: &mut hs,
        session: &mut session,
        record: &mut record,
        crypto: &crypto,
        key_schedule: &mut key_schedule,
    };

    let result = step(&mut cx, Box::new(WriteDriven)).unwrap();
    assert!(matches!(result, NextState::Signal(Signal::HandshakeComplete)));
}
