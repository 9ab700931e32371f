//! Drives `start_handshake`/`step` through full, hand-constructed server
//! flights instead of a dummy `State` stub — unlike `driver.rs`, which only
//! exercises the dispatch rules, these tests check that the real transition
//! bodies in `client::hs`/`client::tls13` actually reach `HandshakeComplete`
//! (or the right error) against `tls13-client-test`'s deterministic fakes.

use zeroize::Zeroizing;

use tls13_client::codec::{put_u16, put_u16_prefixed, put_u24, put_u8};
use tls13_client::context::{ClientConfig, EarlyDataStatus, HandshakeContext, KeyExchangeMode, Session};
use tls13_client::error::Error;
use tls13_client::msgs::enums::{
    CipherSuiteId, ExtensionType, HandshakeType, NamedGroup, PskKeyExchangeMode, ProtocolVersion,
};
use tls13_client::msgs::handshake::Random;
use tls13_client::provider::HashAlgorithm;
use tls13_client::{start_handshake, step, ClientContext, NextState, NextStateOrError, Signal, State};
use tls13_client_test::{
    FakeCryptoProvider, FakeKeySchedule, FakeRecordChannel, FAKE_GROUP, FAKE_GROUP_ALT,
    FAKE_SCHEME, FAKE_SUITE, VALID_SIGNATURE,
};

/// Every `ClientContext` field is a borrow, so it can't be held across the
/// direct `FakeRecordChannel` pokes (`push_inbound`/`take_outbound`) a test
/// needs between transitions. Each driver function below builds one,
/// drives exactly one transition, and lets it go out of scope before
/// returning — mirroring how a real caller owns the fakes across the whole
/// handshake and only ever lends them to the core one call at a time.
#[allow(clippy::too_many_arguments)]
fn drive_start(
    config: &ClientConfig,
    hs: &mut HandshakeContext,
    session: &mut Session,
    record: &mut FakeRecordChannel,
    crypto: &FakeCryptoProvider,
    key_schedule: &mut FakeKeySchedule,
) -> Result<Box<dyn State>, Error> {
    let mut cx = ClientContext { config, hs, session, record, crypto, key_schedule };
    start_handshake(&mut cx)
}

#[allow(clippy::too_many_arguments)]
fn drive_step(
    config: &ClientConfig,
    hs: &mut HandshakeContext,
    session: &mut Session,
    record: &mut FakeRecordChannel,
    crypto: &FakeCryptoProvider,
    key_schedule: &mut FakeKeySchedule,
    state: Box<dyn State>,
) -> NextStateOrError {
    let mut cx = ClientContext { config, hs, session, record, crypto, key_schedule };
    step(&mut cx, state)
}

fn encode_extensions_list(exts: &[(ExtensionType, Vec<u8>)]) -> Vec<u8> {
    let mut inner = Vec::new();
    for (typ, body) in exts {
        put_u16(&mut inner, typ.0);
        put_u16_prefixed(&mut inner, |b| b.extend_from_slice(body)).unwrap();
    }
    let mut out = Vec::new();
    put_u16_prefixed(&mut out, |b| b.extend_from_slice(&inner)).unwrap();
    out
}

/// Body shared by `ServerHello` and `HelloRetryRequest` (spec §4.5): legacy
/// version, random, session id echo, cipher suite, null compression, then
/// the extension set the caller assembled for whichever of the two this is.
fn server_hello_body(
    random: [u8; 32],
    session_id_echo: &[u8],
    cipher_suite: CipherSuiteId,
    exts: &[(ExtensionType, Vec<u8>)],
) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, 0x0303);
    out.extend_from_slice(&random);
    put_u8(&mut out, session_id_echo.len() as u8);
    out.extend_from_slice(session_id_echo);
    put_u16(&mut out, cipher_suite.0);
    put_u8(&mut out, 0);
    out.extend_from_slice(&encode_extensions_list(exts));
    out
}

/// `ServerHello`'s `key_share` is a single bare entry, unlike `ClientHello`'s
/// length-prefixed list.
fn key_share_entry_body(group: NamedGroup, public: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, group.0);
    put_u16_prefixed(&mut out, |b| b.extend_from_slice(public)).unwrap();
    out
}

/// An HRR's `key_share` carries only the selected group id (spec §4.4).
fn hrr_key_share_body(group: NamedGroup) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, group.0);
    out
}

fn cookie_ext_body(cookie: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16_prefixed(&mut out, |b| b.extend_from_slice(cookie)).unwrap();
    out
}

fn selected_identity_body(idx: u16) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, idx);
    out
}

fn certificate_body(der: &[u8]) -> Vec<u8> {
    let mut entries = Vec::new();
    put_u24(&mut entries, der.len() as u32);
    entries.extend_from_slice(der);
    put_u16(&mut entries, 0); // no per-entry extensions
    let mut out = Vec::new();
    put_u8(&mut out, 0); // no certificate_request_context
    put_u24(&mut out, entries.len() as u32);
    out.extend_from_slice(&entries);
    out
}

fn certificate_verify_body(scheme: u16, signature: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, scheme);
    put_u16_prefixed(&mut out, |b| b.extend_from_slice(signature)).unwrap();
    out
}

/// Mirrors `Transcript::add_message`'s framing so a test can compute the
/// exact transcript hash a server `Finished` will be checked against,
/// without running the client code that does the same thing internally.
fn transcript_add(buf: &mut Vec<u8>, typ: u8, body: &[u8]) {
    buf.push(typ);
    let len = (body.len() as u32).to_be_bytes();
    buf.extend_from_slice(&len[1..4]);
    buf.extend_from_slice(body);
}

fn server_finished_body(transcript_messages: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (typ, body) in transcript_messages {
        transcript_add(&mut buf, *typ, body);
    }
    let ks = FakeKeySchedule::new();
    let hash = ks.transcript_hash(HashAlgorithm::Sha256, &buf);
    ks.finished_verify_data(&hash, true)
}

fn no_psk_config(group_list: Vec<NamedGroup>) -> ClientConfig {
    ClientConfig {
        alpn_protocols: Vec::new(),
        psk: None,
        psk_identity: None,
        tls13_kex_modes: Vec::new(),
        early_data_enabled: false,
        group_list,
        allow_tls12_fallback: false,
        client_identity: None,
    }
}

fn take_one_outbound(record: &mut FakeRecordChannel) -> (HandshakeType, Vec<u8>) {
    let mut out = record.take_outbound();
    assert_eq!(out.len(), 1);
    out.pop().unwrap()
}

#[test]
fn full_handshake_with_fresh_ecdhe_reaches_handshake_complete() {
    let config = no_psk_config(vec![FAKE_GROUP]);
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0x01u8; 32], Vec::new());
    let mut session = Session::fresh(FAKE_SUITE, ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();

    let mut state = drive_start(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule).unwrap();
    let (typ, client_hello) = take_one_outbound(&mut record);
    assert_eq!(typ, HandshakeType::ClientHello);

    let server_hello = server_hello_body(
        [0x02u8; 32],
        &[],
        FAKE_SUITE,
        &[
            (ExtensionType::SUPPORTED_VERSIONS, vec![0x03, 0x04]),
            (ExtensionType::KEY_SHARE, key_share_entry_body(FAKE_GROUP, b"server-share")),
        ],
    );
    let encrypted_extensions = encode_extensions_list(&[]);
    let certificate = certificate_body(b"fake-leaf-certificate-der");
    let certificate_verify = certificate_verify_body(FAKE_SCHEME.0, VALID_SIGNATURE);
    let finished = server_finished_body(&[
        (1, client_hello),
        (2, server_hello.clone()),
        (8, encrypted_extensions.clone()),
        (11, certificate.clone()),
        (15, certificate_verify.clone()),
    ]);

    record.push_inbound(HandshakeType::ServerHello, server_hello);
    record.push_inbound(HandshakeType::EncryptedExtensions, encrypted_extensions);
    record.push_inbound(HandshakeType::Certificate, certificate);
    record.push_inbound(HandshakeType::CertificateVerify, certificate_verify);
    record.push_inbound(HandshakeType::Finished, finished);

    loop {
        match drive_step(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule, state).unwrap() {
            NextState::Continue(next) => state = next,
            NextState::Signal(signal) => {
                assert_eq!(signal, Signal::HandshakeComplete);
                break;
            }
        }
    }

    assert!(record.has_inbound_transform());
    assert!(record.has_outbound_transform());
    assert_eq!(record.dummy_ccs_count(), 1);
    assert!(record.alerts_sent().is_empty());
    let outbound = record.take_outbound();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].0, HandshakeType::Finished);
}

#[test]
fn hello_retry_request_renegotiates_the_group_and_echoes_the_cookie() {
    let config = no_psk_config(vec![FAKE_GROUP_ALT, FAKE_GROUP]);
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0x03u8; 32], Vec::new());
    let mut session = Session::fresh(FAKE_SUITE, ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();

    let mut state = drive_start(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule).unwrap();
    let (_, client_hello_1) = take_one_outbound(&mut record);
    assert_eq!(hs.offered_group_id, Some(FAKE_GROUP_ALT));

    let cookie = b"hrr-cookie".to_vec();
    let hrr = server_hello_body(
        Random::HRR_MAGIC,
        &[],
        FAKE_SUITE,
        &[
            (ExtensionType::SUPPORTED_VERSIONS, vec![0x03, 0x04]),
            (ExtensionType::KEY_SHARE, hrr_key_share_body(FAKE_GROUP)),
            (ExtensionType::COOKIE, cookie_ext_body(&cookie)),
        ],
    );
    record.push_inbound(HandshakeType::ServerHello, hrr.clone());

    state = match drive_step(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule, state).unwrap() {
        NextState::Continue(next) => next,
        NextState::Signal(_) => panic!("HRR must not signal completion"),
    };
    assert_eq!(hs.hrr_count, 1);
    assert_eq!(hs.offered_group_id, Some(FAKE_GROUP));
    assert_eq!(record.dummy_ccs_count(), 1);

    let (typ, client_hello_2) = take_one_outbound(&mut record);
    assert_eq!(typ, HandshakeType::ClientHello);
    assert!(
        client_hello_2.windows(cookie.len()).any(|w| w == cookie.as_slice()),
        "retried ClientHello must echo the HRR cookie"
    );

    let server_hello = server_hello_body(
        [0x04u8; 32],
        &[],
        FAKE_SUITE,
        &[
            (ExtensionType::SUPPORTED_VERSIONS, vec![0x03, 0x04]),
            (ExtensionType::KEY_SHARE, key_share_entry_body(FAKE_GROUP, b"server-share-2")),
        ],
    );
    let encrypted_extensions = encode_extensions_list(&[]);
    let certificate = certificate_body(b"fake-leaf-certificate-der");
    let certificate_verify = certificate_verify_body(FAKE_SCHEME.0, VALID_SIGNATURE);

    let message_hash_digest = {
        let mut ch1_buf = Vec::new();
        transcript_add(&mut ch1_buf, 1, &client_hello_1);
        FakeKeySchedule::new().transcript_hash(HashAlgorithm::Sha256, &ch1_buf)
    };
    let mut synthetic = Vec::new();
    synthetic.push(254u8);
    let len = (message_hash_digest.len() as u32).to_be_bytes();
    synthetic.extend_from_slice(&len[1..4]);
    synthetic.extend_from_slice(&message_hash_digest);

    let finished = {
        let mut buf = synthetic.clone();
        transcript_add(&mut buf, 2, &hrr);
        transcript_add(&mut buf, 1, &client_hello_2);
        transcript_add(&mut buf, 2, &server_hello);
        transcript_add(&mut buf, 8, &encrypted_extensions);
        transcript_add(&mut buf, 11, &certificate);
        transcript_add(&mut buf, 15, &certificate_verify);
        let ks = FakeKeySchedule::new();
        let hash = ks.transcript_hash(HashAlgorithm::Sha256, &buf);
        ks.finished_verify_data(&hash, true)
    };

    record.push_inbound(HandshakeType::ServerHello, server_hello);
    record.push_inbound(HandshakeType::EncryptedExtensions, encrypted_extensions);
    record.push_inbound(HandshakeType::Certificate, certificate);
    record.push_inbound(HandshakeType::CertificateVerify, certificate_verify);
    record.push_inbound(HandshakeType::Finished, finished);

    loop {
        match drive_step(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule, state).unwrap() {
            NextState::Continue(next) => state = next,
            NextState::Signal(signal) => {
                assert_eq!(signal, Signal::HandshakeComplete);
                break;
            }
        }
    }
    assert_eq!(hs.hrr_count, 1);
}

#[test]
fn a_second_hello_retry_request_is_rejected() {
    let config = no_psk_config(vec![FAKE_GROUP_ALT, FAKE_GROUP]);
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0x05u8; 32], Vec::new());
    let mut session = Session::fresh(FAKE_SUITE, ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();

    let state = drive_start(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule).unwrap();
    let hrr = server_hello_body(
        Random::HRR_MAGIC,
        &[],
        FAKE_SUITE,
        &[
            (ExtensionType::SUPPORTED_VERSIONS, vec![0x03, 0x04]),
            (ExtensionType::KEY_SHARE, hrr_key_share_body(FAKE_GROUP)),
        ],
    );
    record.push_inbound(HandshakeType::ServerHello, hrr.clone());
    let state = match drive_step(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule, state).unwrap() {
        NextState::Continue(next) => next,
        NextState::Signal(_) => panic!("first HRR must not signal completion"),
    };

    record.push_inbound(HandshakeType::ServerHello, hrr);
    let err = drive_step(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule, state).unwrap_err();
    assert_eq!(err, Error::UnexpectedMessage("second HelloRetryRequest"));
}

#[test]
fn downgrade_sentinel_aborts_the_handshake() {
    let config = no_psk_config(vec![FAKE_GROUP]);
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0x06u8; 32], Vec::new());
    let mut session = Session::fresh(FAKE_SUITE, ProtocolVersion::TLS1_3, Vec::new());
    let mut record = FakeRecordChannel::new();
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();

    let state = drive_start(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule).unwrap();
    let mut random = [0x22u8; 32];
    random[24..32].copy_from_slice(&Random::DOWNGRADE_TO_TLS12);
    let server_hello = server_hello_body(
        random,
        &[],
        FAKE_SUITE,
        &[(ExtensionType::SUPPORTED_VERSIONS, vec![0x03, 0x04])],
    );
    record.push_inbound(HandshakeType::ServerHello, server_hello);

    let err = drive_step(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule, state).unwrap_err();
    assert_eq!(err, Error::DowngradeDetected);
}

#[test]
fn psk_only_resumption_skips_the_certificate_flight() {
    let config = ClientConfig {
        alpn_protocols: Vec::new(),
        psk: None,
        psk_identity: None,
        tls13_kex_modes: vec![PskKeyExchangeMode::PskKe],
        early_data_enabled: true,
        group_list: Vec::new(),
        allow_tls12_fallback: false,
        client_identity: None,
    };
    let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0x07u8; 32], Vec::new());
    let mut session = Session::fresh(FAKE_SUITE, ProtocolVersion::TLS1_3, Vec::new());
    session.ticket = Some(b"resumption-ticket".to_vec());
    session.resumption_key = Some(Zeroizing::new(b"resumption-psk-secret".to_vec()));
    session.ticket_allows_early_data = true;
    let mut record = FakeRecordChannel::new();
    let crypto = FakeCryptoProvider::new();
    let mut key_schedule = FakeKeySchedule::new();

    let mut state = drive_start(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule).unwrap();
    let (_, client_hello) = take_one_outbound(&mut record);
    assert_eq!(hs.offered_psks.len(), 1);

    let server_hello = server_hello_body(
        [0x08u8; 32],
        &[],
        FAKE_SUITE,
        &[
            (ExtensionType::SUPPORTED_VERSIONS, vec![0x03, 0x04]),
            (ExtensionType::PRE_SHARED_KEY, selected_identity_body(0)),
        ],
    );
    let encrypted_extensions = encode_extensions_list(&[]);
    let finished = server_finished_body(&[
        (1, client_hello),
        (2, server_hello.clone()),
        (8, encrypted_extensions.clone()),
    ]);

    record.push_inbound(HandshakeType::ServerHello, server_hello);
    record.push_inbound(HandshakeType::EncryptedExtensions, encrypted_extensions);
    record.push_inbound(HandshakeType::Finished, finished);

    loop {
        match drive_step(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule, state).unwrap() {
            NextState::Continue(next) => state = next,
            NextState::Signal(signal) => {
                assert_eq!(signal, Signal::HandshakeComplete);
                break;
            }
        }
    }

    assert_eq!(hs.key_exchange_mode, Some(KeyExchangeMode::Psk));
    assert_eq!(hs.early_data_status, EarlyDataStatus::Rejected);
    let outbound = record.take_outbound();
    // No Certificate/CertificateVerify from the client: PSK-only skips the
    // certificate flight entirely (spec §4.6).
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].0, HandshakeType::Finished);
}
