//! `ClientHello` construction and the very first response state
//! (`ServerHello`/`HelloRetryRequest`/TLS-1.2-downgrade triage). Grounded
//! in the teacher's `client/hs.rs::emit_client_hello_for_retry` for the
//! extension-writing order and `ExpectServerHelloOrHelloRetryRequest` for
//! the triage shape.

use crate::client::tls13::ExpectEncryptedExtensions;
use crate::client::{ClientContext, NextState, NextStateOrError, Signal, State};
use crate::codec::put_u16;
use crate::context::KeyExchangeMode;
use crate::error::Error;
use crate::hrr::{self, ServerHelloKind};
use crate::msgs::enums::{
    CipherSuiteId, HandshakeType, PskKeyExchangeMode, SignatureScheme,
};
use crate::msgs::extensions::{self, ALLOWED_HRR, ALLOWED_SH};
use crate::msgs::handshake::{ClientHelloPayload, Random, ServerHelloPayload, SessionId};
use crate::psk::{self, OfferedPsk};
use crate::provider::PskType;

/// The signature algorithms this crate advertises; small and fixed since
/// the registry of schemes is external (spec §1) but *which* we offer in
/// `signature_algorithms` is a client policy choice, same as the teacher's
/// `SupportedCipherSuite`-adjacent defaults.
const OFFERED_SIGNATURE_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme(0x0403), // ecdsa_secp256r1_sha256
    SignatureScheme(0x0807), // ed25519
    SignatureScheme(0x0804), // rsa_pss_rsae_sha256
];

const SUPPORTED_CIPHER_SUITES: &[CipherSuiteId] = &[
    CipherSuiteId(0x1301), // TLS_AES_128_GCM_SHA256
    CipherSuiteId(0x1302), // TLS_AES_256_GCM_SHA384
    CipherSuiteId(0x1303), // TLS_CHACHA20_POLY1305_SHA256
];

/// Picks PSKs to offer, in spec §4.3's order: resumption ticket first, then
/// static external PSK. These are two independent sources — a client with
/// both a resumable session and a configured static PSK offers both at
/// once, not one or the other. Only offered at all when some PSK KEX mode
/// is configured.
fn select_psks(cx: &ClientContext<'_>) -> Vec<OfferedPsk> {
    let mut offered = Vec::new();
    if !cx.config.any_psk_mode_enabled() {
        return offered;
    }
    if cx.session.can_resume() {
        if let (Some(key), true) = (&cx.session.resumption_key, !cx.session.exported) {
            offered.push(OfferedPsk {
                identity: cx.session.ticket.clone().unwrap_or_default(),
                secret: key.to_vec(),
                psk_type: PskType::Resumption,
                hash: cx
                    .crypto
                    .ciphersuite_from_id(cx.session.ciphersuite)
                    .map(|i| i.hash)
                    .unwrap_or(crate::provider::HashAlgorithm::Sha256),
                ticket_origin: Some(psk::TicketOrigin {
                    age_add: cx.session.ticket_age_add,
                    received_at_unix_seconds: cx.session.ticket_received,
                }),
            });
        }
    }
    if let (Some(psk), Some(identity)) = (&cx.config.psk, &cx.config.psk_identity) {
        offered.push(OfferedPsk {
            identity: identity.clone(),
            secret: psk.clone(),
            psk_type: PskType::External,
            hash: crate::provider::HashAlgorithm::Sha256,
            ticket_origin: None,
        });
    }
    offered
}

fn pick_ecdhe_group(cx: &ClientContext<'_>) -> Option<crate::msgs::enums::NamedGroup> {
    if let Some(hrr_group) = cx.hs.offered_group_id {
        // An HRR already dictated the group; reuse it rather than
        // re-picking from `group_list` (spec §4.5's key_share handling).
        return Some(hrr_group);
    }
    cx.config
        .group_list
        .iter()
        .copied()
        .find(|g| g.is_ecdhe() && cx.crypto.supports_group(*g))
}

/// Builds and sends a `ClientHello`, following spec §4.2's fixed writer
/// order, ending with `pre_shared_key` if any PSK is offered. Returns the
/// exact bytes sent (needed for the `legacy_session_id_echo` check and,
/// after an HRR, to fold into the transcript).
fn emit_client_hello(cx: &mut ClientContext<'_>) -> Result<Vec<u8>, Error> {
    let mut extensions = Vec::new();

    extensions::write_supported_versions(&mut extensions, cx.hs.min_version.0 <= 0x0303)?;

    if let Some(cookie) = cx.hs.cookie.take() {
        // Echoed exactly once (spec §3's invariant): `take()` consumes it.
        extensions::write_cookie(&mut extensions, &cookie)?;
    }

    let psks = select_psks(cx);
    // Remembered so `handle_server_hello` can resolve `selected_identity`
    // by position once `ServerHello` arrives, independent of this
    // function's locals (spec §4.3). Overwritten on every call, including
    // the post-HRR retry, which re-derives `psks` fresh.
    cx.hs.offered_psks = psks
        .iter()
        .map(|p| crate::context::OfferedPskRecord {
            secret: zeroize::Zeroizing::new(p.secret.clone()),
            hash: p.hash,
        })
        .collect();

    if cx.config.any_ephemeral_mode_enabled() {
        let group = pick_ecdhe_group(cx)
            .ok_or(Error::HandshakeFailure("no mutually supported (EC)DHE group"))?;
        if let Some(old) = cx.hs.secrets.ecdh_private.take() {
            cx.crypto.destroy_key(old);
        }
        let key_share = cx.crypto.generate_key_share(group)?;
        extensions::write_key_share(&mut extensions, group, key_share.public_key())?;
        cx.hs.offered_group_id = Some(group);
        cx.hs.secrets.ecdh_private = Some(key_share);
    }

    if !psks.is_empty() && cx.config.early_data_enabled && cx.session.ticket_allows_early_data {
        extensions::write_early_data(&mut extensions)?;
        cx.hs.early_data_status = crate::context::EarlyDataStatus::Rejected;
    }

    if !psks.is_empty() {
        extensions::write_psk_key_exchange_modes(&mut extensions, &cx.config.tls13_kex_modes)?;
    }

    extensions::write_signature_algorithms(&mut extensions, OFFERED_SIGNATURE_SCHEMES)?;

    if !cx.config.alpn_protocols.is_empty() {
        extensions::write_alpn(&mut extensions, &cx.config.alpn_protocols)?;
    }

    cx.hs.assert_group_invariant()?;

    let random = cx.hs.client_random;
    let session_id = SessionId::new(cx.hs.legacy_session_id_sent.clone())?;

    let binders_offset_in_ext = if psks.is_empty() {
        None
    } else {
        Some(psk::write_identities_with_placeholder_binders(
            &mut extensions,
            &psks,
            unix_now_seconds(),
        )?)
    };

    let payload = ClientHelloPayload {
        client_version: crate::msgs::enums::ProtocolVersion(0x0303),
        random: Random(random),
        session_id,
        cipher_suites: SUPPORTED_CIPHER_SUITES.to_vec(),
        extensions,
    };
    let mut full_bytes = payload.encode();

    if let Some(offset) = binders_offset_in_ext {
        // `encode_for_binder_signing` shares `encode`'s prefix, so its
        // output is exactly the binder-region-excluding prefix of
        // `full_bytes`; its length is therefore that prefix's offset within
        // `full_bytes` too.
        let truncated = payload.encode_for_binder_signing(offset);
        let binders_offset = truncated.len();
        psk::fill_in_binders(&mut full_bytes, binders_offset, &truncated, &psks, cx.key_schedule)?;
    }

    cx.record
        .send_handshake_msg(HandshakeType::ClientHello, &full_bytes)?;
    cx.hs.transcript.add_message(1, &full_bytes);

    Ok(full_bytes)
}

fn unix_now_seconds() -> u64 {
    // Wall-clock access belongs to the caller in a strict no-std-friendly
    // core; callers running under `std` pass real time in via `ClientConfig`
    // or a future `Clock` hook. Until that knob exists this returns 0,
    // which only affects the (cosmetic) obfuscated-age value, never binder
    // correctness.
    0
}

pub fn start_handshake(cx: &mut ClientContext<'_>) -> Result<Box<dyn State>, Error> {
    emit_client_hello(cx)?;
    Ok(Box::new(ExpectServerHello))
}

/// Awaits either a `ServerHello` or (wire-identical, distinguished only by
/// `random`) a `HelloRetryRequest` (spec §4.4).
pub struct ExpectServerHello;

impl State for ExpectServerHello {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::ServerHello]
    }

    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        _typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        let mut r = crate::codec::Reader::init(msg);
        let sh = ServerHelloPayload::read(&mut r)?;
        r.expect_exhausted()?;

        match hrr::classify(&sh, cx.config.allow_tls12_fallback)? {
            ServerHelloKind::Tls12 => Ok(NextState::Signal(Signal::ServerHelloIsTls12 {
                server_hello: msg.to_vec(),
            })),
            ServerHelloKind::HelloRetryRequest => self.handle_hrr(cx, &sh),
            ServerHelloKind::ServerHello => self.handle_server_hello(cx, &sh),
        }
    }
}

impl ExpectServerHello {
    fn handle_hrr(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        sh: &ServerHelloPayload,
    ) -> NextStateOrError {
        if cx.hs.hrr_count > 0 {
            return Err(Error::UnexpectedMessage("second HelloRetryRequest"));
        }
        if !cx.config.any_ephemeral_mode_enabled() {
            return Err(Error::IllegalParameter(
                "HRR received but no ephemeral mode is enabled",
            ));
        }
        extensions::check_allowed(&sh.extensions, ALLOWED_HRR)?;

        if let Some(group) = extensions::get_hrr_selected_group(&sh.extensions)? {
            if !cx.config.group_list.contains(&group) || !cx.crypto.supports_group(group) {
                return Err(Error::IllegalParameter("HRR selected an unsupported group"));
            }
            if Some(group) == cx.hs.offered_group_id {
                return Err(Error::IllegalParameter(
                    "HRR selected the group we already offered",
                ));
            }
            if let Some(old) = cx.hs.secrets.ecdh_private.take() {
                cx.crypto.destroy_key(old);
            }
            cx.hs.offered_group_id = Some(group);
        }

        if let Some(cookie) = extensions::get_cookie(&sh.extensions)? {
            cx.hs.cookie = Some(cookie);
        }

        // The HRR's cipher_suite fixes the transcript hash used for the
        // message_hash synthetic record below, and must not change when the
        // real ServerHello arrives (RFC 8446 §4.1.4).
        let ciphersuite_info = cx
            .crypto
            .ciphersuite_from_id(sh.cipher_suite)
            .ok_or(Error::IllegalParameter("unknown or unoffered ciphersuite"))?;
        cx.hs.transcript.set_hash_algorithm(ciphersuite_info.hash);
        cx.hs.ciphersuite_info = Some(ciphersuite_info);

        cx.hs.hrr_count += 1;
        // RFC 8446 §4.4.1: fold the already-transcripted ClientHello1 into
        // a synthetic message_hash record, then hash the HRR normally.
        cx.hs
            .transcript
            .replace_client_hello1_with_message_hash(cx.key_schedule);
        cx.hs.transcript.add_message(2, &server_hello_wire_bytes(sh));

        cx.record.send_dummy_ccs();

        emit_client_hello(cx)?;
        Ok(NextState::Continue(Box::new(ExpectServerHello)))
    }

    fn handle_server_hello(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        sh: &ServerHelloPayload,
    ) -> NextStateOrError {
        if sh.legacy_version.0 != 0x0303 {
            return Err(Error::ProtocolVersion);
        }
        if sh.legacy_session_id_echo.as_slice() != cx.hs.legacy_session_id_sent.as_slice() {
            return Err(Error::IllegalParameter("legacy_session_id_echo mismatch"));
        }
        extensions::check_allowed(&sh.extensions, ALLOWED_SH)?;

        let ciphersuite_info = cx
            .crypto
            .ciphersuite_from_id(sh.cipher_suite)
            .ok_or(Error::IllegalParameter("unknown or unoffered ciphersuite"))?;
        if cx.hs.hrr_count > 0 {
            let hrr_suite = cx
                .hs
                .ciphersuite_info
                .ok_or(Error::Internal("HRR path left ciphersuite_info unset"))?
                .id;
            if hrr_suite != sh.cipher_suite {
                return Err(Error::IllegalParameter(
                    "ciphersuite changed between HelloRetryRequest and ServerHello",
                ));
            }
        }
        cx.hs.transcript.set_hash_algorithm(ciphersuite_info.hash);
        cx.hs.ciphersuite_info = Some(ciphersuite_info);

        let key_share = extensions::get_server_key_share(&sh.extensions)?;
        let mut shared_secret = None;
        if let Some(entry) = key_share {
            if Some(entry.group) != cx.hs.offered_group_id {
                return Err(Error::HandshakeFailure("key_share group mismatch"));
            }
            let ours = cx
                .hs
                .secrets
                .ecdh_private
                .take()
                .ok_or(Error::Internal("key_share present but no private key held"))?;
            shared_secret = Some(cx.crypto.complete_key_exchange(ours, &entry.key_exchange)?);
        }

        let selected_identity = extensions::get_selected_psk_identity(&sh.extensions)?;
        let psk_secret = match selected_identity {
            Some(idx) => {
                let candidate = cx
                    .hs
                    .offered_psks
                    .get(idx as usize)
                    .ok_or(Error::IllegalParameter("selected_identity out of range"))?;
                if candidate.hash != ciphersuite_info.hash {
                    return Err(Error::IllegalParameter(
                        "selected PSK's hash does not match the negotiated ciphersuite",
                    ));
                }
                Some(candidate.secret.to_vec())
            }
            None => None,
        };

        let mode = match (psk_secret.is_some(), shared_secret.is_some()) {
            (true, false) => KeyExchangeMode::Psk,
            (false, true) => KeyExchangeMode::Ephemeral,
            (true, true) => KeyExchangeMode::PskEphemeral,
            (false, false) => {
                return Err(Error::HandshakeFailure(
                    "neither pre_shared_key nor key_share was negotiated",
                ))
            }
        };
        let wire_mode = match mode {
            KeyExchangeMode::Psk => PskKeyExchangeMode::PskKe,
            KeyExchangeMode::PskEphemeral => PskKeyExchangeMode::PskDheKe,
            KeyExchangeMode::Ephemeral => PskKeyExchangeMode::PskDheKe,
        };
        if mode != KeyExchangeMode::Ephemeral && !cx.config.kex_mode_allowed(wire_mode) {
            return Err(Error::HandshakeFailure("negotiated mode not configured"));
        }
        cx.hs.key_exchange_mode = Some(mode);

        cx.hs.server_random = Some(sh.random);
        cx.hs
            .transcript
            .add_message(2, &server_hello_wire_bytes(sh));

        let hash = cx.hs.ciphersuite_info.unwrap().hash;
        cx.key_schedule.stage_early(psk_secret.as_deref(), hash)?;
        let transcript_hash = cx.hs.transcript.current_hash(cx.key_schedule);
        let shared_secret_bytes = shared_secret.as_ref().map(|s| s.0.as_slice());
        let (client_secret, server_secret) = cx
            .key_schedule
            .derive_handshake_secrets(shared_secret_bytes, &transcript_hash)?;

        // Server's handshake traffic secret protects what we read next
        // (EncryptedExtensions onward); spec §3's invariant that this is
        // installed before EncryptedExtensions is parsed.
        let inbound = cx.crypto.derive_transform(hash, &server_secret)?;
        cx.record.set_inbound_transform(inbound);
        let outbound = cx.crypto.derive_transform(hash, &client_secret)?;
        cx.record.set_outbound_transform(outbound);

        Ok(NextState::Continue(Box::new(ExpectEncryptedExtensions)))
    }
}

/// Reconstructs the exact wire bytes of a parsed `ServerHello`/HRR body,
/// needed to feed the transcript with what was actually received rather
/// than re-deriving it from already-consumed reader state.
fn server_hello_wire_bytes(sh: &ServerHelloPayload) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, sh.legacy_version.0);
    out.extend_from_slice(&sh.random);
    sh.legacy_session_id_echo.write(&mut out);
    put_u16(&mut out, sh.cipher_suite.0);
    out.push(0);
    let mut ext_bytes = Vec::new();
    for ext in &sh.extensions {
        put_u16(&mut ext_bytes, ext.typ.0);
        crate::codec::put_u16_prefixed(&mut ext_bytes, |b| b.extend_from_slice(&ext.body)).unwrap();
    }
    crate::codec::put_u16_prefixed(&mut out, |b| b.extend_from_slice(&ext_bytes)).unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ClientConfig, HandshakeContext, Session};
    use crate::msgs::enums::{CipherSuiteId, ProtocolVersion};
    use tls13_client_test::{FakeCryptoProvider, FakeKeySchedule, FakeRecordChannel};

    fn config(psk: Option<(Vec<u8>, Vec<u8>)>) -> ClientConfig {
        ClientConfig {
            alpn_protocols: Vec::new(),
            psk: psk.as_ref().map(|(secret, _)| secret.clone()),
            psk_identity: psk.map(|(_, identity)| identity),
            tls13_kex_modes: vec![PskKeyExchangeMode::PskDheKe],
            early_data_enabled: false,
            group_list: Vec::new(),
            allow_tls12_fallback: false,
            client_identity: None,
        }
    }

    fn resumable_session() -> Session {
        let mut session = Session::fresh(CipherSuiteId(0xFA00), ProtocolVersion::TLS1_3, Vec::new());
        session.ticket = Some(b"ticket".to_vec());
        session.resumption_key = Some(zeroize::Zeroizing::new(b"resumption-secret".to_vec()));
        session
    }

    fn context<'a>(
        config: &'a ClientConfig,
        hs: &'a mut HandshakeContext,
        session: &'a mut Session,
        record: &'a mut FakeRecordChannel,
        crypto: &'a FakeCryptoProvider,
        key_schedule: &'a mut FakeKeySchedule,
    ) -> ClientContext<'a> {
        ClientContext {
            config,
            hs,
            session,
            record,
            crypto,
            key_schedule,
        }
    }

    #[test]
    fn select_psks_offers_ticket_then_static_when_both_configured() {
        let config = config(Some((b"static-secret".to_vec(), b"static-id".to_vec())));
        let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
        let mut session = resumable_session();
        let mut record = FakeRecordChannel::new();
        let crypto = FakeCryptoProvider::new();
        let mut key_schedule = FakeKeySchedule::new();
        let cx = context(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule);

        let offered = select_psks(&cx);
        assert_eq!(offered.len(), 2);
        assert_eq!(offered[0].psk_type, PskType::Resumption);
        assert_eq!(offered[0].identity, b"ticket");
        assert_eq!(offered[1].psk_type, PskType::External);
        assert_eq!(offered[1].identity, b"static-id");
    }

    #[test]
    fn select_psks_offers_only_static_when_no_resumable_session() {
        let config = config(Some((b"static-secret".to_vec(), b"static-id".to_vec())));
        let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
        let mut session = Session::fresh(CipherSuiteId(0xFA00), ProtocolVersion::TLS1_3, Vec::new());
        let mut record = FakeRecordChannel::new();
        let crypto = FakeCryptoProvider::new();
        let mut key_schedule = FakeKeySchedule::new();
        let cx = context(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule);

        let offered = select_psks(&cx);
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].psk_type, PskType::External);
    }

    #[test]
    fn select_psks_offers_nothing_when_no_psk_mode_is_enabled() {
        let mut config = config(Some((b"static-secret".to_vec(), b"static-id".to_vec())));
        config.tls13_kex_modes.clear();
        let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
        let mut session = resumable_session();
        let mut record = FakeRecordChannel::new();
        let crypto = FakeCryptoProvider::new();
        let mut key_schedule = FakeKeySchedule::new();
        let cx = context(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule);

        assert!(select_psks(&cx).is_empty());
    }

    #[test]
    fn handle_server_hello_rejects_a_selected_identity_beyond_what_was_offered() {
        let config = config(None);
        let mut hs = HandshakeContext::new(ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_3, [0u8; 32], Vec::new());
        hs.offered_psks.push(crate::context::OfferedPskRecord {
            secret: zeroize::Zeroizing::new(b"only-one".to_vec()),
            hash: crate::provider::HashAlgorithm::Sha256,
        });
        let mut session = Session::fresh(CipherSuiteId(0xFA00), ProtocolVersion::TLS1_3, Vec::new());
        let mut record = FakeRecordChannel::new();
        let crypto = FakeCryptoProvider::new();
        let mut key_schedule = FakeKeySchedule::new();
        let mut cx = context(&config, &mut hs, &mut session, &mut record, &crypto, &mut key_schedule);

        let sh = ServerHelloPayload {
            legacy_version: ProtocolVersion::TLS1_2,
            random: [0x11u8; 32],
            legacy_session_id_echo: SessionId::empty(),
            cipher_suite: tls13_client_test::FAKE_SUITE,
            extensions: vec![
                extensions::RawExtension {
                    typ: crate::msgs::enums::ExtensionType::SUPPORTED_VERSIONS,
                    body: vec![0x03, 0x04],
                },
                extensions::RawExtension {
                    typ: crate::msgs::enums::ExtensionType::PRE_SHARED_KEY,
                    body: vec![0x00, 0x01], // selected_identity = 1, but only index 0 was offered
                },
            ],
        };

        let err = Box::new(ExpectServerHello)
            .handle_server_hello(&mut cx, &sh)
            .unwrap_err();
        assert_eq!(err, Error::IllegalParameter("selected_identity out of range"));
    }
}
