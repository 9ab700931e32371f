//! States from `EncryptedExtensions` through `HANDSHAKE_OVER` and the
//! post-handshake `NewSessionTicket` loop (spec §4.6-§4.10). Grounded in
//! the teacher's `client/tls13.rs`: `ExpectEncryptedExtensions`,
//! `ExpectCertificateOrCertReq`, `ExpectCertificate`,
//! `ExpectCertificateVerify`, `ExpectFinished`, `ExpectTraffic`.

use crate::client::{ClientContext, NextState, NextStateOrError, Signal, State};
use crate::codec::Reader;
use crate::error::Error;
use crate::msgs::enums::HandshakeType;
use crate::msgs::extensions::{self, ALLOWED_CR, ALLOWED_EE, ALLOWED_NST};
use crate::msgs::handshake::{
    CertificatePayload, CertificateRequestPayload, CertificateVerifyPayload,
    EncryptedExtensionsPayload, FinishedPayload, NewSessionTicketPayload,
};

/// RFC 8446 §4.4.3's fixed 64-byte pad prepended to every `CertificateVerify`
/// signature's content, before the direction-specific context string and
/// the transcript hash.
const SIGNATURE_CONTEXT_PAD: [u8; 64] = [0x20; 64];
const SERVER_CERT_VERIFY_CONTEXT: &[u8] = b"TLS 1.3, server CertificateVerify";
const CLIENT_CERT_VERIFY_CONTEXT: &[u8] = b"TLS 1.3, client CertificateVerify";

fn signed_content(context: &[u8], transcript_hash: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + context.len() + 1 + transcript_hash.len());
    out.extend_from_slice(&SIGNATURE_CONTEXT_PAD);
    out.extend_from_slice(context);
    out.push(0);
    out.extend_from_slice(transcript_hash);
    out
}

pub struct ExpectEncryptedExtensions;

impl State for ExpectEncryptedExtensions {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::EncryptedExtensions]
    }

    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        _typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        let mut r = Reader::init(msg);
        let ee = EncryptedExtensionsPayload::read(&mut r)?;
        extensions::check_allowed(&ee.extensions, ALLOWED_EE)?;

        if let Some(proto) = extensions::get_ee_alpn_protocol(&ee.extensions)? {
            if !cx.config.alpn_protocols.iter().any(|p| p == &proto) {
                return Err(Error::BadInput("server selected an ALPN protocol we didn't offer"));
            }
        }

        if extensions::get_ee_early_data(&ee.extensions)? {
            if cx.hs.early_data_status != crate::context::EarlyDataStatus::Rejected {
                return Err(Error::BadInput("early_data accepted but was never offered"));
            }
            cx.hs.early_data_status = crate::context::EarlyDataStatus::Accepted;
        }

        cx.hs.transcript.add_message(8, msg);

        let psk_only = matches!(
            cx.hs.key_exchange_mode,
            Some(crate::context::KeyExchangeMode::Psk)
        );
        if psk_only {
            Ok(NextState::Continue(Box::new(ExpectFinished)))
        } else {
            Ok(NextState::Continue(Box::new(ExpectCertificateOrCertReq)))
        }
    }
}

/// The coordinator peeks the next message: a `CertificateRequest` if the
/// server wants client auth, or straight to `Certificate` otherwise (spec
/// §4.7). Both share this one state since the record channel hands back
/// whichever type actually arrived; `step()` in `crate::client` already
/// validated `typ` against `expected_types()`, so the match below is
/// exhaustive over what can actually reach here.
pub struct ExpectCertificateOrCertReq;

impl State for ExpectCertificateOrCertReq {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::CertificateRequest, HandshakeType::Certificate]
    }

    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        match typ {
            Some(HandshakeType::CertificateRequest) => {
                let mut r = Reader::init(msg);
                let cr = CertificateRequestPayload::read(&mut r)?;
                extensions::check_allowed(&cr.extensions, ALLOWED_CR)?;
                if extensions::get_signature_algorithms(&cr.extensions)?.is_none() {
                    return Err(Error::DecodeError(
                        "CertificateRequest missing mandatory signature_algorithms",
                    ));
                }
                cx.hs.certificate_request_context = Some(cr.context);
                cx.hs.client_auth = true;
                cx.hs.transcript.add_message(13, msg);
                Ok(NextState::Continue(Box::new(ExpectCertificate)))
            }
            Some(HandshakeType::Certificate) => {
                Box::new(ExpectCertificate).handle(cx, typ, msg)
            }
            _ => Err(Error::Internal(
                "ExpectCertificateOrCertReq driven with an unexpected type",
            )),
        }
    }
}

pub struct ExpectCertificate;

impl State for ExpectCertificate {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::Certificate]
    }

    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        _typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        let mut r = Reader::init(msg);
        let cert = CertificatePayload::read(&mut r)?;
        if cert.entries.is_empty() {
            return Err(Error::DecodeError("server Certificate carried no entries"));
        }
        cx.hs.transcript.add_message(11, msg);
        Ok(NextState::Continue(Box::new(ExpectCertificateVerify {
            leaf_der: cert.entries[0].der.clone(),
        })))
    }
}

pub struct ExpectCertificateVerify {
    leaf_der: Vec<u8>,
}

impl State for ExpectCertificateVerify {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::CertificateVerify]
    }

    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        _typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        let mut r = Reader::init(msg);
        let cv = CertificateVerifyPayload::read(&mut r)?;

        let transcript_hash = cx.hs.transcript.current_hash(cx.key_schedule);
        let content = signed_content(SERVER_CERT_VERIFY_CONTEXT, &transcript_hash);
        cx.crypto
            .verify_transcript_signature(cv.scheme, &self.leaf_der, &content, &cv.signature)?;

        cx.hs.transcript.add_message(15, msg);
        Ok(NextState::Continue(Box::new(ExpectFinished)))
    }
}

pub struct ExpectFinished;

impl State for ExpectFinished {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::Finished]
    }

    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        _typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        let mut r = Reader::init(msg);
        let finished = FinishedPayload::read(&mut r)?;

        let transcript_hash = cx.hs.transcript.current_hash(cx.key_schedule);
        let expected = cx
            .key_schedule
            .finished_verify_data(&transcript_hash, true);
        if expected != finished.0 {
            return Err(Error::DecodeError("server Finished verify_data mismatch"));
        }
        cx.hs.transcript.add_message(20, msg);

        let hash = cx.hs.ciphersuite_info.unwrap().hash;
        let app_transcript_hash = cx.hs.transcript.current_hash(cx.key_schedule);
        let (client_app_secret, server_app_secret) = cx
            .key_schedule
            .derive_application_secrets(&app_transcript_hash)?;
        let inbound = cx.crypto.derive_transform(hash, &server_app_secret)?;
        cx.record.set_inbound_transform(inbound);

        if cx.hs.early_data_status == crate::context::EarlyDataStatus::Accepted {
            let body: &[u8] = &[];
            cx.record
                .send_handshake_msg(HandshakeType::EndOfEarlyData, body)?;
            cx.hs.transcript.add_message(5, body);
        } else {
            cx.record.send_dummy_ccs();
        }

        if cx.hs.client_auth {
            let context = cx.hs.certificate_request_context.clone().unwrap_or_default();
            let chain: Vec<Vec<u8>> = cx
                .config
                .client_identity
                .as_ref()
                .map(|id| id.chain.iter().map(|der| der.as_ref().to_vec()).collect())
                .unwrap_or_default();
            let cert_body = CertificatePayload::write_client(&context, &chain);
            cx.record
                .send_handshake_msg(HandshakeType::Certificate, &cert_body)?;
            cx.hs.transcript.add_message(11, &cert_body);

            if let Some(identity) = &cx.config.client_identity {
                let transcript_hash = cx.hs.transcript.current_hash(cx.key_schedule);
                let content = signed_content(CLIENT_CERT_VERIFY_CONTEXT, &transcript_hash);
                let signature = identity.signer.sign(&content)?;
                let verify = CertificateVerifyPayload {
                    scheme: identity.signer.scheme(),
                    signature,
                }
                .write();
                cx.record
                    .send_handshake_msg(HandshakeType::CertificateVerify, &verify)?;
                cx.hs.transcript.add_message(15, &verify);
            }
        }

        let finished_transcript_hash = cx.hs.transcript.current_hash(cx.key_schedule);
        let our_verify_data = cx
            .key_schedule
            .finished_verify_data(&finished_transcript_hash, false);
        let finished_body = FinishedPayload(our_verify_data).write();
        cx.record
            .send_handshake_msg(HandshakeType::Finished, &finished_body)?;
        cx.hs.transcript.add_message(20, &finished_body);

        let resumption_transcript_hash = cx.hs.transcript.current_hash(cx.key_schedule);
        let resumption_master_secret = cx
            .key_schedule
            .resumption_master_secret(&resumption_transcript_hash)?;
        cx.hs.secrets.resumption_master_secret =
            Some(zeroize::Zeroizing::new(resumption_master_secret));

        let outbound = cx.crypto.derive_transform(hash, &client_app_secret)?;
        cx.record.set_outbound_transform(outbound);

        Ok(NextState::Signal(Signal::HandshakeComplete))
    }
}

/// Terminal, steady-state traffic. The only handshake-layer message still
/// legal here is a post-handshake `NewSessionTicket` (spec §4.9); key
/// updates are a record-layer concern this crate doesn't drive.
pub struct ExpectTraffic;

impl State for ExpectTraffic {
    fn expected_types(&self) -> &'static [HandshakeType] {
        &[HandshakeType::NewSessionTicket]
    }

    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        _typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError {
        let mut r = Reader::init(msg);
        let nst = NewSessionTicketPayload::read(&mut r)?;
        extensions::check_allowed(&nst.extensions, ALLOWED_NST)?;

        let hash = cx.hs.ciphersuite_info.unwrap().hash;
        let resumption_master_secret = cx
            .hs
            .secrets
            .resumption_master_secret
            .as_ref()
            .ok_or(Error::Internal("NewSessionTicket before resumption_master_secret was derived"))?;

        let mut resumption_psk = vec![0u8; hash.len()];
        cx.key_schedule.hkdf_expand_label(
            hash,
            resumption_master_secret,
            b"resumption",
            &nst.nonce,
            &mut resumption_psk,
        )?;

        let allows_early_data = extensions::get_nst_max_early_data_size(&nst.extensions)?.is_some();

        cx.session.ticket = Some(nst.ticket);
        cx.session.ticket_lifetime = nst.lifetime;
        cx.session.ticket_age_add = nst.age_add;
        cx.session.ticket_allows_early_data = allows_early_data;
        cx.session.resumption_key = Some(zeroize::Zeroizing::new(resumption_psk));
        cx.session.exported = false;

        Ok(NextState::Signal(Signal::ReceivedNewSessionTicket))
    }
}
