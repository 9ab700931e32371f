//! The data model of spec §3: the per-handshake [`HandshakeContext`], the
//! longer-lived [`Session`] a ticket can resume into, and the read-only
//! [`ClientConfig`] shared across handshakes.

use std::fmt;

use zeroize::Zeroizing;

use crate::msgs::enums::{CipherSuiteId, NamedGroup, PskKeyExchangeMode, ProtocolVersion};
use crate::provider::{CipherSuiteInfo, ClientSigningKey, KeyShare, Transform};
use crate::transcript::Transcript;

/// A client certificate chain plus the means to sign with its private key,
/// supplied only when the caller wants to support mutual authentication
/// (spec §4.7-§4.8's optional client `Certificate`/`CertificateVerify`).
/// `chain` uses `pki-types`' borrowed-or-owned DER wrapper, the same type a
/// caller building this from a real certificate-issuing pipeline
/// (`rustls-pki-types::CertificateDer`) already has on hand.
pub struct ClientIdentity {
    pub chain: Vec<pki_types::CertificateDer<'static>>,
    pub signer: Box<dyn ClientSigningKey>,
}

/// Which secrets fed the key schedule, decided once per handshake from the
/// extensions the server actually sent back (spec §4.5's inference table).
/// `Display` mirrors the diagnostic strings mbedTLS's
/// `ssl_tls13_get_kex_mode_str` prints, used only in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeMode {
    Psk,
    Ephemeral,
    PskEphemeral,
}

impl fmt::Display for KeyExchangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Psk => "psk",
            Self::Ephemeral => "ephemeral",
            Self::PskEphemeral => "psk_ephemeral",
        })
    }
}

/// Tentative, then finalized by `EncryptedExtensions` (spec §4.2, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyDataStatus {
    NotOffered,
    Rejected,
    Accepted,
}

/// Ephemeral material a handshake owns exclusively and must zero on every
/// exit path (spec §5). One aggregate rather than field-by-field lifetimes,
/// per spec §9's design note.
pub struct HandshakeSecrets {
    pub ecdh_private: Option<Box<dyn KeyShare>>,
    pub psk: Option<Zeroizing<Vec<u8>>>,
    pub resumption_master_secret: Option<Zeroizing<Vec<u8>>>,
}

impl HandshakeSecrets {
    pub fn empty() -> Self {
        Self {
            ecdh_private: None,
            psk: None,
            resumption_master_secret: None,
        }
    }
}

/// A PSK offered in the `ClientHello` we sent, remembered just long enough
/// to resolve `ServerHello.pre_shared_key`'s `selected_identity` once it
/// arrives (spec §4.3): the identity bytes themselves are back on the wire
/// and not needed again, but the secret, hash, and PSK type are.
pub struct OfferedPskRecord {
    pub secret: Zeroizing<Vec<u8>>,
    pub hash: crate::provider::HashAlgorithm,
}

/// Transient state for one handshake (spec §3's `HandshakeContext`).
pub struct HandshakeContext {
    pub min_version: ProtocolVersion,
    pub max_version: ProtocolVersion,

    pub offered_group_id: Option<NamedGroup>,
    /// The PSKs offered in the most recently sent `ClientHello`, in the
    /// same order as `pre_shared_key`'s identity list, so
    /// `selected_identity` can be resolved by position (spec §4.3's two
    /// independent PSK sources: resumption ticket, then static PSK).
    pub offered_psks: Vec<OfferedPskRecord>,
    pub secrets: HandshakeSecrets,
    pub cookie: Option<Vec<u8>>,
    pub certificate_request_context: Option<Vec<u8>>,
    pub hrr_count: u8,

    pub sent_extensions: u64,
    pub received_extensions: u64,

    pub key_exchange_mode: Option<KeyExchangeMode>,
    pub early_data_status: EarlyDataStatus,

    pub transcript: Transcript,
    pub client_random: [u8; 32],
    pub server_random: Option<[u8; 32]>,

    pub transform_handshake_inbound: Option<Box<dyn Transform>>,
    pub transform_handshake_outbound: Option<Box<dyn Transform>>,
    pub transform_application_inbound: Option<Box<dyn Transform>>,
    pub transform_application_outbound: Option<Box<dyn Transform>>,

    pub client_auth: bool,
    pub resume: bool,
    pub ciphersuite_info: Option<CipherSuiteInfo>,

    /// The legacy session id bytes sent in `ClientHello`, checked byte-equal
    /// against `ServerHello.legacy_session_id_echo` (spec §3's invariant,
    /// §4.5's check).
    pub legacy_session_id_sent: Vec<u8>,
}

impl HandshakeContext {
    /// Starts a fresh handshake. `client_random` and `legacy_session_id` are
    /// generated by the caller (randomness is out of scope, §1) — the
    /// latter is 0 bytes unless middlebox-compatibility padding is wanted,
    /// in which case the caller fills in up to 32 random bytes. The
    /// transcript starts keyed to SHA-256 and is re-keyed the moment a
    /// `HelloRetryRequest` or `ServerHello` reveals the real ciphersuite
    /// (see [`crate::transcript::Transcript::set_hash_algorithm`]).
    pub fn new(
        min_version: ProtocolVersion,
        max_version: ProtocolVersion,
        client_random: [u8; 32],
        legacy_session_id: Vec<u8>,
    ) -> Self {
        Self {
            min_version,
            max_version,
            offered_group_id: None,
            offered_psks: Vec::new(),
            secrets: HandshakeSecrets::empty(),
            cookie: None,
            certificate_request_context: None,
            hrr_count: 0,
            sent_extensions: 0,
            received_extensions: 0,
            key_exchange_mode: None,
            early_data_status: EarlyDataStatus::NotOffered,
            transcript: Transcript::new(crate::provider::HashAlgorithm::Sha256),
            client_random,
            server_random: None,
            transform_handshake_inbound: None,
            transform_handshake_outbound: None,
            transform_application_inbound: None,
            transform_application_outbound: None,
            client_auth: false,
            resume: false,
            ciphersuite_info: None,
            legacy_session_id_sent: legacy_session_id,
        }
    }

    /// `offered_group_id ≠ 0` whenever a key_share extension has been
    /// written — spec §3's first invariant, checked at the one call site
    /// that's allowed to violate it transiently (mid key-share write).
    pub fn assert_group_invariant(&self) -> Result<(), crate::error::Error> {
        if self.sent_extensions & ext_bit_key_share() != 0 && self.offered_group_id.is_none() {
            return Err(crate::error::Error::Internal(
                "key_share was sent but offered_group_id is unset",
            ));
        }
        Ok(())
    }
}

fn ext_bit_key_share() -> u64 {
    1 << crate::msgs::enums::ExtensionType::KEY_SHARE
        .mask_bit()
        .expect("KEY_SHARE always has a mask bit")
}

/// A prior or freshly negotiated session, persisted across handshakes for
/// resumption (spec §3's `Session`, §6's "Persisted state").
pub struct Session {
    pub id: Vec<u8>,
    pub ciphersuite: CipherSuiteId,
    pub tls_version: ProtocolVersion,

    pub ticket: Option<Vec<u8>>,
    pub ticket_lifetime: u32,
    pub ticket_age_add: u32,
    pub ticket_received: u64,
    pub ticket_allows_early_data: bool,

    pub resumption_key: Option<Zeroizing<Vec<u8>>>,
    pub resumption_master_secret: Option<Zeroizing<Vec<u8>>>,

    /// Cleared when the session is refreshed by a fresh `NewSessionTicket`;
    /// prevents the same ticket from being offered twice in ways that would
    /// let a passive observer correlate connections.
    pub exported: bool,
}

impl Session {
    pub fn fresh(ciphersuite: CipherSuiteId, tls_version: ProtocolVersion, id: Vec<u8>) -> Self {
        Self {
            id,
            ciphersuite,
            tls_version,
            ticket: None,
            ticket_lifetime: 0,
            ticket_age_add: 0,
            ticket_received: 0,
            ticket_allows_early_data: false,
            resumption_key: None,
            resumption_master_secret: None,
            exported: false,
        }
    }

    /// Whether this session is usable as a resumption PSK source: it must
    /// carry a ticket and not already have been exported elsewhere.
    pub fn can_resume(&self) -> bool {
        self.ticket.is_some() && self.resumption_key.is_some() && !self.exported
    }
}

/// Read-only handshake configuration, shared across connections (spec §3's
/// `Configuration`).
pub struct ClientConfig {
    pub alpn_protocols: Vec<Vec<u8>>,
    pub psk: Option<Vec<u8>>,
    pub psk_identity: Option<Vec<u8>>,
    pub tls13_kex_modes: Vec<PskKeyExchangeMode>,
    pub early_data_enabled: bool,
    pub group_list: Vec<NamedGroup>,
    pub allow_tls12_fallback: bool,
    pub client_identity: Option<ClientIdentity>,
}

impl ClientConfig {
    pub fn kex_mode_allowed(&self, mode: PskKeyExchangeMode) -> bool {
        self.tls13_kex_modes.contains(&mode)
    }

    pub fn any_psk_mode_enabled(&self) -> bool {
        !self.tls13_kex_modes.is_empty()
    }

    /// Whether a `key_share` should be written: either no PSK is in play at
    /// all, or the configured modes include `psk_dhe_ke` (spec §4.2).
    pub fn any_ephemeral_mode_enabled(&self) -> bool {
        !self.group_list.is_empty()
            && (self.psk.is_none() || self.tls13_kex_modes.contains(&PskKeyExchangeMode::PskDheKe))
    }
}
