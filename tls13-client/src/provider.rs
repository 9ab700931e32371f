//! Narrow interfaces to the external collaborators named in spec §6:
//! the record layer, the key schedule, and the crypto/registry primitives.
//! This crate never implements AEAD sealing, HKDF, ECDHE, or certificate
//! validation itself — it drives these traits at the transitions the state
//! machine defines and otherwise treats them as opaque.
//!
//! `tls13-client-ring` implements all three against `ring`. `tls13-client-test`
//! implements deterministic fakes for driving the state machine in tests
//! without needing real cryptography for every assertion.

use crate::error::Error;
use crate::msgs::enums::{CipherSuiteId, NamedGroup, SignatureScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
}

impl HashAlgorithm {
    pub fn len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }
}

/// Everything the driver needs to know about a negotiated ciphersuite,
/// looked up externally (ciphersuite registry is out of scope per §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuiteInfo {
    pub id: CipherSuiteId,
    pub hash: HashAlgorithm,
}

/// An opaque handle to an ephemeral (EC)DHE private key. Exclusively owned;
/// `CryptoProvider::destroy_key` must be called along every exit path,
/// including HRR reset (spec §3, §5) — the provider is responsible for
/// zeroizing on drop as well, as a backstop.
pub trait KeyShare: Send {
    fn group(&self) -> NamedGroup;
    fn public_key(&self) -> &[u8];

    /// Recovers the concrete type so a provider can consume its own private
    /// key handle back out of the trait object passed into
    /// `CryptoProvider::complete_key_exchange`/`destroy_key`.
    fn into_any(self: Box<Self>) -> Box<dyn core::any::Any>;
}

/// A derived shared secret from completing a key exchange. Treated as
/// opaque by the core; handed straight to [`KeySchedule`].
pub struct SharedSecret(pub Vec<u8>);

impl Drop for SharedSecret {
    fn drop(&mut self) {
        // Best-effort; the provider's own handle types carry the real
        // zeroize-on-drop guarantee (spec §5's "secret buffers are zeroed
        // before free").
        for b in self.0.iter_mut() {
            *b = 0;
        }
    }
}

/// Registry lookups and raw key-exchange primitives (spec §6's "Crypto
/// abstractions"). Ciphersuite/group *selection* is the driver's job;
/// whether a given id is supported and how to exercise it is the
/// provider's.
pub trait CryptoProvider {
    fn ciphersuite_from_id(&self, id: CipherSuiteId) -> Option<CipherSuiteInfo>;
    fn supports_group(&self, group: NamedGroup) -> bool;

    /// Ordered list of (EC)DHE groups this provider can generate a share
    /// for, used to pick `offered_group_id` from `group_list` (spec §4.2).
    fn ecdhe_groups(&self) -> &[NamedGroup];

    fn generate_key_share(&self, group: NamedGroup) -> Result<Box<dyn KeyShare>, Error>;

    /// Consumes `ours`, deriving the shared secret against `their_public`.
    /// Corresponds to `read_public_ecdhe_share` in spec §6.
    fn complete_key_exchange(
        &self,
        ours: Box<dyn KeyShare>,
        their_public: &[u8],
    ) -> Result<SharedSecret, Error>;

    /// Releases a key share early, e.g. on HRR reset, without completing
    /// the exchange. Spec §9's open question: a provider that only
    /// implements ECDHE must still accept being asked to reset a DHE-only
    /// share and should report `Error::Internal` in that case, same as the
    /// mbedTLS source this was distilled from.
    fn destroy_key(&self, key: Box<dyn KeyShare>) {
        drop(key);
    }

    /// Builds a record-layer [`Transform`] (AEAD keys plus the fixed IV/
    /// sequence-number state it needs) from a traffic secret the key
    /// schedule derived. AEAD itself is external (§1); this is the one
    /// seam where a raw secret becomes something the record layer can use.
    fn derive_transform(
        &self,
        hash: HashAlgorithm,
        traffic_secret: &[u8],
    ) -> Result<Box<dyn Transform>, Error>;

    /// Verifies a server `CertificateVerify` signature over the RFC 8446
    /// §4.4.3 signed content (the 64-space pad, context string, and
    /// transcript hash are the driver's job to assemble; this just checks
    /// `signature` against the leaf certificate's public key). Certificate
    /// *chain* trust is out of scope (§1) — this only authenticates that
    /// the leaf holds the private key for the handshake just run.
    fn verify_transcript_signature(
        &self,
        scheme: SignatureScheme,
        leaf_certificate_der: &[u8],
        content: &[u8],
        signature: &[u8],
    ) -> Result<(), Error>;
}

/// A client certificate's signing half, supplied through [`crate::context::ClientConfig`]
/// when the caller wants to support mutual authentication. Mirrors the
/// split between a certificate (public) and its signer (the private key
/// operation) that the teacher's `sign` module uses.
pub trait ClientSigningKey: Send + Sync {
    fn scheme(&self) -> SignatureScheme;
    fn sign(&self, content: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Which PSK a binder authenticates, needed because external and
/// resumption PSKs use different binder-key derivation contexts (spec
/// §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PskType {
    External,
    Resumption,
}

/// Key-schedule hooks (spec §6). Each method corresponds 1:1 to a state
/// transition the driver performs; the key schedule itself — and the
/// HKDF/HMAC primitives behind it — are out of scope (§1).
pub trait KeySchedule {
    /// Digests `messages` (the transcript-so-far) under `hash`. The only
    /// place this crate needs a bare hash rather than an HKDF/HMAC
    /// derivative: RFC 8446 §4.4.1's `message_hash` synthetic record after
    /// an HRR, and every `Finished`/`CertificateVerify` transcript input.
    fn transcript_hash(&self, hash: HashAlgorithm, messages: &[u8]) -> Vec<u8>;

    /// Enters the early-secret stage, keyed from a PSK if one was
    /// selected, or from an all-zeroes PSK otherwise.
    fn stage_early(&mut self, psk: Option<&[u8]>, hash: HashAlgorithm) -> Result<(), Error>;

    /// Computes the binder MAC over `transcript` for the given PSK,
    /// writing exactly `hash.len()` bytes into `out`.
    fn create_psk_binder(
        &self,
        hash: HashAlgorithm,
        psk: &[u8],
        psk_type: PskType,
        transcript: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error>;

    /// `HKDF-Expand-Label`, exposed directly because resumption-PSK
    /// derivation in `NewSessionTicket` handling (spec §4.9) needs it
    /// outside of any of the other named transitions.
    fn hkdf_expand_label(
        &self,
        hash: HashAlgorithm,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error>;

    /// Folds in the (EC)DHE shared secret (or nothing, for PSK-only mode)
    /// and the transcript hash at ServerHello, producing handshake
    /// traffic secrets. Returns (client_secret, server_secret).
    fn derive_handshake_secrets(
        &mut self,
        shared_secret: Option<&[u8]>,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error>;

    /// Folds in the handshake-transcript hash at the end of the Certificate
    /// flight, producing application traffic secrets.
    fn derive_application_secrets(
        &mut self,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error>;

    /// Signs/verifies `Finished.verify_data` over `transcript_hash` for
    /// our own side or the peer's, depending on `server_side`.
    fn finished_verify_data(&self, transcript_hash: &[u8], server_side: bool) -> Vec<u8>;

    /// Derives the resumption master secret once the client Finished has
    /// been transcripted (spec §4.8).
    fn resumption_master_secret(&mut self, transcript_hash: &[u8]) -> Result<Vec<u8>, Error>;
}

/// An opaque handle to an installed record-layer transform (read or write
/// direction). The record layer is responsible for sealing/opening with
/// whatever keys this wraps; the core only ever installs and swaps these.
/// `as_any` is the one concession to opacity: a record layer built against
/// a specific provider (e.g. `tls13-client-ring`) downcasts to the concrete
/// type to recover the AEAD key material, since this trait itself exposes
/// none.
pub trait Transform: Send {
    fn as_any(&self) -> &dyn core::any::Any;
}

/// Handshake-message framing and transform installation (spec §6's
/// "Handshake-message framing" and "Transform management"). This is the
/// boundary with the record layer, which owns fragmentation, sequence
/// numbers, and AEAD sealing/opening — none of which are this crate's
/// concern (§1).
pub trait RecordChannel {
    /// Returns the next handshake message's type and body, or `Ok(None)` if
    /// the record layer doesn't have a whole message buffered yet (spec
    /// §5's suspension points never occur mid-transition, so the driver
    /// just retries later rather than blocking here). The driver — not
    /// this trait — is responsible for checking the returned type against
    /// what the current state expects; HRR and ServerHello share a wire
    /// type and are told apart only by `random` (spec §4.4).
    fn fetch_handshake_msg(
        &mut self,
    ) -> Result<Option<(crate::msgs::enums::HandshakeType, Vec<u8>)>, Error>;

    /// Serializes and sends a handshake message body, running it through
    /// the transcript as a side effect is the *caller's* job (so the
    /// transcript can see the exact bytes once, not twice).
    fn send_handshake_msg(
        &mut self,
        typ: crate::msgs::enums::HandshakeType,
        body: &[u8],
    ) -> Result<(), Error>;

    fn send_alert(&mut self, alert: crate::msgs::enums::AlertDescription);

    /// Sends a dummy `ChangeCipherSpec` record for middlebox compatibility
    /// (spec §4.5's HRR post-processing, §4.10's `[CCS?]` transitions).
    fn send_dummy_ccs(&mut self);

    fn set_inbound_transform(&mut self, transform: Box<dyn Transform>);
    fn set_outbound_transform(&mut self, transform: Box<dyn Transform>);
}
