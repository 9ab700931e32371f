//! The running handshake transcript hash (spec §3's `HandshakeTranscript`,
//! §4.6/§4.7/§4.8's "transcript-so-far" inputs to `Finished` and
//! `CertificateVerify`).
//!
//! RFC 8446 §4.4.1 hashes every handshake message as it's sent or received,
//! in order, with one exception: on a HelloRetryRequest the first
//! `ClientHello` is replaced in the running hash by a synthetic
//! `message_hash` record (`{handshake_type: message_hash, length: Hash.len,
//! body: Hash(ClientHello1)}`) rather than being hashed directly. That's
//! the only state this module carries beyond "keep appending and hand the
//! digest to the key schedule."

use crate::provider::{HashAlgorithm, KeySchedule};

/// The synthetic handshake-message header RFC 8446 §4.4.1 calls
/// `message_hash`, used to fold `ClientHello1` into the transcript by its
/// digest rather than its bytes after an HRR.
const MESSAGE_HASH_TYPE: u8 = 254;

pub struct Transcript {
    hash: HashAlgorithm,
    buffer: Vec<u8>,
}

impl Transcript {
    pub fn new(hash: HashAlgorithm) -> Self {
        Self {
            hash,
            buffer: Vec::new(),
        }
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    /// Fixes the transcript's hash algorithm once the negotiated ciphersuite
    /// is known. Called as soon as a `HelloRetryRequest` or `ServerHello`
    /// reveals it (RFC 8446 §4.4.1: the `message_hash` synthetic record's
    /// digest width, and every transcript hash after it, is determined by
    /// the selected ciphersuite — never the placeholder this transcript was
    /// constructed with before anything was negotiated).
    pub fn set_hash_algorithm(&mut self, hash: HashAlgorithm) {
        self.hash = hash;
    }

    /// Appends a full handshake message (4-byte header plus body) to the
    /// running transcript. Callers pass the exact bytes sent or received,
    /// including the header, so the transcript matches the wire image.
    pub fn add_message(&mut self, typ: u8, body: &[u8]) {
        self.buffer.push(typ);
        let len = (body.len() as u32).to_be_bytes();
        self.buffer.extend_from_slice(&len[1..4]);
        self.buffer.extend_from_slice(body);
    }

    /// Replaces a single buffered `ClientHello1` with its `message_hash`
    /// synthetic record after an HRR is accepted (RFC 8446 §4.4.1). Must be
    /// called with the transcript containing *only* `ClientHello1` so far.
    pub fn replace_client_hello1_with_message_hash(&mut self, ks: &dyn KeySchedule) {
        let digest = ks.transcript_hash(self.hash, &self.buffer);
        self.buffer.clear();
        self.buffer.push(MESSAGE_HASH_TYPE);
        let len = (digest.len() as u32).to_be_bytes();
        self.buffer.extend_from_slice(&len[1..4]);
        self.buffer.extend_from_slice(&digest);
    }

    pub fn current_hash(&self, ks: &dyn KeySchedule) -> Vec<u8> {
        ks.transcript_hash(self.hash, &self.buffer)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}
