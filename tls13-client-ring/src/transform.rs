//! The record-layer transform handed back from `derive_transform`: an AEAD
//! key plus the fixed IV and sequence-number counter RFC 8446 §5.3 combines
//! with it to build the per-record nonce. Sealing/opening itself is the
//! record layer's job (out of scope, spec §1); this only carries the
//! derived key material in a form it can recover via `as_any`.

use std::sync::atomic::{AtomicU64, Ordering};

use ring::aead::{self, LessSafeKey, UnboundKey};

use tls13_client::error::Error;
use tls13_client::provider::Transform;

/// `key` and `iv` are derived once at installation (RFC 8446 §7.3:
/// `key = HKDF-Expand-Label(Secret, "key", "", key_length)`,
/// `iv = HKDF-Expand-Label(Secret, "iv", "", iv_length)`). `seq` is the
/// per-direction record sequence number XORed into `iv` to build each
/// record's nonce; it only ever increments.
pub struct RingTransform {
    key: LessSafeKey,
    iv: [u8; aead::NONCE_LEN],
    seq: AtomicU64,
}

impl RingTransform {
    pub(crate) fn new(
        algorithm: &'static aead::Algorithm,
        key_bytes: &[u8],
        iv_bytes: &[u8],
    ) -> Result<Self, Error> {
        let unbound = UnboundKey::new(algorithm, key_bytes)
            .map_err(|_| Error::Internal("AEAD key material had the wrong length"))?;
        let mut iv = [0u8; aead::NONCE_LEN];
        if iv_bytes.len() != iv.len() {
            return Err(Error::Internal("AEAD IV had the wrong length"));
        }
        iv.copy_from_slice(iv_bytes);
        Ok(RingTransform {
            key: LessSafeKey::new(unbound),
            iv,
            seq: AtomicU64::new(0),
        })
    }

    pub fn key(&self) -> &LessSafeKey {
        &self.key
    }

    /// Builds the nonce for the next record and advances the sequence
    /// number. Panics-by-overflow is intentionally not handled: 2^64
    /// records exceeds any connection's lifetime (RFC 8446 §5.3 leaves a
    /// rekey mandatory well before this wraps).
    pub fn next_nonce(&self) -> aead::Nonce {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let mut nonce = self.iv;
        for (b, s) in nonce[4..].iter_mut().zip(seq.to_be_bytes()) {
            *b ^= s;
        }
        aead::Nonce::assume_unique_for_key(nonce)
    }
}

impl Transform for RingTransform {
    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}
