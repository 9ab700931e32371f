//! [`RingCryptoProvider`]: the `ring`-backed implementation of
//! `tls13_client::provider::CryptoProvider`.

use std::cell::Cell;

use tls13_client::error::Error;
use tls13_client::msgs::enums::{CipherSuiteId, NamedGroup, SignatureScheme};
use tls13_client::provider::{CipherSuiteInfo, CryptoProvider, HashAlgorithm, KeyShare, SharedSecret, Transform};

use crate::kx;
use crate::sign;
use crate::suites;
use crate::transform::RingTransform;

/// One instance is meant to live for exactly one connection. `selected`
/// remembers the ciphersuite id the driver looked up via
/// `ciphersuite_from_id` during ServerHello/HelloRetryRequest processing,
/// since `derive_transform` is only ever given a bare hash — AES-128-GCM
/// and ChaCha20-Poly1305 share SHA-256, so the AEAD algorithm itself isn't
/// recoverable from `hash` alone. `Cell` rather than a constructor
/// argument because the id isn't known until negotiation completes, well
/// after the provider is handed to the driver.
pub struct RingCryptoProvider {
    selected: Cell<Option<CipherSuiteId>>,
}

impl RingCryptoProvider {
    pub fn new() -> Self {
        RingCryptoProvider {
            selected: Cell::new(None),
        }
    }
}

impl Default for RingCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for RingCryptoProvider {
    fn ciphersuite_from_id(&self, id: CipherSuiteId) -> Option<CipherSuiteInfo> {
        let info = suites::lookup(id)?;
        self.selected.set(Some(id));
        Some(info)
    }

    fn supports_group(&self, group: NamedGroup) -> bool {
        suites::agreement_algorithm(group).is_some()
    }

    fn ecdhe_groups(&self) -> &[NamedGroup] {
        suites::ECDHE_GROUPS
    }

    fn generate_key_share(&self, group: NamedGroup) -> Result<Box<dyn KeyShare>, Error> {
        Ok(Box::new(kx::generate(group)?))
    }

    fn complete_key_exchange(
        &self,
        ours: Box<dyn KeyShare>,
        their_public: &[u8],
    ) -> Result<SharedSecret, Error> {
        kx::complete(ours, their_public)
    }

    fn destroy_key(&self, key: Box<dyn KeyShare>) {
        drop(key);
    }

    fn derive_transform(
        &self,
        hash: HashAlgorithm,
        traffic_secret: &[u8],
    ) -> Result<Box<dyn Transform>, Error> {
        let id = self
            .selected
            .get()
            .ok_or(Error::Internal("derive_transform called before a ciphersuite was selected"))?;
        let info = suites::lookup(id).ok_or(Error::Internal("selected ciphersuite is no longer known"))?;
        if info.hash != hash {
            return Err(Error::Internal("derive_transform hash didn't match the selected ciphersuite"));
        }
        let algorithm = suites::aead_algorithm(id).ok_or(Error::Internal("selected ciphersuite has no AEAD mapping"))?;
        let mut key_bytes = vec![0u8; algorithm.key_len()];
        let mut iv_bytes = vec![0u8; ring::aead::NONCE_LEN];
        crate::key_schedule::expand_label_standalone(hash, traffic_secret, b"key", &[], &mut key_bytes)?;
        crate::key_schedule::expand_label_standalone(hash, traffic_secret, b"iv", &[], &mut iv_bytes)?;
        Ok(Box::new(RingTransform::new(algorithm, &key_bytes, &iv_bytes)?))
    }

    fn verify_transcript_signature(
        &self,
        scheme: SignatureScheme,
        leaf_certificate_der: &[u8],
        content: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        sign::verify(scheme, leaf_certificate_der, content, signature)
    }
}
