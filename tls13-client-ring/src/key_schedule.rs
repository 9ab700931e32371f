//! RFC 8446 §7.1 key schedule, built on `ring::hkdf`/`ring::hmac`/`ring::digest`.
//! `ring` has no built-in notion of `HKDF-Expand-Label`; everything here is
//! the manual wire construction of the `HkdfLabel` struct, fed as the
//! `info` block to an otherwise ordinary HKDF-Expand.

use ring::{digest, hkdf, hmac};

use tls13_client::error::Error;
use tls13_client::provider::{HashAlgorithm, KeySchedule, PskType};

fn hkdf_alg(hash: HashAlgorithm) -> hkdf::Algorithm {
    match hash {
        HashAlgorithm::Sha256 => hkdf::HKDF_SHA256,
        HashAlgorithm::Sha384 => hkdf::HKDF_SHA384,
    }
}

fn digest_alg(hash: HashAlgorithm) -> &'static digest::Algorithm {
    match hash {
        HashAlgorithm::Sha256 => &digest::SHA256,
        HashAlgorithm::Sha384 => &digest::SHA384,
    }
}

fn hmac_alg(hash: HashAlgorithm) -> hmac::Algorithm {
    match hash {
        HashAlgorithm::Sha256 => hmac::HMAC_SHA256,
        HashAlgorithm::Sha384 => hmac::HMAC_SHA384,
    }
}

fn empty_hash(hash: HashAlgorithm) -> Vec<u8> {
    digest::digest(digest_alg(hash), &[]).as_ref().to_vec()
}

/// Length-prefixed "tls13 "+label+context wire struct HKDF-Expand-Label
/// expands against, used as the `info` block of an otherwise ordinary
/// HKDF-Expand.
fn hkdf_label(out_len: usize, label: &[u8], context: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + 1 + 6 + label.len() + 1 + context.len());
    buf.extend_from_slice(&(out_len as u16).to_be_bytes());
    buf.push((6 + label.len()) as u8);
    buf.extend_from_slice(b"tls13 ");
    buf.extend_from_slice(label);
    buf.push(context.len() as u8);
    buf.extend_from_slice(context);
    buf
}

struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}

fn expand_label(prk: &hkdf::Prk, label: &[u8], context: &[u8], out: &mut [u8]) -> Result<(), Error> {
    let info = hkdf_label(out.len(), label, context);
    prk.expand(&[&info], OkmLen(out.len()))
        .map_err(|_| Error::Internal("HKDF-Expand-Label failed"))?
        .fill(out)
        .map_err(|_| Error::Internal("HKDF-Expand-Label failed"))
}

fn derive_secret(prk: &hkdf::Prk, hash: HashAlgorithm, label: &[u8], messages_hash: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; hash.len()];
    expand_label(prk, label, messages_hash, &mut out)?;
    Ok(out)
}

/// `HKDF-Expand-Label` with no running key-schedule state attached, used by
/// [`crate::provider::RingCryptoProvider::derive_transform`] to turn a
/// traffic secret into record keys (RFC 8446 §7.3) without needing a whole
/// [`RingKeySchedule`] for it.
pub(crate) fn expand_label_standalone(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    out: &mut [u8],
) -> Result<(), Error> {
    let prk = hkdf::Prk::new_less_safe(hkdf_alg(hash), secret);
    expand_label(&prk, label, context, out)
}

/// RFC 8446 §7.1's running secret, advanced Early -> Handshake -> Master as
/// the handshake progresses. PSK binders (spec §4.3) are computed from an
/// independent, throwaway Early Secret and never touch this state.
pub struct RingKeySchedule {
    hash: HashAlgorithm,
    early_secret: Option<hkdf::Prk>,
    handshake_secret: Option<hkdf::Prk>,
    master_secret: Option<hkdf::Prk>,
    client_hs_traffic_secret: Option<Vec<u8>>,
    server_hs_traffic_secret: Option<Vec<u8>>,
}

impl RingKeySchedule {
    pub fn new() -> Self {
        RingKeySchedule {
            hash: HashAlgorithm::Sha256,
            early_secret: None,
            handshake_secret: None,
            master_secret: None,
            client_hs_traffic_secret: None,
            server_hs_traffic_secret: None,
        }
    }
}

impl Default for RingKeySchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySchedule for RingKeySchedule {
    fn transcript_hash(&self, hash: HashAlgorithm, messages: &[u8]) -> Vec<u8> {
        digest::digest(digest_alg(hash), messages).as_ref().to_vec()
    }

    fn stage_early(&mut self, psk: Option<&[u8]>, hash: HashAlgorithm) -> Result<(), Error> {
        self.hash = hash;
        let alg = hkdf_alg(hash);
        let ikm = match psk {
            Some(p) => p.to_vec(),
            None => vec![0u8; hash.len()],
        };
        let salt = hkdf::Salt::new(alg, &[]);
        self.early_secret = Some(salt.extract(&ikm));
        Ok(())
    }

    fn create_psk_binder(
        &self,
        hash: HashAlgorithm,
        psk: &[u8],
        psk_type: PskType,
        transcript: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error> {
        let alg = hkdf_alg(hash);
        let salt = hkdf::Salt::new(alg, &[]);
        let early_secret = salt.extract(psk);
        let label: &[u8] = match psk_type {
            PskType::External => b"ext binder",
            PskType::Resumption => b"res binder",
        };
        let binder_key = derive_secret(&early_secret, hash, label, &empty_hash(hash))?;
        let binder_key_prk = hkdf::Prk::new_less_safe(alg, &binder_key);
        let mut finished_key = vec![0u8; hash.len()];
        expand_label(&binder_key_prk, b"finished", &[], &mut finished_key)?;
        let tag = hmac::sign(&hmac::Key::new(hmac_alg(hash), &finished_key), transcript);
        let tag = tag.as_ref();
        if tag.len() != out.len() {
            return Err(Error::Internal("binder length mismatch"));
        }
        out.copy_from_slice(tag);
        Ok(())
    }

    fn hkdf_expand_label(
        &self,
        hash: HashAlgorithm,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error> {
        let prk = hkdf::Prk::new_less_safe(hkdf_alg(hash), secret);
        expand_label(&prk, label, context, out)
    }

    fn derive_handshake_secrets(
        &mut self,
        shared_secret: Option<&[u8]>,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let hash = self.hash;
        let alg = hkdf_alg(hash);
        let early_secret = self
            .early_secret
            .take()
            .unwrap_or_else(|| hkdf::Salt::new(alg, &[]).extract(&vec![0u8; hash.len()]));
        let derived = derive_secret(&early_secret, hash, b"derived", &empty_hash(hash))?;
        let salt = hkdf::Salt::new(alg, &derived);
        let ikm = match shared_secret {
            Some(s) => s.to_vec(),
            None => vec![0u8; hash.len()],
        };
        let handshake_secret = salt.extract(&ikm);
        let client_secret = derive_secret(&handshake_secret, hash, b"c hs traffic", transcript_hash)?;
        let server_secret = derive_secret(&handshake_secret, hash, b"s hs traffic", transcript_hash)?;
        self.client_hs_traffic_secret = Some(client_secret.clone());
        self.server_hs_traffic_secret = Some(server_secret.clone());
        self.handshake_secret = Some(handshake_secret);
        Ok((client_secret, server_secret))
    }

    fn derive_application_secrets(
        &mut self,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let hash = self.hash;
        let alg = hkdf_alg(hash);
        let handshake_secret = self
            .handshake_secret
            .as_ref()
            .ok_or(Error::Internal("application secrets derived before handshake secret"))?;
        let derived = derive_secret(handshake_secret, hash, b"derived", &empty_hash(hash))?;
        let salt = hkdf::Salt::new(alg, &derived);
        let master_secret = salt.extract(&vec![0u8; hash.len()]);
        let client_secret = derive_secret(&master_secret, hash, b"c ap traffic", transcript_hash)?;
        let server_secret = derive_secret(&master_secret, hash, b"s ap traffic", transcript_hash)?;
        self.master_secret = Some(master_secret);
        Ok((client_secret, server_secret))
    }

    fn finished_verify_data(&self, transcript_hash: &[u8], server_side: bool) -> Vec<u8> {
        let hash = self.hash;
        let base_secret = if server_side {
            self.server_hs_traffic_secret.as_deref()
        } else {
            self.client_hs_traffic_secret.as_deref()
        };
        let Some(base_secret) = base_secret else {
            // Only reachable if the driver asks for Finished data before
            // handshake secrets exist, which is a state-machine bug, not a
            // peer-triggerable condition; there's no error return here to
            // propagate it through, so produce a value that will provably
            // fail verification instead of panicking.
            return vec![0u8; hash.len()];
        };
        let prk = hkdf::Prk::new_less_safe(hkdf_alg(hash), base_secret);
        let mut finished_key = vec![0u8; hash.len()];
        if expand_label(&prk, b"finished", &[], &mut finished_key).is_err() {
            return vec![0u8; hash.len()];
        }
        hmac::sign(&hmac::Key::new(hmac_alg(hash), &finished_key), transcript_hash)
            .as_ref()
            .to_vec()
    }

    fn resumption_master_secret(&mut self, transcript_hash: &[u8]) -> Result<Vec<u8>, Error> {
        let hash = self.hash;
        let master_secret = self
            .master_secret
            .as_ref()
            .ok_or(Error::Internal("resumption secret derived before master secret"))?;
        derive_secret(master_secret, hash, b"res master", transcript_hash)
    }
}
