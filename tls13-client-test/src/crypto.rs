//! Deterministic, non-cryptographic stand-ins for [`CryptoProvider`] and
//! [`KeySchedule`], so a test can assert on exact derived bytes without
//! pulling in real HKDF/ECDHE math. Never use these outside tests: nothing
//! here is a secret.

use tls13_client::error::Error;
use tls13_client::msgs::enums::{CipherSuiteId, NamedGroup, SignatureScheme};
use tls13_client::provider::{
    CipherSuiteInfo, ClientSigningKey, CryptoProvider, HashAlgorithm, KeyShare, KeySchedule,
    PskType, SharedSecret, Transform,
};

/// The one ciphersuite `FakeCryptoProvider` knows about, and the two groups
/// it can generate a (fake) share for. Real group ids rather than invented
/// ones, since `NamedGroup::is_ecdhe` — the driver's gate on which groups
/// it will even try to offer — only recognizes the standard registry
/// values; a fake group id would silently never get offered.
pub const FAKE_SUITE: CipherSuiteId = CipherSuiteId(0xFA00);
pub const FAKE_GROUP: NamedGroup = NamedGroup::X25519;
pub const FAKE_GROUP_ALT: NamedGroup = NamedGroup::SECP256R1;
pub const FAKE_SCHEME: SignatureScheme = SignatureScheme(0xFA02);

const GROUPS: &[NamedGroup] = &[FAKE_GROUP, FAKE_GROUP_ALT];

pub struct FakeKeyShare {
    group: NamedGroup,
    public: Vec<u8>,
}

impl KeyShare for FakeKeyShare {
    fn group(&self) -> NamedGroup {
        self.group
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn into_any(self: Box<Self>) -> Box<dyn core::any::Any> {
        self
    }
}

pub struct FakeTransform {
    pub label: Vec<u8>,
}

impl Transform for FakeTransform {
    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

/// `verify_transcript_signature` accepts exactly this byte string, so tests
/// can exercise both the accept and reject paths without real signing.
pub const VALID_SIGNATURE: &[u8] = b"fake-valid-signature";

pub struct FakeCryptoProvider {
    /// Bumped on every `generate_key_share` call so distinct calls produce
    /// distinct (but still fully deterministic) public key bytes.
    next_key_id: std::cell::Cell<u8>,
}

impl FakeCryptoProvider {
    pub fn new() -> Self {
        FakeCryptoProvider {
            next_key_id: std::cell::Cell::new(0),
        }
    }
}

impl Default for FakeCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for FakeCryptoProvider {
    fn ciphersuite_from_id(&self, id: CipherSuiteId) -> Option<CipherSuiteInfo> {
        (id == FAKE_SUITE).then_some(CipherSuiteInfo {
            id,
            hash: HashAlgorithm::Sha256,
        })
    }

    fn supports_group(&self, group: NamedGroup) -> bool {
        group == FAKE_GROUP || group == FAKE_GROUP_ALT
    }

    fn ecdhe_groups(&self) -> &[NamedGroup] {
        GROUPS
    }

    fn generate_key_share(&self, group: NamedGroup) -> Result<Box<dyn KeyShare>, Error> {
        if group != FAKE_GROUP && group != FAKE_GROUP_ALT {
            return Err(Error::HandshakeFailure("unsupported group"));
        }
        let id = self.next_key_id.get();
        self.next_key_id.set(id.wrapping_add(1));
        Ok(Box::new(FakeKeyShare {
            group,
            public: vec![b'k', id],
        }))
    }

    fn complete_key_exchange(
        &self,
        ours: Box<dyn KeyShare>,
        their_public: &[u8],
    ) -> Result<SharedSecret, Error> {
        let ours = ours
            .into_any()
            .downcast::<FakeKeyShare>()
            .map_err(|_| Error::Internal("key share from a different provider"))?;
        let mut secret = ours.public.clone();
        secret.extend_from_slice(their_public);
        Ok(SharedSecret(secret))
    }

    fn derive_transform(
        &self,
        _hash: HashAlgorithm,
        traffic_secret: &[u8],
    ) -> Result<Box<dyn Transform>, Error> {
        Ok(Box::new(FakeTransform {
            label: traffic_secret.to_vec(),
        }))
    }

    fn verify_transcript_signature(
        &self,
        _scheme: SignatureScheme,
        _leaf_certificate_der: &[u8],
        _content: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        if signature == VALID_SIGNATURE {
            Ok(())
        } else {
            Err(Error::HandshakeFailure("signature check failed"))
        }
    }
}

pub struct FakeClientSigningKey;

impl ClientSigningKey for FakeClientSigningKey {
    fn scheme(&self) -> SignatureScheme {
        FAKE_SCHEME
    }

    fn sign(&self, _content: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(VALID_SIGNATURE.to_vec())
    }
}

/// Mixes `label` and `input` into `out` with a simple, invertible,
/// non-cryptographic scheme: deterministic so assertions can pin exact
/// derived values, a real mix so bugs that drop/duplicate an input still
/// show up as a wrong answer.
fn mix(label: &[u8], input: &[u8], out: &mut [u8]) {
    for (i, b) in out.iter_mut().enumerate() {
        let l = label[i % label.len()];
        let n = input.get(i % input.len().max(1)).copied().unwrap_or(0);
        *b = l ^ n ^ (i as u8);
    }
}

#[derive(Default)]
pub struct FakeKeySchedule {
    handshake_base: Option<Vec<u8>>,
    master_base: Option<Vec<u8>>,
}

impl FakeKeySchedule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySchedule for FakeKeySchedule {
    fn transcript_hash(&self, hash: HashAlgorithm, messages: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; hash.len()];
        mix(b"transcript", messages, &mut out);
        out
    }

    fn stage_early(&mut self, _psk: Option<&[u8]>, _hash: HashAlgorithm) -> Result<(), Error> {
        Ok(())
    }

    fn create_psk_binder(
        &self,
        _hash: HashAlgorithm,
        psk: &[u8],
        psk_type: PskType,
        transcript: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error> {
        let label: &[u8] = match psk_type {
            PskType::External => b"ext-binder",
            PskType::Resumption => b"res-binder",
        };
        let mut input = psk.to_vec();
        input.extend_from_slice(transcript);
        mix(label, &input, out);
        Ok(())
    }

    fn hkdf_expand_label(
        &self,
        _hash: HashAlgorithm,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error> {
        let mut input = secret.to_vec();
        input.extend_from_slice(context);
        mix(label, &input, out);
        Ok(())
    }

    fn derive_handshake_secrets(
        &mut self,
        shared_secret: Option<&[u8]>,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let mut base = transcript_hash.to_vec();
        if let Some(shared) = shared_secret {
            base.extend_from_slice(shared);
        }
        self.handshake_base = Some(base.clone());
        let mut client = vec![0u8; transcript_hash.len()];
        let mut server = vec![0u8; transcript_hash.len()];
        mix(b"c hs traffic", &base, &mut client);
        mix(b"s hs traffic", &base, &mut server);
        Ok((client, server))
    }

    fn derive_application_secrets(
        &mut self,
        transcript_hash: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let handshake_base = self
            .handshake_base
            .clone()
            .ok_or(Error::Internal("application secrets derived before handshake secrets"))?;
        let mut base = handshake_base;
        base.extend_from_slice(transcript_hash);
        self.master_base = Some(base.clone());
        let mut client = vec![0u8; transcript_hash.len()];
        let mut server = vec![0u8; transcript_hash.len()];
        mix(b"c ap traffic", &base, &mut client);
        mix(b"s ap traffic", &base, &mut server);
        Ok((client, server))
    }

    fn finished_verify_data(&self, transcript_hash: &[u8], server_side: bool) -> Vec<u8> {
        let mut out = vec![0u8; transcript_hash.len()];
        let label: &[u8] = if server_side { b"s finished" } else { b"c finished" };
        mix(label, transcript_hash, &mut out);
        out
    }

    fn resumption_master_secret(&mut self, transcript_hash: &[u8]) -> Result<Vec<u8>, Error> {
        let master_base = self
            .master_base
            .clone()
            .ok_or(Error::Internal("resumption secret derived before master secret"))?;
        let mut base = master_base;
        base.extend_from_slice(transcript_hash);
        let mut out = vec![0u8; transcript_hash.len()];
        mix(b"res master", &base, &mut out);
        Ok(out)
    }
}
