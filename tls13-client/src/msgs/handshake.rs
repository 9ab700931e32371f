//! Handshake message bodies this crate writes or parses, per RFC 8446 §4.
//! Layouts not named in spec §4 (the full TLS 1.2 `ServerHello` body,
//! `ServerKeyExchange`, and so on) aren't represented here at all.

use crate::codec::{put_u16, put_u24, put_u8, Reader};
use crate::error::Error;
use crate::msgs::enums::{CipherSuiteId, ProtocolVersion, SignatureScheme};
use crate::msgs::extensions::{self, RawExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Random(pub [u8; 32]);

impl Random {
    /// The SHA-256 of the literal string `"HelloRetryRequest"`, which RFC
    /// 8446 §4.1.3 specifies `ServerHello.random` must equal to signal an
    /// HRR rather than a real ServerHello.
    pub const HRR_MAGIC: [u8; 32] = [
        0xCF, 0x21, 0xAD, 0x74, 0xE5, 0x9A, 0x61, 0x11, 0xBE, 0x1D, 0x8C, 0x02, 0x1E, 0x65, 0xB8,
        0x91, 0xC2, 0xA2, 0x11, 0x16, 0x7A, 0xBB, 0x8C, 0x5E, 0x07, 0x9E, 0x09, 0xE2, 0xC8, 0xA8,
        0x33, 0x9C,
    ];

    /// RFC 8446 §4.1.3's downgrade sentinels: the last 8 bytes of
    /// `ServerHello.random` when the server actually speaks TLS 1.1 or
    /// TLS 1.2 but a TLS 1.3 client probed it.
    pub const DOWNGRADE_TO_TLS12: [u8; 8] = [0x44, 0x4F, 0x57, 0x4E, 0x47, 0x52, 0x44, 0x01];
    pub const DOWNGRADE_TO_TLS11_OR_BELOW: [u8; 8] =
        [0x44, 0x4F, 0x57, 0x4E, 0x47, 0x52, 0x44, 0x00];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    data: Vec<u8>,
}

impl SessionId {
    pub fn empty() -> Self {
        Self { data: Vec::new() }
    }

    pub fn new(data: Vec<u8>) -> Result<Self, Error> {
        if data.len() > 32 {
            return Err(Error::Internal("session id exceeds 32 bytes"));
        }
        Ok(Self { data })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        put_u8(out, self.data.len() as u8);
        out.extend_from_slice(&self.data);
    }

    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let body = r.length_prefixed(1)?.rest().to_vec();
        Self::new(body)
    }
}

/// Everything needed to write a `ClientHello` body, already decided by the
/// caller (spec §4.2's extension writers run against this).
pub struct ClientHelloPayload {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suites: Vec<CipherSuiteId>,
    pub extensions: Vec<u8>,
}

impl ClientHelloPayload {
    /// Encodes everything up to, but not including, the `pre_shared_key`
    /// extension's binder list (spec §4.3: "the binder region length must
    /// be known before hashing proceeds"). `extensions` must already
    /// contain the `pre_shared_key` header and identities with zeroed
    /// binder placeholders; `binders_offset` is where the binder list's own
    /// 2-byte length prefix starts (RFC 8446 §4.2.11.2: that prefix is part
    /// of the binder region and must not be hashed either).
    pub fn encode_for_binder_signing(&self, binders_offset: usize) -> Vec<u8> {
        let mut out = self.encode_prefix();
        out.extend_from_slice(&self.extensions[..binders_offset]);
        out
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.encode_prefix();
        out.extend_from_slice(&self.extensions);
        out
    }

    fn encode_prefix(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u16(&mut out, self.client_version.0);
        out.extend_from_slice(&self.random.0);
        self.session_id.write(&mut out);
        put_u16(&mut out, (self.cipher_suites.len() * 2) as u16);
        for cs in &self.cipher_suites {
            put_u16(&mut out, cs.0);
        }
        put_u8(&mut out, 1);
        put_u8(&mut out, 0); // compression_methods = { null }
        out
    }
}

/// Shared layout of `ServerHello` and `HelloRetryRequest` (spec §4.5): they
/// differ only in the `random` value and in which extensions the allow-mask
/// permits.
pub struct ServerHelloPayload {
    pub legacy_version: ProtocolVersion,
    pub random: [u8; 32],
    pub legacy_session_id_echo: SessionId,
    pub cipher_suite: CipherSuiteId,
    pub extensions: Vec<RawExtension>,
}

impl ServerHelloPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let legacy_version = ProtocolVersion(r.u16()?);
        let random: [u8; 32] = r
            .take(32)?
            .try_into()
            .map_err(|_| Error::Internal("random slice was not 32 bytes"))?;
        let legacy_session_id_echo = SessionId::read(r)?;
        let cipher_suite = CipherSuiteId(r.u16()?);
        let compression = r.u8()?;
        if compression != 0 {
            return Err(Error::IllegalParameter("non-null compression method"));
        }
        let extensions = extensions::read_extensions(r)?;
        Ok(Self {
            legacy_version,
            random,
            legacy_session_id_echo,
            cipher_suite,
            extensions,
        })
    }

    pub fn is_hello_retry_request(&self) -> bool {
        self.random == Random::HRR_MAGIC
    }
}

pub struct EncryptedExtensionsPayload {
    pub extensions: Vec<RawExtension>,
}

impl EncryptedExtensionsPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let extensions = extensions::read_extensions(r)?;
        r.expect_exhausted()?;
        Ok(Self { extensions })
    }
}

pub struct CertificateRequestPayload {
    pub context: Vec<u8>,
    pub extensions: Vec<RawExtension>,
}

impl CertificateRequestPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let context = r.length_prefixed(1)?.rest().to_vec();
        let extensions = extensions::read_extensions(r)?;
        r.expect_exhausted()?;
        Ok(Self { context, extensions })
    }
}

/// One DER certificate plus its (TLS 1.3 per-entry) extensions, which this
/// crate doesn't interpret — OCSP/SCT handling is left to the caller, same
/// as certificate-chain validation itself (§1 Out of scope).
pub struct CertificateEntry {
    pub der: Vec<u8>,
    pub extensions: Vec<u8>,
}

pub struct CertificatePayload {
    pub context: Vec<u8>,
    pub entries: Vec<CertificateEntry>,
}

impl CertificatePayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let context = r.length_prefixed(1)?.rest().to_vec();
        let mut list = r.length_prefixed(3)?;
        let mut entries = Vec::new();
        while !list.eof() {
            let der = list.length_prefixed(3)?.rest().to_vec();
            let extensions = list.length_prefixed(2)?.rest().to_vec();
            entries.push(CertificateEntry { der, extensions });
        }
        r.expect_exhausted()?;
        Ok(Self { context, entries })
    }

    /// Writes a client `Certificate` message, echoing `context` from the
    /// `CertificateRequest` (spec §4.8). An empty `entries` is legal: it's
    /// how a client without a certificate responds to a request.
    pub fn write_client(context: &[u8], chain: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        put_u8(&mut out, context.len() as u8);
        out.extend_from_slice(context);
        let list_start = out.len();
        put_u24(&mut out, 0);
        let body_start = out.len();
        for cert in chain {
            put_u24(&mut out, cert.len() as u32);
            out.extend_from_slice(cert);
            put_u16(&mut out, 0); // no per-entry extensions from the client
        }
        let list_len = (out.len() - body_start) as u32;
        out[list_start..body_start].copy_from_slice(&list_len.to_be_bytes()[1..4]);
        out
    }
}

pub struct CertificateVerifyPayload {
    pub scheme: SignatureScheme,
    pub signature: Vec<u8>,
}

impl CertificateVerifyPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let scheme = SignatureScheme(r.u16()?);
        let signature = r.length_prefixed(2)?.rest().to_vec();
        r.expect_exhausted()?;
        Ok(Self { scheme, signature })
    }

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u16(&mut out, self.scheme.0);
        put_u16(&mut out, self.signature.len() as u16);
        out.extend_from_slice(&self.signature);
        out
    }
}

pub struct FinishedPayload(pub Vec<u8>);

impl FinishedPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        Ok(Self(r.rest().to_vec()))
    }

    pub fn write(&self) -> Vec<u8> {
        self.0.clone()
    }
}

pub struct NewSessionTicketPayload {
    pub lifetime: u32,
    pub age_add: u32,
    pub nonce: Vec<u8>,
    pub ticket: Vec<u8>,
    pub extensions: Vec<RawExtension>,
}

impl NewSessionTicketPayload {
    pub fn read(r: &mut Reader<'_>) -> Result<Self, Error> {
        let lifetime = r.u32()?;
        let age_add = r.u32()?;
        let nonce = r.length_prefixed(1)?.rest().to_vec();
        let ticket = r.length_prefixed(2)?.rest().to_vec();
        let extensions = extensions::read_extensions(r)?;
        r.expect_exhausted()?;
        Ok(Self {
            lifetime,
            age_add,
            nonce,
            ticket,
            extensions,
        })
    }
}
