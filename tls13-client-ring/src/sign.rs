//! `CertificateVerify` signing and verification. Verification goes through
//! `webpki` (to get from a DER certificate to its public key); the client's
//! own signing key goes straight through `ring::signature`. The 64-space pad
//! and context string (RFC 8446 §4.4.3) are assembled by the caller; this
//! only ever sees the finished `content` to sign or check.

use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, Ed25519KeyPair};
use webpki::ring as webpki_algs;
use webpki::{EndEntityCert, SignatureVerificationAlgorithm};

use tls13_client::error::Error;
use tls13_client::msgs::enums::SignatureScheme;
use tls13_client::provider::ClientSigningKey;

pub(crate) const ECDSA_SECP256R1_SHA256: SignatureScheme = SignatureScheme(0x0403);
pub(crate) const ECDSA_SECP384R1_SHA384: SignatureScheme = SignatureScheme(0x0503);
pub(crate) const ED25519: SignatureScheme = SignatureScheme(0x0807);
pub(crate) const RSA_PSS_RSAE_SHA256: SignatureScheme = SignatureScheme(0x0804);

fn verification_algorithm(scheme: SignatureScheme) -> Option<&'static dyn SignatureVerificationAlgorithm> {
    Some(match scheme {
        ECDSA_SECP256R1_SHA256 => webpki_algs::ECDSA_P256_SHA256,
        ECDSA_SECP384R1_SHA384 => webpki_algs::ECDSA_P384_SHA384,
        ED25519 => webpki_algs::ED25519,
        RSA_PSS_RSAE_SHA256 => webpki_algs::RSA_PSS_2048_8192_SHA256_LEGACY_KEY,
        _ => return None,
    })
}

/// Verifies a `CertificateVerify` signature against the leaf certificate's
/// public key. `leaf_certificate_der` is the full DER certificate (not just
/// its SPKI) — `webpki::EndEntityCert` parses it and extracts the key
/// itself, the same step rustls's certificate verifier performs before
/// checking the signature over a TLS transcript.
pub(crate) fn verify(
    scheme: SignatureScheme,
    leaf_certificate_der: &[u8],
    content: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let alg = verification_algorithm(scheme)
        .ok_or(Error::HandshakeFailure("unsupported signature scheme"))?;
    let cert = EndEntityCert::try_from(leaf_certificate_der)
        .map_err(|_| Error::HandshakeFailure("malformed leaf certificate"))?;
    cert.verify_signature(alg, content, signature)
        .map_err(|_| Error::HandshakeFailure("CertificateVerify signature check failed"))
}

/// A client signing key backed by `ring`, used only when mutual
/// authentication is configured (spec §4.7-§4.8).
pub enum RingClientSigningKey {
    EcdsaP256(EcdsaKeyPair),
    Ed25519(Ed25519KeyPair),
}

impl ClientSigningKey for RingClientSigningKey {
    fn scheme(&self) -> SignatureScheme {
        match self {
            Self::EcdsaP256(_) => ECDSA_SECP256R1_SHA256,
            Self::Ed25519(_) => ED25519,
        }
    }

    fn sign(&self, content: &[u8]) -> Result<Vec<u8>, Error> {
        let rng = SystemRandom::new();
        match self {
            Self::EcdsaP256(key) => key
                .sign(&rng, content)
                .map(|sig| sig.as_ref().to_vec())
                .map_err(|_| Error::Internal("client signature generation failed")),
            Self::Ed25519(key) => Ok(key.sign(content).as_ref().to_vec()),
        }
    }
}
