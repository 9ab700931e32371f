//! Classifying an incoming `ServerHello`-shaped message (spec §4.4):
//! ordinary `ServerHello`, `HelloRetryRequest`, or a disguised TLS 1.2
//! `ServerHello` signaling a downgrade. All three share the same first
//! bytes on the wire; only `random` tells them apart, per RFC 8446 §4.1.3.

use crate::error::Error;
use crate::msgs::extensions;
use crate::msgs::handshake::{Random, ServerHelloPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerHelloKind {
    ServerHello,
    HelloRetryRequest,
    /// `supported_versions` was absent: the peer chose TLS 1.2 or below and
    /// no downgrade sentinel fired. The core hands the message to an
    /// external TLS 1.2 implementation and exits (spec §4.10's
    /// `ServerHelloTls12`).
    Tls12,
}

/// Checks `random` for RFC 8446 §4.1.3's downgrade sentinels before
/// anything else runs. A client that offered TLS 1.3 and gets one of these
/// back is being actively downgraded (or is talking to a broken/malicious
/// middlebox) and must abort rather than fall back silently.
pub fn check_downgrade(random: &[u8; 32]) -> Result<(), Error> {
    let tail = &random[24..32];
    if tail == Random::DOWNGRADE_TO_TLS12 || tail == Random::DOWNGRADE_TO_TLS11_OR_BELOW {
        return Err(Error::DowngradeDetected);
    }
    Ok(())
}

/// Classifies a parsed `ServerHello`/`HelloRetryRequest` body (spec §4.4):
/// absence of `supported_versions` means the peer chose TLS 1.2 or below;
/// the downgrade check runs regardless, since a match is a protocol
/// violation whether or not TLS 1.2 fallback is configured; only once both
/// have been checked does a missing `supported_versions` turn into the
/// `Tls12` hand-off, and only when the caller actually allows it.
pub fn classify(sh: &ServerHelloPayload, allow_tls12_fallback: bool) -> Result<ServerHelloKind, Error> {
    let has_supported_versions = extensions::get_supported_versions(&sh.extensions).is_some();
    check_downgrade(&sh.random)?;
    if !has_supported_versions && allow_tls12_fallback {
        return Ok(ServerHelloKind::Tls12);
    }
    if sh.random == Random::HRR_MAGIC {
        Ok(ServerHelloKind::HelloRetryRequest)
    } else {
        Ok(ServerHelloKind::ServerHello)
    }
}
