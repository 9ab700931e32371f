//! Ciphersuite and named-group tables. Ciphersuite/group *registries* are a
//! provider concern (spec §1); `tls13-client` only ever asks "do you know
//! this id" and "what hash does it imply".

use ring::aead;

use tls13_client::msgs::enums::{CipherSuiteId, NamedGroup};
use tls13_client::provider::{CipherSuiteInfo, HashAlgorithm};

pub(crate) const TLS13_AES_128_GCM_SHA256: CipherSuiteId = CipherSuiteId(0x1301);
pub(crate) const TLS13_AES_256_GCM_SHA384: CipherSuiteId = CipherSuiteId(0x1302);
pub(crate) const TLS13_CHACHA20_POLY1305_SHA256: CipherSuiteId = CipherSuiteId(0x1303);

pub(crate) fn lookup(id: CipherSuiteId) -> Option<CipherSuiteInfo> {
    let hash = match id {
        TLS13_AES_128_GCM_SHA256 => HashAlgorithm::Sha256,
        TLS13_AES_256_GCM_SHA384 => HashAlgorithm::Sha384,
        TLS13_CHACHA20_POLY1305_SHA256 => HashAlgorithm::Sha256,
        _ => return None,
    };
    Some(CipherSuiteInfo { id, hash })
}

/// The AEAD algorithm a ciphersuite id implies, needed when a transform
/// seals/opens records. Not reachable from `CipherSuiteInfo` alone since the
/// core never needs to know it — only the provider does.
pub(crate) fn aead_algorithm(id: CipherSuiteId) -> Option<&'static aead::Algorithm> {
    match id {
        TLS13_AES_128_GCM_SHA256 => Some(&aead::AES_128_GCM),
        TLS13_AES_256_GCM_SHA384 => Some(&aead::AES_256_GCM),
        TLS13_CHACHA20_POLY1305_SHA256 => Some(&aead::CHACHA20_POLY1305),
        _ => None,
    }
}

pub(crate) const ECDHE_GROUPS: &[NamedGroup] = &[
    NamedGroup::X25519,
    NamedGroup::SECP256R1,
    NamedGroup::SECP384R1,
];

pub(crate) fn agreement_algorithm(group: NamedGroup) -> Option<&'static ring::agreement::Algorithm> {
    match group {
        NamedGroup::X25519 => Some(&ring::agreement::X25519),
        NamedGroup::SECP256R1 => Some(&ring::agreement::ECDH_P256),
        NamedGroup::SECP384R1 => Some(&ring::agreement::ECDH_P384),
        _ => None,
    }
}
