//! A `ring`-backed implementation of `tls13_client`'s `CryptoProvider`,
//! `KeySchedule`, `KeyShare`, `ClientSigningKey`, and `Transform` traits.
//! Registries (ciphersuite/group tables) and the RFC 8446 §7.1/§7.3 key
//! derivation live here; AEAD sealing/opening, certificate chain
//! validation, and the record layer itself stay out of scope, same as the
//! core crate.

#![warn(elided_lifetimes_in_paths)]
#![warn(unreachable_pub)]

mod key_schedule;
mod kx;
mod provider;
mod sign;
mod suites;
mod transform;

pub use key_schedule::RingKeySchedule;
pub use provider::RingCryptoProvider;
pub use sign::RingClientSigningKey;
pub use transform::RingTransform;
