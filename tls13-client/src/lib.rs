//! A TLS 1.3 client handshake state machine (RFC 8446), decoupled from
//! transport I/O and from the cryptographic primitives that back it.
//!
//! This crate owns exactly the parts of a TLS 1.3 client named in its
//! module map: `ClientHello` construction, `ServerHello`/`HelloRetryRequest`
//! triage, the downgrade-sentinel and transcript-hash bookkeeping RFC 8446
//! requires, PSK binder computation, and the
//! `EncryptedExtensions` → `Finished` → steady-state-traffic flight. Record
//! framing, AEAD sealing, HKDF, and (EC)DHE are external — see
//! [`provider`] for the seams this crate drives them through, and the
//! `tls13-client-ring` and `tls13-client-test` crates for two concrete
//! providers (one real, one deterministic for tests).
//!
//! Certificate *chain* trust evaluation is out of scope: this crate only
//! verifies that a server's `CertificateVerify` signature was produced by
//! the leaf certificate it sent, never whether that certificate chains to
//! a trusted root.

#![warn(elided_lifetimes_in_paths)]
#![warn(unreachable_pub)]

pub mod client;
pub mod codec;
pub mod context;
pub mod error;
pub mod hrr;
pub mod msgs;
pub mod provider;
pub mod psk;
pub mod transcript;

pub use client::hs::start_handshake;
pub use client::{step, ClientContext, NextState, NextStateOrError, Signal, State};
pub use context::{ClientConfig, ClientIdentity, HandshakeContext, Session};
pub use error::Error;
