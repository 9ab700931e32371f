//! Test-only support crate: an in-memory `RecordChannel` and deterministic
//! `CryptoProvider`/`KeySchedule` fakes, so `tls13-client`'s unit and
//! integration tests can drive the handshake state machine without real
//! I/O or real cryptography.

#![warn(elided_lifetimes_in_paths)]
#![warn(unreachable_pub)]

mod crypto;
mod record;

pub use crypto::{
    FakeClientSigningKey, FakeCryptoProvider, FakeKeySchedule, FakeKeyShare, FakeTransform,
    FAKE_GROUP, FAKE_GROUP_ALT, FAKE_SCHEME, FAKE_SUITE, VALID_SIGNATURE,
};
pub use record::FakeRecordChannel;
