//! Wire types: enums, extensions, and handshake message bodies.

pub mod enums;
pub mod extensions;
pub mod handshake;
