use core::fmt;

use crate::msgs::enums::{AlertDescription, HandshakeType};

/// Errors the handshake core can return.
///
/// Every fatal variant either carries, or can be mapped to, the
/// [`AlertDescription`] that must be enqueued for send before the
/// connection is torn down. `AllocFailed` and `Internal` carry no alert:
/// the peer gets nothing and the caller just closes the transport.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// The wire codec ran past the end of the buffer it was given.
    BufferTooSmall,
    /// A message was structurally malformed: trailing bytes, a length that
    /// didn't add up, an exhausted reader with data still expected.
    DecodeError(&'static str),
    /// A message was well-formed but violated a protocol invariant: wrong
    /// group in a key share, bad session-id echo, a duplicate HRR group,
    /// `selected_identity` out of range, and similar.
    IllegalParameter(&'static str),
    /// No valid key-exchange mode could be agreed, or the server's key
    /// share group didn't match what the client offered.
    HandshakeFailure(&'static str),
    /// An extension appeared in a message where it isn't allowed.
    UnsupportedExtension(&'static str),
    /// `legacy_version` was not `0x0303`.
    ProtocolVersion,
    /// A second HelloRetryRequest, or a message type the current state
    /// doesn't accept.
    UnexpectedMessage(&'static str),
    /// ALPN selected a protocol we didn't offer, or PSK configuration
    /// disagreed with what the peer did.
    BadInput(&'static str),
    /// A downgrade to TLS 1.2 was attempted after we offered TLS 1.3,
    /// detected via the RFC 8446 §4.1.3 random-field sentinel.
    DowngradeDetected,
    /// Allocation failure. Fatal, no alert.
    AllocFailed,
    /// An invariant this crate maintains internally was broken: an empty
    /// `offered_group_id` where an ephemeral mode is required, an unknown
    /// branch taken. Always a bug, never the peer's fault.
    Internal(&'static str),
    /// The record channel doesn't have a full message buffered yet. Not
    /// fatal and carries no alert; the caller should poll I/O and retry the
    /// same transition (spec §5's suspension points).
    WouldBlock,
    /// A `HandshakeType` arrived where it's not a legal transition from
    /// the state currently driving the connection.
    InappropriateMessage {
        expected: &'static [HandshakeType],
        got: HandshakeType,
    },
}

impl Error {
    /// The alert this error would cause the driver to enqueue, if any.
    ///
    /// `ReceivedNewSessionTicket` is not an `Error` at all — it's a
    /// positive signal, see [`crate::client::tls13::Signal`].
    pub fn alert(&self) -> Option<AlertDescription> {
        use Error::*;
        Some(match self {
            BufferTooSmall | DecodeError(_) => AlertDescription::DecodeError,
            IllegalParameter(_) | DowngradeDetected => AlertDescription::IllegalParameter,
            HandshakeFailure(_) => AlertDescription::HandshakeFailure,
            UnsupportedExtension(_) => AlertDescription::UnsupportedExtension,
            ProtocolVersion => AlertDescription::ProtocolVersion,
            UnexpectedMessage(_) | InappropriateMessage { .. } => {
                AlertDescription::UnexpectedMessage
            }
            BadInput(_) => AlertDescription::IllegalParameter,
            AllocFailed | Internal(_) | WouldBlock => return None,
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooSmall => write!(f, "buffer too small"),
            Error::DecodeError(msg) => write!(f, "decode error: {msg}"),
            Error::IllegalParameter(msg) => write!(f, "illegal parameter: {msg}"),
            Error::HandshakeFailure(msg) => write!(f, "handshake failure: {msg}"),
            Error::UnsupportedExtension(msg) => write!(f, "unsupported extension: {msg}"),
            Error::ProtocolVersion => write!(f, "unexpected legacy_version"),
            Error::UnexpectedMessage(msg) => write!(f, "unexpected message: {msg}"),
            Error::BadInput(msg) => write!(f, "bad input: {msg}"),
            Error::DowngradeDetected => write!(f, "downgrade attack detected"),
            Error::AllocFailed => write!(f, "allocation failed"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
            Error::WouldBlock => write!(f, "no complete message buffered yet"),
            Error::InappropriateMessage { expected, got } => {
                write!(f, "received {got:?} but expected one of {expected:?}")
            }
        }
    }
}

impl std::error::Error for Error {}
