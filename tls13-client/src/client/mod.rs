//! The client-side state machine driver (spec §4.10). Follows the
//! teacher's `client/hs.rs` `State`/`NextStateOrError` shape: each state is
//! a boxed trait object that consumes itself and returns the next one,
//! rather than a single enum matched on every step. This lets each state
//! carry exactly the fields it needs, matching spec §4.5-§4.9's per-state
//! data.

pub mod hs;
pub mod tls13;

use crate::context::{ClientConfig, HandshakeContext, Session};
use crate::error::Error;
use crate::msgs::enums::HandshakeType;
use crate::provider::{CryptoProvider, KeySchedule, RecordChannel};

/// Everything a state needs to do its job: the shared, read-only config,
/// the mutable per-handshake context, and the three external collaborators
/// (spec §6). Borrowed for the duration of one `handle` call; no state
/// holds onto it across transitions.
pub struct ClientContext<'a> {
    pub config: &'a ClientConfig,
    pub hs: &'a mut HandshakeContext,
    pub session: &'a mut Session,
    pub record: &'a mut dyn RecordChannel,
    pub crypto: &'a dyn CryptoProvider,
    pub key_schedule: &'a mut dyn KeySchedule,
}

/// What a completed transition hands back: either the next state to drive,
/// or a positive signal the caller must act on (spec §4.9's
/// `ReceivedNewSessionTicket`, which is explicitly not an error).
pub enum NextState {
    Continue(Box<dyn State>),
    Signal(Signal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Handshake reached `HANDSHAKE_OVER` (spec §4.10's terminal state).
    HandshakeComplete,
    /// A `NewSessionTicket` arrived and `ClientContext::session` was
    /// updated; the caller should persist it (spec §4.9).
    ReceivedNewSessionTicket,
    /// `ServerHello` carried no `supported_versions` and TLS 1.2 fallback is
    /// configured (spec §4.4 step 3). The core exits without consuming the
    /// message further; the caller hands `server_hello` to an external
    /// TLS 1.2 implementation.
    ServerHelloIsTls12 { server_hello: Vec<u8> },
}

pub type NextStateOrError = Result<NextState, Error>;

/// One state in the handshake (spec §4.10). `handle` is given the raw body
/// of the next handshake message the record channel delivered, already
/// typed as `expected_types()` promised it would be.
pub trait State: Send {
    /// The handshake message type(s) legal to receive while this state is
    /// active; anything else is `InappropriateMessage`. A state driving a
    /// *write* transition (no read expected) returns an empty slice and
    /// ignores `msg`.
    fn expected_types(&self) -> &'static [HandshakeType];

    /// `typ` is `Some` of one of `expected_types()` for a read-driven state,
    /// or `None` for a write-driven one (empty `expected_types()`). States
    /// that list more than one type (spec §4.7's CertificateRequest-or-
    /// Certificate peek) switch on it instead of re-sniffing the body.
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        typ: Option<HandshakeType>,
        msg: &[u8],
    ) -> NextStateOrError;
}

/// Runs the driver until it reaches a terminal state or a signal the
/// caller must act on, fetching messages from `cx.record` as needed. A
/// single call processes exactly one transition per spec §5's "no
/// suspension inside a transition" rule — callers loop this themselves.
pub fn step(cx: &mut ClientContext<'_>, state: Box<dyn State>) -> NextStateOrError {
    let expected = state.expected_types();
    if expected.is_empty() {
        return state.handle(cx, None, &[]);
    }
    let Some((got, body)) = cx.record.fetch_handshake_msg()? else {
        // No complete message buffered yet (spec §5's suspension points
        // never occur mid-transition, so this return carries no partial
        // state) — the caller polls I/O and retries the same state.
        return Err(Error::WouldBlock);
    };
    if !expected.contains(&got) {
        return Err(Error::InappropriateMessage { expected, got });
    }
    state.handle(cx, Some(got), &body)
}
