use std::time::Duration;

/// A handler body failed, on either side of the channel.
///
/// Carries the failing handler's name, a one-line summary, and the full
/// multi-line trace forwarded over the wire. After one of these the session
/// is poisoned: the failure is not catchable across nesting levels.
#[derive(Debug, Clone, thiserror::Error)]
#[error("handler {handler:?} failed: {summary}")]
pub struct RemoteFailure {
    /// Name of the failing handler (or of the call that was pending when
    /// the failure arrived).
    pub handler: String,
    /// First line of the trace.
    pub summary: String,
    /// Full error trace from the failing side.
    pub trace: String,
}

impl RemoteFailure {
    pub(crate) fn new(handler: impl Into<String>, trace: impl Into<String>) -> Self {
        let trace = trace.into();
        let summary = trace.lines().next().unwrap_or("").to_string();
        Self {
            handler: handler.into(),
            summary,
            trace,
        }
    }
}

/// Errors that can occur in session operations.
///
/// Everything except [`SessionError::Remote`] indicates desynchronization or
/// misuse; the session is unusable afterwards and must be torn down.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] macrolink_transport::TransportError),

    /// Wire-level error (framing, codec, I/O).
    #[error("wire error: {0}")]
    Wire(#[from] macrolink_wire::WireError),

    /// The peer sent something other than the identity line first.
    #[error("expected identity line before any traffic, got {0:?}")]
    HandshakeExpected(String),

    /// A return was produced with no open inbound call frame.
    #[error("no open call frame to return to")]
    NoOpenFrame,

    /// A line outside the message grammar, or a message that is invalid in
    /// the current protocol state.
    #[error("unexpected message: {0:?}")]
    UnexpectedMessageKind(String),

    /// The peer did not respond within the configured bound.
    #[error("no reply from peer within {0:?}")]
    Timeout(Duration),

    /// A handler body failed; the session is poisoned.
    #[error(transparent)]
    Remote(#[from] RemoteFailure),

    /// The session was poisoned by an earlier failure.
    #[error("session unusable after an earlier failure")]
    Poisoned,

    /// The session was closed.
    #[error("session closed")]
    Closed,

    /// A handler name is empty, contains invalid characters, or is already
    /// registered.
    #[error("invalid handler name {0:?}")]
    InvalidHandlerName(String),

    /// An argument or return value cannot be represented on the wire.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
