/// Errors raised while decoding a serialized token list.
///
/// Always local to the codec: the input line was malformed. Never retried —
/// a malformed line means the channel is desynchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A control-sequence unit never reached its terminating space.
    #[error("control-sequence name not terminated (unit starting at char {at})")]
    UnterminatedName { at: usize },

    /// A caret escape or escape unit was truncated or carried an
    /// out-of-range shifted character.
    #[error("bad escape sequence at char {at}")]
    BadEscape { at: usize },

    /// A unit started with a character outside the marker alphabet.
    #[error("unknown category marker {marker:?} at char {at}")]
    UnknownCategory { marker: char, at: usize },
}

/// Errors that can occur on the line-oriented wire.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A token-list line failed to decode.
    #[error("token decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A received line exceeds the configured maximum length.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// An outgoing line contains an embedded newline.
    #[error("line contains an embedded newline")]
    EmbeddedNewline,

    /// A received line is not valid UTF-8.
    #[error("line is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// An I/O error occurred while reading or writing lines.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel closed before a complete line (or block terminator)
    /// arrived.
    #[error("channel closed (incomplete message)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
