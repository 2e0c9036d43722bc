/// Errors that can occur in channel transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to spawn the engine child process.
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The child process did not expose the expected stdio handles.
    #[error("child process is missing a {0} handle")]
    MissingChildHandle(&'static str),

    /// An I/O error occurred on a channel half.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed its end of the channel.
    #[error("channel closed by peer")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
