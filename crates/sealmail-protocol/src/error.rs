//! Protocol error types.

use thiserror::Error;

/// Failures that end the current protocol operation.
///
/// Key and cipher problems are not errors at this layer; the session engine
/// reports them as outcome variants.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The peer closed the stream before a complete line arrived.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// A response line without a recognised code.
    #[error("Malformed response: {0:?}")]
    MalformedResponse(String),

    /// A request line that cannot be interpreted.
    #[error("Malformed request: {0:?}")]
    MalformedRequest(String),

    /// The peer sent more than `limit` bytes without a line terminator. The
    /// rest of the line is still on the stream, so the connection is unusable.
    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// A response notice that should have been a count.
    #[error("Invalid notice {0:?}: expected a count within limits")]
    InvalidNotice(String),

    /// Transport I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// True if the connection cannot be used for further commands.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::ConnectionClosed | ProtocolError::LineTooLong { .. } => true,
            ProtocolError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
