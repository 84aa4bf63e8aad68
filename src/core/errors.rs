// src/core/errors.rs

//! Defines the error type shared by the codec, the dispatch step and the server loop.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Every failure the connection core can observe.
///
/// The variants are deliberately coarse: the pipeline loop only needs to know
/// whether the byte stream is still framed (`Protocol` means it is not) and
/// whether the transport is still usable (`Io`, `Timeout` and
/// `ConnectionClosed` mean it is not).
#[derive(Error, Debug, Clone)]
pub enum ServeError {
    #[error("IO Error: {0}")]
    Io(Arc<io::Error>),

    /// The request stream is malformed and can no longer be parsed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The per-command deadline expired while reading or flushing.
    #[error("i/o timeout")]
    Timeout,

    /// The connection was closed by the server, e.g. during a drain.
    #[error("connection closed by server")]
    ConnectionClosed,
}

impl ServeError {
    /// Builds a protocol error from any message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        ServeError::Protocol(msg.into())
    }

    /// Builds the error returned when the peer hangs up mid-command.
    pub fn unexpected_eof() -> Self {
        ServeError::Io(Arc::new(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed mid-command",
        )))
    }

    /// True if the input stream is no longer in a parseable state.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, ServeError::Protocol(_))
    }

    /// True if the transport itself is gone and no reply can be delivered.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ServeError::Io(_) | ServeError::Timeout | ServeError::ConnectionClosed
        )
    }

    /// True for disconnects that are part of normal operation and only worth a debug log.
    pub fn is_normal_disconnect(&self) -> bool {
        match self {
            ServeError::ConnectionClosed => true,
            ServeError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

impl PartialEq for ServeError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ServeError::Io(e1), ServeError::Io(e2)) => {
                e1.kind() == e2.kind() && e1.to_string() == e2.to_string()
            }
            (ServeError::Protocol(s1), ServeError::Protocol(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl From<io::Error> for ServeError {
    fn from(e: io::Error) -> Self {
        ServeError::Io(Arc::new(e))
    }
}

impl From<tokio::time::error::Elapsed> for ServeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ServeError::Timeout
    }
}
