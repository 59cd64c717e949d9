use thiserror::Error;

/// Errors produced by the UDP transport.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying socket operation failed.
    #[error("udp io error: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk arrived whose declared total-parts count disagreed with
    /// an already-buffered chunk sharing its hash.
    #[error("chunk for message {0} has inconsistent total_parts")]
    InconsistentChunking(String),

    /// A datagram could not be decoded as a transport frame.
    #[error("malformed transport frame: {0}")]
    MalformedFrame(String),
}

/// Result type used throughout the transport crate.
pub type Result<T> = std::result::Result<T, Error>;
