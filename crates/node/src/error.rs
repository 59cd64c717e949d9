use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading configuration or running the node
/// binary.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file does not exist.
    #[error("configuration file {0} does not exist")]
    NotFile(PathBuf),

    /// The configuration file could not be parsed.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// `quorum` was configured at or below `threshold`.
    #[error("quorum must be greater than threshold")]
    QuorumTooLow,

    /// Filesystem I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Core crate error surfaced to the binary.
    #[error(transparent)]
    Core(#[from] tss_core::Error),

    /// Protocol wire type error surfaced to the binary.
    #[error(transparent)]
    Protocol(#[from] tss_protocol::Error),

    /// A persisted key share, round message, or signature could not be
    /// (de)serialized.
    #[error("(de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Transport crate error surfaced to the binary.
    #[error(transparent)]
    Transport(#[from] tss_transport::Error),

    /// The online signing round was reached with no message scalar on
    /// file, or produced no outgoing share.
    #[error("no keysign in progress to drive the online signing round")]
    NoPendingMessage,

    /// A keysign RPC was awaiting a signature when the session was
    /// canceled or failed.
    #[error("threshold signing failed or was canceled before producing a signature")]
    KeysignFailed,
}

/// Result type used throughout the node binary.
pub type Result<T> = std::result::Result<T, Error>;
