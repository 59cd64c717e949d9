use thiserror::Error;

/// Errors produced by the coordinator's core components.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol wire type error (parsing, validation).
    #[error(transparent)]
    Protocol(#[from] tss_protocol::Error),

    /// Crypto engine error.
    #[error("protocol engine error: {0}")]
    Engine(String),

    /// Transport-layer error.
    #[error(transparent)]
    Transport(#[from] tss_transport::Error),

    /// A session of the given kind is already running; a second
    /// `*_START` was ignored.
    #[error("a {0:?} session is already running")]
    AlreadyStarted(tss_protocol::Operation),

    /// An operation was requested while no session of that kind was
    /// running.
    #[error("no {0:?} session is currently running")]
    NotRunning(tss_protocol::Operation),

    /// The requesting party is not part of the party set.
    #[error("party {0} is not registered")]
    UnknownParty(String),

    /// The session was aborted by a `CommunicationError`.
    #[error(transparent)]
    Canceled(#[from] tss_protocol::CommunicationError),
}

/// Result type used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;
