use thiserror::Error;

/// Errors produced while driving a protocol round to completion.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying state machine rejected an incoming message.
    #[error("protocol engine rejected incoming message: {0}")]
    HandleIncoming(String),

    /// The underlying state machine could not proceed to the next round.
    #[error("protocol engine could not proceed: {0}")]
    Proceed(String),

    /// The underlying state machine could not be finalized.
    #[error("protocol engine could not finish: {0}")]
    Finish(String),

    /// The local party's index is not part of the signing participant set.
    #[error("local key index {0} is not among the signing participants")]
    LocalKeyNotParticipant(u16),

    /// Pre-parameter generation did not complete within the allotted time.
    #[error("pre-parameter generation did not complete within {0:?}")]
    PreParamsTimeout(std::time::Duration),

    /// The produced signature failed local verification against the
    /// group public key.
    #[error("generated signature failed verification")]
    VerifySignature,

    /// A round buffer was asked to take a round it never tracked.
    #[error("round {0} is not configured for this buffer")]
    UnknownRound(u16),
}

/// Result type used throughout the engine crate.
pub type Result<T> = std::result::Result<T, Error>;
