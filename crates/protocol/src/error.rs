use thiserror::Error;

/// Errors produced while building or parsing protocol wire types.
#[derive(Debug, Error)]
pub enum Error {
    /// A party identity string was not a valid decimal big integer.
    #[error("party identity \"{0}\" is not a decimal integer")]
    InvalidPartyIdentity(String),

    /// The local identity was not present in the known party set.
    #[error("local party is not in the set of known parties")]
    LocalNotInSet,

    /// Envelope JSON failed to parse.
    #[error("envelope parse error: {0}")]
    EnvelopeParse(#[from] serde_json::Error),

    /// Envelope decoded but was missing a field required for its kind.
    #[error("envelope of kind \"{0}\" is missing required field \"{1}\"")]
    MissingField(&'static str, &'static str),

    /// Base64 payload in an envelope could not be decoded.
    #[error("base64 decode error: {0}")]
    Base64(String),
}
