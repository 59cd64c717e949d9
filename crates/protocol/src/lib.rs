//! Wire types shared by every component of the threshold ECDSA
//! coordinator: party identities, protocol messages, the envelope
//! format exchanged over the peer-to-peer transport, and session
//! configuration.
#![deny(missing_docs)]

mod envelope;
mod error;
mod message;
mod party;
mod session;

pub use envelope::{Envelope, EnvelopeKind, KeysignRequest};
pub use error::Error;
pub use message::ProtocolMessage;
pub use party::{PartyDescriptor, PartyIdentity};
pub use session::{
    CommunicationError, Operation, SessionConfig, SessionPhase,
    SessionState,
};

pub use hex;

/// Result type used throughout the protocol crate.
pub type Result<T> = std::result::Result<T, Error>;
