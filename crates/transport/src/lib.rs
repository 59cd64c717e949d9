//! Peer-to-peer UDP transport for the threshold ECDSA coordinator.
//!
//! This crate is deliberately dumb: it moves opaque bytes between
//! addresses, splitting and rejoining oversized payloads and
//! suppressing duplicate deliveries. Framing the bytes as
//! [`tss_protocol::Envelope`] JSON and deciding what to do with them
//! is `tss-core`'s job.
#![deny(missing_docs)]

mod chunk;
mod dedup;
mod error;
mod socket;

pub use chunk::Chunk;
pub use dedup::DedupCache;
pub use error::{Error, Result};
pub use socket::{Inbound, P2pTransport, TransportConfig};
