//! Crypto engine boundary for the threshold ECDSA coordinator.
//!
//! Everything in this crate is a deliberately replaceable black box:
//! the core only ever talks to it through [`ProtocolDriver`]. Swapping
//! the GG20 state machines behind [`gg20`] for a different threshold
//! signature scheme should never require touching `tss-core`.
#![deny(missing_docs)]

mod error;
mod preparams;
mod round;

#[cfg(feature = "gg20")]
pub mod gg20;

pub use error::{Error, Result};
pub use preparams::{generate_pre_params, PreParams, PRE_PARAMS_TIMEOUT};
pub use round::{RoundBuffer, RoundMsg};

/// secp256k1's group order, in bits — used to truncate an
/// over-long message hash to a valid scalar the same way the curve's
/// own `hashToInt` does.
const SECP256K1_ORDER_BITS: usize = 256;

/// Convert a message hash into the scalar value the signing round
/// actually signs over.
///
/// Mirrors the coordinator's own hash-to-scalar truncation: a hash
/// longer than the curve order's byte length is truncated from the
/// left, and if the order isn't a whole number of bits the excess
/// low bits are shifted out. For an already-32-byte hash on
/// secp256k1 this is the identity transform; the general form only
/// matters for non-standard-length inputs.
pub fn message_to_scalar(hash: &[u8]) -> [u8; 32] {
    let order_bytes = SECP256K1_ORDER_BITS.div_ceil(8);
    let truncated = if hash.len() > order_bytes {
        &hash[..order_bytes]
    } else {
        hash
    };

    let mut value = num_bigint::BigUint::from_bytes_be(truncated);
    let excess = truncated.len() * 8;
    if excess > SECP256K1_ORDER_BITS {
        value >>= excess - SECP256K1_ORDER_BITS;
    }

    let mut out = [0u8; 32];
    let bytes = value.to_bytes_be();
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Parameters shared by every session of a key: number of parties and
/// the signing threshold.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Parameters {
    /// Total number of parties `n`.
    pub parties: u16,
    /// Threshold `t`: `t + 1` parties must cooperate to sign.
    pub threshold: u16,
}

/// Drives one instance of a round-based MPC protocol to completion.
///
/// A driver owns one state machine run (one keygen, one offline
/// pre-signing stage, or one online signing round). The bridge in
/// `tss-core` feeds it incoming messages round by round and dispatches
/// whatever it produces; the driver itself knows nothing about the
/// network.
pub trait ProtocolDriver {
    /// Error type returned by this driver's operations.
    type Error;
    /// Wire type of messages this driver consumes.
    type Incoming;
    /// Wire type of messages this driver produces.
    type Outgoing;
    /// Value produced once the protocol completes.
    type Output;

    /// Feed one incoming message into the state machine.
    fn handle_incoming(
        &mut self,
        message: Self::Incoming,
    ) -> std::result::Result<(), Self::Error>;

    /// Advance the state machine, returning the round number just
    /// completed and the messages it produced for the next round.
    fn proceed(
        &mut self,
    ) -> std::result::Result<(u16, Vec<Self::Outgoing>), Self::Error>;

    /// Consume the driver and extract its final output.
    fn finish(self) -> std::result::Result<Self::Output, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_32_byte_hash_passes_through_unchanged() {
        let hash = [7u8; 32];
        assert_eq!(message_to_scalar(&hash), hash);
    }

    #[test]
    fn a_longer_hash_is_truncated_from_the_left() {
        let mut hash = [0u8; 40];
        hash[..32].copy_from_slice(&[9u8; 32]);
        hash[32..].copy_from_slice(&[0xffu8; 8]);
        assert_eq!(message_to_scalar(&hash), [9u8; 32]);
    }
}
