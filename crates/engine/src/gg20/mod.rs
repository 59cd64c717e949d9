//! GG20 threshold ECDSA state machines wrapped behind [`crate::ProtocolDriver`].
mod keygen;
mod presign;
mod sign;

pub use keygen::{KeyShare, KeygenDriver};
pub use presign::{OfflineResult, ParticipantDriver, PreSignDriver};
pub use sign::{Signature, SignOnlineDriver};

fn keccak_address(public_key: &[u8]) -> String {
    use sha3::{Digest, Keccak256};
    // Uncompressed SEC1 points start with a 0x04 tag byte.
    let bytes = &public_key[1..];
    let digest = Keccak256::digest(bytes);
    format!("0x{}", tss_protocol::hex::encode(&digest[12..]))
}
