use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::{Error, Result};

/// One piece of a payload too large for a single UDP datagram.
///
/// Mirrors the coordinator's own chunking: payloads larger than the
/// configured buffer size are split, hashed so their parts can be
/// correlated, and numbered so they can be rejoined in order on the
/// receiving side regardless of datagram arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Hex-encoded SHA-256 hash of the full, unsplit payload.
    pub hash: String,
    /// How many parts the payload was split into.
    pub total_parts: usize,
    /// 1-based index of this part.
    pub part: usize,
    /// This part's bytes.
    pub data: Vec<u8>,
}

/// Split `payload` into chunks of at most `chunk_size` bytes.
///
/// Returns a single-element vector, unchunked, if `payload` already
/// fits within `chunk_size` — callers should prefer sending the raw
/// payload directly in that case rather than paying the chunk framing
/// overhead.
pub fn split(payload: &[u8], chunk_size: usize) -> Vec<Chunk> {
    let hash = hex::encode(Sha256::digest(payload));
    let parts: Vec<&[u8]> = payload.chunks(chunk_size.max(1)).collect();
    let total_parts = parts.len();
    parts
        .into_iter()
        .enumerate()
        .map(|(i, data)| Chunk {
            hash: hash.clone(),
            total_parts,
            part: i + 1,
            data: data.to_vec(),
        })
        .collect()
}

/// Buffers chunks by their payload hash until every part has arrived,
/// then joins them back into the original payload.
#[derive(Default)]
pub struct Reassembler {
    pending: HashMap<String, Vec<Option<Vec<u8>>>>,
}

impl Reassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one chunk. Returns the reassembled payload once every part
    /// for its hash has arrived.
    pub fn add(&mut self, chunk: Chunk) -> Result<Option<Vec<u8>>> {
        let slots = self
            .pending
            .entry(chunk.hash.clone())
            .or_insert_with(|| vec![None; chunk.total_parts]);

        if slots.len() != chunk.total_parts {
            return Err(Error::InconsistentChunking(chunk.hash));
        }

        if let Some(slot) = slots.get_mut(chunk.part.saturating_sub(1)) {
            *slot = Some(chunk.data);
        }

        if slots.iter().all(Option::is_some) {
            let slots = self.pending.remove(&chunk.hash).unwrap();
            let payload = slots
                .into_iter()
                .flat_map(|part| part.unwrap_or_default())
                .collect();
            Ok(Some(payload))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_rejoins_a_payload() {
        let payload: Vec<u8> = (0..250u16).map(|b| b as u8).collect();
        let chunks = split(&payload, 64);
        assert_eq!(chunks.len(), 4);

        let mut reassembler = Reassembler::new();
        let mut joined = None;
        for chunk in chunks {
            if let Some(payload) = reassembler.add(chunk).unwrap() {
                joined = Some(payload);
            }
        }
        assert_eq!(joined.unwrap(), payload);
    }

    #[test]
    fn small_payload_is_a_single_chunk() {
        let payload = b"short".to_vec();
        let chunks = split(&payload, 64);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_parts, 1);
    }

    #[test]
    fn reassembly_is_order_independent() {
        let payload: Vec<u8> = (0..100u8).collect();
        let mut chunks = split(&payload, 30);
        chunks.reverse();

        let mut reassembler = Reassembler::new();
        let mut joined = None;
        for chunk in chunks {
            if let Some(payload) = reassembler.add(chunk).unwrap() {
                joined = Some(payload);
            }
        }
        assert_eq!(joined.unwrap(), payload);
    }
}
