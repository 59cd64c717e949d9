use std::collections::HashMap;
use std::sync::Mutex;

/// Collects partial signature shares for the one-round signing path.
///
/// Grounded in the coordinator's `HandleOneRoundSigning`: every
/// participant computes its own share locally (no prior rounds),
/// broadcasts it, and collects shares from the rest of the quorum
/// before combining. This aggregator only does the collection and
/// readiness check; combining shares into a final signature is
/// `tss-engine`'s job; see [`crate::aggregator::SignatureAggregator::take_shares`].
#[derive(Default)]
pub struct SignatureAggregator {
    /// Shares needed from *other* parties before the quorum is met
    /// (the quorum minus this node's own share).
    needed_from_peers: usize,
    shares: Mutex<HashMap<usize, Vec<u8>>>,
}

impl SignatureAggregator {
    /// Create an aggregator that waits for `quorum - 1` peer shares
    /// (this party's own share is supplied separately via
    /// [`Self::seed_local_share`]).
    pub fn new(quorum: u16) -> Self {
        Self {
            needed_from_peers: quorum.saturating_sub(1) as usize,
            shares: Mutex::new(HashMap::new()),
        }
    }

    /// Record this party's own locally-computed share.
    pub fn seed_local_share(&self, party_index: usize, share: Vec<u8>) {
        self.shares.lock().unwrap().insert(party_index, share);
    }

    /// Record a share received from a peer.
    ///
    /// Returns `true` once the quorum (this node's share plus
    /// `quorum - 1` peers) has been reached.
    pub fn add_share(&self, party_index: usize, share: Vec<u8>) -> bool {
        let mut shares = self.shares.lock().unwrap();
        shares.insert(party_index, share);
        // +1 because `needed_from_peers` excludes this node's own share,
        // but `shares` includes it once seeded.
        shares.len() > self.needed_from_peers
    }

    /// Whether the quorum (this node's share plus `quorum - 1` peers)
    /// has been reached, without draining the collected shares.
    pub fn is_ready(&self) -> bool {
        self.shares.lock().unwrap().len() > self.needed_from_peers
    }

    /// Take every collected share, sorted by party index for
    /// deterministic combination order.
    pub fn take_shares(&self) -> Vec<(usize, Vec<u8>)> {
        let mut shares: Vec<(usize, Vec<u8>)> =
            self.shares.lock().unwrap().drain().collect();
        shares.sort_by_key(|(index, _)| *index);
        shares
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn becomes_ready_once_quorum_shares_are_in() {
        let aggregator = SignatureAggregator::new(3);
        aggregator.seed_local_share(0, vec![1]);
        assert!(!aggregator.add_share(1, vec![2]));
        assert!(aggregator.add_share(2, vec![3]));
    }

    #[test]
    fn take_shares_is_sorted_by_party_index() {
        let aggregator = SignatureAggregator::new(3);
        aggregator.add_share(2, vec![9]);
        aggregator.add_share(0, vec![7]);
        aggregator.add_share(1, vec![8]);
        let shares = aggregator.take_shares();
        let indices: Vec<_> = shares.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
