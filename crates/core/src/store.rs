use std::collections::HashMap;
use std::sync::Mutex;

use tss_protocol::ProtocolMessage;

/// De-duplicating store for in-flight round messages.
///
/// Keyed by [`ProtocolMessage::store_key`], so a redelivered or
/// re-broadcast message for the same round/sender/recipients is
/// dropped rather than double-counted — mirroring the coordinator's
/// own `KeygenMsgsStorage`/`KeysignMsgsStorage` maps, which are keyed
/// by the same `Type|From|To|Broadcast` tuple.
#[derive(Default)]
pub struct MessageStore {
    messages: Mutex<HashMap<String, ProtocolMessage>>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `message` if its store key has not been seen yet.
    ///
    /// Returns `true` if this was a new message accepted into the
    /// store, `false` if it was a duplicate and therefore ignored.
    pub fn insert(&self, message: ProtocolMessage) -> bool {
        let mut messages = self.messages.lock().unwrap();
        let key = message.store_key();
        if messages.contains_key(&key) {
            return false;
        }
        messages.insert(key, message);
        true
    }

    /// Count of stored messages whose `message_type` starts with
    /// `prefix`.
    ///
    /// Round gating gets to ask "have I got everything for round 2
    /// yet?" without needing to know whether round 2 is one wire type
    /// or several (as with `KGRound2Message1`/`KGRound2Message2`
    /// sharing the `KGRound2` prefix).
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.message_type.starts_with(prefix))
            .count()
    }

    /// Drain every stored message whose `message_type` starts with
    /// `prefix`, in ascending order of sender identity.
    ///
    /// Ascending-by-sender delivery order is required for determinism:
    /// the crypto engine must see round messages in the same order on
    /// every node, and sender identity is the only ordering every node
    /// agrees on independent of arrival time.
    pub fn drain_with_prefix(&self, prefix: &str) -> Vec<ProtocolMessage> {
        let mut messages = self.messages.lock().unwrap();
        let keys: Vec<String> = messages
            .iter()
            .filter(|(_, m)| m.message_type.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        let mut drained: Vec<ProtocolMessage> = keys
            .into_iter()
            .filter_map(|k| messages.remove(&k))
            .collect();
        drained.sort_by(|a, b| a.from.id.cmp(&b.from.id));
        drained
    }

    /// Discard every stored message, invoked on session termination
    /// (success, cancellation, or failure) so a new session of the
    /// same kind starts from an empty store rather than inheriting
    /// stale round messages.
    pub fn reset(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tss_protocol::PartyDescriptor;

    fn party(id: &str, index: usize) -> PartyDescriptor {
        PartyDescriptor {
            id: tss_protocol::PartyIdentity::new(id).unwrap(),
            moniker: format!("moniker_{id}"),
            index,
        }
    }

    fn msg(from: &str, message_type: &str) -> ProtocolMessage {
        ProtocolMessage {
            from: party(from, 0),
            to: vec![],
            is_broadcast: true,
            bytes: vec![],
            message_type: message_type.into(),
            routing: vec![],
        }
    }

    #[test]
    fn duplicate_store_key_is_rejected() {
        let store = MessageStore::new();
        assert!(store.insert(msg("1", "KGRound1Message")));
        assert!(!store.insert(msg("1", "KGRound1Message")));
    }

    #[test]
    fn drain_is_sorted_by_sender_ascending() {
        let store = MessageStore::new();
        store.insert(msg("10", "KGRound1Message"));
        store.insert(msg("2", "KGRound1Message"));
        store.insert(msg("9", "KGRound1Message"));
        let drained = store.drain_with_prefix("KGRound1");
        let ids: Vec<_> =
            drained.iter().map(|m| m.from.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "9", "10"]);
    }

    #[test]
    fn count_and_drain_respect_prefix_not_exact_type() {
        let store = MessageStore::new();
        store.insert(msg("1", "KGRound2Message1"));
        store.insert(msg("2", "KGRound2Message2"));
        store.insert(msg("3", "KGRound3Message"));
        assert_eq!(store.count_with_prefix("KGRound2"), 2);
        assert_eq!(store.drain_with_prefix("KGRound2").len(), 2);
        assert_eq!(store.count_with_prefix("KGRound3"), 1);
    }

    #[test]
    fn reset_clears_every_stored_message() {
        let store = MessageStore::new();
        store.insert(msg("1", "KGRound1Message"));
        store.insert(msg("2", "KGRound1Message"));
        store.reset();
        assert_eq!(store.count_with_prefix("KGRound1"), 0);
    }
}
