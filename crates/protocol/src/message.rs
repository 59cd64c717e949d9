use serde::{Deserialize, Serialize};

use crate::PartyDescriptor;

/// A round message produced by the crypto engine, en route to the
/// transport.
///
/// `bytes` and `routing` are produced by, and opaque to, the core —
/// only the crypto engine that emitted them can interpret their
/// contents. The core only ever inspects `from`, `to`, `is_broadcast`
/// and `message_type` to decide delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMessage {
    /// Sender of this message.
    pub from: PartyDescriptor,
    /// Recipients of this message; empty when `is_broadcast`.
    #[serde(default)]
    pub to: Vec<PartyDescriptor>,
    /// Whether this message should be delivered to every peer.
    pub is_broadcast: bool,
    /// Opaque wire bytes, interpreted only by the crypto engine.
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
    /// Round-tag string, e.g. `"KGRound2Message1"`.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Opaque engine-specific routing metadata.
    #[serde(default, with = "hex::serde")]
    pub routing: Vec<u8>,
}

impl ProtocolMessage {
    /// Unique store key for this message, per spec §3:
    /// `"Type=<type>|From=<id>|To=[<id>,...]|Broadcast=<bool>"`.
    ///
    /// First writer for a given key wins; this is the de-duplication
    /// key used by [`crate::Envelope`]'s consumer, the message store.
    pub fn store_key(&self) -> String {
        let to = self
            .to
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "Type={}|From={}|To=[{}]|Broadcast={}",
            self.message_type,
            self.from.id,
            to,
            self.is_broadcast
        )
    }

    /// Whether this message is addressed to `local`, either directly
    /// or via broadcast.
    pub fn addressed_to(&self, local: &crate::PartyIdentity) -> bool {
        self.is_broadcast || self.to.iter().any(|p| &p.id == local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PartyDescriptor;

    fn party(id: &str, index: usize) -> PartyDescriptor {
        PartyDescriptor {
            id: crate::PartyIdentity::new(id).unwrap(),
            moniker: format!("moniker_{id}"),
            index,
        }
    }

    #[test]
    fn store_key_is_stable_for_identical_messages() {
        let a = ProtocolMessage {
            from: party("1", 0),
            to: vec![],
            is_broadcast: true,
            bytes: vec![1, 2, 3],
            message_type: "KGRound1Message".into(),
            routing: vec![],
        };
        let b = ProtocolMessage {
            bytes: vec![9, 9, 9], // payload differs, key must not
            ..a.clone()
        };
        assert_eq!(a.store_key(), b.store_key());
    }

    #[test]
    fn store_key_differs_by_recipient() {
        let base = ProtocolMessage {
            from: party("1", 0),
            to: vec![party("2", 1)],
            is_broadcast: false,
            bytes: vec![],
            message_type: "KGRound2Message2".into(),
            routing: vec![],
        };
        let other = ProtocolMessage {
            to: vec![party("3", 2)],
            ..base.clone()
        };
        assert_ne!(base.store_key(), other.store_key());
    }
}
