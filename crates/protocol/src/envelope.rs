use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{CommunicationError, PartyIdentity, ProtocolMessage};

/// Discriminant for [`Envelope::kind`], matching the wire tags exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Introduces a peer and its public key.
    TssHandshakeMsg,
    /// Announces a peer is leaving.
    TssDisconnectMsg,
    /// Starts a key generation session.
    TssKeygenStartMsg,
    /// Carries one round message of a key generation session.
    TssKeygenMsg,
    /// Aborts an in-flight key generation session.
    TssKeygenCancelMsg,
    /// Starts a threshold signing session.
    TssKeysignStartMsg,
    /// Carries one round message of a threshold signing session.
    TssKeysignMsg,
    /// Carries one partial signature share of a one-round signing.
    TssKeysingOneRound,
    /// Aborts an in-flight threshold signing session.
    TssKeysignCancelMsg,
}

/// Request payload for [`EnvelopeKind::TssKeysignStartMsg`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysignRequest {
    /// Message to be signed, as raw bytes.
    #[serde(with = "hex::serde")]
    pub msg: Vec<u8>,
    /// Whether to use the one-round signing path.
    pub one_round_signing: bool,
}

/// The single envelope type exchanged over the peer-to-peer transport.
///
/// Every field besides `kind` and `from` is optional: which ones are
/// populated, and required, is determined entirely by `kind`. See
/// [`Envelope::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminates which optional fields below apply.
    pub kind: EnvelopeKind,
    /// Sender of this envelope.
    pub from: PartyIdentity,
    /// `TSS_HANDSHAKE_MSG`: sender's public key, hex-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    /// `TSS_HANDSHAKE_MSG` / `TSS_DISCONNECT_MSG`: sender's reachable
    /// network address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_addr: Option<String>,
    /// `TSS_KEYGEN_MSG` / `TSS_KEYSIGN_MSG`: one round message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tss_message: Option<ProtocolMessage>,
    /// `TSS_KEYSIGN_START_MSG`: the message to sign and signing mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keysign_request: Option<KeysignRequest>,
    /// `TSS_KEYSIGN_ONE_ROUND`: this party's partial signature share,
    /// hex-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub si: Option<String>,
    /// `TSS_KEYSIGN_ONE_ROUND`: index of the party that produced `si`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<usize>,
    /// Wall-clock time the envelope was produced, used to time out
    /// stale handshakes and disconnects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_time: Option<SystemTime>,
    /// `TSS_KEYGEN_CANCEL_MSG` / `TSS_KEYSIGN_CANCEL_MSG`: why the
    /// session was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_error: Option<CommunicationError>,
}

impl Envelope {
    /// Parse an envelope from its JSON wire representation.
    pub fn from_json(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize this envelope to its JSON wire representation.
    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Check that the fields required for `self.kind` are present.
    ///
    /// A frame that deserializes but fails this check is the
    /// "unparsable frame" case from spec §7: it is treated the same
    /// as a JSON parse failure by the dispatcher.
    pub fn validate(&self) -> crate::Result<()> {
        use EnvelopeKind::*;
        let require = |present: bool, field: &'static str| {
            if present {
                Ok(())
            } else {
                Err(crate::Error::MissingField(self.kind_name(), field))
            }
        };
        match self.kind {
            TssHandshakeMsg => {
                require(self.pubkey.is_some(), "pubkey")?;
                require(self.peer_addr.is_some(), "peer_addr")
            }
            TssDisconnectMsg => {
                require(self.peer_addr.is_some(), "peer_addr")
            }
            TssKeygenStartMsg => Ok(()),
            TssKeygenMsg | TssKeysignMsg => {
                require(self.tss_message.is_some(), "tss_message")
            }
            TssKeygenCancelMsg | TssKeysignCancelMsg => require(
                self.communication_error.is_some(),
                "communication_error",
            ),
            TssKeysignStartMsg => {
                require(self.keysign_request.is_some(), "keysign_request")
            }
            TssKeysingOneRound => {
                require(self.si.is_some(), "si")?;
                require(self.party_id.is_some(), "party_id")
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        use EnvelopeKind::*;
        match self.kind {
            TssHandshakeMsg => "tss_handshake_msg",
            TssDisconnectMsg => "tss_disconnect_msg",
            TssKeygenStartMsg => "tss_keygen_start_msg",
            TssKeygenMsg => "tss_keygen_msg",
            TssKeygenCancelMsg => "tss_keygen_cancel_msg",
            TssKeysignStartMsg => "tss_keysign_start_msg",
            TssKeysignMsg => "tss_keysign_msg",
            TssKeysingOneRound => "tss_keysing_one_round",
            TssKeysignCancelMsg => "tss_keysign_cancel_msg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PartyIdentity;

    fn from() -> PartyIdentity {
        PartyIdentity::new("1").unwrap()
    }

    #[test]
    fn handshake_round_trips_through_json() {
        let env = Envelope {
            kind: EnvelopeKind::TssHandshakeMsg,
            from: from(),
            pubkey: Some("02abcd".into()),
            peer_addr: Some("127.0.0.1:9000".into()),
            tss_message: None,
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: Some(SystemTime::now()),
            communication_error: None,
        };
        let bytes = env.to_json().unwrap();
        let back = Envelope::from_json(&bytes).unwrap();
        assert_eq!(back.kind, EnvelopeKind::TssHandshakeMsg);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn handshake_missing_pubkey_fails_validation() {
        let env = Envelope {
            kind: EnvelopeKind::TssHandshakeMsg,
            from: from(),
            pubkey: None,
            peer_addr: Some("127.0.0.1:9000".into()),
            tss_message: None,
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: None,
            communication_error: None,
        };
        let err = env.validate().unwrap_err();
        assert!(matches!(err, crate::Error::MissingField(_, "pubkey")));
    }

    #[test]
    fn keygen_start_requires_no_extra_fields() {
        let env = Envelope {
            kind: EnvelopeKind::TssKeygenStartMsg,
            from: from(),
            pubkey: None,
            peer_addr: None,
            tss_message: None,
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: None,
            communication_error: None,
        };
        assert!(env.validate().is_ok());
    }
}
