use std::time::SystemTime;

use tss_protocol::{
    CommunicationError, Envelope, EnvelopeKind, KeysignRequest, Operation,
    PartyIdentity, ProtocolMessage,
};

use crate::Result;

/// What the dispatcher decided to do with one inbound datagram.
///
/// [`crate::controller::SessionController`] consumes these; the
/// dispatcher itself has no session state, it only classifies.
#[derive(Debug)]
pub enum DispatchAction {
    /// Bind or refresh a peer's address.
    Handshake { pubkey: String, peer_addr: String },
    /// Forget a peer's address.
    Disconnect { pubkey: String, peer_addr: String },
    /// Start key generation, if not already running.
    KeygenStart,
    /// One key generation round message.
    KeygenMsg(ProtocolMessage),
    /// Abort the in-flight key generation session.
    KeygenCancel(CommunicationError),
    /// Start threshold signing, if not already running.
    KeysignStart(KeysignRequest),
    /// One threshold signing round message.
    KeysignMsg(ProtocolMessage),
    /// One partial signature share for the one-round signing path.
    KeysignOneRound { party_id: usize, si: String },
    /// Abort the in-flight threshold signing session.
    KeysignCancel(CommunicationError),
    /// The frame could not be parsed or failed validation; the caller
    /// must abort whichever session is presently blamed and broadcast
    /// the resulting [`CommunicationError`].
    UnparsableFrame(CommunicationError),
    /// A round message addressed from the local party to itself. An
    /// expected, recurring condition (the local node is also one of
    /// the broadcast's logical senders); log-and-drop, never an error.
    SelfAddressed,
}

/// Tells the dispatcher which operation is "in flight" right now, so an
/// unparsable frame can be blamed on the right one.
///
/// Mirrors the coordinator's own classification: a frame that fails to
/// parse during an active key generation is blamed on keygen; any other
/// unparsable frame (including when no keysign has ever started) is
/// blamed on keysign.
pub trait SessionActivity {
    /// Whether key generation is currently running.
    fn keygen_is_started(&self) -> bool;
    /// Whether a keysign session has ever been created.
    fn keysign_instance_exists(&self) -> bool;
}

/// Stateless router from raw datagram bytes to a [`DispatchAction`].
pub struct Dispatcher {
    local_id: PartyIdentity,
}

impl Dispatcher {
    /// Create a dispatcher for the given local identity.
    pub fn new(local_id: PartyIdentity) -> Self {
        Self { local_id }
    }

    /// Classify one inbound datagram.
    pub fn dispatch(
        &self,
        bytes: &[u8],
        activity: &impl SessionActivity,
    ) -> Result<DispatchAction> {
        let envelope = match self.parse(bytes) {
            Ok(envelope) => envelope,
            Err(_) => {
                return Ok(DispatchAction::UnparsableFrame(
                    self.classify_unparsable(activity),
                ));
            }
        };

        use EnvelopeKind::*;
        Ok(match envelope.kind {
            TssHandshakeMsg => DispatchAction::Handshake {
                pubkey: envelope.from.to_string(),
                peer_addr: envelope.peer_addr.unwrap_or_default(),
            },
            TssDisconnectMsg => DispatchAction::Disconnect {
                pubkey: envelope.from.to_string(),
                peer_addr: envelope.peer_addr.unwrap_or_default(),
            },
            TssKeygenStartMsg => DispatchAction::KeygenStart,
            TssKeygenMsg => {
                let message = envelope.tss_message.unwrap();
                if self.is_self_addressed(&message) {
                    DispatchAction::SelfAddressed
                } else {
                    DispatchAction::KeygenMsg(message)
                }
            }
            TssKeygenCancelMsg => DispatchAction::KeygenCancel(
                envelope.communication_error.unwrap(),
            ),
            TssKeysignStartMsg => {
                DispatchAction::KeysignStart(envelope.keysign_request.unwrap())
            }
            TssKeysignMsg => {
                let message = envelope.tss_message.unwrap();
                if self.is_self_addressed(&message) {
                    DispatchAction::SelfAddressed
                } else {
                    DispatchAction::KeysignMsg(message)
                }
            }
            TssKeysingOneRound => DispatchAction::KeysignOneRound {
                party_id: envelope.party_id.unwrap(),
                si: envelope.si.unwrap(),
            },
            TssKeysignCancelMsg => DispatchAction::KeysignCancel(
                envelope.communication_error.unwrap(),
            ),
        })
    }

    /// Build the broadcast `*_CANCEL` envelope for a [`CommunicationError`]
    /// this node raised.
    pub fn cancel_envelope(&self, error: &CommunicationError) -> Envelope {
        let kind = match error.operation {
            Operation::Keygen => EnvelopeKind::TssKeygenCancelMsg,
            Operation::Keysign => EnvelopeKind::TssKeysignCancelMsg,
        };
        Envelope {
            kind,
            from: self.local_id.clone(),
            pubkey: None,
            peer_addr: None,
            tss_message: None,
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: Some(SystemTime::now()),
            communication_error: Some(error.clone()),
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<Envelope> {
        let envelope = Envelope::from_json(bytes)?;
        envelope.validate()?;
        Ok(envelope)
    }

    fn is_self_addressed(&self, message: &ProtocolMessage) -> bool {
        message.from.id == self.local_id
    }

    fn classify_unparsable(
        &self,
        activity: &impl SessionActivity,
    ) -> CommunicationError {
        let operation = if activity.keygen_is_started()
            || !activity.keysign_instance_exists()
        {
            Operation::Keygen
        } else {
            Operation::Keysign
        };
        CommunicationError {
            peer_id: self.local_id.clone(),
            operation,
            time: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Activity {
        keygen_started: bool,
        keysign_exists: bool,
    }

    impl SessionActivity for Activity {
        fn keygen_is_started(&self) -> bool {
            self.keygen_started
        }
        fn keysign_instance_exists(&self) -> bool {
            self.keysign_exists
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(PartyIdentity::new("1").unwrap())
    }

    fn activity() -> Activity {
        Activity {
            keygen_started: true,
            keysign_exists: true,
        }
    }

    #[test]
    fn a_keygen_message_from_the_local_party_is_log_and_dropped() {
        let envelope = Envelope {
            kind: EnvelopeKind::TssKeygenMsg,
            from: PartyIdentity::new("1").unwrap(),
            pubkey: None,
            peer_addr: None,
            tss_message: Some(ProtocolMessage {
                from: tss_protocol::PartyDescriptor {
                    id: PartyIdentity::new("1").unwrap(),
                    moniker: "moniker_1".into(),
                    index: 0,
                },
                to: vec![],
                is_broadcast: true,
                bytes: vec![],
                message_type: "KGRound1Message".into(),
                routing: vec![],
            }),
            keysign_request: None,
            si: None,
            party_id: None,
            sent_time: Some(SystemTime::now()),
            communication_error: None,
        };
        let action = dispatcher()
            .dispatch(&envelope.to_json().unwrap(), &activity())
            .unwrap();
        assert!(matches!(action, DispatchAction::SelfAddressed));
    }

    #[test]
    fn garbage_bytes_are_classified_as_keygen_when_keygen_is_running() {
        let action = dispatcher()
            .dispatch(
                b"not json",
                &Activity {
                    keygen_started: true,
                    keysign_exists: true,
                },
            )
            .unwrap();
        match action {
            DispatchAction::UnparsableFrame(err) => {
                assert_eq!(err.operation, Operation::Keygen)
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn garbage_bytes_are_classified_as_keysign_when_keygen_is_idle_and_keysign_exists(
    ) {
        let action = dispatcher()
            .dispatch(
                b"not json",
                &Activity {
                    keygen_started: false,
                    keysign_exists: true,
                },
            )
            .unwrap();
        match action {
            DispatchAction::UnparsableFrame(err) => {
                assert_eq!(err.operation, Operation::Keysign)
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn no_keysign_instance_yet_defaults_to_keygen() {
        let action = dispatcher()
            .dispatch(
                b"not json",
                &Activity {
                    keygen_started: false,
                    keysign_exists: false,
                },
            )
            .unwrap();
        match action {
            DispatchAction::UnparsableFrame(err) => {
                assert_eq!(err.operation, Operation::Keygen)
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
