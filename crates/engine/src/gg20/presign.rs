use cggmp_threshold_ecdsa::gg_2020::state_machine::keygen::LocalKey;
use cggmp_threshold_ecdsa::gg_2020::state_machine::sign::{
    CompletedOfflineStage, OfflineProtocolMessage, OfflineStage,
};
use round_based::{Msg, StateMachine};

use crate::{Error, ProtocolDriver, Result, RoundMsg};

type Secp256k1 = cggmp_threshold_ecdsa::curv::elliptic::curves::secp256_k1::Secp256k1;

/// Output of the offline pre-signing stage: everything needed to
/// produce a signature share without further network rounds.
pub type OfflineResult = CompletedOfflineStage;

/// Drives the six-round GG20 offline (pre-signing) stage.
///
/// Runs once `threshold + 1` parties have agreed on their participant
/// indices; `RoundBuffer::new_fixed(6, threshold)` gates each round.
pub struct PreSignDriver {
    inner: OfflineStage,
}

impl PreSignDriver {
    /// Start the offline stage for `party_index` (this party's 1-based
    /// rank within `participants`).
    pub fn new(
        party_index: u16,
        participants: Vec<u16>,
        local_key: LocalKey<Secp256k1>,
    ) -> Result<Self> {
        let inner = OfflineStage::new(party_index, participants, local_key)
            .map_err(|e| Error::Proceed(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ProtocolDriver for PreSignDriver {
    type Error = Error;
    type Incoming = Msg<OfflineProtocolMessage>;
    type Outgoing = RoundMsg<OfflineProtocolMessage>;
    type Output = OfflineResult;

    fn handle_incoming(&mut self, message: Self::Incoming) -> Result<()> {
        self.inner
            .handle_incoming(message)
            .map_err(|e| Error::HandleIncoming(e.to_string()))
    }

    fn proceed(&mut self) -> Result<(u16, Vec<Self::Outgoing>)> {
        self.inner
            .proceed()
            .map_err(|e| Error::Proceed(e.to_string()))?;
        let round = self.inner.current_round();
        let messages = self.inner.message_queue().drain(..).collect();
        Ok((round, RoundMsg::from_round(round, messages)))
    }

    fn finish(mut self) -> Result<Self::Output> {
        self.inner
            .pick_output()
            .ok_or_else(|| Error::Finish("no output produced".into()))?
            .map_err(|e| Error::Finish(e.to_string()))
    }
}

/// Exchanges this party's key-share index with the other signing
/// participants so every node agrees on the offline stage's
/// participant list before it starts.
///
/// A single broadcast round: each party announces its key-share index,
/// and `finish` returns the sorted, deduplicated union.
pub struct ParticipantDriver {
    party_number: u16,
    local_key_index: u16,
    participants: Vec<u16>,
}

impl ParticipantDriver {
    /// Create a new participant-index exchange for `party_number`,
    /// announcing `local_key_index`.
    pub fn new(party_number: u16, local_key_index: u16) -> Self {
        Self {
            party_number,
            local_key_index,
            participants: vec![local_key_index],
        }
    }
}

impl ProtocolDriver for ParticipantDriver {
    type Error = Error;
    type Incoming = Msg<u16>;
    type Outgoing = RoundMsg<u16>;
    type Output = Vec<u16>;

    fn handle_incoming(&mut self, message: Self::Incoming) -> Result<()> {
        self.participants.push(message.body);
        Ok(())
    }

    fn proceed(&mut self) -> Result<(u16, Vec<Self::Outgoing>)> {
        let messages = vec![Msg {
            sender: self.party_number,
            receiver: None,
            body: self.local_key_index,
        }];
        Ok((1, RoundMsg::from_round(1, messages)))
    }

    fn finish(mut self) -> Result<Self::Output> {
        self.participants.sort_unstable();
        self.participants.dedup();
        Ok(self.participants)
    }
}
