use cggmp_threshold_ecdsa::curv::elliptic::curves::secp256_k1::Secp256k1;
use cggmp_threshold_ecdsa::gg_2020::state_machine::keygen::{
    Keygen, LocalKey, ProtocolMessage,
};
use round_based::{Msg, StateMachine};

use crate::{Error, Parameters, ProtocolDriver, Result, RoundMsg};

/// The output of a completed key generation run: this party's share of
/// the group's signing key.
pub type KeyShare = LocalKey<Secp256k1>;

/// Drives one GG20 key generation run to completion.
///
/// Runs for exactly four rounds, matching the coordinator's
/// `KGRound1Message` / `KGRound2Message1` / `KGRound2Message2` /
/// `KGRound3Message` sequence; `RoundBuffer::new_fixed(4, n - 1)` gates
/// each round on hearing from every other party.
pub struct KeygenDriver {
    inner: Keygen,
}

impl KeygenDriver {
    /// Start key generation for `party_number` (1-based, matching the
    /// sorted party index plus one).
    pub fn new(parameters: Parameters, party_number: u16) -> Result<Self> {
        let inner = Keygen::new(
            party_number,
            parameters.threshold,
            parameters.parties,
        )
        .map_err(|e| Error::Proceed(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ProtocolDriver for KeygenDriver {
    type Error = Error;
    type Incoming = Msg<ProtocolMessage>;
    type Outgoing = RoundMsg<ProtocolMessage>;
    type Output = KeyShare;

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
