use serde::{de::DeserializeOwned, Serialize};

use tss_engine::{ProtocolDriver, RoundBuffer};
use tss_protocol::{Operation, PartyDescriptor, ProtocolMessage};

use crate::controller::SessionController;
use crate::store::MessageStore;
use crate::{Error, Result};

/// Drives one [`ProtocolDriver`] run using the party's sorted
/// descriptor list and the shared [`MessageStore`]/[`SessionController`],
/// translating between wire [`ProtocolMessage`]s and the driver's own
/// typed incoming/outgoing messages.
///
/// This is the generic bridge the coordinator's own `Bridge` type plays
/// in the engine crate, lifted one layer up so it can also update
/// session phase and round-tag bookkeeping as it goes.
pub struct SessionRunner<D: ProtocolDriver> {
    driver: Option<D>,
    buffer: RoundBuffer<D::Incoming>,
    local: PartyDescriptor,
    parties: Vec<PartyDescriptor>,
    operation: Operation,
    /// `(prefix, messages expected per peer)` for each round, in order.
    round_prefixes: &'static [(&'static str, u16)],
}

impl<D> SessionRunner<D>
where
    D: ProtocolDriver,
    D::Incoming: DeserializeOwned + Send + Sync,
    D::Outgoing: Serialize + Send + Sync,
{
    /// Wrap `driver`, configured to expect `rounds` rounds each with
    /// `messages_per_round` incoming messages from every other party.
    pub fn new(
        driver: D,
        local: PartyDescriptor,
        parties: Vec<PartyDescriptor>,
        operation: Operation,
        round_prefixes: &'static [(&'static str, u16)],
    ) -> Self {
        let peers = (parties.len() as u16).saturating_sub(1);
        let buffer = RoundBuffer::new_fixed(
            round_prefixes.len() as u16,
            peers,
        );
        Self {
            driver: Some(driver),
            buffer,
            local,
            parties,
            operation,
            round_prefixes,
        }
    }

    /// Kick off round 1: ask the driver to produce its first batch of
    /// messages.
    pub fn start(&mut self) -> Result<Vec<ProtocolMessage>> {
        let (round, outgoing) = self
            .driver
            .as_mut()
            .expect("driver runs to completion exactly once")
            .proceed()
            .map_err(|_| Error::Engine("driver failed to start".into()))?;
        self.to_wire(round, outgoing)
    }

    /// Feed every message the store has collected for round `round`
    /// (tagged by `prefix`) into the driver, and advance if that was
    /// enough. Returns the messages produced for the next round, if
    /// the driver advanced, or `None` if the round is still waiting on
    /// more peers.
    pub fn advance(
        &mut self,
        store: &MessageStore,
        controller: &SessionController,
        round: u16,
        prefix: &str,
    ) -> Result<Option<Vec<ProtocolMessage>>> {
        let expected = self
            .round_prefixes
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, n)| *n)
            .unwrap_or(1) as usize
            * (self.parties.len() - 1);

        if store.count_with_prefix(prefix) < expected {
            return Ok(None);
        }

        for message in store.drain_with_prefix(prefix) {
            let incoming: D::Incoming = serde_json::from_slice(&message.bytes)
                .map_err(|e| Error::Engine(e.to_string()))?;
            self.driver
                .as_mut()
                .expect("driver runs to completion exactly once")
                .handle_incoming(incoming)
                .map_err(|_| {
                    Error::Engine(format!(
                        "driver rejected round {round} message"
                    ))
                })?;
        }

        controller.mark_round_advanced(self.operation);

        if round as usize == self.round_prefixes.len() {
            // Last round: the driver has everything it needs, no
            // further `proceed()` call is made.
            return Ok(Some(Vec::new()));
        }

        let (next_round, outgoing) = self
            .driver
            .as_mut()
            .expect("driver runs to completion exactly once")
            .proceed()
            .map_err(|_| Error::Engine("driver failed to proceed".into()))?;
        Ok(Some(self.to_wire(next_round, outgoing)?))
    }

    /// Whether every round has been driven to completion.
    pub fn is_finished(&self, round: u16) -> bool {
        round as usize == self.round_prefixes.len()
    }

    /// Consume the runner and extract the driver's final output.
    pub fn finish(mut self) -> Result<D::Output> {
        self.driver
            .take()
            .expect("driver runs to completion exactly once")
            .finish()
            .map_err(|_| Error::Engine("driver failed to finish".into()))
    }

    fn to_wire(
        &self,
        round: u16,
        outgoing: Vec<D::Outgoing>,
    ) -> Result<Vec<ProtocolMessage>> {
        let prefix = self
            .round_prefixes
            .get(round.saturating_sub(1) as usize)
            .map(|(p, _)| *p)
            .unwrap_or("");
        outgoing
            .into_iter()
            .map(|message| {
                let bytes = serde_json::to_vec(&message)
                    .map_err(|e| Error::Engine(e.to_string()))?;
                Ok(ProtocolMessage {
                    from: self.local.clone(),
                    to: Vec::new(),
                    is_broadcast: true,
                    bytes,
                    message_type: prefix.to_string(),
                    routing: Vec::new(),
                })
            })
            .collect()
    }
}
