use round_based::Msg;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

/// A round message tagged with the round it belongs to.
///
/// Mirrors the engine's internal `round_based::Msg` but carries the
/// round number alongside it so out-of-order delivery from the
/// transport can still be grouped correctly.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct RoundMsg<O>
where
    O: Send + Sync,
{
    round: u16,
    sender: u16,
    receiver: Option<u16>,
    body: O,
}

impl<O> RoundMsg<O>
where
    O: Send + Sync,
{
    /// Whether this round message is a broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.receiver.is_none()
    }

    /// The round this message belongs to.
    pub fn round_number(&self) -> u16 {
        self.round
    }

    /// Direct recipient, if this is not a broadcast.
    pub fn receiver(&self) -> Option<u16> {
        self.receiver
    }

    /// Tag a batch of `round_based` messages with their round number.
    pub fn from_round(round: u16, messages: Vec<Msg<O>>) -> Vec<Self> {
        messages
            .into_iter()
            .map(|m| RoundMsg {
                round,
                sender: m.sender,
                receiver: m.receiver,
                body: m.body,
            })
            .collect()
    }
}

impl<O> From<RoundMsg<O>> for Msg<O>
where
    O: Send + Sync,
{
    fn from(value: RoundMsg<O>) -> Self {
        Msg {
            sender: value.sender,
            receiver: value.receiver,
            body: value.body,
        }
    }
}

/// Buffers incoming round messages until every expected message for a
/// round has arrived.
///
/// This is the engine-side counterpart to the core's message store: the
/// store de-duplicates and routes frames from the network, this buffer
/// gates when a round has enough messages for the state machine to
/// advance.
pub struct RoundBuffer<I>
where
    I: DeserializeOwned,
{
    expected: HashMap<u16, u16>,
    messages: HashMap<u16, Vec<I>>,
}

impl<I> RoundBuffer<I>
where
    I: DeserializeOwned,
{
    /// Create a buffer for `rounds` rounds, each expecting exactly
    /// `messages_per_round` incoming messages before it is ready.
    pub fn new_fixed(rounds: u16, messages_per_round: u16) -> Self {
        let mut expected = HashMap::new();
        for i in 0..rounds {
            expected.insert(i + 1, messages_per_round);
        }
        Self {
            expected,
            messages: HashMap::new(),
        }
    }

    /// Number of rounds this buffer was configured for.
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    /// Whether this buffer has no rounds configured.
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    /// Record one incoming message for `round`.
    pub fn add_message(&mut self, round: u16, message: I) {
        self.messages.entry(round).or_default().push(message);
    }

    /// Whether every expected message for `round` has arrived.
    pub fn is_ready(&self, round: u16) -> bool {
        match (self.expected.get(&round), self.messages.get(&round)) {
            (Some(expected), Some(got)) => got.len() == *expected as usize,
            _ => false,
        }
    }

    /// Take the buffered messages for `round`.
    ///
    /// Callers must check [`Self::is_ready`] first; calling this before
    /// a round is ready returns whatever has arrived so far.
    pub fn take(&mut self, round: u16) -> Vec<I> {
        self.messages.remove(&round).unwrap_or_default()
    }
}
