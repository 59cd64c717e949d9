use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::PartyIdentity;

/// Configuration for one keygen or keysign session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Total number of parties `n`.
    pub parties: u16,
    /// Threshold `t` for key generation: `1 <= t < n`.
    pub threshold: u16,
    /// Quorum `q` required to sign: `t < q <= n`.
    pub quorum: u16,
    /// This node's identity.
    pub local_id: PartyIdentity,
}

impl SessionConfig {
    /// Validate the invariants of spec §3: `1 <= t < N`, `t < q <= N`.
    pub fn validate(&self) -> Result<(), String> {
        if !(1 <= self.threshold && self.threshold < self.parties) {
            return Err(format!(
                "threshold {} must satisfy 1 <= t < parties ({})",
                self.threshold, self.parties
            ));
        }
        if !(self.threshold < self.quorum && self.quorum <= self.parties)
        {
            return Err(format!(
                "quorum {} must satisfy threshold ({}) < q <= parties ({})",
                self.quorum, self.threshold, self.parties
            ));
        }
        Ok(())
    }
}

/// Lifecycle phase of a [`crate::session`] runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Not yet started.
    Idle,
    /// Allocating the engine party (pre-parameters, etc).
    Starting,
    /// Rounds are being exchanged.
    Running,
    /// The engine produced a result; persisting/aggregating it.
    Finalizing,
    /// Terminal: completed successfully.
    Done,
    /// Terminal: a `ProtocolError` or delivery error occurred.
    Failed,
    /// Terminal: a `CommunicationError` aborted the session.
    Canceled,
}

impl SessionPhase {
    /// Whether this phase is terminal (`DONE | FAILED | CANCELED`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Done
                | SessionPhase::Failed
                | SessionPhase::Canceled
        )
    }
}

/// Snapshot of a session's lifecycle state.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Current phase.
    pub phase: SessionPhase,
    /// When the session started.
    pub started_at: SystemTime,
    /// Wall-clock time the last round advanced, for diagnostics.
    pub last_round_advanced: Option<SystemTime>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            started_at: SystemTime::now(),
            last_round_advanced: None,
        }
    }
}

/// Which operation a [`CommunicationError`] aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Key generation.
    Keygen,
    /// Threshold signing.
    Keysign,
}

/// An explicit, broadcast-visible abort of an in-flight session.
///
/// Raised locally when an inbound frame fails to parse, or received
/// from a peer's `*_CANCEL` envelope; in both cases every node aborts
/// the matching in-flight session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationError {
    /// Identity of the peer blamed for the abort.
    pub peer_id: PartyIdentity,
    /// Which operation this aborts.
    pub operation: Operation,
    /// When the error was raised.
    pub time: std::time::SystemTime,
}

impl std::fmt::Display for CommunicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "communication error from peer {} during {:?}",
            self.peer_id, self.operation
        )
    }
}

impl std::error::Error for CommunicationError {}
