use std::sync::Mutex;
use std::time::Duration;

use tss_protocol::{CommunicationError, Operation, SessionPhase, SessionState};

use crate::dispatcher::SessionActivity;
use crate::store::MessageStore;
use crate::{Error, Result};

/// How often the round advancer re-checks whether a round has
/// collected every message it needs.
///
/// Matches the coordinator's own `UpdateForRound` poll, which rechecks
/// once per second rather than waking on every single arrival —
/// simple, and cheap enough at these message volumes.
pub const ROUND_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the lifecycle state for one operation (key generation or
/// threshold signing) and its in-flight message store.
///
/// One [`SessionController`] exists per node and is shared by the
/// dispatcher (to check what is currently running) and the session
/// runners (to advance rounds and record terminal outcomes).
pub struct SessionController {
    keygen_state: Mutex<SessionState>,
    keysign_state: Mutex<SessionState>,
    keysign_instance_exists: Mutex<bool>,
    keygen_store: MessageStore,
    keysign_store: MessageStore,
}

impl Default for SessionController {
    fn default() -> Self {
        Self {
            keygen_state: Mutex::new(SessionState::default()),
            keysign_state: Mutex::new(SessionState::default()),
            keysign_instance_exists: Mutex::new(false),
            keygen_store: MessageStore::new(),
            keysign_store: MessageStore::new(),
        }
    }
}

impl SessionController {
    /// Create a controller with both operations idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The message store backing key generation's in-flight rounds.
    pub fn keygen_store(&self) -> &MessageStore {
        &self.keygen_store
    }

    /// The message store backing threshold signing's in-flight rounds.
    pub fn keysign_store(&self) -> &MessageStore {
        &self.keysign_store
    }

    /// Current phase of the given operation.
    pub fn phase(&self, operation: Operation) -> SessionPhase {
        self.state(operation).lock().unwrap().phase
    }

    /// Transition `operation` to `Starting`, unless it is already
    /// running.
    ///
    /// A second `*_START` for an operation already underway is a no-op
    /// at the protocol level (every node may broadcast its own start
    /// request); this only rejects if a session is genuinely active.
    pub fn begin(&self, operation: Operation) -> Result<()> {
        let mut state = self.state(operation).lock().unwrap();
        if !state.phase.is_terminal() && state.phase != SessionPhase::Idle {
            return Err(Error::AlreadyStarted(operation));
        }
        *state = SessionState {
            phase: SessionPhase::Starting,
            started_at: std::time::SystemTime::now(),
            last_round_advanced: None,
        };
        if operation == Operation::Keysign {
            *self.keysign_instance_exists.lock().unwrap() = true;
        }
        Ok(())
    }

    /// Move `operation` into `Running`, recording that a round just
    /// advanced.
    pub fn mark_round_advanced(&self, operation: Operation) {
        let mut state = self.state(operation).lock().unwrap();
        state.phase = SessionPhase::Running;
        state.last_round_advanced = Some(std::time::SystemTime::now());
    }

    /// Move `operation` into `Finalizing`, once the engine has produced
    /// a result that still needs persisting or aggregating.
    pub fn mark_finalizing(&self, operation: Operation) {
        self.state(operation).lock().unwrap().phase =
            SessionPhase::Finalizing;
    }

    /// Move `operation` to its terminal `Done` phase.
    pub fn complete(&self, operation: Operation) {
        self.state(operation).lock().unwrap().phase = SessionPhase::Done;
    }

    /// Move `operation` to its terminal `Failed` phase.
    pub fn fail(&self, operation: Operation) {
        self.state(operation).lock().unwrap().phase = SessionPhase::Failed;
    }

    /// Abort `operation` with a `CommunicationError`, only if it was
    /// actually running — a cancel for an operation already handled is
    /// logged and dropped, not reapplied.
    pub fn cancel(
        &self,
        operation: Operation,
        error: CommunicationError,
    ) -> Result<()> {
        let mut state = self.state(operation).lock().unwrap();
        if state.phase.is_terminal() {
            tracing::debug!(
                ?operation,
                "cancel for an operation already finished, ignoring"
            );
            return Ok(());
        }
        state.phase = SessionPhase::Canceled;
        Err(Error::Canceled(error))
    }

    fn state(&self, operation: Operation) -> &Mutex<SessionState> {
        match operation {
            Operation::Keygen => &self.keygen_state,
            Operation::Keysign => &self.keysign_state,
        }
    }
}

impl SessionActivity for SessionController {
    fn keygen_is_started(&self) -> bool {
        !matches!(
            self.keygen_state.lock().unwrap().phase,
            SessionPhase::Idle
        )
    }

    fn keysign_instance_exists(&self) -> bool {
        *self.keysign_instance_exists.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_then_begin_again_is_rejected() {
        let controller = SessionController::new();
        controller.begin(Operation::Keygen).unwrap();
        let err = controller.begin(Operation::Keygen).unwrap_err();
        assert!(matches!(err, Error::AlreadyStarted(Operation::Keygen)));
    }

    #[test]
    fn cancel_on_idle_operation_is_a_noop() {
        let controller = SessionController::new();
        let error = CommunicationError {
            peer_id: tss_protocol::PartyIdentity::new("2").unwrap(),
            operation: Operation::Keygen,
            time: std::time::SystemTime::now(),
        };
        // Idle is terminal-adjacent but not itself terminal; starting
        // from Idle and cancelling should still record the abort.
        controller.begin(Operation::Keygen).unwrap();
        assert!(controller.cancel(Operation::Keygen, error).is_err());
        assert_eq!(controller.phase(Operation::Keygen), SessionPhase::Canceled);
    }

    #[test]
    fn keysign_instance_exists_only_after_begin() {
        let controller = SessionController::new();
        assert!(!controller.keysign_instance_exists());
        controller.begin(Operation::Keysign).unwrap();
        assert!(controller.keysign_instance_exists());
    }

    #[test]
    fn completed_operation_can_be_restarted() {
        let controller = SessionController::new();
        controller.begin(Operation::Keygen).unwrap();
        controller.complete(Operation::Keygen);
        assert!(controller.begin(Operation::Keygen).is_ok());
    }
}
