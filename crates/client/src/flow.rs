//! Add-to-cart control flow.
//!
//! Adding an item may hit an expired cart, in which case the local cart is
//! dropped and the add is retried once against a fresh cart. [`AddFlow`]
//! holds that as an explicit state machine:
//!
//! ```text
//! Idle ──start──► InFlight ──ok──────► Succeeded
//!                    │  └────failed──► Failed
//!                    └─expired─► RetryingAfterExpiry ──ok──► Succeeded
//!                                      └──expired/failed──► Failed
//! ```
//!
//! `RetryingAfterExpiry` is only reachable from `InFlight`, so a flow makes
//! at most two backend calls.

/// Phase of an add-to-cart flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPhase {
    Idle,
    InFlight,
    RetryingAfterExpiry,
    Succeeded,
    Failed,
}

/// Result of one backend call, as far as the flow cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    /// The cart ID is dead (expired or not found).
    Expired,
    Failed,
}

/// What the next backend call should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Add to the cart we hold, or create one if we hold none.
    Initial,
    /// Create a fresh cart, ignoring any held ID.
    FreshCart,
}

/// Add-to-cart state machine.
#[derive(Debug, Clone)]
pub struct AddFlow {
    phase: AddPhase,
    attempts: u8,
}

impl Default for AddFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl AddFlow {
    /// A flow that has not started.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: AddPhase::Idle,
            attempts: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> AddPhase {
        self.phase
    }

    /// Backend calls recorded so far.
    #[must_use]
    pub const fn attempts(&self) -> u8 {
        self.attempts
    }

    /// Whether the flow has finished.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.phase, AddPhase::Succeeded | AddPhase::Failed)
    }

    /// Whether the flow went through the expiry retry.
    #[must_use]
    pub const fn retried(&self) -> bool {
        self.attempts > 1
    }

    /// The call to make now, or `None` once the flow is finished.
    #[must_use]
    pub const fn next_attempt(&self) -> Option<Attempt> {
        match self.phase {
            AddPhase::InFlight => Some(Attempt::Initial),
            AddPhase::RetryingAfterExpiry => Some(Attempt::FreshCart),
            AddPhase::Idle | AddPhase::Succeeded | AddPhase::Failed => None,
        }
    }

    /// Start the flow. No effect unless idle.
    pub fn start(&mut self) -> AddPhase {
        if self.phase == AddPhase::Idle {
            self.phase = AddPhase::InFlight;
        }
        self.phase
    }

    /// Record the outcome of the call returned by [`Self::next_attempt`].
    pub fn record(&mut self, outcome: AttemptOutcome) -> AddPhase {
        let next = match (self.phase, outcome) {
            (AddPhase::InFlight | AddPhase::RetryingAfterExpiry, AttemptOutcome::Succeeded) => {
                AddPhase::Succeeded
            }
            (AddPhase::InFlight, AttemptOutcome::Expired) => AddPhase::RetryingAfterExpiry,
            (AddPhase::InFlight | AddPhase::RetryingAfterExpiry, _) => AddPhase::Failed,
            (phase, _) => return phase,
        };
        self.attempts += 1;
        self.phase = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> AddFlow {
        let mut flow = AddFlow::new();
        flow.start();
        flow
    }

    #[test]
    fn test_happy_path() {
        let mut flow = AddFlow::new();
        assert_eq!(flow.next_attempt(), None);
        assert_eq!(flow.start(), AddPhase::InFlight);
        assert_eq!(flow.next_attempt(), Some(Attempt::Initial));
        assert_eq!(flow.record(AttemptOutcome::Succeeded), AddPhase::Succeeded);
        assert!(flow.is_done());
        assert_eq!(flow.attempts(), 1);
        assert!(!flow.retried());
    }

    #[test]
    fn test_expiry_retries_once_with_fresh_cart() {
        let mut flow = started();
        assert_eq!(
            flow.record(AttemptOutcome::Expired),
            AddPhase::RetryingAfterExpiry
        );
        assert_eq!(flow.next_attempt(), Some(Attempt::FreshCart));
        assert_eq!(flow.record(AttemptOutcome::Succeeded), AddPhase::Succeeded);
        assert!(flow.retried());
    }

    #[test]
    fn test_second_expiry_fails() {
        let mut flow = started();
        flow.record(AttemptOutcome::Expired);
        assert_eq!(flow.record(AttemptOutcome::Expired), AddPhase::Failed);
        assert_eq!(flow.next_attempt(), None);
        assert_eq!(flow.attempts(), 2);
    }

    #[test]
    fn test_plain_failure_does_not_retry() {
        let mut flow = started();
        assert_eq!(flow.record(AttemptOutcome::Failed), AddPhase::Failed);
        assert_eq!(flow.next_attempt(), None);
    }

    #[test]
    fn test_terminal_states_absorb_events() {
        let mut flow = started();
        flow.record(AttemptOutcome::Failed);
        assert_eq!(flow.record(AttemptOutcome::Succeeded), AddPhase::Failed);
        assert_eq!(flow.start(), AddPhase::Failed);
        assert_eq!(flow.attempts(), 1);
    }

    #[test]
    fn test_loop_is_bounded() {
        let mut flow = started();
        let mut calls = 0;
        while flow.next_attempt().is_some() {
            calls += 1;
            flow.record(AttemptOutcome::Expired);
        }
        assert_eq!(calls, 2);
    }
}
