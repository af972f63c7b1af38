use crate::error::CoreError;

/// Lifecycle status of a transaction record (§3, §8 property 6).
///
/// `PENDING -> PROCESSING -> SENT_TO_HOST -> {terminal}`, with successful
/// terminals able to move on to `REVERSAL_PENDING -> REVERSED`. A
/// short-circuiting pipeline stage (dedup, validation, routing) can also
/// move a record straight from `PENDING` or `PROCESSING` to a terminal state
/// without ever reaching `SENT_TO_HOST`, since those stages run before a
/// network call to the host is ever attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Status {
    Pending,
    Processing,
    SentToHost,
    Completed,
    Approved,
    Declined,
    Failed,
    Timeout,
    ReversalPending,
    Reversed,
}

impl Status {
    pub fn is_terminal_success(self) -> bool {
        matches!(self, Status::Completed | Status::Approved)
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Completed
                | Status::Approved
                | Status::Declined
                | Status::Failed
                | Status::Timeout
        )
    }

    /// Whether `self -> next` is a transition this state machine allows.
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        match (self, next) {
            (Pending, Processing) => true,
            (Pending, to) if to.is_terminal() => true,
            (Processing, SentToHost) => true,
            (Processing, to) if to.is_terminal() => true,
            (SentToHost, to) if to.is_terminal() => true,
            (from, ReversalPending) if from.is_terminal_success() => true,
            (ReversalPending, Reversed) => true,
            _ => false,
        }
    }

    /// Attempt a transition, returning the new status or a logged
    /// `IllegalTransition` error. Per §4.5 "such a rejection is a defect and
    /// is logged", callers should `tracing::error!` on the `Err` path rather
    /// than silently dropping it.
    pub fn transition(self, next: Status) -> Result<Status, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }
}
