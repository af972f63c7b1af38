use std::fmt;

/// Why a pending request terminated without a matching `complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCause {
    /// A newer `register` call for the same STAN displaced this one.
    DuplicateStan,
    /// No reply arrived before the registered timeout.
    Timeout,
    /// Terminated explicitly via `cancel`/`cancelAll`, with the caller's reason.
    Cancelled(String),
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationCause::DuplicateStan => write!(f, "duplicate STAN registered"),
            TerminationCause::Timeout => write!(f, "request timed out"),
            TerminationCause::Cancelled(reason) => write!(f, "cancelled: {reason}"),
        }
    }
}

impl std::error::Error for TerminationCause {}

/// Errors raised by the registry itself, as opposed to a pending request's
/// termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StanRegistryError {
    /// `register` was called after `close`.
    Closed,
}

impl fmt::Display for StanRegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StanRegistryError::Closed => write!(f, "registry is closed"),
        }
    }
}

impl std::error::Error for StanRegistryError {}
