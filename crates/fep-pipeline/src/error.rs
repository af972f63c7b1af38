use std::fmt;

use fep_repo::RepoError;
use fep_validate::ValidationError;

/// Errors the pipeline itself can raise (§7). Short-circuit outcomes
/// (duplicate, validation failure, no route, processor decline) are *not*
/// modeled as `Err` here — they are ordinary `Ok(PipelineOutcome)` values
/// with a response message carrying an error code, because every accepted
/// request still gets exactly one response (§7 "every inbound request
/// yields exactly one response"). `PipelineError` is reserved for failures
/// that prevent a response from being produced at all.
#[derive(Debug)]
pub enum PipelineError {
    /// The repository failed while reading state needed to decide the next
    /// stage (dedup probe, routing lookup). Unlike an audit-stage failure,
    /// there is no record to return a response against, so this does
    /// propagate.
    Repository(RepoError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Repository(e) => write!(f, "repository error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<RepoError> for PipelineError {
    fn from(e: RepoError) -> Self {
        PipelineError::Repository(e)
    }
}

/// Why the reversal service refused to process a request (§4.5.2, §7 "NotReversible").
#[derive(Debug)]
pub enum ReversalError {
    /// No record exists for the given original transaction id.
    OriginalNotFound(String),
    /// The original exists but its status isn't reversible
    /// (not APPROVED/COMPLETED/PENDING).
    NotReversible(String),
    Pipeline(PipelineError),
    Repository(RepoError),
}

impl fmt::Display for ReversalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReversalError::OriginalNotFound(id) => write!(f, "no such transaction to reverse: '{id}'"),
            ReversalError::NotReversible(id) => write!(f, "transaction '{id}' is not in a reversible state"),
            ReversalError::Pipeline(e) => write!(f, "{e}"),
            ReversalError::Repository(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReversalError {}

impl From<PipelineError> for ReversalError {
    fn from(e: PipelineError) -> Self {
        ReversalError::Pipeline(e)
    }
}

impl From<RepoError> for ReversalError {
    fn from(e: RepoError) -> Self {
        ReversalError::Repository(e)
    }
}

pub(crate) fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
