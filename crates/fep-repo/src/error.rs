use std::fmt;

/// Errors raised by a `Repository` implementation (§6, §7 "RepositoryError").
#[derive(Debug)]
pub enum RepoError {
    /// The referenced transaction doesn't exist.
    NotFound(String),
    /// A status transition the caller asked for isn't legal from the
    /// record's current status.
    IllegalTransition(fep_core::CoreError),
    /// The storage backend itself failed (I/O, constraint violation, ...).
    Backend(String),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::NotFound(id) => write!(f, "no transaction record for '{id}'"),
            RepoError::IllegalTransition(e) => write!(f, "illegal status transition: {e}"),
            RepoError::Backend(msg) => write!(f, "repository backend error: {msg}"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<fep_core::CoreError> for RepoError {
    fn from(e: fep_core::CoreError) -> Self {
        RepoError::IllegalTransition(e)
    }
}
