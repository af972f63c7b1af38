use std::fmt;

/// Errors raised by the shared data model.
///
/// Each variant corresponds to one way a caller can misuse the types in this
/// crate; codec-level parsing failures live in `fep-codec` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// MTI string was not exactly 4 ASCII digits.
    InvalidMti(String),
    /// A required field was absent when the caller asked for it directly.
    FieldMissing(FieldId),
    /// A field value could not be interpreted as the requested shape (e.g. not UTF-8).
    FieldMalformed(FieldId),
    /// A status transition was attempted that the state machine does not allow.
    IllegalTransition { from: Status, to: Status },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidMti(s) => write!(f, "invalid MTI: {s:?} (expected 4 ASCII digits)"),
            CoreError::FieldMissing(id) => write!(f, "field {id} is missing"),
            CoreError::FieldMalformed(id) => write!(f, "field {id} is malformed"),
            CoreError::IllegalTransition { from, to } => {
                write!(f, "illegal status transition: {from:?} -> {to:?}")
            }
        }
    }
}

impl std::error::Error for CoreError {}

use crate::message::FieldId;
use crate::status::Status;
