use std::fmt;

use fep_core::FieldId;

/// Errors raised while framing or interpreting a single field (§7 "FieldError").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    BadLengthPrefix(String),
    LengthOverflow { len: u64, max: u64 },
    TruncatedField { id: FieldId, expected: usize, available: usize },
    InvalidBitmapGate { bit: u32 },
    NonAsciiPayload { id: FieldId },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::BadLengthPrefix(msg) => write!(f, "bad length prefix: {msg}"),
            FieldError::LengthOverflow { len, max } => {
                write!(f, "frame length {len} exceeds maximum {max} for this prefix width")
            }
            FieldError::TruncatedField { id, expected, available } => write!(
                f,
                "field {id} truncated: expected {expected} bytes, only {available} available"
            ),
            FieldError::InvalidBitmapGate { bit } => {
                write!(f, "bitmap gates bit {bit} but no field is configured for it")
            }
            FieldError::NonAsciiPayload { id } => {
                write!(f, "field {id} is not valid ASCII")
            }
        }
    }
}

impl std::error::Error for FieldError {}

/// Snapshot of how far decoding got before it failed, for diagnostics
/// (§4.1 "Parse failure is returned with a progress summary").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProgress {
    pub bytes_consumed: usize,
    pub section: Section,
    pub current_field: Option<FieldId>,
    pub parsed_fields: Vec<FieldId>,
    /// Hex dump of the remaining unparsed bytes, capped to avoid unbounded
    /// error payloads on malformed giant frames.
    pub remaining_hex: String,
}

const REMAINING_HEX_CAP: usize = 256;

impl ParseProgress {
    pub fn new(
        bytes_consumed: usize,
        section: Section,
        current_field: Option<FieldId>,
        parsed_fields: Vec<FieldId>,
        remaining: &[u8],
    ) -> Self {
        let capped = &remaining[..remaining.len().min(REMAINING_HEX_CAP)];
        let mut remaining_hex: String = capped.iter().map(|b| format!("{b:02x}")).collect();
        if remaining.len() > REMAINING_HEX_CAP {
            remaining_hex.push_str("...(truncated)");
        }
        ParseProgress {
            bytes_consumed,
            section,
            current_field,
            parsed_fields,
            remaining_hex,
        }
    }
}

/// Which part of the message the parser was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Mti,
    Bitmap,
    Fields,
}

/// A decode failure, carrying both the immediate cause and a progress
/// summary for diagnostics (§4.1, §7 "ParseError").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub cause: FieldError,
    pub progress: ParseProgress,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error in {:?} after {} bytes: {} (parsed so far: {:?})",
            self.progress.section, self.progress.bytes_consumed, self.cause, self.progress.parsed_fields
        )
    }
}

impl std::error::Error for ParseError {}

/// Errors raised while encoding a message to wire bytes (§7 "FieldError" on
/// the encode side too, since a malformed outbound message is still a field
/// error rather than a transport error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    Field(FieldError),
    ValueTooLong { id: FieldId, max_len: usize, actual_len: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Field(e) => write!(f, "{e}"),
            EncodeError::ValueTooLong { id, max_len, actual_len } => write!(
                f,
                "field {id} value is {actual_len} bytes, exceeds maximum {max_len}"
            ),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<FieldError> for EncodeError {
    fn from(e: FieldError) -> Self {
        EncodeError::Field(e)
    }
}
