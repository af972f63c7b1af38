use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;
use crate::mti::Mti;

/// STAN lives at ISO field 11.
pub const STAN_FIELD: FieldId = FieldId::Numeric(11);
/// RRN lives at ISO field 37.
pub const RRN_FIELD: FieldId = FieldId::Numeric(37);

/// Identifies a field either by its ISO-8583 numeric tag or by a generic
/// schema's string id. Both addressing schemes can appear in the same
/// codec configuration (§4.1, §6), so `Message` keys fields by this enum
/// rather than committing to one scheme.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    Numeric(u32),
    Named(String),
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldId::Numeric(n) => write!(f, "{n}"),
            FieldId::Named(s) => write!(f, "{s}"),
        }
    }
}

impl From<u32> for FieldId {
    fn from(n: u32) -> Self {
        FieldId::Numeric(n)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        FieldId::Named(s.to_string())
    }
}

/// A decoded, immutable ISO-8583-style message.
///
/// Fields are read-only once a message leaves the codec: the pipeline and
/// every processor see a `&Message`, never a `&mut Message` (§3 "Fields are
/// read-only once the message is handed to the pipeline").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    mti: Mti,
    fields: BTreeMap<FieldId, Vec<u8>>,
    raw: Vec<u8>,
}

impl Message {
    /// Build a message directly (used by processors that synthesize a
    /// response or a reversal request, and by tests).
    pub fn new(mti: Mti, fields: BTreeMap<FieldId, Vec<u8>>, raw: Vec<u8>) -> Self {
        Message { mti, fields, raw }
    }

    pub fn mti(&self) -> Mti {
        self.mti
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn field(&self, id: impl Into<FieldId>) -> Option<&[u8]> {
        self.fields.get(&id.into()).map(Vec::as_slice)
    }

    pub fn field_str(&self, id: impl Into<FieldId>) -> Result<Option<&str>, CoreError> {
        let id = id.into();
        match self.fields.get(&id) {
            None => Ok(None),
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|_| CoreError::FieldMalformed(id)),
        }
    }

    pub fn require_field(&self, id: impl Into<FieldId>) -> Result<&[u8], CoreError> {
        let id = id.into();
        self.fields
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(CoreError::FieldMissing(id))
    }

    pub fn require_field_str(&self, id: impl Into<FieldId>) -> Result<&str, CoreError> {
        let id = id.into();
        let bytes = self
            .fields
            .get(&id)
            .ok_or_else(|| CoreError::FieldMissing(id.clone()))?;
        std::str::from_utf8(bytes).map_err(|_| CoreError::FieldMalformed(id))
    }

    pub fn has_field(&self, id: impl Into<FieldId>) -> bool {
        self.fields.contains_key(&id.into())
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.fields.keys()
    }

    /// STAN (field 11), if present and valid UTF-8.
    pub fn stan(&self) -> Option<&str> {
        self.field_str(STAN_FIELD.clone()).ok().flatten()
    }

    /// RRN (field 37), if present and valid UTF-8.
    pub fn rrn(&self) -> Option<&str> {
        self.field_str(RRN_FIELD.clone()).ok().flatten()
    }
}

/// Incremental constructor used by the codec while decoding, and by
/// processors synthesizing outbound messages.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    mti: Option<Mti>,
    fields: BTreeMap<FieldId, Vec<u8>>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mti(mut self, mti: Mti) -> Self {
        self.mti = Some(mti);
        self
    }

    pub fn field(mut self, id: impl Into<FieldId>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.insert(id.into(), value.into());
        self
    }

    pub fn set_field(&mut self, id: impl Into<FieldId>, value: impl Into<Vec<u8>>) {
        self.fields.insert(id.into(), value.into());
    }

    /// Finish building, computing `raw` as an empty placeholder; callers that
    /// need wire bytes should go through `fep-codec::encode` instead, which
    /// fills `raw` from the real framing. This constructor is for in-process
    /// messages (reversal requests, synthesized responses) that never hit
    /// the wire directly.
    pub fn build(self) -> Option<Message> {
        Some(Message::new(self.mti?, self.fields, Vec::new()))
    }

    pub fn build_with_raw(self, raw: Vec<u8>) -> Option<Message> {
        Some(Message::new(self.mti?, self.fields, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_roundtrip() {
        let msg = MessageBuilder::new()
            .mti(Mti::parse("0200").unwrap())
            .field(11u32, b"000001".to_vec())
            .field(41u32, b"ATM00001".to_vec())
            .build()
            .unwrap();

        assert_eq!(msg.mti().as_str(), "0200");
        assert_eq!(msg.stan(), Some("000001"));
        assert_eq!(msg.field(41u32), Some(&b"ATM00001"[..]));
    }

    #[test]
    fn missing_required_field_errors() {
        let msg = MessageBuilder::new()
            .mti(Mti::parse("0200").unwrap())
            .build()
            .unwrap();

        assert_eq!(
            msg.require_field(11u32).unwrap_err(),
            CoreError::FieldMissing(FieldId::Numeric(11))
        );
    }

    #[test]
    fn named_field_ids_coexist_with_numeric() {
        let msg = MessageBuilder::new()
            .mti(Mti::parse("0800").unwrap())
            .field("merchantCategory", b"5411".to_vec())
            .field(3u32, b"010000".to_vec())
            .build()
            .unwrap();

        assert_eq!(msg.field_str("merchantCategory").unwrap(), Some("5411"));
        assert_eq!(msg.field_str(3u32).unwrap(), Some("010000"));
    }
}
