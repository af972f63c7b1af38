//! Field schema: fixed-length padding and variable-length LL/LLL/LLLL
//! prefixing (§4.1 "encode"), plus the bitmap gate and composite recursion
//! described in §4.1/§6.

use fep_core::FieldId;

/// Field data type, used by the validation engine's FORMAT rule (§4.5.3)
/// and carried here so the codec can apply the right character-set checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Numeric (digits only).
    N,
    /// Alphabetic.
    A,
    /// Alphanumeric.
    An,
    /// Alphanumeric + special characters.
    Ans,
    /// Binary (opaque bytes).
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadSpec {
    pub char: u8,
    pub side: PadSide,
}

impl PadSpec {
    pub const fn zero_left() -> Self {
        PadSpec { char: b'0', side: PadSide::Left }
    }
    pub const fn space_right() -> Self {
        PadSpec { char: b' ', side: PadSide::Right }
    }
}

/// How a field's length is determined on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Fixed-width, padded to `len` bytes.
    Fixed { len: usize, pad: PadSpec },
    /// Variable-width, preceded by `length_digits` ASCII digits (LL=2,
    /// LLL=3, LLLL=4) giving the value's length, up to `max_len`.
    Variable { length_digits: u8, max_len: usize },
    /// A nested message: decoded recursively against its own field list.
    Composite(Vec<FieldSpec>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: FieldId,
    pub field_type: FieldType,
    pub kind: FieldKind,
    /// Bitmap bit (1-indexed) that gates this field's presence. `None`
    /// means the field is always present (e.g. a schema with no bitmap, or
    /// a composite sub-field addressed positionally instead).
    pub bitmap_bit: Option<u32>,
}

/// A full wire schema for one channel/message family (§6 "a schema-driven
/// composite of named fields").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Whether a primary bitmap precedes the field list.
    pub has_bitmap: bool,
    /// Width of the primary bitmap in bytes (conventionally 8 = 64 bits).
    pub bitmap_bytes: usize,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn field_spec(&self, id: &FieldId) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| &f.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_spec_lookup() {
        let schema = Schema {
            has_bitmap: true,
            bitmap_bytes: 8,
            fields: vec![FieldSpec {
                id: FieldId::Numeric(2),
                field_type: FieldType::N,
                kind: FieldKind::Variable { length_digits: 2, max_len: 19 },
                bitmap_bit: Some(2),
            }],
        };
        assert!(schema.field_spec(&FieldId::Numeric(2)).is_some());
        assert!(schema.field_spec(&FieldId::Numeric(3)).is_none());
    }
}
