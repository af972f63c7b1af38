//! The default ISO-8583-style wire schema (§6 "Wire protocol"). Channels
//! that don't name a `schema_ref` decode/encode against this one.

use fep_codec::{FieldKind, FieldSpec, FieldType, PadSpec, Schema};
use fep_core::FieldId;

fn fixed(id: u32, len: usize, field_type: FieldType, pad: PadSpec, bit: u32) -> FieldSpec {
    FieldSpec {
        id: FieldId::Numeric(id),
        field_type,
        kind: FieldKind::Fixed { len, pad },
        bitmap_bit: Some(bit),
    }
}

fn variable(id: u32, length_digits: u8, max_len: usize, field_type: FieldType, bit: u32) -> FieldSpec {
    FieldSpec {
        id: FieldId::Numeric(id),
        field_type,
        kind: FieldKind::Variable { length_digits, max_len },
        bitmap_bit: Some(bit),
    }
}

/// Field 2 (PAN, LL-variable), 3 (processing code), 4 (amount), 11 (STAN),
/// 32 (acquirer), 37 (RRN), 38 (auth code), 39 (response code), 41
/// (terminal), 42 (merchant), 49 (currency), 102/103 (source/destination
/// account, LLL-variable for IBAN-length account numbers).
pub fn default_iso8583_schema() -> Schema {
    Schema {
        has_bitmap: true,
        bitmap_bytes: 8,
        fields: vec![
            variable(2, 2, 19, FieldType::N, 2),
            fixed(3, 6, FieldType::N, PadSpec::zero_left(), 3),
            fixed(4, 12, FieldType::N, PadSpec::zero_left(), 4),
            fixed(11, 6, FieldType::N, PadSpec::zero_left(), 11),
            fixed(32, 11, FieldType::N, PadSpec::zero_left(), 32),
            fixed(37, 12, FieldType::An, PadSpec::space_right(), 37),
            fixed(38, 6, FieldType::An, PadSpec::space_right(), 38),
            fixed(39, 2, FieldType::N, PadSpec::zero_left(), 39),
            fixed(41, 8, FieldType::Ans, PadSpec::space_right(), 41),
            fixed(42, 15, FieldType::Ans, PadSpec::space_right(), 42),
            fixed(49, 3, FieldType::N, PadSpec::zero_left(), 49),
            variable(102, 3, 28, FieldType::Ans, 60),
            variable(103, 3, 28, FieldType::Ans, 61),
        ],
    }
}
