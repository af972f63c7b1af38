use std::collections::BTreeMap;

use fep_core::{FieldId, Message, Mti};

use crate::bitmap::Bitmap;
use crate::error::{FieldError, ParseError, ParseProgress, Section};
use crate::schema::{FieldKind, FieldSpec, PadSide, Schema};

/// Decode one framed payload into a `Message`, per the given schema
/// (§4.1 "decode").
pub fn decode(payload: &[u8], schema: &Schema) -> Result<Message, ParseError> {
    if payload.len() < 4 {
        return Err(ParseError {
            cause: FieldError::TruncatedField {
                id: FieldId::Named("mti".into()),
                expected: 4,
                available: payload.len(),
            },
            progress: ParseProgress::new(0, Section::Mti, None, vec![], payload),
        });
    }

    let mti_str = std::str::from_utf8(&payload[..4]).map_err(|_| ParseError {
        cause: FieldError::NonAsciiPayload {
            id: FieldId::Named("mti".into()),
        },
        progress: ParseProgress::new(0, Section::Mti, None, vec![], payload),
    })?;
    let mti = Mti::parse(mti_str).map_err(|_| ParseError {
        cause: FieldError::NonAsciiPayload {
            id: FieldId::Named("mti".into()),
        },
        progress: ParseProgress::new(0, Section::Mti, None, vec![], payload),
    })?;

    let mut cursor = 4usize;
    let mut parsed_fields = Vec::new();

    let bitmap = if schema.has_bitmap {
        if payload.len() < cursor + schema.bitmap_bytes {
            return Err(ParseError {
                cause: FieldError::TruncatedField {
                    id: FieldId::Named("bitmap".into()),
                    expected: schema.bitmap_bytes,
                    available: payload.len() - cursor,
                },
                progress: ParseProgress::new(cursor, Section::Bitmap, None, parsed_fields, &payload[cursor..]),
            });
        }
        let bm = Bitmap::from_bytes(&payload[cursor..cursor + schema.bitmap_bytes]);
        cursor += schema.bitmap_bytes;
        Some(bm)
    } else {
        None
    };

    let mut fields = BTreeMap::new();
    if let Err(err) = decode_fields(payload, &mut cursor, &schema.fields, bitmap.as_ref(), &mut fields, &mut parsed_fields) {
        tracing::debug!(mti = %mti, section = ?err.progress.section, cause = %err.cause, "decode failed");
        return Err(err);
    }

    Ok(Message::new(mti, fields, payload.to_vec()))
}

fn decode_fields(
    payload: &[u8],
    cursor: &mut usize,
    specs: &[FieldSpec],
    bitmap: Option<&Bitmap>,
    fields: &mut BTreeMap<FieldId, Vec<u8>>,
    parsed_fields: &mut Vec<FieldId>,
) -> Result<(), ParseError> {
    for spec in specs {
        let present = match spec.bitmap_bit {
            Some(bit) => match bitmap {
                Some(bm) => bm.is_set(bit),
                None => {
                    return Err(ParseError {
                        cause: FieldError::InvalidBitmapGate { bit },
                        progress: ParseProgress::new(
                            *cursor,
                            Section::Fields,
                            Some(spec.id.clone()),
                            parsed_fields.clone(),
                            &payload[*cursor..],
                        ),
                    });
                }
            },
            None => true,
        };
        if !present {
            continue;
        }

        match &spec.kind {
            FieldKind::Fixed { len, pad } => {
                if payload.len() < *cursor + len {
                    return Err(truncated(payload, *cursor, spec.id.clone(), *len, parsed_fields));
                }
                let raw = &payload[*cursor..*cursor + len];
                *cursor += len;
                fields.insert(spec.id.clone(), strip_padding(raw, pad.char, pad.side));
            }
            FieldKind::Variable { length_digits, max_len } => {
                let ld = *length_digits as usize;
                if payload.len() < *cursor + ld {
                    return Err(truncated(payload, *cursor, spec.id.clone(), ld, parsed_fields));
                }
                let len_str = std::str::from_utf8(&payload[*cursor..*cursor + ld]).map_err(|_| {
                    ParseError {
                        cause: FieldError::NonAsciiPayload { id: spec.id.clone() },
                        progress: ParseProgress::new(
                            *cursor,
                            Section::Fields,
                            Some(spec.id.clone()),
                            parsed_fields.clone(),
                            &payload[*cursor..],
                        ),
                    }
                })?;
                let len: usize = len_str.parse().map_err(|_| ParseError {
                    cause: FieldError::BadLengthPrefix(format!("field {} length prefix {len_str:?}", spec.id)),
                    progress: ParseProgress::new(
                        *cursor,
                        Section::Fields,
                        Some(spec.id.clone()),
                        parsed_fields.clone(),
                        &payload[*cursor..],
                    ),
                })?;
                if len > *max_len {
                    return Err(ParseError {
                        cause: FieldError::BadLengthPrefix(format!(
                            "field {} declares length {len} exceeding max {max_len}",
                            spec.id
                        )),
                        progress: ParseProgress::new(
                            *cursor,
                            Section::Fields,
                            Some(spec.id.clone()),
                            parsed_fields.clone(),
                            &payload[*cursor..],
                        ),
                    });
                }
                *cursor += ld;
                if payload.len() < *cursor + len {
                    return Err(truncated(payload, *cursor, spec.id.clone(), len, parsed_fields));
                }
                let raw = payload[*cursor..*cursor + len].to_vec();
                *cursor += len;
                fields.insert(spec.id.clone(), raw);
            }
            FieldKind::Composite(sub_specs) => {
                decode_fields(payload, cursor, sub_specs, bitmap, fields, parsed_fields)?;
            }
        }
        parsed_fields.push(spec.id.clone());
    }
    Ok(())
}

fn truncated(
    payload: &[u8],
    cursor: usize,
    id: FieldId,
    expected: usize,
    parsed_fields: &[FieldId],
) -> ParseError {
    ParseError {
        cause: FieldError::TruncatedField {
            id: id.clone(),
            expected,
            available: payload.len().saturating_sub(cursor),
        },
        progress: ParseProgress::new(cursor, Section::Fields, Some(id), parsed_fields.to_vec(), &payload[cursor.min(payload.len())..]),
    }
}

fn strip_padding(raw: &[u8], pad_char: u8, side: PadSide) -> Vec<u8> {
    match side {
        PadSide::Left => {
            let start = raw.iter().position(|b| *b != pad_char).unwrap_or(raw.len());
            raw[start..].to_vec()
        }
        PadSide::Right => {
            let end = raw.iter().rposition(|b| *b != pad_char).map(|i| i + 1).unwrap_or(0);
            raw[..end].to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, PadSpec};

    fn simple_schema() -> Schema {
        Schema {
            has_bitmap: true,
            bitmap_bytes: 8,
            fields: vec![
                FieldSpec {
                    id: FieldId::Numeric(2),
                    field_type: FieldType::N,
                    kind: FieldKind::Variable { length_digits: 2, max_len: 19 },
                    bitmap_bit: Some(2),
                },
                FieldSpec {
                    id: FieldId::Numeric(3),
                    field_type: FieldType::N,
                    kind: FieldKind::Fixed { len: 6, pad: PadSpec::zero_left() },
                    bitmap_bit: Some(3),
                },
                FieldSpec {
                    id: FieldId::Numeric(4),
                    field_type: FieldType::N,
                    kind: FieldKind::Fixed { len: 12, pad: PadSpec::zero_left() },
                    bitmap_bit: Some(4),
                },
            ],
        }
    }

    #[test]
    fn decodes_gated_fields() {
        let schema = simple_schema();
        let mut payload = b"0200".to_vec();
        // bitmap: bits 3 and 4 set (fields 3 and 4 present), field 2 absent.
        payload.extend_from_slice(&[0b0011_0000, 0, 0, 0, 0, 0, 0, 0]);
        payload.extend_from_slice(b"010000");
        payload.extend_from_slice(b"000000010000");

        let msg = decode(&payload, &schema).unwrap();
        assert_eq!(msg.mti().as_str(), "0200");
        assert!(msg.field(3u32).is_some());
        assert!(msg.field(4u32).is_some());
        assert!(msg.field(2u32).is_none());
        assert_eq!(msg.field(3u32).unwrap(), b"10000");
    }

    #[test]
    fn decodes_variable_field() {
        let schema = simple_schema();
        let mut payload = b"0200".to_vec();
        payload.extend_from_slice(&[0b1000_0000, 0, 0, 0, 0, 0, 0, 0]); // bit 2
        payload.extend_from_slice(b"16");
        payload.extend_from_slice(b"4111111111111111");

        let msg = decode(&payload, &schema).unwrap();
        assert_eq!(msg.field(2u32).unwrap(), b"4111111111111111");
    }

    #[test]
    fn truncated_payload_reports_progress() {
        let schema = simple_schema();
        let mut payload = b"0200".to_vec();
        payload.extend_from_slice(&[0b0010_0000, 0, 0, 0, 0, 0, 0, 0]); // bit 3 only
        payload.extend_from_slice(b"01"); // too short for 6-byte field 3

        let err = decode(&payload, &schema).unwrap_err();
        assert_eq!(err.progress.section, Section::Fields);
        assert_eq!(err.progress.current_field, Some(FieldId::Numeric(3)));
    }

    #[test]
    fn invalid_mti_reports_mti_section() {
        let err = decode(b"02a0", &simple_schema()).unwrap_err();
        assert_eq!(err.progress.section, Section::Mti);
    }
}
