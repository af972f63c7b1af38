use fep_core::{FieldId, Message};

use crate::bitmap::Bitmap;
use crate::error::{EncodeError, FieldError};
use crate::schema::{FieldKind, FieldSpec, PadSide, Schema};

/// Encode a `Message` to wire bytes, per the given schema (§4.1 "encode").
pub fn encode(msg: &Message, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
    let mut bitmap = schema.has_bitmap.then(|| Bitmap::with_capacity(schema.bitmap_bytes * 8));
    if let Some(bm) = bitmap.as_mut() {
        mark_present(msg, &schema.fields, bm);
    }

    let mut out = msg.mti().as_bytes().to_vec();
    if let Some(bm) = &bitmap {
        out.extend_from_slice(&bm.to_bytes());
    }
    if let Err(err) = encode_fields(msg, &schema.fields, bitmap.as_ref(), &mut out) {
        tracing::debug!(mti = %msg.mti(), cause = %err, "encode failed");
        return Err(err);
    }
    Ok(out)
}

fn mark_present(msg: &Message, specs: &[FieldSpec], bitmap: &mut Bitmap) {
    for spec in specs {
        if let FieldKind::Composite(sub) = &spec.kind {
            mark_present(msg, sub, bitmap);
            continue;
        }
        if let Some(bit) = spec.bitmap_bit {
            if msg.has_field(spec.id.clone()) {
                bitmap.set(bit);
            }
        }
    }
}

fn encode_fields(
    msg: &Message,
    specs: &[FieldSpec],
    bitmap: Option<&Bitmap>,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    for spec in specs {
        let present = match spec.bitmap_bit {
            Some(bit) => bitmap.map(|bm| bm.is_set(bit)).unwrap_or(false),
            None => true,
        };
        if !present {
            continue;
        }

        match &spec.kind {
            FieldKind::Fixed { len, pad } => {
                let value = msg.field(spec.id.clone()).unwrap_or(&[]);
                if value.len() > *len {
                    return Err(EncodeError::ValueTooLong {
                        id: spec.id.clone(),
                        max_len: *len,
                        actual_len: value.len(),
                    });
                }
                out.extend_from_slice(&apply_padding(value, *len, pad.char, pad.side));
            }
            FieldKind::Variable { length_digits, max_len } => {
                let value = msg.field(spec.id.clone()).unwrap_or(&[]);
                if value.len() > *max_len {
                    return Err(EncodeError::ValueTooLong {
                        id: spec.id.clone(),
                        max_len: *max_len,
                        actual_len: value.len(),
                    });
                }
                let ld = *length_digits as usize;
                let max_for_prefix = 10u64.pow(*length_digits as u32) as usize - 1;
                if value.len() > max_for_prefix {
                    return Err(FieldError::LengthOverflow {
                        len: value.len() as u64,
                        max: max_for_prefix as u64,
                    }
                    .into());
                }
                out.extend_from_slice(format!("{:0width$}", value.len(), width = ld).as_bytes());
                out.extend_from_slice(value);
            }
            FieldKind::Composite(sub_specs) => {
                encode_fields(msg, sub_specs, bitmap, out)?;
            }
        }
    }
    Ok(())
}

fn apply_padding(value: &[u8], len: usize, pad_char: u8, side: PadSide) -> Vec<u8> {
    let mut padding = vec![pad_char; len - value.len()];
    match side {
        PadSide::Left => {
            padding.extend_from_slice(value);
            padding
        }
        PadSide::Right => {
            let mut out = value.to_vec();
            out.append(&mut padding);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::schema::{FieldType, PadSpec};
    use fep_core::{Mti, MessageBuilder};

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
            ],
        }
    }

    #[test]
    fn encode_pads_and_gates_fields() {
        let schema = simple_schema();
        let msg = MessageBuilder::new()
            .mti(Mti::parse("0200").unwrap())
            .field(3u32, b"10000".to_vec())
            .build()
            .unwrap();

        let bytes = encode(&msg, &schema).unwrap();
        assert_eq!(&bytes[..4], b"0200");
        assert_eq!(bytes[4], 0b0010_0000); // bit 3 set, bit 2 clear
        assert_eq!(&bytes[12..], b"010000");
    }

    #[test]
    fn roundtrips_through_decode() {
        let schema = simple_schema();
        let msg = MessageBuilder::new()
            .mti(Mti::parse("0200").unwrap())
            .field(2u32, b"4111111111111111".to_vec())
            .field(3u32, b"10000".to_vec())
            .build()
            .unwrap();

        let bytes = encode(&msg, &schema).unwrap();
        let decoded = decode(&bytes, &schema).unwrap();
        assert_eq!(decoded.field(2u32), Some(&b"4111111111111111"[..]));
        assert_eq!(decoded.field(3u32), Some(&b"10000"[..]));
    }

    #[test]
    fn value_too_long_for_fixed_field_is_rejected() {
        let schema = simple_schema();
        let msg = MessageBuilder::new()
            .mti(Mti::parse("0200").unwrap())
            .field(3u32, b"1234567".to_vec())
            .build()
            .unwrap();

        assert!(matches!(
            encode(&msg, &schema),
            Err(EncodeError::ValueTooLong { .. })
        ));
    }
}
