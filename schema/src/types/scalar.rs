//! Codec for scalar kinds.
//!
//! # Encoding
//!
//! * `bool` is a single byte (`0` or `1`); any nonzero byte decodes as `true`.
//! * Integers and floats are fixed-width, little-endian.
//! * `text` and `bytes` are a `u32` length prefix followed by the raw bytes.
//!
//! # Narrowing
//!
//! Integer kinds accept any integer value whose mathematical value fits the target kind, so
//! `Value::I64(127)` encodes as `int8` while `Value::I64(300)` fails with
//! [InputError::Overflow]. `float64` accepts every float and integer, and `float32` rejects finite
//! `float64` values whose magnitude exceeds [f32::MAX].

use super::ScalarKind;
use crate::{
    config::Config,
    util::{at_least, read_len, write_len},
    value::Key,
    BufferError, InputError, Value,
};
use bytes::{Buf, BufMut};

fn mismatch(kind: ScalarKind, value: &Value) -> InputError {
    InputError::Mismatch {
        expected: kind.to_string(),
        found: value.type_name(),
    }
}

fn as_integer(value: &Value) -> Option<i128> {
    Some(match *value {
        Value::I8(v) => v.into(),
        Value::I16(v) => v.into(),
        Value::I32(v) => v.into(),
        Value::I64(v) => v.into(),
        Value::U8(v) => v.into(),
        Value::U16(v) => v.into(),
        Value::U32(v) => v.into(),
        Value::U64(v) => v.into(),
        _ => return None,
    })
}

/// Converts an integer value into the target integer type, checking its range.
fn narrow<T: TryFrom<i128>>(kind: ScalarKind, value: &Value) -> Result<T, InputError> {
    let n = as_integer(value).ok_or_else(|| mismatch(kind, value))?;
    T::try_from(n).map_err(|_| InputError::Overflow {
        value: n.to_string(),
        kind,
    })
}

fn to_f32(value: &Value) -> Result<f32, InputError> {
    match *value {
        Value::F32(v) => Ok(v),
        Value::F64(v) if v.is_finite() && v.abs() > f32::MAX as f64 => {
            Err(InputError::Overflow {
                value: v.to_string(),
                kind: ScalarKind::F32,
            })
        }
        Value::F64(v) => Ok(v as f32),
        _ => as_integer(value)
            .map(|n| n as f32)
            .ok_or_else(|| mismatch(ScalarKind::F32, value)),
    }
}

fn to_f64(value: &Value) -> Result<f64, InputError> {
    match *value {
        Value::F32(v) => Ok(v.into()),
        Value::F64(v) => Ok(v),
        _ => as_integer(value)
            .map(|n| n as f64)
            .ok_or_else(|| mismatch(ScalarKind::F64, value)),
    }
}

/// Encodes `value` as `kind`.
pub(crate) fn write(
    kind: ScalarKind,
    value: &Value,
    buf: &mut impl BufMut,
) -> Result<(), InputError> {
    match kind {
        ScalarKind::Bool => match value {
            Value::Bool(v) => buf.put_u8(u8::from(*v)),
            _ => return Err(mismatch(kind, value)),
        },
        ScalarKind::I8 => buf.put_i8(narrow(kind, value)?),
        ScalarKind::I16 => buf.put_i16_le(narrow(kind, value)?),
        ScalarKind::I32 => buf.put_i32_le(narrow(kind, value)?),
        ScalarKind::I64 => buf.put_i64_le(narrow(kind, value)?),
        ScalarKind::U8 => buf.put_u8(narrow(kind, value)?),
        ScalarKind::U16 => buf.put_u16_le(narrow(kind, value)?),
        ScalarKind::U32 => buf.put_u32_le(narrow(kind, value)?),
        ScalarKind::U64 => buf.put_u64_le(narrow(kind, value)?),
        ScalarKind::F32 => buf.put_f32_le(to_f32(value)?),
        ScalarKind::F64 => buf.put_f64_le(to_f64(value)?),
        ScalarKind::Text => match value {
            Value::Text(text) => {
                write_len(buf, text.len())?;
                buf.put_slice(text.as_bytes());
            }
            _ => return Err(mismatch(kind, value)),
        },
        ScalarKind::Bytes => match value {
            Value::Bytes(bytes) => {
                write_len(buf, bytes.len())?;
                buf.put_slice(bytes);
            }
            _ => return Err(mismatch(kind, value)),
        },
    }
    Ok(())
}

macro_rules! get {
    ($buf:ident, $type:ty, $method:ident) => {{
        at_least($buf, std::mem::size_of::<$type>())?;
        $buf.$method()
    }};
}

/// Decodes a `kind` value into its canonical variant.
pub(crate) fn read(kind: ScalarKind, buf: &mut impl Buf, cfg: &Config) -> Result<Key, BufferError> {
    Ok(match kind {
        ScalarKind::Bool => Key::Bool(get!(buf, u8, get_u8) != 0),
        ScalarKind::I8 => Key::I8(get!(buf, i8, get_i8)),
        ScalarKind::I16 => Key::I16(get!(buf, i16, get_i16_le)),
        ScalarKind::I32 => Key::I32(get!(buf, i32, get_i32_le)),
        ScalarKind::I64 => Key::I64(get!(buf, i64, get_i64_le)),
        ScalarKind::U8 => Key::U8(get!(buf, u8, get_u8)),
        ScalarKind::U16 => Key::U16(get!(buf, u16, get_u16_le)),
        ScalarKind::U32 => Key::U32(get!(buf, u32, get_u32_le)),
        ScalarKind::U64 => Key::U64(get!(buf, u64, get_u64_le)),
        ScalarKind::F32 => Key::F32(get!(buf, f32, get_f32_le)),
        ScalarKind::F64 => Key::F64(get!(buf, f64, get_f64_le)),
        ScalarKind::Text => {
            let len = read_len(buf, cfg)?;
            let mut raw = vec![0; len];
            buf.copy_to_slice(&mut raw);
            Key::Text(String::from_utf8(raw).map_err(|_| BufferError::InvalidUtf8)?)
        }
        ScalarKind::Bytes => {
            let len = read_len(buf, cfg)?;
            Key::Bytes(buf.copy_to_bytes(len))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use test_case::test_case;

    fn encode(kind: ScalarKind, value: Value) -> Result<Vec<u8>, InputError> {
        let mut buf = Vec::new();
        write(kind, &value, &mut buf)?;
        Ok(buf)
    }

    fn decode(kind: ScalarKind, mut raw: &[u8]) -> Result<Value, BufferError> {
        let key = read(kind, &mut raw, &Config::default())?;
        assert!(raw.is_empty(), "trailing bytes after {kind}");
        Ok(Value::from(key))
    }

    #[test_case(ScalarKind::I8, Value::I64(127); "int8 max")]
    #[test_case(ScalarKind::I8, Value::I64(-128); "int8 min")]
    #[test_case(ScalarKind::I16, Value::U8(255); "unsigned into int16")]
    #[test_case(ScalarKind::U8, Value::I32(255); "uint8 max")]
    #[test_case(ScalarKind::U32, Value::U64(u32::MAX as u64); "uint32 max")]
    #[test_case(ScalarKind::U64, Value::I64(i64::MAX); "int64 into uint64")]
    #[test_case(ScalarKind::I64, Value::U32(u32::MAX); "uint32 into int64")]
    fn test_narrowing_accepts(kind: ScalarKind, value: Value) {
        let raw = encode(kind, value.clone()).unwrap();
        assert_eq!(raw.len(), kind.width().unwrap());
    }

    #[test_case(ScalarKind::I8, Value::I64(300), "300"; "int8 too large")]
    #[test_case(ScalarKind::I8, Value::I16(-129), "-129"; "int8 too small")]
    #[test_case(ScalarKind::U8, Value::I8(-1), "-1"; "negative into uint8")]
    #[test_case(ScalarKind::U16, Value::U32(65_536), "65536"; "uint16 too large")]
    #[test_case(ScalarKind::I64, Value::U64(u64::MAX), "18446744073709551615"; "uint64 into int64")]
    fn test_narrowing_overflows(kind: ScalarKind, value: Value, rendered: &str) {
        assert_eq!(
            encode(kind, value),
            Err(InputError::Overflow {
                value: rendered.to_string(),
                kind,
            })
        );
    }

    #[test]
    fn test_int8_example() {
        assert_eq!(encode(ScalarKind::I8, Value::I64(127)).unwrap(), vec![0x7f]);
        assert!(matches!(
            encode(ScalarKind::I8, Value::I64(300)),
            Err(InputError::Overflow { kind: ScalarKind::I8, .. })
        ));
    }

    #[test]
    fn test_little_endian() {
        assert_eq!(
            encode(ScalarKind::U32, Value::U32(0x0102_0304)).unwrap(),
            vec![0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(
            encode(ScalarKind::I16, Value::I16(-2)).unwrap(),
            vec![0xfe, 0xff]
        );
        assert_eq!(
            encode(ScalarKind::F32, Value::F32(1.0)).unwrap(),
            vec![0x00, 0x00, 0x80, 0x3f]
        );
    }

    #[test]
    fn test_float_narrowing() {
        assert_eq!(
            decode(
                ScalarKind::F32,
                &encode(ScalarKind::F32, Value::F64(0.5)).unwrap()
            )
            .unwrap(),
            Value::F32(0.5)
        );
        assert!(matches!(
            encode(ScalarKind::F32, Value::F64(1e300)),
            Err(InputError::Overflow { kind: ScalarKind::F32, .. })
        ));
        assert!(encode(ScalarKind::F32, Value::F64(f64::INFINITY)).is_ok());
        assert_eq!(
            decode(
                ScalarKind::F64,
                &encode(ScalarKind::F64, Value::I32(-7)).unwrap()
            )
            .unwrap(),
            Value::F64(-7.0)
        );
    }

    #[test]
    fn test_floats_never_become_integers() {
        assert_eq!(
            encode(ScalarKind::I32, Value::F64(1.0)),
            Err(InputError::Mismatch {
                expected: "int32".to_string(),
                found: "float64",
            })
        );
    }

    #[test]
    fn test_mismatch() {
        assert_eq!(
            encode(ScalarKind::Text, Value::I64(1)),
            Err(InputError::Mismatch {
                expected: "text".to_string(),
                found: "int64",
            })
        );
        assert!(encode(ScalarKind::Bool, Value::U8(1)).is_err());
        assert!(encode(ScalarKind::Bytes, Value::from("x")).is_err());
    }

    #[test]
    fn test_bool() {
        assert_eq!(encode(ScalarKind::Bool, Value::Bool(true)).unwrap(), vec![1]);
        assert_eq!(decode(ScalarKind::Bool, &[0]).unwrap(), Value::Bool(false));
        assert_eq!(decode(ScalarKind::Bool, &[7]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_text() {
        let raw = encode(ScalarKind::Text, Value::from("héllo")).unwrap();
        assert_eq!(&raw[..4], &[6, 0, 0, 0]);
        assert_eq!(decode(ScalarKind::Text, &raw).unwrap(), Value::from("héllo"));
    }

    #[test]
    fn test_text_invalid_utf8() {
        assert_eq!(
            decode(ScalarKind::Text, &[2, 0, 0, 0, 0xc3, 0x28]),
            Err(BufferError::InvalidUtf8)
        );
    }

    #[test]
    fn test_bytes() {
        let value = Value::Bytes(Bytes::from_static(&[9, 8, 7]));
        let raw = encode(ScalarKind::Bytes, value.clone()).unwrap();
        assert_eq!(raw, vec![3, 0, 0, 0, 9, 8, 7]);
        assert_eq!(decode(ScalarKind::Bytes, &raw).unwrap(), value);
    }

    #[test]
    fn test_length_prefix_exceeds_buffer() {
        assert_eq!(
            decode(ScalarKind::Bytes, &[200, 0, 0, 0, 1, 2, 3]),
            Err(BufferError::LengthExceeded(200, 3))
        );
    }

    #[test]
    fn test_truncated() {
        for kind in ScalarKind::ALL {
            let Some(width) = kind.width() else {
                continue;
            };
            let raw = vec![0u8; width - 1];
            assert_eq!(decode(kind, &raw), Err(BufferError::EndOfBuffer), "{kind}");
        }
    }

    #[test]
    fn test_canonical_variants() {
        for kind in ScalarKind::ALL {
            let raw = match kind.width() {
                Some(width) => vec![0u8; width],
                None => vec![0u8; 4],
            };
            assert_eq!(decode(kind, &raw).unwrap().kind(), Some(kind));
        }
    }
}
