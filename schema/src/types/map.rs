//! Codec for maps with scalar keys.
//!
//! A map is a `u32` entry count followed by `(key, value)` pairs. Dynamic maps iterate in key
//! order, so equal maps always produce equal bytes. Keys that encode to the same bytes (e.g.
//! `I64(1)` and `I32(1)` into an `int8` key) are rejected on encode, and repeated keys are
//! rejected on decode.

use super::{scalar, ScalarKind, Type};
use crate::{
    config::Scope,
    error::Segment,
    util::{read_len, write_len},
    BufferError, Error, InputError, Value,
};
use bytes::{Buf, BufMut};
use std::collections::{btree_map::Entry, BTreeMap, HashSet};

/// Writes one entry, rejecting a key whose encoding was already written.
fn write_entry(
    key_kind: ScalarKind,
    element: &Type,
    (key, value): (&Value, &Value),
    rendered: &str,
    written: &mut HashSet<Vec<u8>>,
    buf: &mut impl BufMut,
    scope: Scope<'_>,
) -> Result<(), Error> {
    let mut encoded = Vec::new();
    scalar::write(key_kind, key, &mut encoded)?;
    buf.put_slice(&encoded);
    if !written.insert(encoded) {
        return Err(InputError::DuplicateKey(rendered.to_owned()).into());
    }
    element.write(value, buf, scope)
}

pub(crate) fn write(
    key_kind: ScalarKind,
    element: &Type,
    value: &Value,
    buf: &mut impl BufMut,
    scope: Scope<'_>,
) -> Result<(), Error> {
    match value {
        Value::Map(entries) => {
            write_len(buf, entries.len())?;
            let mut written = HashSet::with_capacity(entries.len());
            for (key, value) in entries {
                let rendered = key.to_string();
                let entry = (&key.to_value(), value);
                write_entry(key_kind, element, entry, &rendered, &mut written, buf, scope)
                    .map_err(|err| err.within(Segment::Key(rendered)))?;
            }
        }
        // A record is a text-keyed map.
        Value::Record(record) if key_kind == ScalarKind::Text => {
            write_len(buf, record.len())?;
            let mut written = HashSet::with_capacity(record.len());
            for (label, value) in record.iter() {
                let rendered = format!("{label:?}");
                let entry = (&Value::from(label), value);
                write_entry(key_kind, element, entry, &rendered, &mut written, buf, scope)
                    .map_err(|err| err.within(Segment::Key(rendered)))?;
            }
        }
        _ => {
            return Err(InputError::Mismatch {
                expected: Type::Map(key_kind, Box::new(element.clone())).to_string(),
                found: value.type_name(),
            }
            .into())
        }
    }
    Ok(())
}

pub(crate) fn read(
    key_kind: ScalarKind,
    element: &Type,
    buf: &mut impl Buf,
    scope: Scope<'_>,
) -> Result<Value, Error> {
    let len = read_len(buf, scope.cfg)?;
    let mut entries = BTreeMap::new();
    for index in 0..len {
        let key = scalar::read(key_kind, buf, scope.cfg)
            .map_err(|err| Error::from(err).within(Segment::Item(index)))?;
        let rendered = key.to_string();
        let Entry::Vacant(entry) = entries.entry(key) else {
            let err = BufferError::DuplicateKey(rendered);
            return Err(Error::from(err).within(Segment::Item(index)));
        };
        let value = element
            .read(buf, scope)
            .map_err(|err| err.within(Segment::Key(rendered)))?;
        entry.insert(value);
    }
    Ok(Value::Map(entries))
}
