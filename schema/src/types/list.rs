//! Codec for homogeneous lists.
//!
//! A list is a `u32` element count followed by each element, in order.

use super::Type;
use crate::{
    config::Scope,
    error::Segment,
    util::{read_len, write_len},
    Error, InputError, Value,
};
use bytes::{Buf, BufMut};

pub(crate) fn write(
    element: &Type,
    value: &Value,
    buf: &mut impl BufMut,
    scope: Scope<'_>,
) -> Result<(), Error> {
    let Value::List(items) = value else {
        return Err(InputError::Mismatch {
            expected: Type::List(Box::new(element.clone())).to_string(),
            found: value.type_name(),
        }
        .into());
    };
    write_len(buf, items.len())?;
    for (index, item) in items.iter().enumerate() {
        element
            .write(item, buf, scope)
            .map_err(|err| err.within(Segment::Item(index)))?;
    }
    Ok(())
}

pub(crate) fn read(element: &Type, buf: &mut impl Buf, scope: Scope<'_>) -> Result<Value, Error> {
    let len = read_len(buf, scope.cfg)?;
    let mut items = Vec::with_capacity(len);
    for index in 0..len {
        let item = element
            .read(buf, scope)
            .map_err(|err| err.within(Segment::Item(index)))?;
        items.push(item);
    }
    Ok(Value::List(items))
}
