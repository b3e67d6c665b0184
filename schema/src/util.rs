//! Helpers shared by the codecs.

use crate::{config::Config, BufferError, InputError};
use bytes::{Buf, BufMut};

/// Checks that at least `len` bytes remain in the buffer.
#[inline]
pub(crate) fn at_least(buf: &impl Buf, len: usize) -> Result<(), BufferError> {
    if buf.remaining() < len {
        return Err(BufferError::EndOfBuffer);
    }
    Ok(())
}

/// Reads a `u32` length or count prefix.
///
/// Every encoded value occupies at least one byte, so a prefix larger than the remaining buffer
/// can never be satisfied and is rejected before anything is allocated.
#[inline]
pub(crate) fn read_len(buf: &mut impl Buf, cfg: &Config) -> Result<usize, BufferError> {
    at_least(buf, 4)?;
    let len = buf.get_u32_le() as usize;
    let remaining = buf.remaining();
    if len > remaining {
        return Err(BufferError::LengthExceeded(len, remaining));
    }
    if !cfg.lengths.contains(&len) {
        return Err(BufferError::InvalidLength(len));
    }
    Ok(len)
}

/// Writes a `u32` length or count prefix.
#[inline]
pub(crate) fn write_len(buf: &mut impl BufMut, len: usize) -> Result<(), InputError> {
    let len32 = u32::try_from(len).map_err(|_| InputError::TooLong(len))?;
    buf.put_u32_le(len32);
    Ok(())
}
