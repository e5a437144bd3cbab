//! Variable-length unsigned integers: 7 payload bits per byte, least significant
//! group first, high bit set on every byte except the last.

use tokio::io::{AsyncRead, AsyncReadExt};

use super::Error;

/// Longest encoding of a 32-bit value.
pub const MAX_VARINT_LEN: usize = 5;

const SEGMENT_BITS: u32 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;
/// The fifth byte only has room for the top four bits of a `u32`.
const LAST_SEGMENT_MAX: u32 = 0x0F;

/// Appends the encoding of `value` to `buf`.
///
/// The value is reduced to its unsigned 32-bit two's-complement form first, so
/// negative inputs take the full five bytes.
pub fn put_varint(buf: &mut Vec<u8>, value: i64) {
    let mut value = (value & 0xFFFF_FFFF) as u32;
    loop {
        let byte = (value & SEGMENT_BITS) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | CONTINUE_BIT);
    }
}

pub fn encode_varint(value: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    put_varint(&mut buf, value);
    buf
}

/// Reads one varint from `reader`, a byte at a time.
///
/// # Errors
///
/// - [`Error::Io`] if the stream fails or ends mid-value.
/// - [`Error::VarintTooLong`] if no terminating byte arrives within five bytes.
/// - [`Error::VarintOverflow`] if the value does not fit in 32 bits.
pub async fn read_varint<R>(reader: &mut R) -> Result<u32, Error>
where
    R: AsyncRead + Unpin,
{
    let mut result: u32 = 0;
    for index in 0..MAX_VARINT_LEN {
        let byte = reader.read_u8().await?;
        let segment = u32::from(byte) & SEGMENT_BITS;
        if index == MAX_VARINT_LEN - 1 && segment > LAST_SEGMENT_MAX {
            return Err(Error::VarintOverflow);
        }
        result |= segment << (7 * index);
        if byte & CONTINUE_BIT == 0 {
            return Ok(result);
        }
    }

    Err(Error::VarintTooLong)
}
