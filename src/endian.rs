//! Little-endian field access.
//!
//! Every multi-byte field in the supported formats is stored little-endian.
//! Values are converted at the point of read; source buffers are never
//! rewritten in place.

use crate::error::{truncated, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Cursor;

pub fn read_le_u16(bytes: [u8; 2]) -> u16 {
    LittleEndian::read_u16(&bytes)
}

pub fn read_le_i16(bytes: [u8; 2]) -> i16 {
    LittleEndian::read_i16(&bytes)
}

pub fn read_le_u32(bytes: [u8; 4]) -> u32 {
    LittleEndian::read_u32(&bytes)
}

pub fn read_le_i32(bytes: [u8; 4]) -> i32 {
    LittleEndian::read_i32(&bytes)
}

pub fn read_le_f32(bytes: [u8; 4]) -> f32 {
    LittleEndian::read_f32(&bytes)
}

/// Returns `len` bytes at `offset`, or `TruncatedInput` naming `what`.
pub fn region<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| truncated(what, usize::MAX, data.len()))?;
    data.get(offset..end)
        .ok_or_else(|| truncated(what, end, data.len()))
}

/// Like [`region`] but takes the signed offset/length pair a header declares.
pub fn declared_region<'a>(
    data: &'a [u8],
    offset: i32,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    let offset = usize::try_from(offset).map_err(|_| truncated(what, 0, data.len()))?;
    region(data, offset, len, what)
}

pub fn tag_at(data: &[u8]) -> Result<u32> {
    let bytes = region(data, 0, 4, "format tag")?;
    Ok(read_le_u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Reads one 32-bit word from a stream whose end is not known up front.
pub fn next_word(cursor: &mut Cursor<&[u8]>, what: &'static str) -> Result<i32> {
    let available = cursor.get_ref().len();
    let needed = cursor.position() as usize + 4;
    cursor
        .read_i32::<LittleEndian>()
        .map_err(|_| truncated(what, needed, available))
}

pub fn next_f32(cursor: &mut Cursor<&[u8]>, what: &'static str) -> Result<f32> {
    next_word(cursor, what).map(|word| f32::from_bits(word as u32))
}

/// Copies a NUL-padded name field, keeping the bytes verbatim.
pub fn name_bytes<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N]> {
    use std::io::Read;
    let mut name = [0u8; N];
    cursor.read_exact(&mut name)?;
    Ok(name)
}

/// Decodes a NUL-padded legacy name for display and lookups.
pub fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(&raw[..end]);
    text.into_owned()
}

/// Encodes `name` into a fixed NUL-terminated field, truncating like `snprintf`.
pub fn encode_name<const N: usize>(name: &str) -> [u8; N] {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(name);
    let mut out = [0u8; N];
    let len = bytes.len().min(N.saturating_sub(1));
    out[..len].copy_from_slice(&bytes[..len]);
    out
}
