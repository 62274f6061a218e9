//! Byte-level helpers shared by the codecs.
//!
//! Every format in this crate is little-endian. Fixed records are binrw structs
//! read and written through a `Cursor` positioned at an absolute file offset;
//! loose scalars go through the `read_*` / `write_*` helpers below.

use std::io::Cursor;

use binrw::{BinRead, BinWrite, Endian};

use crate::error::{ensure_len, Result};

// ============================================================================
// binrw records at absolute offsets
// ============================================================================

/// Decode one fixed record starting at `offset`.
pub(crate) fn read_at<T>(data: &[u8], offset: usize) -> Result<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(data);
    cursor.set_position(offset as u64);
    Ok(T::read_options(&mut cursor, Endian::Little, ())?)
}

/// Encode one fixed record over the bytes starting at `offset`.
///
/// The caller checks that the record fits; writing past the end grows `buf`.
pub(crate) fn write_at<T>(buf: &mut Vec<u8>, offset: usize, value: &T) -> Result<()>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(buf);
    cursor.set_position(offset as u64);
    value.write_options(&mut cursor, Endian::Little, ())?;
    Ok(())
}

/// Decode `count` consecutive records of `size` bytes starting at `offset`.
pub(crate) fn read_array<T>(data: &[u8], offset: usize, count: usize, size: usize) -> Result<Vec<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    ensure_len(data, offset + count * size)?;
    let mut cursor = Cursor::new(data);
    cursor.set_position(offset as u64);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(T::read_options(&mut cursor, Endian::Little, ())?);
    }
    Ok(out)
}

// ============================================================================
// Sequential access for variable-length sections
// ============================================================================

/// Decode the next record at the cursor.
pub(crate) fn read_next<T>(cursor: &mut Cursor<&[u8]>) -> Result<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    Ok(T::read_options(cursor, Endian::Little, ())?)
}

/// Borrow the next `n` bytes and advance.
pub(crate) fn take<'a>(cursor: &mut Cursor<&'a [u8]>, n: usize) -> Result<&'a [u8]> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    ensure_len(data, start + n)?;
    cursor.set_position((start + n) as u64);
    Ok(&data[start..start + n])
}

pub(crate) fn take_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    Ok(take(cursor, 1)?[0])
}

pub(crate) fn take_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    let b = take(cursor, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Append one record to the end of `buf`.
pub(crate) fn push_record<T>(buf: &mut Vec<u8>, value: &T) -> Result<()>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let end = buf.len();
    write_at(buf, end, value)
}

// ============================================================================
// Scalars
// ============================================================================

pub(crate) fn read_i32(data: &[u8], offset: usize) -> Result<i32> {
    ensure_len(data, offset + 4)?;
    Ok(i32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    read_i32(data, offset).map(|v| v as u32)
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    ensure_len(data, offset + 2)?;
    Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

pub(crate) fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Read a NUL-terminated string from a fixed-size field.
pub(crate) fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).to_string()
}
