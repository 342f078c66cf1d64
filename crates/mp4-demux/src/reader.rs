//! Big-endian primitives over a [`Bytes`] buffer.
//!
//! MP4 is entirely big-endian. Every leaf-box parser reads through this
//! module rather than indexing raw slices directly, so out-of-range reads
//! surface as [`Error::BufferUnderflow`] instead of a panic.

use bytes::Bytes;

use crate::error::{Error, Result};

/// A four-character box type code (`ftyp`, `moov`, `stsd`, ...).
pub type FourCc = [u8; 4];

/// Render a four-character code for error messages and logging.
pub fn fourcc_str(fcc: FourCc) -> String {
    String::from_utf8_lossy(&fcc).into_owned()
}

fn check(buf: &[u8], offset: usize, need: usize) -> Result<()> {
    let in_range = match offset.checked_add(need) {
        Some(end) => end <= buf.len(),
        None => false,
    };
    if !in_range {
        return Err(Error::BufferUnderflow {
            need,
            have: buf.len().saturating_sub(offset),
        });
    }
    Ok(())
}

/// Read an unsigned 8-bit value at `offset`.
pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    check(buf, offset, 1)?;
    Ok(buf[offset])
}

/// Read a big-endian unsigned 16-bit value at `offset`.
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    check(buf, offset, 2)?;
    Ok(u16::from_be_bytes([buf[offset], buf[offset + 1]]))
}

/// Read a big-endian unsigned 24-bit value at `offset`, returned widened to `u32`.
pub fn read_u24(buf: &[u8], offset: usize) -> Result<u32> {
    check(buf, offset, 3)?;
    Ok(u32::from_be_bytes([0, buf[offset], buf[offset + 1], buf[offset + 2]]))
}

/// Read a big-endian unsigned 32-bit value at `offset`.
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    check(buf, offset, 4)?;
    Ok(u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

/// Read a four-character code at `offset`.
pub fn read_fourcc(buf: &[u8], offset: usize) -> Result<FourCc> {
    check(buf, offset, 4)?;
    Ok([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Slice `[offset, offset+len)` out of a [`Bytes`] without copying.
pub fn slice(bytes: &Bytes, offset: usize, len: usize) -> Result<Bytes> {
    check(bytes, offset, len)?;
    Ok(bytes.slice(offset..offset + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let buf = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(read_u16(&buf, 0).unwrap(), 0x0001);
        assert_eq!(read_u32(&buf, 0).unwrap(), 0x0001_0203);
        assert_eq!(read_u24(&buf, 1).unwrap(), 0x01_0203);
    }

    #[test]
    fn fourcc_roundtrip() {
        let buf = *b"ftyp";
        assert_eq!(read_fourcc(&buf, 0).unwrap(), *b"ftyp");
        assert_eq!(fourcc_str(*b"ftyp"), "ftyp");
    }

    #[test]
    fn underflow_on_short_read() {
        let buf = [0u8; 2];
        let err = read_u32(&buf, 0).unwrap_err();
        assert!(matches!(err, Error::BufferUnderflow { need: 4, have: 2 }));
    }

    #[test]
    fn underflow_past_end_does_not_panic() {
        let buf = [0u8; 4];
        assert!(read_u32(&buf, 3).is_err());
        assert!(read_u8(&buf, 10).is_err());
    }
}
