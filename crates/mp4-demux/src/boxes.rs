//! Box header parsing and the box-tree walker.
//!
//! An MP4 box is an 8-byte header (`u32` size, inclusive of the header,
//! followed by a four-character type) and a body. This module recognizes
//! which types are containers (recurse into the body) versus leaves
//! (dispatched to [`crate::boxes::leaf`]), and walks a byte range invoking a
//! visitor for each box it finds.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::reader::{self, FourCc};

pub const FTYP: FourCc = *b"ftyp";
pub const MOOV: FourCc = *b"moov";
pub const MVHD: FourCc = *b"mvhd";
pub const TRAK: FourCc = *b"trak";
pub const TKHD: FourCc = *b"tkhd";
pub const EDTS: FourCc = *b"edts";
pub const ELST: FourCc = *b"elst";
pub const MDIA: FourCc = *b"mdia";
pub const MDHD: FourCc = *b"mdhd";
pub const MINF: FourCc = *b"minf";
pub const STBL: FourCc = *b"stbl";
pub const STSD: FourCc = *b"stsd";
pub const STSC: FourCc = *b"stsc";
pub const STSZ: FourCc = *b"stsz";
pub const STCO: FourCc = *b"stco";
pub const STTS: FourCc = *b"stts";
pub const AVC1: FourCc = *b"avc1";
pub const AVCC: FourCc = *b"avcC";

/// Box header: size (inclusive of the 8-byte header) and four-character type.
#[derive(Debug, Clone, Copy)]
pub struct BoxHeader {
    pub box_type: FourCc,
    /// Absolute offset of the box body (8 bytes past the box start).
    pub body_start: usize,
    /// Size of the body, excluding the header.
    pub body_size: usize,
}

/// Returns true if `box_type`'s body should be walked as a sequence of
/// child boxes rather than dispatched to a leaf parser.
pub fn is_container(box_type: FourCc) -> bool {
    matches!(box_type, MOOV | TRAK | MDIA | MINF | STBL | EDTS)
}

/// Walk boxes in `[start, end)` of `bytes`, invoking `visitor` with each
/// box's header. `visitor` returns `Ok(())` to continue; any `Err` aborts
/// the walk and is propagated.
///
/// Stops cleanly (without invoking `visitor`) once fewer than 8 bytes
/// remain before `end`; the caller is expected to retry once more data has
/// arrived, per the streaming contract in [`crate::driver`].
pub fn walk(
    bytes: &Bytes,
    start: usize,
    end: usize,
    mut visitor: impl FnMut(BoxHeader) -> Result<()>,
) -> Result<()> {
    let mut offset = start;
    while offset + 8 <= end {
        let size = reader::read_u32(bytes, offset)? as usize;
        let box_type = reader::read_fourcc(bytes, offset + 4)?;

        if size < 8 {
            return Err(Error::format(format!(
                "box '{}' at {offset} has invalid size {size}",
                reader::fourcc_str(box_type)
            )));
        }
        if offset + size > end {
            return Err(Error::format(format!(
                "box '{}' at {offset} (size {size}) overflows its parent",
                reader::fourcc_str(box_type)
            )));
        }

        visitor(BoxHeader {
            box_type,
            body_start: offset + 8,
            body_size: size - 8,
        })?;

        offset += size;
    }
    Ok(())
}

/// Returns `true` once `[start, end)` has at least one complete 8-byte box
/// header available, i.e. the walk would make progress.
pub fn has_full_header(end: usize, start: usize) -> bool {
    end.saturating_sub(start) >= 8
}
