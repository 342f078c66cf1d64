//! Leaf-box parsers: decode the body of each recognized non-container box
//! into a typed record.
//!
//! Every "full box" (`mvhd`, `tkhd`, `mdhd`, `elst`, `stsd`, `stsc`, `stsz`,
//! `stco`, `stts`) starts with a 1-byte version and 3-byte flags field;
//! version 1 handling beyond `tkhd` is not implemented (non-goal: 64-bit
//! durations).

use bytes::Bytes;

use crate::boxes::{self, BoxHeader};
use crate::error::{Error, Result};
use crate::reader;

/// `ftyp`: major brand, minor version, and the compatible-brands list
/// filling the remainder of the box.
#[derive(Debug, Clone)]
pub struct Ftyp {
    pub major_brand: [u8; 4],
    pub minor_version: u32,
    pub compatible_brands: Vec<[u8; 4]>,
}

pub fn parse_ftyp(body: &Bytes) -> Result<Ftyp> {
    let major_brand = reader::read_fourcc(body, 0)?;
    let minor_version = reader::read_u32(body, 4)?;
    let mut compatible_brands = Vec::new();
    let mut offset = 8;
    while offset + 4 <= body.len() {
        compatible_brands.push(reader::read_fourcc(body, offset)?);
        offset += 4;
    }
    Ok(Ftyp {
        major_brand,
        minor_version,
        compatible_brands,
    })
}

/// `mvhd` (v0): movie timescale and duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mvhd {
    pub timescale: u32,
    pub duration: u32,
}

pub fn parse_mvhd(body: &Bytes) -> Result<Mvhd> {
    // byte 0: version, bytes 1..4: flags, bytes 4..12: creation/modification.
    let timescale = reader::read_u32(body, 12)?;
    let duration = reader::read_u32(body, 16)?;
    Ok(Mvhd { timescale, duration })
}

/// `tkhd`: just the track id, since that's all the resolver needs. Returns
/// the id itself; the caller decides whether it matches the video track.
pub fn parse_tkhd_track_id(body: &Bytes) -> Result<u32> {
    let version = reader::read_u8(body, 0)?;
    let offset = if version == 1 { 20 } else { 12 };
    reader::read_u32(body, offset)
}

/// `mdhd` (v0): media timescale and duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mdhd {
    pub timescale: u32,
    pub duration: u32,
}

pub fn parse_mdhd(body: &Bytes) -> Result<Mdhd> {
    // byte 0: version, bytes 1..4: flags, bytes 4..12: creation/mod.
    let timescale = reader::read_u32(body, 12)?;
    let duration = reader::read_u32(body, 16)?;
    Ok(Mdhd { timescale, duration })
}

/// A single `elst` entry. Only `entries[0]` is consulted by the timing
/// resolver (non-goal: edit lists beyond the first).
#[derive(Debug, Clone, Copy)]
pub struct ElstEntry {
    pub segment_duration: u32,
    pub media_time: u32,
    pub media_rate_integer: u16,
    pub media_rate_fraction: u16,
}

pub fn parse_elst(body: &Bytes) -> Result<Vec<ElstEntry>> {
    let entry_count = reader::read_u32(body, 4)? as usize;
    let mut entries = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        let base = 8 + i * 12;
        entries.push(ElstEntry {
            segment_duration: reader::read_u32(body, base)?,
            media_time: reader::read_u32(body, base + 4)?,
            media_rate_integer: reader::read_u16(body, base + 8)?,
            media_rate_fraction: reader::read_u16(body, base + 10)?,
        });
    }
    Ok(entries)
}

/// Parsed `avc1` sample entry: fixed fields plus the raw, not-yet-parsed
/// `avcC` box body nested inside it.
#[derive(Debug, Clone)]
pub struct Avc1Entry {
    pub width: u16,
    pub height: u16,
    pub frame_count: u16,
    pub depth: u16,
    pub avcc: Bytes,
}

/// `stsd`: entry count (expected 1) followed by a `SampleEntry`, which for
/// video must be `avc1` (ISO/IEC 14496-15 layout). `avcC` is a nested box
/// immediately after the fixed `avc1` fields.
pub fn parse_stsd(body: &Bytes) -> Result<Avc1Entry> {
    let entry_count = reader::read_u32(body, 4)?;
    if entry_count == 0 {
        return Err(Error::format("stsd: no sample entries"));
    }

    // SampleEntry base: size(4) + type(4) starting at offset 8.
    let entry_type = reader::read_fourcc(body, 8 + 4)?;
    if entry_type != boxes::AVC1 {
        return Err(Error::codec_unsupported(format!(
            "stsd sample entry is '{}', expected 'avc1'",
            reader::fourcc_str(entry_type)
        )));
    }

    // avc1 VisualSampleEntry fields begin after the 8-byte SampleEntry header:
    // 6 reserved + 2 data_reference_index + 16 pre_defined
    //   + 2 width + 2 height + 4 horiz_res + 4 vert_res + 4 reserved
    //   + 2 frame_count + 32 compressorname + 2 depth + 2 pre_defined
    let avc1_start = 8 + 8; // past stsd header + SampleEntry header
    let width = reader::read_u16(body, avc1_start + 6 + 2 + 16)?;
    let height = reader::read_u16(body, avc1_start + 6 + 2 + 16 + 2)?;
    let frame_count = reader::read_u16(
        body,
        avc1_start + 6 + 2 + 16 + 2 + 2 + 4 + 4 + 4,
    )?;
    let depth = reader::read_u16(
        body,
        avc1_start + 6 + 2 + 16 + 2 + 2 + 4 + 4 + 4 + 2 + 32,
    )?;

    // End of the fixed avc1 fields, where the nested avcC box starts.
    let children_start = avc1_start + 6 + 2 + 16 + 2 + 2 + 4 + 4 + 4 + 2 + 32 + 2 + 2;
    if children_start > body.len() {
        return Err(Error::format("avc1 sample entry shorter than its fixed fields"));
    }
    let children = body.slice(children_start..);

    let mut avcc = None;
    boxes::walk(&children, 0, children.len(), |h| {
        if h.box_type == boxes::AVCC {
            avcc = Some(reader::slice(&children, h.body_start, h.body_size)?);
        }
        Ok(())
    })?;

    let avcc = avcc.ok_or_else(|| Error::format("avc1 sample entry missing avcC box"))?;

    Ok(Avc1Entry {
        width,
        height,
        frame_count,
        depth,
        avcc,
    })
}

/// `stsc` entry: run-length encoded sample-to-chunk mapping.
#[derive(Debug, Clone, Copy)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

pub fn parse_stsc(body: &Bytes) -> Result<Vec<StscEntry>> {
    let entry_count = reader::read_u32(body, 4)? as usize;
    let mut entries = Vec::with_capacity(entry_count);
    let mut last_first_chunk = 0u32;
    for i in 0..entry_count {
        let base = 8 + i * 12;
        let entry = StscEntry {
            first_chunk: reader::read_u32(body, base)?,
            samples_per_chunk: reader::read_u32(body, base + 4)?,
            sample_description_index: reader::read_u32(body, base + 8)?,
        };
        if i > 0 && entry.first_chunk <= last_first_chunk {
            return Err(Error::format(
                "stsc entries must be strictly ascending by first_chunk",
            ));
        }
        last_first_chunk = entry.first_chunk;
        entries.push(entry);
    }
    Ok(entries)
}

/// `stsz`: either a constant sample size, or an explicit per-sample size
/// table of length `sample_count`.
#[derive(Debug, Clone, Default)]
pub struct Stsz {
    pub sample_size: u32,
    pub sample_count: u32,
    pub samples: Vec<u32>,
}

pub fn parse_stsz(body: &Bytes) -> Result<Stsz> {
    let sample_size = reader::read_u32(body, 4)?;
    let sample_count = reader::read_u32(body, 8)?;
    let mut samples = Vec::new();
    if sample_size == 0 {
        samples.reserve(sample_count as usize);
        for i in 0..sample_count as usize {
            samples.push(reader::read_u32(body, 12 + i * 4)?);
        }
    }
    Ok(Stsz {
        sample_size,
        sample_count,
        samples,
    })
}

/// `stco`: 32-bit file offset of each chunk, one per chunk.
pub fn parse_stco(body: &Bytes) -> Result<Vec<u32>> {
    let entry_count = reader::read_u32(body, 4)? as usize;
    let mut entries = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        entries.push(reader::read_u32(body, 8 + i * 4)?);
    }
    Ok(entries)
}

/// `stts` entry: run-length encoded decode-time deltas.
#[derive(Debug, Clone, Copy)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

pub fn parse_stts(body: &Bytes) -> Result<Vec<SttsEntry>> {
    let entry_count = reader::read_u32(body, 4)? as usize;
    let mut entries = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        let base = 8 + i * 8;
        entries.push(SttsEntry {
            sample_count: reader::read_u32(body, base)?,
            sample_delta: reader::read_u32(body, base + 4)?,
        });
    }
    Ok(entries)
}

/// Slice a box's body out of the full accumulated buffer given its header.
pub fn body_of(bytes: &Bytes, header: &BoxHeader) -> Result<Bytes> {
    reader::slice(bytes, header.body_start, header.body_size)
}
