//! NAL framer: splits a sample's bytes into length-prefixed NAL
//! units and detects IDR (keyframe) units.

use bytes::Bytes;

use crate::reader;

/// One NAL unit: its type (low 5 bits of the byte after the length prefix)
/// and its data, which includes the length prefix plus the payload.
#[derive(Debug, Clone)]
pub struct NalUnit {
    pub nalu_type: u8,
    pub data: Bytes,
}

/// IDR (instantaneous decoder refresh) NAL unit type.
pub const NAL_TYPE_IDR: u8 = 5;

/// Result of framing one sample.
#[derive(Debug, Clone, Default)]
pub struct FramedSample {
    pub nal_units: Vec<NalUnit>,
    pub is_keyframe: bool,
}

/// Split `sample` into NAL units using `nalu_length_size`-byte big-endian
/// length prefixes. Returns `None` (and logs a warning naming `dts`) if a
/// declared NAL size exceeds the remaining bytes; the caller drops the
/// sample in that case.
pub fn frame_sample(sample: &Bytes, nalu_length_size: u8, dts: i64) -> Option<FramedSample> {
    let mut framed = FramedSample::default();
    let mut offset = 0usize;

    while offset < sample.len() {
        let remaining = sample.len() - offset;
        if remaining < nalu_length_size as usize {
            tracing::warn!(dts, "Malformed Nalus near timestamp {dts}, NaluSize > DataSize!");
            return None;
        }

        let nalu_size = match nalu_length_size {
            3 => reader::read_u24(sample, offset).ok()?,
            4 => reader::read_u32(sample, offset).ok()?,
            _ => unreachable!("naluLengthSize is validated to be 3 or 4 in avcc::parse"),
        } as usize;

        let payload_start = offset + nalu_length_size as usize;
        if sample.len() - payload_start < nalu_size {
            tracing::warn!(dts, "Malformed Nalus near timestamp {dts}, NaluSize > DataSize!");
            return None;
        }

        let nalu_type = sample[payload_start] & 0b0001_1111;
        if nalu_type == NAL_TYPE_IDR {
            framed.is_keyframe = true;
        }

        let unit_end = payload_start + nalu_size;
        framed.nal_units.push(NalUnit {
            nalu_type,
            data: sample.slice(offset..unit_end),
        });

        offset = unit_end;
    }

    Some(framed)
}
