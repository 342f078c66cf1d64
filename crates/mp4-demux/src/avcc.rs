//! AVC decoder-configuration parser: validates `avcC`, extracts
//! the NAL length size, and invokes the SPS parser.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::reader;
use crate::sps::{self, SpsInfo};

/// Parsed `AVCDecoderConfigurationRecord`.
#[derive(Debug, Clone)]
pub struct AvcDecoderConfig {
    pub nalu_length_size: u8,
    pub sps_info: SpsInfo,
    /// `avc1.XXYYZZ`, built from SPS bytes 1..4.
    pub codec: String,
    /// The raw record, retained verbatim for the metadata record's `avcc` field.
    pub raw: Bytes,
}

pub fn parse(avcc: &Bytes) -> Result<AvcDecoderConfig> {
    let configuration_version = reader::read_u8(avcc, 0)?;
    if configuration_version != 1 {
        return Err(Error::format("Invalid AVCDecoderConfigurationRecord"));
    }
    let profile_indication = reader::read_u8(avcc, 1)?;
    if profile_indication == 0 {
        return Err(Error::format("Invalid AVCDecoderConfigurationRecord"));
    }

    let length_size_minus_one = reader::read_u8(avcc, 4)? & 0b0000_0011;
    let nalu_length_size = length_size_minus_one + 1;
    if !matches!(nalu_length_size, 3 | 4) {
        return Err(Error::format(format!(
            "Strange NaluLengthSizeMinusOne: {length_size_minus_one}"
        )));
    }

    let num_sps = reader::read_u8(avcc, 5)? & 0b0001_1111;
    if num_sps == 0 {
        return Err(Error::format(
            "Invalid AVCDecoderConfigurationRecord: No SPS",
        ));
    }
    if num_sps > 1 {
        tracing::warn!(num_sps, "avcC carries multiple SPS; using only the first");
    }

    let sps_len = reader::read_u16(avcc, 6)? as usize;
    let sps_bytes = reader::slice(avcc, 8, sps_len)?;
    let sps_info = sps::parse(&sps_bytes);
    let frame_rate = if sps_info.frame_rate.fixed
        && sps_info.frame_rate.fps_num != 0
        && sps_info.frame_rate.fps_den != 0
    {
        sps_info.frame_rate
    } else {
        sps::FrameRate::DEFAULT
    };
    let sps_info = SpsInfo {
        frame_rate,
        ..sps_info
    };

    let codec = codec_string(&sps_bytes);

    // Walk past however many more SPS entries were declared (only the
    // first is used) to reach the PPS count.
    let mut offset = 8 + sps_len;
    for _ in 1..num_sps {
        let len = reader::read_u16(avcc, offset)? as usize;
        offset += 2 + len;
    }

    let num_pps = reader::read_u8(avcc, offset)?;
    if num_pps == 0 {
        return Err(Error::format(
            "Invalid AVCDecoderConfigurationRecord: No PPS",
        ));
    }

    Ok(AvcDecoderConfig {
        nalu_length_size,
        sps_info,
        codec,
        raw: avcc.clone(),
    })
}

/// `avc1.XXYYZZ`, where XX/YY/ZZ are SPS bytes 1..4 as two-digit lowercase hex.
fn codec_string(sps: &Bytes) -> String {
    if sps.len() < 4 {
        return "avc1.000000".to_string();
    }
    format!("avc1.{:02x}{:02x}{:02x}", sps[1], sps[2], sps[3])
}
