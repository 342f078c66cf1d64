//! A minimal H.264 Sequence Parameter Set parser.
//!
//! Treated as an external, pure-function collaborator: this module's
//! correctness is not what the demuxer's own test suite targets, but a
//! real implementation is still required to produce codec/resolution
//! data for [`crate::metadata::VideoMetaBuilder`]. Kept dependency-free and
//! side-effect-free by construction.

/// Frame-rate info decoded from (or substituted for) VUI timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    pub fixed: bool,
    pub fps: f64,
    pub fps_num: u32,
    pub fps_den: u32,
}

impl FrameRate {
    /// Default substituted when VUI timing is absent or not fixed.
    pub const DEFAULT: FrameRate = FrameRate {
        fixed: true,
        fps: 23.976,
        fps_num: 23976,
        fps_den: 1000,
    };
}

/// Resolution/profile/level/chroma info decoded from an SPS.
#[derive(Debug, Clone, Copy)]
pub struct SpsInfo {
    pub profile_idc: u8,
    pub level_idc: u8,
    pub codec_width: u32,
    pub codec_height: u32,
    pub present_width: u32,
    pub present_height: u32,
    pub chroma_format: u8,
    pub bit_depth: u8,
    pub frame_rate: FrameRate,
}

/// A bit reader for Exp-Golomb-coded H.264 syntax elements, operating on
/// already-unescaped RBSP bytes (the caller is responsible for stripping
/// emulation-prevention `0x03` bytes before calling in).
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn read_bit(&mut self) -> u8 {
        let byte = self.bit_pos / 8;
        if byte >= self.data.len() {
            return 0;
        }
        let shift = 7 - (self.bit_pos % 8);
        let bit = (self.data[byte] >> shift) & 1;
        self.bit_pos += 1;
        bit
    }

    fn read_bits(&mut self, count: u32) -> u32 {
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | self.read_bit() as u32;
        }
        value
    }

    /// Unsigned Exp-Golomb (`ue(v)`).
    fn read_ue(&mut self) -> u32 {
        let mut leading_zero_bits = 0u32;
        while self.read_bit() == 0 && leading_zero_bits < 32 {
            if self.bit_pos / 8 >= self.data.len() {
                return 0;
            }
            leading_zero_bits += 1;
        }
        if leading_zero_bits == 0 {
            return 0;
        }
        let suffix = self.read_bits(leading_zero_bits);
        (1u32 << leading_zero_bits) - 1 + suffix
    }

    /// Signed Exp-Golomb (`se(v)`).
    fn read_se(&mut self) -> i32 {
        let code = self.read_ue();
        let magnitude = ((code + 1) / 2) as i32;
        if code % 2 == 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    fn skip_scaling_list(&mut self, size: usize) {
        let mut last_scale = 8i32;
        let mut next_scale = 8i32;
        for _ in 0..size {
            if next_scale != 0 {
                let delta = self.read_se();
                next_scale = (last_scale + delta + 256) % 256;
            }
            last_scale = if next_scale == 0 { last_scale } else { next_scale };
        }
    }
}

/// Parse a raw SPS NAL payload (including the 1-byte NAL header) into
/// resolution/profile/level/framerate info.
pub fn parse(sps: &[u8]) -> SpsInfo {
    if sps.len() < 4 {
        return fallback();
    }

    let profile_idc = sps[1];
    let level_idc = sps[3];

    let mut reader = BitReader::new(&sps[4..]);
    let _seq_parameter_set_id = reader.read_ue();

    let mut chroma_format_idc = 1u32;
    let mut bit_depth_luma = 8u32;
    let mut separate_colour_plane = false;

    if matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    ) {
        chroma_format_idc = reader.read_ue();
        if chroma_format_idc == 3 {
            separate_colour_plane = reader.read_bit() == 1;
        }
        bit_depth_luma = reader.read_ue() + 8;
        let _bit_depth_chroma = reader.read_ue() + 8;
        let _qpprime_y_zero_transform_bypass = reader.read_bit();
        let seq_scaling_matrix_present = reader.read_bit() == 1;
        if seq_scaling_matrix_present {
            let count = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..count {
                if reader.read_bit() == 1 {
                    reader.skip_scaling_list(if i < 6 { 16 } else { 64 });
                }
            }
        }
    }

    let _log2_max_frame_num_minus4 = reader.read_ue();
    let pic_order_cnt_type = reader.read_ue();
    if pic_order_cnt_type == 0 {
        let _log2_max_pic_order_cnt_lsb_minus4 = reader.read_ue();
    } else if pic_order_cnt_type == 1 {
        let _delta_pic_order_always_zero = reader.read_bit();
        let _offset_for_non_ref_pic = reader.read_se();
        let _offset_for_top_to_bottom_field = reader.read_se();
        let num_ref_frames_in_pic_order_cnt_cycle = reader.read_ue();
        for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
            let _ = reader.read_se();
        }
    }

    let _max_num_ref_frames = reader.read_ue();
    let _gaps_in_frame_num_value_allowed = reader.read_bit();
    let pic_width_in_mbs_minus1 = reader.read_ue();
    let pic_height_in_map_units_minus1 = reader.read_ue();
    let frame_mbs_only_flag = reader.read_bit();
    if frame_mbs_only_flag == 0 {
        let _mb_adaptive_frame_field_flag = reader.read_bit();
    }
    let _direct_8x8_inference_flag = reader.read_bit();

    let frame_cropping_flag = reader.read_bit();
    let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0u32, 0u32, 0u32, 0u32);
    if frame_cropping_flag == 1 {
        crop_left = reader.read_ue();
        crop_right = reader.read_ue();
        crop_top = reader.read_ue();
        crop_bottom = reader.read_ue();
    }

    let frame_mbs_only = frame_mbs_only_flag == 1;
    let codec_width = (pic_width_in_mbs_minus1 + 1) * 16;
    let codec_height =
        (2 - frame_mbs_only_flag as u32) * (pic_height_in_map_units_minus1 + 1) * 16;

    let sub_width_c = if chroma_format_idc == 1 || chroma_format_idc == 2 {
        2
    } else {
        1
    };
    let sub_height_c = if chroma_format_idc == 1 { 2 } else { 1 };
    let crop_unit_x = if separate_colour_plane || chroma_format_idc == 0 {
        1
    } else {
        sub_width_c
    };
    let crop_unit_y = if separate_colour_plane || chroma_format_idc == 0 {
        2 - frame_mbs_only_flag as u32
    } else {
        sub_height_c * (2 - frame_mbs_only_flag as u32)
    };

    let present_width = codec_width.saturating_sub((crop_left + crop_right) * crop_unit_x);
    let present_height = codec_height.saturating_sub((crop_top + crop_bottom) * crop_unit_y);

    let frame_rate = parse_vui_frame_rate(&mut reader, frame_mbs_only);

    SpsInfo {
        profile_idc,
        level_idc,
        codec_width,
        codec_height,
        present_width: if present_width == 0 { codec_width } else { present_width },
        present_height: if present_height == 0 { codec_height } else { present_height },
        chroma_format: chroma_format_idc as u8,
        bit_depth: bit_depth_luma as u8,
        frame_rate,
    }
}

fn parse_vui_frame_rate(reader: &mut BitReader<'_>, frame_mbs_only: bool) -> FrameRate {
    let vui_parameters_present = reader.read_bit() == 1;
    if !vui_parameters_present {
        return FrameRate::DEFAULT;
    }

    // aspect_ratio_info, overscan_info, video_signal_type, chroma_loc_info
    // are skipped here; they don't bear on frame rate and are out of scope
    // for this demuxer (sarRatio is read elsewhere where a downstream
    // remuxer needs it; this crate only needs fps for refSampleDuration).
    if reader.read_bit() == 1 {
        let aspect_ratio_idc = reader.read_bits(8);
        if aspect_ratio_idc == 255 {
            let _sar_width = reader.read_bits(16);
            let _sar_height = reader.read_bits(16);
        }
    }
    if reader.read_bit() == 1 {
        let _overscan_appropriate_flag = reader.read_bit();
    }
    if reader.read_bit() == 1 {
        let _video_format = reader.read_bits(3);
        let _video_full_range_flag = reader.read_bit();
        if reader.read_bit() == 1 {
            let _colour_primaries = reader.read_bits(8);
            let _transfer_characteristics = reader.read_bits(8);
            let _matrix_coefficients = reader.read_bits(8);
        }
    }
    if reader.read_bit() == 1 {
        let _chroma_sample_loc_type_top_field = reader.read_ue();
        let _chroma_sample_loc_type_bottom_field = reader.read_ue();
    }

    let timing_info_present = reader.read_bit() == 1;
    if !timing_info_present {
        return FrameRate::DEFAULT;
    }

    let num_units_in_tick = reader.read_bits(32);
    let time_scale = reader.read_bits(32);
    let fixed_frame_rate_flag = reader.read_bit() == 1;

    if !fixed_frame_rate_flag || num_units_in_tick == 0 || time_scale == 0 {
        return FrameRate::DEFAULT;
    }

    // time_scale counts fields for non-frame-mbs-only streams.
    let divisor = if frame_mbs_only { 2 } else { 1 };
    let fps_den = num_units_in_tick * divisor;
    let fps_num = time_scale;
    FrameRate {
        fixed: true,
        fps: fps_num as f64 / fps_den as f64,
        fps_num,
        fps_den,
    }
}

fn fallback() -> SpsInfo {
    SpsInfo {
        profile_idc: 0,
        level_idc: 0,
        codec_width: 0,
        codec_height: 0,
        present_width: 0,
        present_height: 0,
        chroma_format: 1,
        bit_depth: 8,
        frame_rate: FrameRate::DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short_sps_falls_back() {
        let info = parse(&[0x67, 0x42]);
        assert_eq!(info.codec_width, 0);
        assert_eq!(info.frame_rate, FrameRate::DEFAULT);
    }

    #[test]
    fn profile_and_level_come_from_fixed_offsets() {
        // A real 1280x720 baseline SPS would be longer; here we only check
        // that profile_idc/level_idc are read from byte 1 and byte 3.
        let sps = [0x67, 0x42, 0x00, 0x1f, 0x00, 0x00, 0x00, 0x00];
        let info = parse(&sps);
        assert_eq!(info.profile_idc, 0x42);
        assert_eq!(info.level_idc, 0x1f);
    }

    #[test]
    fn exp_golomb_ue_decodes_known_values() {
        // Concatenated Exp-Golomb codes for 0,1,2,3: "1" "010" "011" "00100",
        // packed MSB-first into two bytes and zero-padded to 16 bits.
        let data = [0xA6u8, 0x40u8];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read_ue(), 0);
        assert_eq!(r.read_ue(), 1);
        assert_eq!(r.read_ue(), 2);
        assert_eq!(r.read_ue(), 3);
    }
}
