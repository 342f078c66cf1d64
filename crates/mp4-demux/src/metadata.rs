//! The video-metadata accumulator, modeled as a builder (Design Note 2):
//! fields are filled in incrementally as boxes arrive and stay optional
//! until [`VideoMetaBuilder::finalize`] produces an immutable
//! [`VideoMeta`].

use bytes::Bytes;

use crate::avcc::AvcDecoderConfig;
use crate::sps::FrameRate;

/// Finalized, immutable video-track metadata.
#[derive(Debug, Clone)]
pub struct VideoMeta {
    pub track_id: u32,
    pub timescale: u32,
    pub duration: u32,
    pub timescale_mdhd: u32,
    pub duration_mdhd: u32,
    pub codec_width: u32,
    pub codec_height: u32,
    pub present_width: u32,
    pub present_height: u32,
    pub profile: u8,
    pub level: u8,
    pub bit_depth: u8,
    pub chroma_format: u8,
    pub frame_rate: FrameRate,
    pub ref_sample_duration: f64,
    pub avcc: Bytes,
    pub codec: String,
}

/// Accumulates video-track fields across `mvhd`, `tkhd`, `mdhd` and
/// `stsd`/`avcC` before they can be finalized into a [`VideoMeta`].
#[derive(Debug, Default)]
pub struct VideoMetaBuilder {
    track_id: Option<u32>,
    timescale: Option<u32>,
    duration: Option<u32>,
    timescale_mdhd: Option<u32>,
    duration_mdhd: Option<u32>,
    avc_config: Option<AvcDecoderConfig>,
}

impl VideoMetaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_movie_header(&mut self, track_id: u32, timescale: u32, duration: u32) {
        self.track_id = Some(track_id);
        self.timescale = Some(timescale);
        self.duration = Some(duration);
    }

    pub fn set_media_header(&mut self, timescale_mdhd: u32, duration_mdhd: u32) {
        self.timescale_mdhd = Some(timescale_mdhd);
        self.duration_mdhd = Some(duration_mdhd);
    }

    pub fn set_avc_config(&mut self, avc_config: AvcDecoderConfig) {
        self.avc_config = Some(avc_config);
    }

    pub fn is_ready(&self) -> bool {
        self.track_id.is_some()
            && self.timescale.is_some()
            && self.duration.is_some()
            && self.timescale_mdhd.is_some()
            && self.avc_config.is_some()
    }

    /// Produce the immutable record once every required field is present.
    pub fn finalize(&self) -> Option<VideoMeta> {
        if !self.is_ready() {
            return None;
        }
        let avc = self.avc_config.as_ref()?;
        let timescale = self.timescale?;
        let fps = &avc.sps_info.frame_rate;
        let ref_sample_duration = if fps.fps_num != 0 {
            timescale as f64 * (fps.fps_den as f64 / fps.fps_num as f64)
        } else {
            0.0
        };

        Some(VideoMeta {
            track_id: self.track_id?,
            timescale,
            duration: self.duration?,
            timescale_mdhd: self.timescale_mdhd?,
            duration_mdhd: self.duration_mdhd.unwrap_or(0),
            codec_width: avc.sps_info.codec_width,
            codec_height: avc.sps_info.codec_height,
            present_width: avc.sps_info.present_width,
            present_height: avc.sps_info.present_height,
            profile: avc.sps_info.profile_idc,
            level: avc.sps_info.level_idc,
            bit_depth: avc.sps_info.bit_depth,
            chroma_format: avc.sps_info.chroma_format,
            frame_rate: *fps,
            ref_sample_duration,
            avcc: avc.raw.clone(),
            codec: avc.codec.clone(),
        })
    }
}

/// Media-wide information, emitted once `onMediaInfo` completeness is
/// reached: width, height, fps and codec all populated; if
/// audio exists, its codec must also be present (this crate does not
/// realize the audio path, so `has_audio` is always driven by config or
/// probing rather than by an audio codec becoming available).
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub has_audio: bool,
    pub has_video: bool,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    pub duration_ms: u64,
}

impl MediaInfo {
    pub fn from_video_meta(meta: &VideoMeta, has_audio: bool, has_video: bool, duration_ms: u64) -> Self {
        Self {
            has_audio,
            has_video,
            width: meta.present_width,
            height: meta.present_height,
            fps: meta.frame_rate.fps,
            codec: meta.codec.clone(),
            duration_ms,
        }
    }

    /// Complete once width, height, fps, codec are all non-zero
    /// and, if audio is present, its codec must be too (always satisfied
    /// here since the audio path isn't realized by this crate).
    pub fn is_complete(&self) -> bool {
        self.has_video && self.width != 0 && self.height != 0 && self.fps > 0.0 && !self.codec.is_empty()
    }
}
