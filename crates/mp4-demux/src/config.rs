//! Configuration options recognized by the demuxer.
//!
//! `reuseRedirectedURL` is a loader-only option and isn't modeled here;
//! this crate has no loader. The `serialize` feature lets a host persist
//! or transmit a config alongside session state.

#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default)]
pub struct DemuxerConfig {
    /// Replaces the derived duration in `MediaInfo`, in milliseconds.
    pub overrided_duration: Option<u32>,
    /// Force-sets whether an audio track is reported present.
    pub overrided_has_audio: Option<bool>,
    /// Force-sets whether a video track is reported present.
    pub overrided_has_video: Option<bool>,
    /// Added to output timestamps, in milliseconds.
    pub timestamp_base: u32,
}
