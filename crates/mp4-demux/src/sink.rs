//! The callback-driven sink re-expressed as a typed event channel (Design
//! Note 1): instead of four separate JS callback slots (`onError`,
//! `onMediaInfo`, `onTrackMetadata`, `onDataAvailable`), [`StreamDriver`]
//! returns a `Vec<DemuxEvent>` synchronously from each `parse_chunk` call
//! and the host matches on the variant.
//!
//! [`StreamDriver`]: crate::driver::StreamDriver

use crate::error::ErrorKind;
use crate::metadata::{MediaInfo, VideoMeta};
use crate::sample::Sample;

/// One event emitted during a `parse_chunk` call.
#[derive(Debug, Clone)]
pub enum DemuxEvent {
    /// Emitted once all required [`MediaInfo`] fields are populated.
    /// Idempotent: re-emitted at most once per session even if completeness
    /// would be re-evaluated on a later call.
    MediaInfo(MediaInfo),
    /// Emitted exactly once per session, right after `avcC` parsing succeeds.
    TrackMetadata(Box<VideoMeta>),
    /// Emitted after a chunk that produced new video samples.
    DataAvailable { video_samples: Vec<Sample> },
    /// A fatal, session-terminating error.
    Error { kind: ErrorKind, message: String },
}
