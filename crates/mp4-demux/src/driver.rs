//! The stream driver: the only stateful, public entry point.
//! Owns the growing byte buffer, walks `moov` once it has fully arrived,
//! and dispatches samples out of `mdat` as their bytes become available.

use bytes::{Bytes, BytesMut};

use crate::avcc::{self, AvcDecoderConfig};
use crate::boxes::{self, BoxHeader};
use crate::boxes_leaf::{self, Avc1Entry, ElstEntry, Mdhd, Mvhd, SttsEntry, StscEntry, Stsz};
use crate::config::DemuxerConfig;
use crate::error::{Error, Result};
use crate::metadata::{MediaInfo, VideoMetaBuilder};
use crate::nal;
use crate::probe;
use crate::reader;
use crate::sample::Sample;
use crate::sample_table::{self, FlatSample};
use crate::sink::DemuxEvent;
use crate::timing;

/// Driver lifecycle, mirroring the box-tree's own progress through the
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxState {
    IdleAwaitingHeader,
    FtypParsed,
    MoovParsing,
    TrackTablesReady,
    Dispatching,
    Complete,
    Error,
}

/// Return value of [`StreamDriver::parse_chunk`]: how many bytes of the
/// stream so far are now accounted for, and whatever events that
/// accounting produced.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub consumed: u64,
    pub events: Vec<DemuxEvent>,
}

/// One sample with its file position and timestamps resolved, ready to be
/// sliced out of the buffer once its bytes have arrived.
#[derive(Debug, Clone, Copy)]
struct ResolvedSample {
    file_offset: u64,
    size: u32,
    dts: i64,
    pts: i64,
    cts: i32,
}

#[derive(Default)]
struct ParsedTrak {
    track_id: Option<u32>,
    mdhd: Option<Mdhd>,
    elst: Option<Vec<ElstEntry>>,
    avc1: Option<Avc1Entry>,
    stsc: Option<Vec<StscEntry>>,
    stsz: Option<Stsz>,
    stco: Option<Vec<u32>>,
    stts: Option<Vec<SttsEntry>>,
}

impl ParsedTrak {
    fn is_video(&self) -> bool {
        self.avc1.is_some()
            && self.stsc.is_some()
            && self.stsz.is_some()
            && self.stco.is_some()
            && self.stts.is_some()
    }
}

/// Streaming demuxer session. `parse_chunk` is the sole entry point once
/// constructed; it is fed chunks in order and returns the events each
/// chunk's new bytes unlocked.
pub struct StreamDriver {
    state: DemuxState,
    config: DemuxerConfig,
    buffer: Bytes,
    data_offset: u32,
    track_id: Option<u32>,
    builder: VideoMetaBuilder,
    nalu_length_size: Option<u8>,
    resolved_samples: Vec<ResolvedSample>,
    sample_cursor: usize,
    media_info_emitted: bool,
    track_metadata_emitted: bool,
    mvhd: Option<Mvhd>,
    probed_has_audio: bool,
    probed_has_video: bool,
}

impl StreamDriver {
    pub fn new(config: DemuxerConfig) -> Self {
        Self {
            state: DemuxState::IdleAwaitingHeader,
            config,
            buffer: Bytes::new(),
            data_offset: 0,
            track_id: None,
            builder: VideoMetaBuilder::new(),
            nalu_length_size: None,
            resolved_samples: Vec::new(),
            sample_cursor: 0,
            media_info_emitted: false,
            track_metadata_emitted: false,
            mvhd: None,
            probed_has_audio: false,
            probed_has_video: false,
        }
    }

    /// Feed the next chunk of the stream. `byte_start` must equal the
    /// number of bytes already accepted by this session; a mismatch is an
    /// `Exception` (the driver can't address a gap in a buffered stream).
    pub fn parse_chunk(&mut self, chunk: Bytes, byte_start: u64) -> Result<ParseOutcome> {
        if self.state == DemuxState::Error {
            return Ok(ParseOutcome::default());
        }
        if byte_start != self.buffer.len() as u64 {
            let err = Error::Exception(format!(
                "parse_chunk byte_start {byte_start} does not follow buffered length {}",
                self.buffer.len()
            ));
            self.state = DemuxState::Error;
            return Ok(ParseOutcome {
                consumed: 0,
                events: vec![self.error_event(&err)],
            });
        }

        let mut combined = BytesMut::with_capacity(self.buffer.len() + chunk.len());
        combined.extend_from_slice(&self.buffer);
        combined.extend_from_slice(&chunk);
        self.buffer = combined.freeze();

        let mut events = Vec::new();
        match self.advance() {
            Ok(new_events) => events.extend(new_events),
            Err(err) => {
                self.state = DemuxState::Error;
                events.push(self.error_event(&err));
            }
        }

        let consumed = if self.state == DemuxState::IdleAwaitingHeader {
            0
        } else {
            self.buffer.len() as u64
        };

        Ok(ParseOutcome { consumed, events })
    }

    fn error_event(&self, err: &Error) -> DemuxEvent {
        DemuxEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Drive the state machine forward as far as the currently buffered
    /// bytes allow, looping until a call makes no further progress.
    fn advance(&mut self) -> Result<Vec<DemuxEvent>> {
        let mut events = Vec::new();
        loop {
            let progressed = match self.state {
                DemuxState::IdleAwaitingHeader => self.try_parse_ftyp()?,
                DemuxState::FtypParsed => self.try_locate_moov()?,
                DemuxState::MoovParsing => self.try_parse_moov(&mut events)?,
                DemuxState::TrackTablesReady => self.try_finalize_track(&mut events)?,
                DemuxState::Dispatching => self.try_dispatch(&mut events)?,
                DemuxState::Complete | DemuxState::Error => false,
            };
            if !progressed {
                break;
            }
        }
        Ok(events)
    }

    fn try_parse_ftyp(&mut self) -> Result<bool> {
        let result = probe::probe(&self.buffer);
        if !result.matched {
            return Ok(false);
        }
        self.data_offset = result.data_offset;
        self.probed_has_audio = result.has_audio;
        self.probed_has_video = result.has_video;
        self.state = DemuxState::FtypParsed;
        Ok(true)
    }

    /// Scan top-level boxes after `ftyp` for `moov`'s header. Unlike
    /// [`boxes::walk`], this tolerates a sibling box whose declared size
    /// extends past the buffered bytes; that just means "not here yet".
    fn try_locate_moov(&mut self) -> Result<bool> {
        let mut offset = self.data_offset as usize;
        loop {
            if self.buffer.len() - offset < 8 {
                return Ok(false);
            }
            let size = reader::read_u32(&self.buffer, offset)? as usize;
            let box_type = reader::read_fourcc(&self.buffer, offset + 4)?;
            if size < 8 {
                return Err(Error::format(format!(
                    "box '{}' at {offset} has invalid size {size}",
                    reader::fourcc_str(box_type)
                )));
            }
            if box_type == boxes::MOOV {
                if offset + size > self.buffer.len() {
                    return Ok(false);
                }
                self.state = DemuxState::MoovParsing;
                return Ok(true);
            }
            if offset + size > self.buffer.len() {
                return Ok(false);
            }
            offset += size;
        }
    }

    fn try_parse_moov(&mut self, _events: &mut [DemuxEvent]) -> Result<bool> {
        let mut offset = self.data_offset as usize;
        let moov_header = loop {
            let size = reader::read_u32(&self.buffer, offset)? as usize;
            let box_type = reader::read_fourcc(&self.buffer, offset + 4)?;
            if box_type == boxes::MOOV {
                break BoxHeader {
                    box_type,
                    body_start: offset + 8,
                    body_size: size - 8,
                };
            }
            offset += size;
        };

        let mut mvhd = None;
        let mut traks = Vec::new();
        boxes::walk(
            &self.buffer,
            moov_header.body_start,
            moov_header.body_start + moov_header.body_size,
            |h| {
                match h.box_type {
                    boxes::MVHD => {
                        mvhd = Some(boxes_leaf::parse_mvhd(&boxes_leaf::body_of(&self.buffer, &h)?)?);
                    }
                    boxes::TRAK => {
                        traks.push(parse_trak(&self.buffer, h.body_start, h.body_start + h.body_size)?);
                    }
                    _ => {}
                }
                Ok(())
            },
        )?;

        let mvhd = mvhd.ok_or_else(|| Error::format("moov missing mvhd"))?;
        let video_trak = traks
            .into_iter()
            .find(ParsedTrak::is_video)
            .ok_or_else(|| Error::codec_unsupported("no avc1 video track found in moov"))?;

        let track_id = video_trak
            .track_id
            .ok_or_else(|| Error::format("trak missing tkhd"))?;
        let mdhd = video_trak
            .mdhd
            .ok_or_else(|| Error::format("trak missing mdhd"))?;
        let avc1 = video_trak.avc1.expect("checked by is_video");
        let stsc = video_trak.stsc.expect("checked by is_video");
        let stsz = video_trak.stsz.expect("checked by is_video");
        let stco = video_trak.stco.expect("checked by is_video");
        let stts = video_trak.stts.expect("checked by is_video");

        let avc_config: AvcDecoderConfig = avcc::parse(&avc1.avcc)?;
        self.nalu_length_size = Some(avc_config.nalu_length_size);

        self.builder
            .set_movie_header(track_id, mvhd.timescale, mvhd.duration);
        self.builder.set_media_header(mdhd.timescale, mdhd.duration);
        self.builder.set_avc_config(avc_config);
        self.track_id = Some(track_id);

        let flat: Vec<FlatSample> = sample_table::resolve(&stsc, &stsz, &stco)?;
        let start_offset = timing::start_offset(video_trak.elst.as_deref(), mdhd.timescale, mvhd.timescale);
        let dts_values = timing::resolve_dts(&stts, stsz.sample_count as usize, start_offset);
        let timings = timing::zip_timings(&dts_values);

        self.resolved_samples = flat
            .iter()
            .zip(timings.iter())
            .map(|(f, t)| ResolvedSample {
                file_offset: f.file_offset,
                size: f.size,
                dts: t.dts + self.config.timestamp_base as i64,
                pts: t.pts + self.config.timestamp_base as i64,
                cts: t.cts,
            })
            .collect();

        self.mvhd = Some(mvhd);
        self.state = DemuxState::TrackTablesReady;
        Ok(true)
    }

    fn try_finalize_track(&mut self, events: &mut Vec<DemuxEvent>) -> Result<bool> {
        if self.track_metadata_emitted {
            self.state = DemuxState::Dispatching;
            return Ok(true);
        }
        let Some(meta) = self.builder.finalize() else {
            return Err(Error::format("track metadata incomplete after moov parse"));
        };
        events.push(DemuxEvent::TrackMetadata(Box::new(meta)));
        self.track_metadata_emitted = true;
        self.state = DemuxState::Dispatching;
        Ok(true)
    }

    fn try_dispatch(&mut self, events: &mut Vec<DemuxEvent>) -> Result<bool> {
        if !self.media_info_emitted {
            if let Some(meta) = self.builder.finalize() {
                let has_audio = self.config.overrided_has_audio.unwrap_or(self.probed_has_audio);
                let has_video = self.config.overrided_has_video.unwrap_or(self.probed_has_video);
                let duration_ms = self.config.overrided_duration.map(|d| d as u64).unwrap_or_else(|| {
                    let mvhd = self.mvhd.as_ref().expect("mvhd set before dispatch");
                    if mvhd.timescale == 0 {
                        0
                    } else {
                        (mvhd.duration as u64 * 1000) / mvhd.timescale as u64
                    }
                });
                let info = MediaInfo::from_video_meta(&meta, has_audio, has_video, duration_ms);
                if info.is_complete() {
                    events.push(DemuxEvent::MediaInfo(info));
                    self.media_info_emitted = true;
                }
            }
        }

        let nalu_length_size = self.nalu_length_size.expect("set during moov parse");
        let mut video_samples = Vec::new();
        while self.sample_cursor < self.resolved_samples.len() {
            let resolved = self.resolved_samples[self.sample_cursor];
            let end = resolved.file_offset + resolved.size as u64;
            if end > self.buffer.len() as u64 {
                break;
            }
            let raw = self
                .buffer
                .slice(resolved.file_offset as usize..end as usize);
            self.sample_cursor += 1;
            let Some(framed) = nal::frame_sample(&raw, nalu_length_size, resolved.dts) else {
                continue;
            };
            video_samples.push(Sample {
                dts: resolved.dts,
                pts: resolved.pts,
                cts: resolved.cts,
                is_keyframe: framed.is_keyframe,
                length: resolved.size,
                nal_units: framed.nal_units,
            });
        }

        let progressed = !video_samples.is_empty();
        if progressed {
            events.push(DemuxEvent::DataAvailable { video_samples });
        }

        if self.sample_cursor == self.resolved_samples.len() {
            self.state = DemuxState::Complete;
            return Ok(true);
        }

        Ok(progressed)
    }

    /// Stop producing events but keep the session addressable; matches the
    /// source's distinction between a paused and a torn-down session.
    pub fn abort(&mut self) {
        self.state = DemuxState::Complete;
    }

    /// Tear down the session. Idempotent: calling `destroy` twice, or
    /// calling `parse_chunk` afterwards, is a no-op rather than a panic.
    pub fn destroy(&mut self) {
        self.state = DemuxState::Complete;
        self.buffer = Bytes::new();
        self.resolved_samples.clear();
        self.sample_cursor = 0;
    }

    pub fn state(&self) -> DemuxState {
        self.state
    }
}

fn parse_trak(bytes: &Bytes, start: usize, end: usize) -> Result<ParsedTrak> {
    let mut trak = ParsedTrak::default();
    boxes::walk(bytes, start, end, |h| {
        match h.box_type {
            boxes::TKHD => {
                trak.track_id = Some(boxes_leaf::parse_tkhd_track_id(&boxes_leaf::body_of(bytes, &h)?)?);
            }
            boxes::EDTS => {
                boxes::walk(bytes, h.body_start, h.body_start + h.body_size, |eh| {
                    if eh.box_type == boxes::ELST {
                        trak.elst = Some(boxes_leaf::parse_elst(&boxes_leaf::body_of(bytes, &eh)?)?);
                    }
                    Ok(())
                })?;
            }
            boxes::MDIA => {
                parse_mdia(bytes, h.body_start, h.body_start + h.body_size, &mut trak)?;
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(trak)
}

fn parse_mdia(bytes: &Bytes, start: usize, end: usize, trak: &mut ParsedTrak) -> Result<()> {
    boxes::walk(bytes, start, end, |h| {
        match h.box_type {
            boxes::MDHD => {
                trak.mdhd = Some(boxes_leaf::parse_mdhd(&boxes_leaf::body_of(bytes, &h)?)?);
            }
            boxes::MINF => {
                parse_minf(bytes, h.body_start, h.body_start + h.body_size, trak)?;
            }
            _ => {}
        }
        Ok(())
    })
}

fn parse_minf(bytes: &Bytes, start: usize, end: usize, trak: &mut ParsedTrak) -> Result<()> {
    boxes::walk(bytes, start, end, |h| {
        if h.box_type == boxes::STBL {
            parse_stbl(bytes, h.body_start, h.body_start + h.body_size, trak)?;
        }
        Ok(())
    })
}

fn parse_stbl(bytes: &Bytes, start: usize, end: usize, trak: &mut ParsedTrak) -> Result<()> {
    boxes::walk(bytes, start, end, |h| {
        match h.box_type {
            boxes::STSD => {
                // A non-avc1 sample entry (audio track, unsupported codec)
                // just means this trak isn't the video track; it's not a
                // fatal condition for the session.
                trak.avc1 = boxes_leaf::parse_stsd(&boxes_leaf::body_of(bytes, &h)?).ok();
            }
            boxes::STSC => {
                trak.stsc = Some(boxes_leaf::parse_stsc(&boxes_leaf::body_of(bytes, &h)?)?);
            }
            boxes::STSZ => {
                trak.stsz = Some(boxes_leaf::parse_stsz(&boxes_leaf::body_of(bytes, &h)?)?);
            }
            boxes::STCO => {
                trak.stco = Some(boxes_leaf::parse_stco(&boxes_leaf::body_of(bytes, &h)?)?);
            }
            boxes::STTS => {
                trak.stts = Some(boxes_leaf::parse_stts(&boxes_leaf::body_of(bytes, &h)?)?);
            }
            _ => {}
        }
        Ok(())
    })
}
