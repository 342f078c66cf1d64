//! End-to-end tests driving [`StreamDriver`] through `parse_chunk` only,
//! covering the boundary scenarios a real caller hits: too little data to
//! make progress, a non-MP4 buffer, samples split across chunks spanning
//! multiple `stco` chunks, an edit list shifting DTS negative, and IDR
//! detection surfacing through to the emitted samples.

use bytes::Bytes;
use mp4_demux::{DemuxEvent, DemuxState, DemuxerConfig, StreamDriver};

mod support;
use support::{build_mp4, BuildOpts};

#[test]
fn insufficient_data_makes_no_progress() {
    let mut driver = StreamDriver::new(DemuxerConfig::default());
    let outcome = driver.parse_chunk(Bytes::from(vec![0u8; 12]), 0).unwrap();

    assert_eq!(outcome.consumed, 0);
    assert!(outcome.events.is_empty());
    assert_eq!(driver.state(), DemuxState::IdleAwaitingHeader);
}

#[test]
fn non_ftyp_header_never_progresses_past_idle() {
    let mut buf = 16u32.to_be_bytes().to_vec();
    buf.extend_from_slice(b"wide");
    buf.extend_from_slice(&[0u8; 8]);

    let mut driver = StreamDriver::new(DemuxerConfig::default());
    let outcome = driver.parse_chunk(Bytes::from(buf), 0).unwrap();

    assert_eq!(outcome.consumed, 0);
    assert!(outcome.events.is_empty());
    assert_eq!(driver.state(), DemuxState::IdleAwaitingHeader);
}

#[test]
fn file_delivered_across_two_chunks_still_resolves() {
    let opts = BuildOpts {
        samples: vec![(0x65, vec![0xAA, 0xBB])],
        stsc_entries: vec![(1, 1)],
        chunk_count: 1,
        stts: vec![(1, 3000)],
        elst: None,
        mvhd_timescale: 1000,
        mvhd_duration: 5000,
        mdhd_timescale: 90_000,
        mdhd_duration: 450_000,
    };
    let (bytes, ftyp_len) = build_mp4(&opts);

    let mut driver = StreamDriver::new(DemuxerConfig::default());

    // Hand over just the ftyp box first: not enough to find moov yet.
    let first = driver
        .parse_chunk(Bytes::copy_from_slice(&bytes[..ftyp_len]), 0)
        .unwrap();
    assert!(first.events.is_empty());
    assert_eq!(driver.state(), DemuxState::FtypParsed);

    let second = driver
        .parse_chunk(Bytes::copy_from_slice(&bytes[ftyp_len..]), ftyp_len as u64)
        .unwrap();

    assert_eq!(driver.state(), DemuxState::Complete);
    assert!(second
        .events
        .iter()
        .any(|e| matches!(e, DemuxEvent::TrackMetadata(_))));

    let keyframes: Vec<bool> = second
        .events
        .iter()
        .flat_map(|e| match e {
            DemuxEvent::DataAvailable { video_samples } => {
                video_samples.iter().map(|s| s.is_keyframe).collect::<Vec<_>>()
            }
            _ => vec![],
        })
        .collect();
    assert_eq!(keyframes, vec![true]);
}

#[test]
fn samples_spanning_multiple_stco_chunks_resolve_in_order() {
    let opts = BuildOpts {
        samples: vec![
            (0x65, vec![0xAA, 0xBB]), // IDR
            (0x01, vec![0xCC, 0xDD]), // non-IDR
            (0x01, vec![0xEE, 0xFF]), // non-IDR
        ],
        // Chunk 1 carries the first two samples, chunk 2 carries the third.
        stsc_entries: vec![(1, 2), (2, 1)],
        chunk_count: 2,
        stts: vec![(3, 1000)],
        elst: None,
        mvhd_timescale: 1000,
        mvhd_duration: 5000,
        mdhd_timescale: 90_000,
        mdhd_duration: 450_000,
    };
    let (bytes, _ftyp_len) = build_mp4(&opts);

    let mut driver = StreamDriver::new(DemuxerConfig::default());
    let outcome = driver.parse_chunk(Bytes::from(bytes), 0).unwrap();

    assert_eq!(driver.state(), DemuxState::Complete);

    let mut samples = Vec::new();
    for event in &outcome.events {
        if let DemuxEvent::DataAvailable { video_samples } = event {
            samples.extend(video_samples.iter().cloned());
        }
    }
    assert_eq!(samples.len(), 3);
    assert_eq!(
        samples.iter().map(|s| s.is_keyframe).collect::<Vec<_>>(),
        vec![true, false, false]
    );
    assert!(samples.windows(2).all(|w| w[1].dts >= w[0].dts));
}

#[test]
fn edit_list_shifts_first_sample_dts_negative() {
    let opts = BuildOpts {
        samples: vec![(0x65, vec![0xAA, 0xBB])],
        stsc_entries: vec![(1, 1)],
        chunk_count: 1,
        stts: vec![(1, 3000)],
        // media_time 9000 at mdhd timescale 90_000, movie timescale 1_000:
        // start_offset = 9000 * 90_000 / 1_000 = 810_000.
        elst: Some((0, 9000)),
        mvhd_timescale: 1_000,
        mvhd_duration: 5000,
        mdhd_timescale: 90_000,
        mdhd_duration: 450_000,
    };
    let (bytes, _ftyp_len) = build_mp4(&opts);

    let mut driver = StreamDriver::new(DemuxerConfig::default());
    let outcome = driver.parse_chunk(Bytes::from(bytes), 0).unwrap();

    let mut samples = Vec::new();
    for event in &outcome.events {
        if let DemuxEvent::DataAvailable { video_samples } = event {
            samples.extend(video_samples.iter().cloned());
        }
    }
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].dts, -810_000);
    assert_eq!(samples[0].pts, samples[0].dts);
}
