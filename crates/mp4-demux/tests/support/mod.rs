//! Builds minimal, hand-assembled MP4 byte buffers for the integration
//! tests: ftyp + moov (mvhd, one avc1 video trak with an optional edit
//! list) + mdat holding one length-prefixed NAL per sample.

fn fbox(ty: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = ((8 + body.len()) as u32).to_be_bytes().to_vec();
    buf.extend_from_slice(ty);
    buf.extend_from_slice(body);
    buf
}

fn full_box(version: u8, rest: &[u8]) -> Vec<u8> {
    let mut buf = vec![version, 0, 0, 0];
    buf.extend_from_slice(rest);
    buf
}

pub struct BuildOpts {
    /// `(nal_type_byte, payload)` per sample, in decode order.
    pub samples: Vec<(u8, Vec<u8>)>,
    /// `stsc` entries as `(first_chunk, samples_per_chunk)`.
    pub stsc_entries: Vec<(u32, u32)>,
    pub chunk_count: u32,
    /// `stts` entries as `(sample_count, sample_delta)`.
    pub stts: Vec<(u32, u32)>,
    /// `elst` first entry as `(segment_duration, media_time)`.
    pub elst: Option<(u32, u32)>,
    pub mvhd_timescale: u32,
    pub mvhd_duration: u32,
    pub mdhd_timescale: u32,
    pub mdhd_duration: u32,
}

/// Returns the full file bytes and the length of the leading `ftyp` box,
/// so callers can split the buffer to exercise chunked delivery.
pub fn build_mp4(opts: &BuildOpts) -> (Vec<u8>, usize) {
    let ftyp = fbox(b"ftyp", &{
        let mut b = b"isom".to_vec();
        b.extend_from_slice(&0u32.to_be_bytes());
        b.extend_from_slice(b"isom");
        b
    });

    let mvhd_body = full_box(0, &{
        let mut r = vec![0u8; 8];
        r.extend_from_slice(&opts.mvhd_timescale.to_be_bytes());
        r.extend_from_slice(&opts.mvhd_duration.to_be_bytes());
        r
    });
    let mvhd = fbox(b"mvhd", &mvhd_body);

    let tkhd_body = full_box(0, &{
        let mut r = vec![0u8; 8];
        r.extend_from_slice(&1u32.to_be_bytes()); // track_id
        r
    });
    let tkhd = fbox(b"tkhd", &tkhd_body);

    let edts = opts.elst.map(|(segment_duration, media_time)| {
        let elst_body = full_box(0, &{
            let mut r = 1u32.to_be_bytes().to_vec();
            r.extend_from_slice(&segment_duration.to_be_bytes());
            r.extend_from_slice(&media_time.to_be_bytes());
            r.extend_from_slice(&1u16.to_be_bytes());
            r.extend_from_slice(&0u16.to_be_bytes());
            r
        });
        fbox(b"edts", &fbox(b"elst", &elst_body))
    });

    let mdhd_body = full_box(0, &{
        let mut r = vec![0u8; 8];
        r.extend_from_slice(&opts.mdhd_timescale.to_be_bytes());
        r.extend_from_slice(&opts.mdhd_duration.to_be_bytes());
        r
    });
    let mdhd = fbox(b"mdhd", &mdhd_body);

    let sps = [0x67u8, 0x42, 0x00, 0x1f, 0x00, 0x00];
    let pps = [0x68u8, 0xce, 0x3c, 0x80];
    let mut avcc_body = vec![1u8, 0x42, 0x00, 0x1f, 0xff, 0xe1];
    avcc_body.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    avcc_body.extend_from_slice(&sps);
    avcc_body.push(1);
    avcc_body.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    avcc_body.extend_from_slice(&pps);
    let avcc = fbox(b"avcC", &avcc_body);

    let mut avc1_body = Vec::new();
    avc1_body.extend_from_slice(&[0u8; 6]);
    avc1_body.extend_from_slice(&1u16.to_be_bytes());
    avc1_body.extend_from_slice(&[0u8; 16]);
    avc1_body.extend_from_slice(&64u16.to_be_bytes());
    avc1_body.extend_from_slice(&48u16.to_be_bytes());
    avc1_body.extend_from_slice(&0x00480000u32.to_be_bytes());
    avc1_body.extend_from_slice(&0x00480000u32.to_be_bytes());
    avc1_body.extend_from_slice(&[0u8; 4]);
    avc1_body.extend_from_slice(&1u16.to_be_bytes());
    avc1_body.extend_from_slice(&[0u8; 32]);
    avc1_body.extend_from_slice(&24u16.to_be_bytes());
    avc1_body.extend_from_slice(&(-1i16).to_be_bytes());
    avc1_body.extend_from_slice(&avcc);
    let avc1 = fbox(b"avc1", &avc1_body);

    let stsd_body = {
        let mut b = full_box(0, &1u32.to_be_bytes());
        b.extend_from_slice(&avc1);
        b
    };
    let stsd = fbox(b"stsd", &stsd_body);

    let stsc_body = full_box(0, &{
        let mut r = (opts.stsc_entries.len() as u32).to_be_bytes().to_vec();
        for (first_chunk, samples_per_chunk) in &opts.stsc_entries {
            r.extend_from_slice(&first_chunk.to_be_bytes());
            r.extend_from_slice(&samples_per_chunk.to_be_bytes());
            r.extend_from_slice(&1u32.to_be_bytes()); // sample_description_index
        }
        r
    });
    let stsc = fbox(b"stsc", &stsc_body);

    let sample_sizes: Vec<u32> = opts
        .samples
        .iter()
        .map(|(_, payload)| (4 + 1 + payload.len()) as u32)
        .collect();
    let stsz_body = full_box(0, &{
        let mut r = 0u32.to_be_bytes().to_vec(); // sample_size = 0: explicit table
        r.extend_from_slice(&(sample_sizes.len() as u32).to_be_bytes());
        for size in &sample_sizes {
            r.extend_from_slice(&size.to_be_bytes());
        }
        r
    });
    let stsz = fbox(b"stsz", &stsz_body);

    let stts_body = full_box(0, &{
        let mut r = (opts.stts.len() as u32).to_be_bytes().to_vec();
        for (sample_count, sample_delta) in &opts.stts {
            r.extend_from_slice(&sample_count.to_be_bytes());
            r.extend_from_slice(&sample_delta.to_be_bytes());
        }
        r
    });
    let stts = fbox(b"stts", &stts_body);

    let stco_for = |offsets: &[u32]| {
        let body = full_box(0, &{
            let mut r = (offsets.len() as u32).to_be_bytes().to_vec();
            for o in offsets {
                r.extend_from_slice(&o.to_be_bytes());
            }
            r
        });
        fbox(b"stco", &body)
    };

    let assemble = |stco: &[u8]| -> Vec<u8> {
        let stbl_body = {
            let mut b = Vec::new();
            b.extend_from_slice(&stsd);
            b.extend_from_slice(&stsc);
            b.extend_from_slice(&stsz);
            b.extend_from_slice(stco);
            b.extend_from_slice(&stts);
            b
        };
        let minf = fbox(b"minf", &fbox(b"stbl", &stbl_body));
        let mdia_body = {
            let mut b = Vec::new();
            b.extend_from_slice(&mdhd);
            b.extend_from_slice(&minf);
            b
        };
        let mdia = fbox(b"mdia", &mdia_body);
        let trak_body = {
            let mut b = Vec::new();
            b.extend_from_slice(&tkhd);
            if let Some(edts) = &edts {
                b.extend_from_slice(edts);
            }
            b.extend_from_slice(&mdia);
            b
        };
        let trak = fbox(b"trak", &trak_body);
        let moov_body = {
            let mut b = Vec::new();
            b.extend_from_slice(&mvhd);
            b.extend_from_slice(&trak);
            b
        };
        fbox(b"moov", &moov_body)
    };

    // First pass with an all-zero stco of the right entry count, solely to
    // learn the final byte layout's length so the real offsets can be
    // computed, then patched in below.
    let placeholder_offsets = vec![0u32; opts.chunk_count as usize];
    let placeholder_stco = stco_for(&placeholder_offsets);
    let moov_first_pass = assemble(&placeholder_stco);

    let mdat_data_start = ftyp.len() + moov_first_pass.len() + 8;

    // Expand stsc's run-length encoding to per-chunk sample counts, exactly
    // as the sample-table resolver does, to lay out chunk offsets in mdat.
    let mut per_chunk = vec![0u32; opts.chunk_count as usize];
    for (i, (first_chunk, samples_per_chunk)) in opts.stsc_entries.iter().enumerate() {
        let next_first_chunk = opts
            .stsc_entries
            .get(i + 1)
            .map(|e| e.0)
            .unwrap_or(opts.chunk_count + 1);
        for chunk in *first_chunk..next_first_chunk {
            let idx = (chunk - 1) as usize;
            if idx < per_chunk.len() {
                per_chunk[idx] = *samples_per_chunk;
            }
        }
    }

    let mut chunk_offsets = Vec::with_capacity(opts.chunk_count as usize);
    let mut cursor = mdat_data_start as u32;
    let mut sample_cursor = 0usize;
    for &count in &per_chunk {
        chunk_offsets.push(cursor);
        for _ in 0..count {
            cursor += sample_sizes[sample_cursor];
            sample_cursor += 1;
        }
    }

    let real_stco = stco_for(&chunk_offsets);
    let moov = assemble(&real_stco);
    assert_eq!(moov.len(), moov_first_pass.len(), "stco patch must not change moov's length");

    let mut mdat_payload = Vec::new();
    for (nal_type, payload) in &opts.samples {
        let size = (1 + payload.len()) as u32;
        mdat_payload.extend_from_slice(&size.to_be_bytes());
        mdat_payload.push(*nal_type);
        mdat_payload.extend_from_slice(payload);
    }
    let mdat = fbox(b"mdat", &mdat_payload);

    let mut full = Vec::new();
    full.extend_from_slice(&ftyp);
    full.extend_from_slice(&moov);
    full.extend_from_slice(&mdat);

    (full, ftyp.len())
}
