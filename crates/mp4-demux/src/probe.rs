//! Static probe over an initial buffer: confirms the
//! stream starts with `ftyp` and locates `moov`, without attempting a full
//! box-tree parse.

use crate::boxes;
use crate::reader;

/// Result of probing an initial buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    pub matched: bool,
    /// Absolute offset past the `ftyp` box.
    pub data_offset: u32,
    /// Bytes between `ftyp` and `moov` (0 if `moov` is `ftyp`'s immediate
    /// sibling; `None` if `moov`'s header hasn't arrived yet).
    pub raw_data_size: Option<u32>,
    /// `data_offset + raw_data_size`; absolute start of `moov`.
    pub info_offset: Option<u32>,
    pub has_audio: bool,
    pub has_video: bool,
}

/// Probe `buf` for a valid `ftyp` header and, if present in the same
/// buffer, the following `moov` header. Audio/video presence is a cheap
/// heuristic scan for `mp4a`/`avc1` sample-entry four-character codes;
/// a full handler-type walk isn't possible until `moov`'s `trak`/`mdia`
/// subtree has actually arrived.
pub fn probe(buf: &[u8]) -> ProbeResult {
    if buf.len() < 8 {
        return ProbeResult::default();
    }

    let Ok(ftyp_size) = reader::read_u32(buf, 0) else {
        return ProbeResult::default();
    };
    let Ok(box_type) = reader::read_fourcc(buf, 4) else {
        return ProbeResult::default();
    };
    if box_type != boxes::FTYP || (ftyp_size as usize) < 8 || (ftyp_size as usize) > buf.len() {
        return ProbeResult::default();
    }

    let data_offset = ftyp_size;
    let mut info_offset = None;
    let mut offset = data_offset as usize;
    while offset + 8 <= buf.len() {
        let Ok(size) = reader::read_u32(buf, offset) else { break };
        let Ok(ty) = reader::read_fourcc(buf, offset + 4) else { break };
        if ty == boxes::MOOV {
            info_offset = Some(offset as u32);
            break;
        }
        if size < 8 {
            break;
        }
        offset += size as usize;
    }

    ProbeResult {
        matched: true,
        data_offset,
        raw_data_size: info_offset.map(|io| io - data_offset),
        info_offset,
        has_audio: contains_fourcc(buf, b"mp4a"),
        has_video: contains_fourcc(buf, b"avc1"),
    }
}

fn contains_fourcc(buf: &[u8], needle: &[u8; 4]) -> bool {
    buf.windows(4).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ftyp_box(major: &[u8; 4]) -> Vec<u8> {
        let mut buf = 16u32.to_be_bytes().to_vec();
        buf.extend_from_slice(b"ftyp");
        buf.extend_from_slice(major);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf
    }

    #[test]
    fn matches_ftyp_followed_by_moov() {
        let mut buf = ftyp_box(b"isom");
        let ftyp_len = buf.len() as u32;
        buf.extend_from_slice(&16u32.to_be_bytes());
        buf.extend_from_slice(b"moov");
        buf.extend_from_slice(&[0u8; 8]);

        let result = probe(&buf);
        assert!(result.matched);
        assert_eq!(result.data_offset, ftyp_len);
        assert_eq!(result.raw_data_size, Some(0));
    }

    #[test]
    fn rejects_non_ftyp_header() {
        // byte[4..8] is "isom" instead of "ftyp".
        let mut buf = 32u32.to_be_bytes().to_vec();
        buf.extend_from_slice(b"isom");
        buf.extend_from_slice(&[0u8; 24]);

        let result = probe(&buf);
        assert!(!result.matched);
    }

    #[test]
    fn short_buffer_does_not_match() {
        let buf = vec![0u8; 20];
        assert!(!probe(&buf).matched);
    }

    #[test]
    fn moov_not_yet_arrived_leaves_info_offset_unset() {
        let buf = ftyp_box(b"isom");
        let result = probe(&buf);
        assert!(result.matched);
        assert!(result.info_offset.is_none());
    }
}
