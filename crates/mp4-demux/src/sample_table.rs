//! The sample-to-chunk resolver: combines `stsc` + `stsz` + `stco` into a
//! flat, one-record-per-sample table. This is the algorithmic heart of the
//! demuxer.

use crate::boxes_leaf::{Stsz, StscEntry};
use crate::error::{Error, Result};

/// One resolved sample: where it lives in the file, how big it is, and
/// which chunk it came from. Timestamps are filled in later by the timing
/// resolver ([`crate::timing`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatSample {
    pub chunk_index: u32,
    pub index_in_chunk: u32,
    pub file_offset: u64,
    pub size: u32,
}

/// Expand `stsc`'s run-length encoding into a per-chunk `samples_per_chunk`
/// lookup. `stsc` entry *i* applies to chunks `[first_chunk[i], next_first_chunk)`
/// (1-based in the file, converted to 0-based chunk indices here).
fn samples_per_chunk_table(stsc: &[StscEntry], chunk_count: u32) -> Result<Vec<u32>> {
    if stsc.is_empty() {
        return Ok(vec![0; chunk_count as usize]);
    }

    let mut table = vec![0u32; chunk_count as usize];
    for i in 0..stsc.len() {
        let first_chunk = stsc[i].first_chunk;
        let next_first_chunk = stsc
            .get(i + 1)
            .map(|e| e.first_chunk)
            .unwrap_or(chunk_count + 1);

        if first_chunk == 0 {
            return Err(Error::format("stsc first_chunk is 1-based and must be >= 1"));
        }

        for chunk in first_chunk..next_first_chunk {
            let idx = (chunk - 1) as usize;
            if idx >= table.len() {
                break;
            }
            table[idx] = stsc[i].samples_per_chunk;
        }
    }
    Ok(table)
}

/// Resolve the flat sample table from the three compact tables.
///
/// Invariant: the produced table's length must equal
/// `stsz.sample_count`; a mismatch is a [`Error::FormatError`]
/// (`SampleCountMismatch`).
pub fn resolve(stsc: &[StscEntry], stsz: &Stsz, stco: &[u32]) -> Result<Vec<FlatSample>> {
    let chunk_count = stco.len() as u32;
    let per_chunk = samples_per_chunk_table(stsc, chunk_count)?;

    let mut table = Vec::with_capacity(stsz.sample_count as usize);
    let mut global_index = 0u32;

    'chunks: for (chunk_index, &samples_in_chunk) in per_chunk.iter().enumerate() {
        let mut cursor = stco[chunk_index] as u64;
        for index_in_chunk in 0..samples_in_chunk {
            if global_index as usize >= stsz.sample_count as usize {
                break 'chunks;
            }
            let size = sample_size(stsz, global_index as usize)?;
            table.push(FlatSample {
                chunk_index: chunk_index as u32,
                index_in_chunk,
                file_offset: cursor,
                size,
            });
            cursor += size as u64;
            global_index += 1;
        }
    }

    if table.len() != stsz.sample_count as usize {
        return Err(Error::format(format!(
            "sample count mismatch: stsc/stco expand to {} samples, stsz declares {}",
            table.len(),
            stsz.sample_count
        )));
    }

    Ok(table)
}

fn sample_size(stsz: &Stsz, index: usize) -> Result<u32> {
    if stsz.sample_size != 0 {
        return Ok(stsz.sample_size);
    }
    stsz.samples
        .get(index)
        .copied()
        .ok_or_else(|| Error::format(format!("stsz missing explicit size for sample {index}")))
}
