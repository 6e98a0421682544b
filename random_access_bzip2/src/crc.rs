//! Per-block CRC extraction and the stream-CRC fold.
//!
//! Every block carries its own 32-bit CRC directly behind the block marker,
//! and the stream trailer stores a combined CRC folded over all block CRCs.
//! Walking the blocks of a file, extracting each CRC, and folding them
//! reproduces the trailer value, which both validates the walk and yields
//! the seed needed to extend a truncated stream.

use crate::footer::TrailerRecord;
use crate::scanner::{confirm_block, BlockRecord, MarkerType, Scanner, MARKER_BITS};
use crate::bits::read_u32;

/// One step of the combined-CRC recurrence: rotate the accumulator left by
/// one bit and fold in the next block CRC as stored in the stream.
pub fn combine_crc(combined: u32, block_crc: u32) -> u32 {
    combined.rotate_left(1) ^ block_crc
}

/// Blocks and trailer of one stream within a file.
#[derive(Debug, Default, Clone)]
pub struct StreamMap {
    pub blocks: Vec<BlockRecord>,
    /// Trailer, when the stream is complete.
    pub trailer: Option<TrailerRecord>,
    /// Fold of `blocks` per [`combine_crc`]; equals the trailer CRC for an
    /// intact stream.
    pub combined_crc: u32,
}

/// Walks the whole file and maps every stream in it.
///
/// Block candidates are accepted per [`Scanner::find_first_block`]'s
/// verification rules; each end-of-stream marker closes the current stream
/// and restarts the fold, so multi-stream files (concatenated dumps) report
/// one entry per stream.
pub fn scan_streams(scanner: &Scanner, data: &[u8], verify: bool) -> Vec<StreamMap> {
    let mut streams = Vec::new();
    let mut current = StreamMap::default();
    for marker in scanner.raw_markers(data, 0) {
        match marker.kind {
            MarkerType::Block => {
                if let Some(record) = confirm_block(data, marker, verify) {
                    current.combined_crc = combine_crc(current.combined_crc, record.crc32);
                    current.blocks.push(record);
                }
            }
            MarkerType::Eos => {
                current.trailer =
                    read_u32(data, marker.bit_offset + MARKER_BITS).map(|crc| TrailerRecord {
                        end_marker_offset: marker.byte_offset(),
                        bit_shift: marker.bit_shift(),
                        combined_crc32: crc,
                    });
                if !current.blocks.is_empty() || current.trailer.is_some() {
                    streams.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.blocks.is_empty() {
        streams.push(current);
    }
    streams
}

/// Folds the per-block CRCs of the first stream in `data`, stopping at the
/// first end-of-stream marker. This is the combined CRC of a (possibly
/// trailerless) prefix, the seed needed to append to it. `None` when no
/// verified block exists.
pub fn compute_combined_crc(scanner: &Scanner, data: &[u8]) -> Option<u32> {
    let mut combined: Option<u32> = None;
    for marker in scanner.raw_markers(data, 0) {
        match marker.kind {
            MarkerType::Block => {
                if let Some(record) = confirm_block(data, marker, true) {
                    combined = Some(combine_crc(combined.unwrap_or(0), record.crc32));
                }
            }
            MarkerType::Eos => break,
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_values() {
        let mut cc = 0u32;
        cc = combine_crc(cc, 0xA1B2_C3D4);
        assert_eq!(cc, 0xA1B2_C3D4);
        cc = combine_crc(cc, 0x1122_3344);
        assert_eq!(cc, 0x5247_B4ED);
        cc = combine_crc(cc, 0xDEAD_BEEF);
        assert_eq!(cc, 0x7A22_D735);
    }

    #[test]
    fn fold_from_seed_is_rotated_xor() {
        // Folding from a seed equals the zero-seeded fold xor the seed
        // rotated once per block.
        let crcs = [0xDEAD_BEEFu32, 0x0BAD_F00D, 0x1234_5678, 0x9ABC_DEF0];
        let seed = 0x5E4D_3C2Bu32;
        let from_zero = crcs.iter().fold(0u32, |cc, &c| combine_crc(cc, c));
        let from_seed = crcs.iter().fold(seed, |cc, &c| combine_crc(cc, c));
        assert_eq!(from_seed, from_zero ^ seed.rotate_left(crcs.len() as u32));
    }
}
