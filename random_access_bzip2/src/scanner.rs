//! Block-marker scanner for bzip2 streams.
//!
//! This module locates the two 48-bit magic numbers defined by the bzip2
//! format inside raw compressed bytes:
//!
//! - block marker: `0x314159265359` (pi in base 16)
//! - end-of-stream marker: `0x177245385090` (sqrt(pi) in base 16)
//!
//! Because blocks are packed at the bit level, a marker may begin at any bit
//! offset 0..=7 within a byte. The scanner pre-computes eight shifted
//! variants of each magic number and feeds the middle four bytes of every
//! variant to an Aho-Corasick automaton, so a single pass over the data
//! surfaces candidates at every bit alignment. Each candidate is then
//! confirmed by re-reading the full 48 bits at the implied bit offset.
//!
//! A raw match is still not proof of a block: six magic bytes can occur by
//! chance inside compressed data. Callers that need certainty ask for
//! verification, which realigns the candidate behind a synthetic stream
//! header and trial-decompresses it; a candidate is accepted only if the
//! codec produces at least one plaintext byte.

use aho_corasick::AhoCorasick;
use log::debug;

use crate::bits::read_u32;
use crate::decoder::trial_decode;

/// Block start magic number, 3.14159265359 in hex digits.
pub const MAGIC_BLOCK: u64 = 0x3141_5926_5359;

/// End-of-stream magic number, 1.77245385090 in hex digits.
pub const MAGIC_EOS: u64 = 0x1772_4538_5090;

/// Width of a marker in bits.
pub const MARKER_BITS: u64 = 48;

/// Marker type found in a bzip2 stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerType {
    /// Start of a compressed block.
    Block,
    /// Stream trailer; followed by the 32-bit combined CRC.
    Eos,
}

/// Scan direction for [`Scanner::find_first_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest accepted offset at or after the start offset.
    Forward,
    /// Largest accepted offset strictly before the start offset.
    Backward,
}

/// A magic-number hit that has not been trial-decoded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMarker {
    /// Absolute position of the marker's first bit.
    pub bit_offset: u64,
    pub kind: MarkerType,
}

impl RawMarker {
    /// Byte containing the marker's first bit.
    pub fn byte_offset(&self) -> u64 {
        self.bit_offset / 8
    }

    /// Position of the first bit within that byte.
    pub fn bit_shift(&self) -> u8 {
        (self.bit_offset % 8) as u8
    }
}

/// A verified compressed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    /// Byte containing the first bit of the block marker.
    pub byte_offset: u64,
    /// Position of that first bit within the byte, 0..=7.
    pub bit_shift: u8,
    /// Uncomplemented CRC stored in the 32 bits following the marker.
    pub crc32: u32,
}

impl BlockRecord {
    /// Absolute position of the marker's first bit.
    pub fn bit_offset(&self) -> u64 {
        self.byte_offset * 8 + self.bit_shift as u64
    }
}

/// Window size for backward scanning, with a 6-byte overlap between windows
/// so a marker straddling the boundary is never missed.
const BACKWARD_WINDOW: u64 = 1 << 20;

/// Marker scanner holding the pre-built Aho-Corasick automaton.
pub struct Scanner {
    ac: AhoCorasick,
    /// Per-pattern metadata: (magic number, marker type, bit shift).
    patterns: Vec<(u64, MarkerType, u32)>,
}

impl Scanner {
    /// Builds the sixteen search patterns (8 bit alignments for each magic
    /// number). Shifting `magic << 16` right by 0..=7 places the 48 magic
    /// bits at every alignment inside a u64; the middle four bytes of each
    /// variant are fully determined by the magic and serve as the search
    /// key.
    pub fn new() -> Self {
        let mut keys = Vec::with_capacity(16);
        let mut patterns = Vec::with_capacity(16);
        for (magic, kind) in [(MAGIC_BLOCK, MarkerType::Block), (MAGIC_EOS, MarkerType::Eos)] {
            let top = magic << 16;
            for shift in 0..8u32 {
                let bytes = (top >> shift).to_be_bytes();
                keys.push(bytes[1..5].to_vec());
                patterns.push((magic, kind, shift));
            }
        }
        let ac = AhoCorasick::new(keys).expect("marker patterns are well formed");
        Self { ac, patterns }
    }

    /// Magic-verified marker hits in `data`, in stream order, restricted to
    /// markers whose first byte is at or after `from_byte`.
    pub fn raw_markers<'a>(
        &'a self,
        data: &'a [u8],
        from_byte: u64,
    ) -> impl Iterator<Item = RawMarker> + 'a {
        self.markers_in(&data[from_byte as usize..], from_byte)
    }

    /// Marker hits inside `window`, reported with absolute offsets computed
    /// from `base_byte`. Overlapping matches are inspected so a chance hit
    /// cannot shadow a real marker a few bits away.
    fn markers_in<'a>(
        &'a self,
        window: &'a [u8],
        base_byte: u64,
    ) -> impl Iterator<Item = RawMarker> + 'a {
        self.ac.find_overlapping_iter(window).filter_map(move |m| {
            // The search key starts one byte into the marker.
            let start = m.start();
            if start == 0 {
                return None;
            }
            let (magic, kind, shift) = self.patterns[m.pattern().as_usize()];
            let bit = (start as u64 - 1) * 8 + shift as u64;
            magic_at(window, bit, magic).then_some(RawMarker {
                bit_offset: base_byte * 8 + bit,
                kind,
            })
        })
    }

    /// Finds the first verified block relative to `start_offset`.
    ///
    /// Forward scans return the block with the smallest byte offset at or
    /// after `start_offset`; backward scans the largest strictly below it.
    /// With `verify` set, every raw candidate is trial-decompressed and
    /// rejected candidates resume the scan at the next hit; without it a
    /// full 48-bit magic match is taken at face value.
    pub fn find_first_block(
        &self,
        data: &[u8],
        start_offset: u64,
        direction: Direction,
        verify: bool,
    ) -> Option<BlockRecord> {
        match direction {
            Direction::Forward => self
                .raw_markers(data, start_offset.min(data.len() as u64))
                .filter(|m| m.kind == MarkerType::Block)
                .find_map(|m| confirm_block(data, m, verify)),
            Direction::Backward => self.scan_backward(data, start_offset, verify),
        }
    }

    fn scan_backward(&self, data: &[u8], start_offset: u64, verify: bool) -> Option<BlockRecord> {
        // Exclusive upper bound on the marker byte offset.
        let mut hi = start_offset.min(data.len() as u64);
        loop {
            let lo = hi.saturating_sub(BACKWARD_WINDOW);
            // Let candidate bytes extend past `hi` so a marker beginning
            // just below the bound is still readable in full.
            let window_end = (hi + 7).min(data.len() as u64);
            let window = &data[lo as usize..window_end as usize];
            let hits: Vec<RawMarker> = self
                .markers_in(window, lo)
                .filter(|m| m.kind == MarkerType::Block && m.byte_offset() < hi)
                .collect();
            for m in hits.into_iter().rev() {
                if let Some(record) = confirm_block(data, m, verify) {
                    return Some(record);
                }
            }
            if lo == 0 {
                return None;
            }
            hi = lo + 6;
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks whether the full 48-bit `magic` is present at `bit_offset`.
pub(crate) fn magic_at(data: &[u8], bit_offset: u64, magic: u64) -> bool {
    let idx = (bit_offset / 8) as usize;
    let shift = (bit_offset % 8) as u32;
    if idx + 6 > data.len() {
        return false;
    }
    let mut window = [0u8; 8];
    let take = (data.len() - idx).min(8);
    window[..take].copy_from_slice(&data[idx..idx + take]);
    let value = u64::from_be_bytes(window);
    let mask = 0xFFFF_FFFF_FFFF_0000u64 >> shift;
    value & mask == (magic << 16) >> shift
}

/// Promotes a raw block candidate to a [`BlockRecord`], trial-decoding it
/// first when `verify` is set. The CRC is the 32 bits straight after the
/// marker, read with the candidate's bit shift.
pub(crate) fn confirm_block(data: &[u8], marker: RawMarker, verify: bool) -> Option<BlockRecord> {
    if verify && !trial_decode(data, marker.bit_offset) {
        debug!(
            "rejected block candidate at byte {} shift {}",
            marker.byte_offset(),
            marker.bit_shift()
        );
        return None;
    }
    let crc32 = read_u32(data, marker.bit_offset + MARKER_BITS)?;
    Some(BlockRecord {
        byte_offset: marker.byte_offset(),
        bit_shift: marker.bit_shift(),
        crc32,
    })
}
