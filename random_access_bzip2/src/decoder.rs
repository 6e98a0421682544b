//! Random-access decompression.
//!
//! A bzip2 stream can only be decoded from its start in the general case,
//! but every block is independently decodable once it has been realigned to
//! a byte boundary and given a stream header. [`BlockDecoder`] does exactly
//! that: it chains a synthetic `BZh<digit>` header in front of a
//! [`ShiftedReader`] that re-emits the file from the block's first bit, and
//! lets the stock codec do the rest. Decoding continues through the
//! following blocks of the same stream and stops cleanly at the stream
//! trailer.

use std::io::{self, Read};

use bzip2::read::BzDecoder;

use crate::bits::extract_bits;
use crate::scanner::BlockRecord;

/// How much realigned input a trial decode may consume. Generous enough to
/// cover one whole compressed block at the largest block size.
const TRIAL_WINDOW_BYTES: u64 = 2 * 1024 * 1024;

/// Refill granularity of [`ShiftedReader`].
const SHIFT_CHUNK_BYTES: u64 = 32 * 1024;

/// `Read` adapter that serves a byte slice starting from an arbitrary bit
/// position, left-shifting every byte so the stream becomes byte-aligned.
pub struct ShiftedReader<'a> {
    data: &'a [u8],
    bit_pos: u64,
    end_bit: u64,
    scratch: Vec<u8>,
    scratch_pos: usize,
}

impl<'a> ShiftedReader<'a> {
    pub fn new(data: &'a [u8], start_bit: u64) -> Self {
        let end_bit = data.len() as u64 * 8;
        Self {
            data,
            bit_pos: start_bit.min(end_bit),
            end_bit,
            scratch: Vec::new(),
            scratch_pos: 0,
        }
    }

    /// Byte of the underlying slice the next refill will start from.
    pub fn byte_position(&self) -> u64 {
        self.bit_pos / 8
    }
}

impl Read for ShiftedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.scratch_pos == self.scratch.len() {
            let take_bits = (self.end_bit - self.bit_pos).min(SHIFT_CHUNK_BYTES * 8);
            if take_bits == 0 {
                return Ok(0);
            }
            self.scratch.clear();
            self.scratch_pos = 0;
            extract_bits(self.data, self.bit_pos, self.bit_pos + take_bits, &mut self.scratch);
            self.bit_pos += take_bits;
        }
        let n = buf.len().min(self.scratch.len() - self.scratch_pos);
        buf[..n].copy_from_slice(&self.scratch[self.scratch_pos..self.scratch_pos + n]);
        self.scratch_pos += n;
        Ok(n)
    }
}

/// Streaming decoder positioned on a verified block.
///
/// Implements [`Read`]; `Ok(0)` marks the end of the enclosing stream. The
/// synthetic header's block-size digit is copied from the file's real header
/// when one is present and defaults to `9` otherwise (the digit only sizes
/// the decoder's internal buffers, so any value at least as large as the
/// true one is safe).
pub struct BlockDecoder<'a> {
    inner: BzDecoder<io::Chain<io::Cursor<[u8; 4]>, ShiftedReader<'a>>>,
    block_start: u64,
}

impl<'a> BlockDecoder<'a> {
    pub fn open_at(data: &'a [u8], block: &BlockRecord) -> Self {
        let digit = match data {
            [b'B', b'Z', b'h', d, ..] if d.is_ascii_digit() && *d != b'0' => *d,
            _ => b'9',
        };
        let header = [b'B', b'Z', b'h', digit];
        let shifted = ShiftedReader::new(data, block.bit_offset());
        Self {
            inner: BzDecoder::new(io::Cursor::new(header).chain(shifted)),
            block_start: block.byte_offset,
        }
    }

    /// File offset of the compressed input consumed by the codec so far.
    /// Used to bound how far past a search horizon a scan may read.
    pub fn compressed_position(&self) -> u64 {
        self.block_start + self.inner.total_in().saturating_sub(4)
    }
}

impl Read for BlockDecoder<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Trial-decodes a block candidate at `bit_offset`.
///
/// Builds a minimal synthetic stream (header plus a bounded window of
/// realigned candidate bytes) and asks the codec for output. The candidate
/// is genuine iff at least one plaintext byte comes back; anything else,
/// including parameter, header, and data errors, rejects it.
pub(crate) fn trial_decode(data: &[u8], bit_offset: u64) -> bool {
    let end_bit = (data.len() as u64 * 8).min(bit_offset + TRIAL_WINDOW_BYTES * 8);
    if end_bit <= bit_offset {
        return false;
    }
    let mut synthetic = Vec::with_capacity(((end_bit - bit_offset) / 8) as usize + 8);
    synthetic.extend_from_slice(b"BZh9");
    extract_bits(data, bit_offset, end_bit, &mut synthetic);

    let mut decoder = BzDecoder::new(&synthetic[..]);
    let mut probe = [0u8; 4096];
    matches!(decoder.read(&mut probe), Ok(n) if n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_reader_realigns() {
        // 0xAB spread over two bytes at shift 4.
        let data = [0x0Au8, 0xB0];
        let mut r = ShiftedReader::new(&data, 4);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out[0], 0xAB);
    }

    #[test]
    fn shifted_reader_small_reads() {
        let data: Vec<u8> = (0u8..=255).collect();
        let mut r = ShiftedReader::new(&data, 0);
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = r.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn trial_decode_rejects_garbage() {
        let data = vec![0x5Au8; 4096];
        assert!(!trial_decode(&data, 13));
    }
}
