//! Appendable re-encoding.
//!
//! Produces compressed bytes that can be concatenated onto an existing
//! bzip2 prefix (header plus complete blocks, no trailer): the stream
//! header is suppressed, and the trailer CRC is computed as if the prefix's
//! blocks had been emitted by this encoder. The stock codec has no hook for
//! seeding its combined-CRC accumulator, so the seed is applied after the
//! fact: encode normally, re-scan the written blocks, fold their CRCs
//! starting from the caller's seed, and rewrite the 32 trailer bits in
//! place. Appended to any file whose blocks fold to the seed, the result is
//! a stream whose trailer validates.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::Path;

use bzip2::write::BzEncoder;
use bzip2::Compression;
use log::debug;
use memmap2::MmapMut;

use crate::crc::{combine_crc, scan_streams};
use crate::footer::locate_footer;
use crate::scanner::Scanner;
use crate::{Error, Result};

/// Write adapter that swallows the first four bytes (the `BZh<digit>`
/// stream header) and counts everything it forwards.
struct HeaderlessSink<W: Write> {
    inner: W,
    skip: usize,
    written: u64,
}

impl<W: Write> Write for HeaderlessSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.skip > 0 {
            let eat = self.skip.min(buf.len());
            self.skip -= eat;
            if eat == buf.len() {
                return Ok(eat);
            }
            let n = self.inner.write(&buf[eat..])?;
            self.written += n as u64;
            return Ok(eat + n);
        }
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Compresses `input` into `out_path` as a headerless bzip2 stream whose
/// trailer CRC continues from `seed_crc`. Returns the number of bytes
/// written.
///
/// Input is pumped in `buf_size` chunks; the block size is fixed at 9
/// (900k), matching what the dump pipeline writes.
pub fn append_compress<R: Read>(
    mut input: R,
    out_path: &Path,
    seed_crc: u32,
    buf_size: usize,
) -> Result<u64> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(out_path)?;

    let sink = HeaderlessSink {
        inner: file,
        skip: 4,
        written: 0,
    };
    let mut encoder = BzEncoder::new(sink, Compression::best());
    let mut buf = vec![0u8; buf_size.max(1)];
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        encoder.write_all(&buf[..n])?;
    }
    let mut sink = encoder.finish()?;
    sink.flush()?;
    let written = sink.written;
    let file = sink.inner;

    // With a zero seed the trailer is already correct, but running the
    // patch anyway keeps the block-scan self-check on every path.
    let mut map = unsafe { MmapMut::map_mut(&file)? };
    let patched = patch_trailer(&mut map, seed_crc)?;
    map.flush()?;
    debug!("wrote {written} bytes, trailer CRC 0x{patched:08x}");
    Ok(written)
}

/// Rewrites the trailer CRC of a single freshly written stream so that it
/// continues from `seed_crc`. Returns the patched value.
///
/// The blocks are re-discovered with full verification and their zero-seed
/// fold is checked against the trailer the encoder wrote; a mismatch means
/// the scan did not reproduce the encoder's view of the stream and the
/// patch is refused.
pub fn patch_trailer(data: &mut [u8], seed_crc: u32) -> Result<u32> {
    let scanner = Scanner::new();
    let streams = scan_streams(&scanner, data, true);
    if streams.len() != 1 {
        return Err(Error::Codec(format!(
            "expected one stream in encoder output, found {}",
            streams.len()
        )));
    }
    let stream = &streams[0];
    let trailer = locate_footer(data)
        .ok_or_else(|| Error::Codec("no end-of-stream trailer in encoder output".into()))?;
    if stream.combined_crc != trailer.combined_crc32 {
        return Err(Error::Codec(format!(
            "block scan folds to 0x{:08x} but the trailer says 0x{:08x}",
            stream.combined_crc, trailer.combined_crc32
        )));
    }

    let mut combined = seed_crc;
    for block in &stream.blocks {
        combined = combine_crc(combined, block.crc32);
    }
    let crc_bit = trailer.end_marker_offset * 8 + trailer.bit_shift as u64 + 48;
    crate::bits::write_u32(data, crc_bit, combined);
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headerless_sink_strips_across_writes() {
        let mut sink = HeaderlessSink {
            inner: Vec::new(),
            skip: 4,
            written: 0,
        };
        sink.write_all(b"BZ").unwrap();
        sink.write_all(b"h9payload").unwrap();
        assert_eq!(sink.inner, b"payload");
        assert_eq!(sink.written, 7);
    }
}
