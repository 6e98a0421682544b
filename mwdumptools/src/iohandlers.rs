//! Stream-oriented I/O with filename-suffix codec dispatch.
//!
//! One line-reader and one byte-writer cover plain text, gzip, and bzip2;
//! the codec is chosen from the filename (`.bz2`, `.gz`, or a compound
//! suffix like `.bz2.index`), and a missing path means stdin or stdout.
//! The bzip2 variants are built on the multi-stream codecs because dump
//! files are concatenations of independent streams.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::Path;

use anyhow::{bail, Context, Result};
use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

/// Size of the line-reassembly buffer. The compressed codecs are
/// block-oriented, not line-oriented, so lines are accumulated across
/// fills of this buffer.
pub const LINE_BUF_SIZE: usize = 65536;

/// Default per-line byte budget; longer lines are handed out in pieces.
pub const MAX_LINE: usize = 4096;

/// Compression codec selected from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Plain,
    Gzip,
    Bzip2,
}

/// Chooses a codec from the path's suffix. A compound suffix is handled by
/// stripping the trailing `.ext` once and retesting, so `pages.bz2.index`
/// is still bzip2.
pub fn codec_for(path: &Path) -> Codec {
    fn direct(name: &str) -> Option<Codec> {
        if name.ends_with(".bz2") {
            Some(Codec::Bzip2)
        } else if name.ends_with(".gz") {
            Some(Codec::Gzip)
        } else {
            None
        }
    }

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if let Some(codec) = direct(name) {
        return codec;
    }
    if let Some((stem, _)) = name.rsplit_once('.') {
        if let Some(codec) = direct(stem) {
            return codec;
        }
    }
    Codec::Plain
}

/// Uniform line reader over a possibly compressed source.
pub struct InputHandler {
    reader: Box<dyn BufRead>,
    eof: bool,
}

impl InputHandler {
    /// Opens `path`, or stdin when `None`.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let reader: Box<dyn BufRead> = match path {
            None => Box::new(BufReader::with_capacity(LINE_BUF_SIZE, io::stdin())),
            Some(p) => {
                let file = File::open(p)
                    .with_context(|| format!("failed to open {} for read", p.display()))?;
                match codec_for(p) {
                    Codec::Plain => Box::new(BufReader::with_capacity(LINE_BUF_SIZE, file)),
                    Codec::Gzip => Box::new(BufReader::with_capacity(
                        LINE_BUF_SIZE,
                        MultiGzDecoder::new(BufReader::new(file)),
                    )),
                    Codec::Bzip2 => Box::new(BufReader::with_capacity(
                        LINE_BUF_SIZE,
                        MultiBzDecoder::new(file),
                    )),
                }
            }
        };
        Ok(Self { reader, eof: false })
    }

    /// Reads one line into `line`, including its newline, consuming at most
    /// `max` bytes. A line longer than the budget is returned in pieces,
    /// which is harmless for XML because angle brackets cannot occur inside
    /// page text. Returns `false` once the input is exhausted.
    pub fn read_line(&mut self, line: &mut Vec<u8>, max: usize) -> Result<bool> {
        line.clear();
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                self.eof = true;
                return Ok(!line.is_empty());
            }
            let budget = max - line.len();
            let window = &available[..available.len().min(budget)];
            match memchr::memchr(b'\n', window) {
                Some(pos) => {
                    line.extend_from_slice(&available[..=pos]);
                    self.reader.consume(pos + 1);
                    return Ok(true);
                }
                None => {
                    let take = window.len();
                    line.extend_from_slice(&available[..take]);
                    self.reader.consume(take);
                    if line.len() == max {
                        return Ok(true);
                    }
                }
            }
        }
    }

    /// True once a read has hit the end of the input.
    pub fn at_eof(&self) -> bool {
        self.eof
    }
}

/// Counts the bytes passed through to the underlying writer.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

type Raw = CountingWriter<Box<dyn Write>>;

enum Sink {
    Plain(Raw),
    Gzip(GzEncoder<Raw>),
    Bzip2(BzEncoder<Raw>),
    /// Between compressed streams; the next write opens a fresh one.
    Parked(Raw, Codec),
    Closed,
}

/// Uniform byte writer over a possibly compressed sink.
///
/// For compressed codecs each [`finish_stream`](Self::finish_stream) call
/// closes the current stream and the next write appends a new one to the
/// same file, which is how the recompressor emits one stream per page
/// batch. [`current_byte_offset`](Self::current_byte_offset) reports
/// post-compression bytes so an index built from it points into the
/// compressed archive.
pub struct OutputHandler {
    sink: Sink,
    /// Post-compression size at the last stream boundary.
    offset: u64,
}

impl OutputHandler {
    /// Creates a writer for `path`, or stdout when `None`. With `append`
    /// set the file is opened for appending instead of truncated.
    pub fn create(path: Option<&Path>, append: bool) -> Result<Self> {
        let (raw, codec): (Box<dyn Write>, Codec) = match path {
            None => (Box::new(BufWriter::new(io::stdout())), Codec::Plain),
            Some(p) => {
                let file = if append {
                    File::options()
                        .append(true)
                        .create(true)
                        .open(p)
                        .with_context(|| format!("failed to open {} for append", p.display()))?
                } else {
                    File::create(p)
                        .with_context(|| format!("failed to open {} for write", p.display()))?
                };
                (Box::new(BufWriter::new(file)), codec_for(p))
            }
        };
        let raw = CountingWriter::new(raw);
        Ok(Self {
            sink: Self::start(raw, codec),
            offset: 0,
        })
    }

    fn start(raw: Raw, codec: Codec) -> Sink {
        match codec {
            Codec::Plain => Sink::Plain(raw),
            Codec::Gzip => Sink::Gzip(GzEncoder::new(raw, flate2::Compression::default())),
            Codec::Bzip2 => Sink::Bzip2(BzEncoder::new(raw, bzip2::Compression::best())),
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Sink::Parked(..) = self.sink {
            match mem::replace(&mut self.sink, Sink::Closed) {
                Sink::Parked(raw, codec) => self.sink = Self::start(raw, codec),
                _ => unreachable!(),
            }
        }
        match &mut self.sink {
            Sink::Plain(w) => w.write_all(data)?,
            Sink::Gzip(w) => w.write_all(data)?,
            Sink::Bzip2(w) => w.write_all(data)?,
            Sink::Parked(..) | Sink::Closed => bail!("write to a closed output"),
        }
        Ok(())
    }

    /// Finishes the current compressed stream (a no-op flush for plain
    /// output) and returns the post-compression byte offset. Subsequent
    /// writes start a new stream at that offset.
    pub fn finish_stream(&mut self) -> Result<u64> {
        let (raw, codec) = match mem::replace(&mut self.sink, Sink::Closed) {
            Sink::Plain(mut w) => {
                w.flush()?;
                (w, Codec::Plain)
            }
            Sink::Gzip(enc) => (enc.finish()?, Codec::Gzip),
            Sink::Bzip2(enc) => (enc.finish()?, Codec::Bzip2),
            Sink::Parked(w, c) => (w, c),
            Sink::Closed => bail!("output already closed"),
        };
        self.offset = raw.count;
        self.sink = Sink::Parked(raw, codec);
        Ok(self.offset)
    }

    /// Post-compression bytes emitted so far. During a compressed stream
    /// this is the offset at which that stream began.
    pub fn current_byte_offset(&self) -> u64 {
        match &self.sink {
            Sink::Plain(w) => w.count,
            Sink::Parked(w, _) => w.count,
            _ => self.offset,
        }
    }

    /// Finalizes the sink and flushes the underlying file.
    pub fn close(mut self) -> Result<u64> {
        let offset = self.finish_stream()?;
        if let Sink::Parked(mut raw, _) = mem::replace(&mut self.sink, Sink::Closed) {
            raw.flush()?;
        }
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_dispatch() {
        assert_eq!(codec_for(Path::new("pages.xml.bz2")), Codec::Bzip2);
        assert_eq!(codec_for(Path::new("pages.xml.gz")), Codec::Gzip);
        assert_eq!(codec_for(Path::new("pages.xml")), Codec::Plain);
        // Compound suffixes strip one extension and retest.
        assert_eq!(codec_for(Path::new("pages.xml.bz2.index")), Codec::Bzip2);
        assert_eq!(codec_for(Path::new("pages.xml.gz.tmp")), Codec::Gzip);
        assert_eq!(codec_for(Path::new("bz2")), Codec::Plain);
        assert_eq!(codec_for(Path::new("pages.bz2.gz")), Codec::Gzip);
    }

    #[test]
    fn counting_writer_counts() {
        let mut w = CountingWriter::new(Vec::new());
        w.write_all(b"0123456789").unwrap();
        assert_eq!(w.count, 10);
    }
}
