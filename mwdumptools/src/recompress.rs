//! Per-page-count recompression.
//!
//! Reads a page-content XML stream and writes it back out through a
//! compressed sink, closing the stream after the siteinfo prologue and
//! then after every N pages, so the output is a concatenation of small
//! independently decodable bzip2 streams. Optionally emits an index with
//! one line per stream: `<offset>:<pageid>:<title>`, where the offset is
//! the compressed byte position at which the stream starts.

use anyhow::{ensure, Result};
use log::{debug, info};
use regex::bytes::Regex;

use crate::iohandlers::{InputHandler, OutputHandler, MAX_LINE};

/// Titles longer than this are not something a wiki produces.
const MAX_TITLE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexState {
    WantPage,
    WantTitle,
    WantId,
}

struct IndexTracker {
    state: IndexState,
    title: Vec<u8>,
    /// One index line per stream: set once the first page id of the
    /// current stream has been written out.
    emitted_for_stream: bool,
}

/// Did this line close the unit the current stream is collecting?
fn ends_xml_block(trimmed: &[u8], header: bool) -> bool {
    if header {
        return trimmed == b"</siteinfo>\n";
    }
    trimmed == b"</page>\n" || trimmed == b"</mediawiki>\n"
}

pub struct Recompressor {
    pages_per_stream: u32,
    title_re: Regex,
    id_re: Regex,
}

impl Recompressor {
    pub fn new(pages_per_stream: u32) -> Self {
        Self {
            pages_per_stream,
            title_re: Regex::new(r"<title>(.+)</title>\n").expect("static pattern"),
            id_re: Regex::new(r"<id>([0-9]+)</id>\n").expect("static pattern"),
        }
    }

    /// Copies `input` to `out` in per-page-count streams. The siteinfo
    /// prologue, when present, goes into a stream of its own; input without
    /// one (already-spliced page runs) starts batching pages at offset
    /// zero.
    pub fn run(
        &self,
        input: &mut InputHandler,
        out: &mut OutputHandler,
        mut index: Option<&mut OutputHandler>,
    ) -> Result<()> {
        let mut tracker = IndexTracker {
            state: IndexState::WantPage,
            title: Vec::new(),
            emitted_for_stream: false,
        };
        let mut offset = out.current_byte_offset();

        let mut first_line = Vec::with_capacity(MAX_LINE);
        if !input.read_line(&mut first_line, MAX_LINE)? {
            return Ok(());
        }
        let mut pending = Some(first_line);
        if pending
            .as_deref()
            .is_some_and(|l| l.trim_ascii_start().starts_with(b"<mediawiki"))
        {
            self.write_stream(
                true,
                &mut pending,
                input,
                out,
                &mut index,
                &mut tracker,
                &mut offset,
            )?;
            debug!("siteinfo header stream ends at offset {offset}");
        }

        while pending.is_some() || !input.at_eof() {
            self.write_stream(
                false,
                &mut pending,
                input,
                out,
                &mut index,
                &mut tracker,
                &mut offset,
            )?;
        }
        info!("recompression done, {offset} bytes out");
        Ok(())
    }

    /// Writes one output stream: the siteinfo prologue when `header` is
    /// set, otherwise up to `pages_per_stream` pages. `pending` holds a
    /// line read by the caller (or a previous stream) that still has to be
    /// processed.
    #[allow(clippy::too_many_arguments)]
    fn write_stream(
        &self,
        header: bool,
        pending: &mut Option<Vec<u8>>,
        input: &mut InputHandler,
        out: &mut OutputHandler,
        index: &mut Option<&mut OutputHandler>,
        tracker: &mut IndexTracker,
        offset: &mut u64,
    ) -> Result<()> {
        let mut line = match pending.take() {
            Some(line) => line,
            None => {
                let mut line = Vec::with_capacity(MAX_LINE);
                if !input.read_line(&mut line, MAX_LINE)? {
                    return Ok(());
                }
                line
            }
        };
        tracker.state = IndexState::WantPage;
        tracker.emitted_for_stream = false;
        let mut pages_done = 0u32;

        loop {
            if let Some(idx) = index.as_deref_mut() {
                self.track_index(&line, tracker, idx, *offset)?;
            }
            out.write(&line)?;
            if ends_xml_block(line.trim_ascii_start(), header) {
                if header {
                    *offset = out.finish_stream()?;
                    return Ok(());
                }
                pages_done += 1;
                if pages_done % self.pages_per_stream == 0 {
                    *offset = out.finish_stream()?;
                    return Ok(());
                }
            }
            if !input.read_line(&mut line, MAX_LINE)? {
                break;
            }
        }
        *offset = out.finish_stream()?;
        Ok(())
    }

    fn track_index(
        &self,
        line: &[u8],
        tracker: &mut IndexTracker,
        index: &mut OutputHandler,
        offset: u64,
    ) -> Result<()> {
        let trimmed = line.trim_ascii_start();
        match tracker.state {
            IndexState::WantPage => {
                if trimmed == b"<page>\n" {
                    tracker.state = IndexState::WantTitle;
                }
            }
            IndexState::WantTitle => {
                if let Some(caps) = self.title_re.captures(trimmed) {
                    if let Some(title) = caps.get(1) {
                        ensure!(
                            title.len() <= MAX_TITLE,
                            "page title longer than {MAX_TITLE} bytes"
                        );
                        tracker.title.clear();
                        tracker.title.extend_from_slice(title.as_bytes());
                        tracker.state = IndexState::WantId;
                    }
                }
            }
            IndexState::WantId => {
                if let Some(caps) = self.id_re.captures(trimmed) {
                    if let Some(id) = caps.get(1) {
                        if !tracker.emitted_for_stream {
                            let mut record = Vec::with_capacity(tracker.title.len() + 32);
                            record.extend_from_slice(offset.to_string().as_bytes());
                            record.push(b':');
                            record.extend_from_slice(id.as_bytes());
                            record.push(b':');
                            record.extend_from_slice(&tracker.title);
                            record.push(b'\n');
                            index.write(&record)?;
                            tracker.emitted_for_stream = true;
                        }
                        tracker.state = IndexState::WantPage;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_end_detection() {
        assert!(ends_xml_block(b"</siteinfo>\n", true));
        assert!(!ends_xml_block(b"</page>\n", true));
        assert!(ends_xml_block(b"</page>\n", false));
        assert!(ends_xml_block(b"</mediawiki>\n", false));
        assert!(!ends_xml_block(b"</pages>\n", false));
    }
}
