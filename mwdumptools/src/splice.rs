//! Line-oriented splicer for MediaWiki XML dumps.
//!
//! The dump is processed as text, one line at a time; only a handful of
//! line-anchored tags drive the state machine (`<mediawiki`, `</siteinfo>`,
//! `<page>`, `<id>`, `</page>`, `</mediawiki`). Lines between `<page>` and
//! the page's `<id>` are staged in a carry buffer until the id decides
//! whether the page is inside the requested range; the siteinfo prologue is
//! kept separately so it can be re-emitted into every output file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;

use crate::iohandlers::{InputHandler, OutputHandler, MAX_LINE};

/// Upper bound for the carry and header buffers. Hitting it means the
/// input is not a sane dump.
pub const MAX_HELD: usize = 524_288;

/// Splicer states, advanced once per input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NoWrite,
    StartHeader,
    EndHeader,
    StartPage,
    WriteMem,
    Write,
    EndPage,
    AtLastPageID,
}

/// One output file request: `filename:startid[:endid]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub filename: String,
    pub start_id: i64,
    pub end_id: Option<i64>,
}

fn numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_fspec(spec: &str) -> Result<FileSpec> {
    let mut pieces = spec.split(':');
    let filename = match pieces.next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => bail!("missing filename in fspec {spec:?}"),
    };
    let start = pieces
        .next()
        .with_context(|| format!("missing page start id in fspec {spec:?}"))?;
    if !numeric(start) {
        bail!("non-numeric page start id in fspec {spec:?}");
    }
    let start_id = start.parse()?;
    let end_id = match pieces.next() {
        // "name:startid:" is allowed for the last spec
        None | Some("") => None,
        Some(end) => {
            if !numeric(end) {
                bail!("non-numeric page end id in fspec {spec:?}");
            }
            Some(end.parse()?)
        }
    };
    if pieces.next().is_some() {
        bail!("trailing fields in fspec {spec:?}");
    }
    Ok(FileSpec {
        filename,
        start_id,
        end_id,
    })
}

/// Parses a `;`-separated fspec list. Ranges are trusted to be ascending
/// and disjoint; nothing here verifies that and the input is never rewound.
pub fn parse_fspecs(specs: &str) -> Result<Vec<FileSpec>> {
    specs.split(';').map(parse_fspec).collect()
}

/// atoi: the run of leading ASCII digits, zero when there is none.
fn parse_digits(bytes: &[u8]) -> i64 {
    let mut value = 0i64;
    for &b in bytes {
        if !b.is_ascii_digit() {
            break;
        }
        value = value * 10 + (b - b'0') as i64;
    }
    value
}

/// Advances the state machine for one left-trimmed line.
///
/// The page id gate: an `<id>` seen in `StartPage` is the page id (user and
/// revision ids come later in the page). At or past `end_id` the whole run
/// stops; at or past `start_id` the staged page is accepted. The end id is
/// exclusive.
fn next_state(
    trimmed: &[u8],
    current: State,
    start_id: i64,
    end_id: Option<i64>,
    read_page_id: &mut i64,
) -> State {
    if current == State::EndHeader && !trimmed.starts_with(b"<page>") {
        // Junk between the siteinfo header and the first page is dropped;
        // streams cut out of the middle of a dump can carry some.
        return State::NoWrite;
    }

    if trimmed.starts_with(b"<mediawiki") {
        State::StartHeader
    } else if trimmed.starts_with(b"</siteinfo>") {
        State::EndHeader
    } else if trimmed.starts_with(b"<page>") {
        State::StartPage
    } else if current == State::StartPage && trimmed.starts_with(b"<id>") {
        let page_id = parse_digits(&trimmed[4..]);
        if let Some(end) = end_id {
            if page_id >= end {
                *read_page_id = page_id;
                return State::AtLastPageID;
            }
        }
        if page_id >= start_id {
            State::WriteMem
        } else {
            State::NoWrite
        }
    } else if current == State::WriteMem {
        State::Write
    } else if trimmed.starts_with(b"</page>") {
        if current == State::Write {
            State::EndPage
        } else {
            State::NoWrite
        }
    } else if trimmed.starts_with(b"</mediawiki") {
        State::NoWrite
    } else {
        current
    }
}

/// Page-range splicer. One instance carries its buffers across output
/// files in multi-output mode.
pub struct Splicer {
    state: State,
    /// `<page>`-through-`<id>` lines pending the range decision.
    carry: Vec<u8>,
    /// `<mediawiki>…</siteinfo>` prologue for re-emission.
    mw_header: Vec<u8>,
    /// Page id that triggered `AtLastPageID`, for the next file's gate.
    read_page_id: i64,
    noheader: bool,
    nofooter: bool,
}

impl Splicer {
    pub fn new(noheader: bool, nofooter: bool) -> Self {
        Self {
            state: State::NoWrite,
            carry: Vec::new(),
            mw_header: Vec::new(),
            read_page_id: 0,
            noheader,
            nofooter,
        }
    }

    fn push_bounded(buf: &mut Vec<u8>, line: &[u8], what: &str) -> Result<()> {
        if buf.len() + line.len() > MAX_HELD {
            bail!("{what} buffer would exceed {MAX_HELD} bytes");
        }
        buf.extend_from_slice(line);
        Ok(())
    }

    /// Applies the per-line actions in order: stage, flush, clear, write.
    /// Returns `true` when the end of the requested range was reached.
    fn handle_line(
        &mut self,
        line: &[u8],
        start_id: i64,
        end_id: Option<i64>,
        out: &mut OutputHandler,
    ) -> Result<bool> {
        self.state = next_state(
            line.trim_ascii_start(),
            self.state,
            start_id,
            end_id,
            &mut self.read_page_id,
        );

        if matches!(self.state, State::StartPage | State::AtLastPageID) {
            Self::push_bounded(&mut self.carry, line, "page preamble")?;
        }
        if matches!(self.state, State::StartHeader | State::EndHeader) {
            Self::push_bounded(&mut self.mw_header, line, "siteinfo header")?;
        }
        if self.state == State::WriteMem {
            out.write(&self.carry)?;
        }
        if matches!(self.state, State::WriteMem | State::NoWrite) {
            self.carry.clear();
        }
        let header_line = matches!(self.state, State::StartHeader | State::EndHeader);
        if matches!(
            self.state,
            State::StartHeader | State::EndHeader | State::WriteMem | State::Write | State::EndPage
        ) && !(header_line && self.noheader)
        {
            out.write(line)?;
        }
        Ok(self.state == State::AtLastPageID)
    }

    /// Single-range mode: pages `start_id..end_id` to one sink.
    pub fn run_single(
        &mut self,
        input: &mut InputHandler,
        out: &mut OutputHandler,
        start_id: i64,
        end_id: Option<i64>,
    ) -> Result<()> {
        let mut line = Vec::with_capacity(MAX_LINE);
        while input.read_line(&mut line, MAX_LINE)? {
            if self.handle_line(&line, start_id, end_id, out)? {
                break;
            }
        }
        if !self.nofooter {
            out.write(b"</mediawiki>\n")?;
        }
        Ok(())
    }

    /// Multi-output mode: one file per fspec, reading the input straight
    /// through. The page whose id ended the previous file is still staged
    /// in the carry buffer and is settled against each new range.
    pub fn run_multi(
        &mut self,
        input: &mut InputHandler,
        odir: &Path,
        specs: &[FileSpec],
    ) -> Result<()> {
        let mut line = Vec::with_capacity(MAX_LINE);
        for spec in specs {
            let path = odir.join(&spec.filename);
            info!("writing {}", path.display());
            let mut out = OutputHandler::create(Some(&path), false)?;
            let mut filestart = true;
            while input.read_line(&mut line, MAX_LINE)? {
                if filestart {
                    if !self.noheader && !self.mw_header.is_empty() {
                        out.write(&self.mw_header)?;
                    }
                    if self.state == State::AtLastPageID {
                        if self.read_page_id >= spec.start_id {
                            out.write(&self.carry)?;
                            self.carry.clear();
                            self.state = State::Write;
                        } else {
                            self.state = State::NoWrite;
                        }
                    }
                    filestart = false;
                }
                if self.handle_line(&line, spec.start_id, spec.end_id, &mut out)? {
                    break;
                }
            }
            if !self.nofooter {
                out.write(b"</mediawiki>\n")?;
            }
            out.close()?;
        }
        Ok(())
    }
}
