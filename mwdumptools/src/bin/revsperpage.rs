//! Per-page revision statistics over a MediaWiki stubs file on stdin.

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;

use mwdumptools::init_logging;
use mwdumptools::iohandlers::{InputHandler, MAX_LINE};

#[derive(Parser, Debug)]
#[command(version, about = "Count revisions (and sizes) per page in a stubs file")]
struct Args {
    /// Report all namespaces and include the page id; default is
    /// namespace 0 only, without ids
    #[arg(short, long)]
    all: bool,

    /// Report the summed byte length of each page's revisions
    #[arg(short = 'b', long)]
    bytes: bool,

    /// Accumulate over batches of this many pages instead of each page
    #[arg(short = 'B', long, default_value_t = 0)]
    batch: u32,

    /// Field-separated output without field names
    #[arg(short, long)]
    concise: bool,

    /// Only report pages with more revisions than this
    #[arg(short = 'C', long, default_value_t = 0)]
    cutoff: u32,

    /// Report the longest revision of each page
    #[arg(short, long)]
    maxrevlen: bool,

    /// Report each page's title
    #[arg(short, long)]
    title: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevState {
    Idle,
    StartPage,
    Title,
    StartNs,
    PageId,
    StartRev,
    ByteLen,
    EndPage,
    EndMw,
}

fn set_state(trimmed: &[u8], current: RevState) -> RevState {
    if trimmed.starts_with(b"<page>") {
        RevState::StartPage
    } else if trimmed.starts_with(b"<title>") {
        RevState::Title
    } else if current == RevState::Title && trimmed.starts_with(b"<ns>") {
        RevState::StartNs
    } else if current == RevState::StartNs && trimmed.starts_with(b"<id>") {
        RevState::PageId
    } else if trimmed.starts_with(b"<revision>") {
        RevState::StartRev
    } else if trimmed.starts_with(b"<text ") {
        RevState::ByteLen
    } else if trimmed.starts_with(b"</page>") {
        RevState::EndPage
    } else if trimmed.starts_with(b"</mediawiki") {
        RevState::EndMw
    } else {
        current
    }
}

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

/// Pulls the value out of ` bytes="NNN"` in a stub text tag; the attribute
/// order in these tags has changed over the years, so search rather than
/// parse positionally.
fn get_bytelen(trimmed: &[u8]) -> i64 {
    match memchr::memmem::find(trimmed, b" bytes=\"") {
        Some(pos) => parse_digits(&trimmed[pos + 8..]),
        None => 0,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut input = InputHandler::open(None)?;
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    let mut state = RevState::Idle;
    let mut revisions = 0u32;
    let mut length = 0i64;
    let mut maxrevlen = 0i64;
    let mut batchstart = true;
    let mut pagecount = 0u32;
    let mut good = false;
    let mut pageid = 0i64;
    let mut title: Vec<u8> = Vec::new();

    let mut line = Vec::with_capacity(MAX_LINE);
    while input.read_line(&mut line, MAX_LINE)? {
        let trimmed = line.trim_ascii_start();
        state = set_state(trimmed, state);

        if state == RevState::StartPage {
            // reset on every page so namespace gating starts fresh
            good = false;
            if batchstart {
                if args.batch > 0 {
                    batchstart = false;
                    pagecount = 1;
                }
                revisions = 0;
                length = 0;
                maxrevlen = 0;
                title.clear();
            }
        }
        if state == RevState::StartNs {
            good = args.all || trimmed.starts_with(b"<ns>0</ns>");
        }
        if state == RevState::ByteLen && good {
            let revlen = get_bytelen(trimmed);
            if revlen > maxrevlen {
                maxrevlen = revlen;
            }
            length += revlen;
            state = RevState::Idle;
        }
        if state == RevState::PageId {
            pageid = parse_digits(&trimmed[4..]);
            state = RevState::Idle;
        }
        if state == RevState::Title && trimmed.len() > 16 {
            // <title>NAME</title>\n
            title = trimmed[7..trimmed.len() - 9].to_vec();
        }
        if state == RevState::StartRev && good {
            revisions += 1;
            state = RevState::Idle;
        }

        let batch_boundary = (state == RevState::EndPage
            && (args.batch == 0 || pagecount == args.batch))
            || (state == RevState::EndMw && args.batch > 0);
        if batch_boundary {
            if revisions > 0 && revisions > args.cutoff {
                if args.all {
                    if args.concise {
                        write!(out, "{pageid}:")?;
                    } else {
                        write!(out, "page:{pageid} ")?;
                    }
                }
                if args.bytes {
                    if args.concise {
                        write!(out, "{length}:")?;
                    } else {
                        write!(out, "bytes:{length} ")?;
                    }
                }
                if args.maxrevlen {
                    if args.concise {
                        write!(out, "{maxrevlen}:")?;
                    } else {
                        write!(out, "maxrevlen:{maxrevlen} ")?;
                    }
                }
                if args.concise {
                    write!(out, "{revisions}")?;
                } else {
                    write!(out, "revs:{revisions}")?;
                }
                if args.title {
                    if args.concise {
                        out.write_all(b":")?;
                    } else {
                        out.write_all(b" title:")?;
                    }
                    out.write_all(&title)?;
                }
                out.write_all(b"\n")?;
            }
            // avoid reporting the final batch twice at </mediawiki>
            revisions = 0;
        }
        if state == RevState::EndPage || state == RevState::EndMw {
            state = RevState::Idle;
            if good {
                pagecount += 1;
                if pagecount > args.batch {
                    batchstart = true;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}
