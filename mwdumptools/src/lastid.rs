//! Highest page/revision id in a bzip2 dump.
//!
//! Works from the end of the file: locate the stream trailer, search
//! backward for the last verified block, decompress forward from it, and
//! regex-scan the plaintext for id tags, keeping the last one seen. When a
//! block yields nothing (or its tail is corrupt) the search horizon steps
//! back one block and tries again.

use log::debug;
use regex::bytes::Regex;

use random_access_bzip2::{locate_footer, BlockDecoder, BlockRecord, Direction, Scanner};

use std::io::Read;

/// Plaintext scan window.
const SCAN_BUF: usize = 5000;

/// Bytes retained across window refills, sized to the longest
/// `<page>…<id>` preamble that can straddle a refill.
const KEEP: usize = 310;

/// The page id is group 2: an id directly behind a title (with an optional
/// namespace line) belongs to the page, not to a user or revision.
const PAGE_ID_PATTERN: &str =
    "<page>\n[ ]+<title>[^<]+</title>\n([ ]+<ns>[0-9]+</ns>\n)?[ ]+<id>([0-9]+)</id>\n";

const REV_ID_PATTERN: &str = "<revision>\n[ ]+<id>([0-9]+)</id>\n";

/// Which id tag to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Page,
    Rev,
}

impl IdKind {
    pub fn label(self) -> &'static str {
        match self {
            IdKind::Page => "page",
            IdKind::Rev => "rev",
        }
    }

    fn pattern(self) -> (&'static str, usize) {
        match self {
            IdKind::Page => (PAGE_ID_PATTERN, 2),
            IdKind::Rev => (REV_ID_PATTERN, 1),
        }
    }
}

/// Returns the last id of the requested kind, or `None` when no block of
/// the file yields one.
pub fn find_last_id(data: &[u8], kind: IdKind) -> Option<i64> {
    let scanner = Scanner::new();
    let (pattern, group) = kind.pattern();
    let re = Regex::new(pattern).expect("static pattern");

    // Block markers live strictly before the end-of-stream marker; on a
    // truncated file the whole tail is fair game.
    let mut horizon = match locate_footer(data) {
        Some(trailer) => trailer.end_marker_offset,
        None => data.len() as u64,
    };
    let mut upto = horizon;

    loop {
        let block = scanner.find_first_block(data, horizon, Direction::Backward, true)?;
        debug!(
            "scanning from block at byte {} shift {}",
            block.byte_offset, block.bit_shift
        );
        if let Some(id) = last_id_from_block(data, &block, upto, &re, group) {
            return Some(id);
        }
        if block.byte_offset == 0 {
            return None;
        }
        upto = horizon;
        horizon = block.byte_offset;
    }
}

/// Decompresses forward from `block`, scanning a rolling window. Reading
/// stops at end of stream, once the compressed position passes `upto`
/// (that region was covered by a previous attempt), or at a codec error;
/// ids found before an error still count, which is what makes a file with
/// a corrupt final block recoverable from its intact predecessors.
fn last_id_from_block(
    data: &[u8],
    block: &BlockRecord,
    upto: u64,
    re: &Regex,
    group: usize,
) -> Option<i64> {
    let mut decoder = BlockDecoder::open_at(data, block);
    let mut window = vec![0u8; SCAN_BUF];
    let mut filled = 0usize;
    let mut best = None;

    loop {
        match decoder.read(&mut window[filled..]) {
            Ok(0) => {
                scan_ids(&window[..filled], re, group, &mut best);
                return best;
            }
            Ok(n) => {
                filled += n;
                if filled == window.len() {
                    scan_ids(&window[..filled], re, group, &mut best);
                    window.copy_within(filled - KEEP.., 0);
                    filled = KEEP;
                    if decoder.compressed_position() > upto {
                        return best;
                    }
                }
            }
            Err(err) => {
                debug!("decode stopped early: {err}");
                scan_ids(&window[..filled], re, group, &mut best);
                return best;
            }
        }
    }
}

fn scan_ids(window: &[u8], re: &Regex, group: usize, best: &mut Option<i64>) {
    for caps in re.captures_iter(window) {
        if let Some(m) = caps.get(group) {
            if let Some(id) = std::str::from_utf8(m.as_bytes())
                .ok()
                .and_then(|s| s.parse().ok())
            {
                *best = Some(id);
            }
        }
    }
}
