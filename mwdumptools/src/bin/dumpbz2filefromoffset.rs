//! Decompresses a bzip2 file to stdout starting from the first verified
//! block at or after a given byte offset, continuing across stream
//! boundaries until the end of the file.

use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use mwdumptools::init_logging;
use random_access_bzip2::{BlockDecoder, Direction, Scanner};

#[derive(Parser, Debug)]
#[command(version, about = "Decompress a bz2 file from an arbitrary offset")]
struct Args {
    /// File to read
    #[arg(short, long)]
    filename: PathBuf,

    /// Byte offset to start searching for a block at
    #[arg(short, long)]
    offset: u64,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let file = File::open(&args.filename)
        .with_context(|| format!("failed to open {} for read", args.filename.display()))?;
    let data = unsafe { memmap2::Mmap::map(&file)? };

    let scanner = Scanner::new();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    let mut search_from = args.offset;
    let mut dumped = false;
    while let Some(block) = scanner.find_first_block(&data, search_from, Direction::Forward, true) {
        log::debug!(
            "dumping from block at byte {} shift {}",
            block.byte_offset,
            block.bit_shift
        );
        let mut decoder = BlockDecoder::open_at(&data, &block);
        match io::copy(&mut decoder, &mut out) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                log::warn!("stream truncated: {err}");
                dumped = true;
                break;
            }
            Err(err) => return Err(err.into()),
        }
        dumped = true;
        let consumed = decoder.compressed_position();
        if consumed >= data.len() as u64 {
            break;
        }
        // resume behind what this stream consumed; the next hit is the
        // following stream's first block
        search_from = consumed.max(block.byte_offset + 1);
    }
    out.flush()?;

    if !dumped {
        bail!("no bz2 block found at or after offset {}", args.offset);
    }
    Ok(())
}
