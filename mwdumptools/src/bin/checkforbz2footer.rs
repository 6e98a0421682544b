//! Exits 0 when the file ends with an intact bzip2 stream trailer, nonzero
//! otherwise. A quick way to tell a finished dump from a truncated one.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use mwdumptools::init_logging;
use random_access_bzip2::locate_footer;

#[derive(Parser, Debug)]
#[command(version, about = "Check whether a file ends with a bz2 stream trailer")]
struct Args {
    /// File to check
    #[arg(short, long)]
    filename: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let file = File::open(&args.filename)
        .with_context(|| format!("failed to open {} for read", args.filename.display()))?;
    let data = unsafe { memmap2::Mmap::map(&file)? };

    match locate_footer(&data) {
        Some(trailer) => {
            log::info!(
                "end-of-stream marker at byte {} shift {}, stream CRC 0x{:08x}",
                trailer.end_marker_offset,
                trailer.bit_shift,
                trailer.combined_crc32
            );
            Ok(())
        }
        None => bail!("no bz2 footer found in {}", args.filename.display()),
    }
}
