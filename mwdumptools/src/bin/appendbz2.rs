//! Compresses stdin without a stream header and with the trailer CRC
//! seeded from a given combined CRC, producing bytes that can be appended
//! to a partial bzip2 file whose blocks fold to that CRC.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use mwdumptools::init_logging;
use random_access_bzip2::append_compress;

#[derive(Parser, Debug)]
#[command(version, about = "bz2-compress stdin as an appendable, headerless stream")]
struct Args {
    /// File to write the compressed data to
    #[arg(short, long)]
    outfile: PathBuf,

    /// Combined CRC of the blocks in the file being extended (decimal)
    #[arg(short, long)]
    crc: u32,

    /// Size of the input buffer
    #[arg(short, long, default_value_t = 4096)]
    bufsize: usize,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let written = append_compress(io::stdin().lock(), &args.outfile, args.crc, args.bufsize)?;
    log::info!("wrote {written} bytes to {}", args.outfile.display());
    Ok(())
}
