//! Prints the last page or revision id in a bzip2 XML dump, assuming the
//! last intact block(s) of the file are readable.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use mwdumptools::init_logging;
use mwdumptools::lastid::{find_last_id, IdKind};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Page,
    Rev,
}

#[derive(Parser, Debug)]
#[command(version, about = "Show the last page or rev id in a bz2 XML dump")]
struct Args {
    /// File to search
    #[arg(short, long)]
    filename: PathBuf,

    /// Type of id to find
    #[arg(short = 't', long = "type", value_enum)]
    kind: Kind,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let file = File::open(&args.filename)
        .with_context(|| format!("failed to open {} for read", args.filename.display()))?;
    let data = unsafe { memmap2::Mmap::map(&file)? };

    let kind = match args.kind {
        Kind::Page => IdKind::Page,
        Kind::Rev => IdKind::Rev,
    };
    match find_last_id(&data, kind) {
        Some(id) => {
            println!("{}_id:{}", kind.label(), id);
            Ok(())
        }
        None => bail!("failed to find any id tags in file"),
    }
}
