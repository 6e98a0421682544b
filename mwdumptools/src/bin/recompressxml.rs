//! Recompresses a page-content XML stream into one bzip2 stream per N
//! pages, optionally emitting an offset:pageid:title index per stream.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use mwdumptools::init_logging;
use mwdumptools::iohandlers::{InputHandler, OutputHandler};
use mwdumptools::recompress::Recompressor;

#[derive(Parser, Debug)]
#[command(version, about = "Recompress an XML dump, one bz2 stream per N pages")]
struct Args {
    /// Pages per complete output stream; the siteinfo header gets a
    /// stream of its own
    #[arg(short, long)]
    pagesperstream: u32,

    /// Write a stream index (offset:pageid:title) to this file;
    /// compressed when the name says so
    #[arg(short, long)]
    buildindex: Option<PathBuf>,

    /// Input file; stdin when omitted
    #[arg(short, long)]
    inpath: Option<PathBuf>,

    /// Output file; stdout when omitted (a plain name defeats the point)
    #[arg(short, long)]
    outpath: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.pagesperstream == 0 {
        bail!("bad argument given for pages per stream");
    }

    let mut input = InputHandler::open(args.inpath.as_deref())?;
    let mut out = OutputHandler::create(args.outpath.as_deref(), false)?;
    let mut index = match &args.buildindex {
        Some(path) => Some(OutputHandler::create(Some(path), false)?),
        None => None,
    };

    Recompressor::new(args.pagesperstream).run(&mut input, &mut out, index.as_mut())?;

    out.close()?;
    if let Some(index) = index {
        index.close()?;
    }
    Ok(())
}
