//! Writes a range of pages from a MediaWiki XML dump, either to stdout or
//! to a series of per-range output files. Useful both for salvaging
//! partially written dumps and for cutting stub files for reruns.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use mwdumptools::init_logging;
use mwdumptools::iohandlers::{InputHandler, OutputHandler};
use mwdumptools::splice::{parse_fspecs, Splicer};

#[derive(Parser, Debug)]
#[command(version, about = "Write a page-id range out of a MediaWiki XML dump")]
struct Args {
    /// Input file; stdin when omitted (.gz/.bz2 decompressed on the fly)
    #[arg(short, long)]
    inpath: Option<PathBuf>,

    /// Directory for output files (requires --fspecs)
    #[arg(short, long)]
    odir: Option<PathBuf>,

    /// Output specs `filename:startid[:endid]`, separated by `;`; ranges
    /// must be ascending and disjoint
    #[arg(short, long)]
    fspecs: Option<String>,

    /// Don't write the mediawiki/siteinfo header
    #[arg(short = 'H', long)]
    noheader: bool,

    /// Don't write the closing mediawiki tag
    #[arg(short = 'F', long)]
    nofooter: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Id of the first page to write
    startpageid: Option<i64>,

    /// Id of the page at which to stop writing (exclusive); through EOF
    /// when omitted
    endpageid: Option<i64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut input = InputHandler::open(args.inpath.as_deref())?;
    let mut splicer = Splicer::new(args.noheader, args.nofooter);

    match (&args.odir, &args.fspecs) {
        (Some(odir), Some(fspecs)) => {
            let specs = parse_fspecs(fspecs)?;
            splicer.run_multi(&mut input, odir, &specs)
        }
        (Some(_), None) => bail!("the --odir option requires --fspecs"),
        (None, Some(_)) => bail!("the --fspecs option requires --odir"),
        (None, None) => {
            let start = match args.startpageid {
                Some(id) if id > 0 => id,
                _ => bail!("startpageid must be a positive integer"),
            };
            if args.endpageid.is_some_and(|id| id <= 0) {
                bail!("endpageid must be a positive integer");
            }
            let mut out = OutputHandler::create(None, false)?;
            splicer.run_single(&mut input, &mut out, start, args.endpageid)?;
            out.close()?;
            Ok(())
        }
    }
}
