//! Dump-level tooling over the block engine: suffix-dispatched line I/O,
//! the page-range splicer, the per-page-count recompressor, and the
//! last-id scanner. Each binary in `src/bin/` is a thin CLI over one of
//! these modules.

pub mod iohandlers;
pub mod lastid;
pub mod recompress;
pub mod splice;

/// Maps repeated `-v` flags to a log level and installs the logger.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();
}
