//! Random access into bzip2 files: block discovery, trial-decode
//! verification, CRC accounting, mid-file decompression, and appendable
//! re-encoding.
//!
//! bzip2 streams are bit-packed, so the interesting structure (block
//! markers, per-block CRCs, the stream trailer) sits at arbitrary bit
//! offsets. This crate treats the bit shift as a first-class value and
//! builds, from the bottom up:
//!
//! 1. bit-aligned buffer primitives ([`bits`]),
//! 2. a marker scanner with trial-decompression verification ([`scanner`]),
//! 3. a streaming decoder that starts at any verified block ([`decoder`]),
//! 4. the stream-trailer locator ([`footer`]),
//! 5. the combined-CRC walk connecting block CRCs to the trailer ([`crc`]),
//! 6. an encoder whose output can be appended to an existing prefix
//!    ([`append`]).
//!
//! # Quick start
//!
//! ```no_run
//! use random_access_bzip2::{scan_streams, BlockDecoder, Scanner};
//! use std::io::Read;
//!
//! let data = std::fs::read("pages.xml.bz2").unwrap();
//! let scanner = Scanner::new();
//! let streams = scan_streams(&scanner, &data, true);
//! let last_block = streams.last().unwrap().blocks.last().unwrap();
//!
//! let mut tail = Vec::new();
//! BlockDecoder::open_at(&data, last_block)
//!     .read_to_end(&mut tail)
//!     .unwrap();
//! ```
//!
//! The underlying codec is the `bzip2` crate; nothing here reimplements
//! compression, and nothing reaches into the codec's private state.

pub mod append;
pub mod bits;
pub mod crc;
pub mod decoder;
pub mod footer;
pub mod scanner;

pub use append::{append_compress, patch_trailer};
pub use bits::extract_bits;
pub use crc::{combine_crc, compute_combined_crc, scan_streams, StreamMap};
pub use decoder::{BlockDecoder, ShiftedReader};
pub use footer::{locate_footer, TrailerRecord};
pub use scanner::{
    BlockRecord, Direction, MarkerType, RawMarker, Scanner, MAGIC_BLOCK, MAGIC_EOS,
};

/// Errors surfaced by this crate. "Not found" outcomes are not errors;
/// search operations return `Option` so callers can iterate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bzip2 codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, Error>;
