#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use random_access_bzip2::{BlockDecoder, BlockRecord};
use std::io::Read;

#[derive(Arbitrary, Debug)]
struct Input {
    data: Vec<u8>,
    byte_offset: u64,
    bit_shift: u8,
}

fuzz_target!(|input: Input| {
    if input.data.is_empty() || input.data.len() > 1_000_000 {
        return;
    }

    let record = BlockRecord {
        byte_offset: input.byte_offset % input.data.len() as u64,
        bit_shift: input.bit_shift % 8,
        crc32: 0,
    };

    // Arbitrary input must produce output or an error, never a panic.
    let mut decoder = BlockDecoder::open_at(&input.data, &record);
    let mut sink = [0u8; 8192];
    let mut total = 0usize;
    loop {
        match decoder.read(&mut sink) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                if total > 100_000_000 {
                    break;
                }
            }
            Err(_) => break,
        }
    }
});
