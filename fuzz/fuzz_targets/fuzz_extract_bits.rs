#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use random_access_bzip2::extract_bits;

#[derive(Arbitrary, Debug)]
struct Input {
    data: Vec<u8>,
    start_bit: u64,
    end_bit: u64,
}

fuzz_target!(|input: Input| {
    if input.data.is_empty() || input.data.len() > 1_000_000 {
        return;
    }

    let max_bits = input.data.len() as u64 * 8;
    let start = input.start_bit % (max_bits + 1);
    let end = input.end_bit % (max_bits + 1);
    let (start, end) = if start <= end { (start, end) } else { (end, start) };

    let mut out = Vec::new();
    extract_bits(&input.data, start, end, &mut out);
    assert_eq!(out.len() as u64, (end - start).div_ceil(8));
});
