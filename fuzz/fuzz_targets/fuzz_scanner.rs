#![no_main]

use libfuzzer_sys::fuzz_target;
use random_access_bzip2::Scanner;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000_000 {
        return;
    }

    let scanner = Scanner::new();
    let total_bits = data.len() as u64 * 8;
    let mut last = None;
    for marker in scanner.raw_markers(data, 0) {
        // Hits are in order and inside the buffer.
        assert!(marker.bit_offset + 48 <= total_bits + 16);
        assert!(marker.bit_shift() < 8);
        if let Some(prev) = last {
            assert!(marker.bit_offset >= prev);
        }
        last = Some(marker.bit_offset);
    }
});
