#![no_main]

use crashscan::segments::{extract_segments, segment_boundaries, EOF_MARKER};
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_LEN: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_LEN {
        return;
    }

    let text = String::from_utf8_lossy(data);
    let lines: Vec<&str> = text.lines().collect();

    // Both acronym spellings show up in real logs.
    for acronym in ["F4SE", "f4se"] {
        let boundaries = segment_boundaries(acronym);
        let segments = extract_segments(lines.as_slice(), &boundaries, EOF_MARKER);
        assert_eq!(segments.len(), boundaries.len());

        let total: usize = segments.iter().map(Vec::len).sum();
        assert!(total <= lines.len());
        for line in segments.iter().flatten() {
            assert_eq!(line.trim(), line.as_str());
        }
    }
});
