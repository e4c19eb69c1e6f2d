#![no_main]

use crashscan::analyzers::plugins::{parse_loadorder, parse_plugin_line, STATUS_DLL, STATUS_UNKNOWN};
use libfuzzer_sys::fuzz_target;

const MAX_LINE_LEN: usize = 4096;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    for line in text.lines().take(256) {
        if line.len() > MAX_LINE_LEN {
            continue;
        }
        if let Some((name, status)) = parse_plugin_line(line) {
            assert!(!name.is_empty());
            let is_id = status.chars().all(|c| c.is_ascii_hexdigit()) && matches!(status.len(), 2 | 5);
            assert!(is_id || status == STATUS_DLL || status == STATUS_UNKNOWN, "{status}");
        }
    }

    let plugins = parse_loadorder(text);
    assert!(plugins.keys().all(|name| !name.trim().is_empty()));
});
