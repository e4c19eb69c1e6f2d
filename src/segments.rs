//! Crash log segmentation.
//!
//! A crash log is split into six sections by `(start, end)` boundary markers.
//! Missing sections come back empty; extraction never fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::GameInfo;

/// End marker for the last section: everything after its start belongs to it.
pub const EOF_MARKER: &str = "EOF";

/// Value used for header fields that were not found.
pub const UNKNOWN: &str = "UNKNOWN";

const MAIN_ERROR_PREFIX: &str = "Unhandled exception";

static MODULE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?\.dll)\s*v?.*").expect("failed to compile module regex"));

/// Header metadata pulled from a crash log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub game_version: String,
    pub crashgen_version: String,
    pub main_error: String,
}

impl Default for HeaderInfo {
    fn default() -> Self {
        Self {
            game_version: UNKNOWN.to_string(),
            crashgen_version: UNKNOWN.to_string(),
            main_error: UNKNOWN.to_string(),
        }
    }
}

/// The six canonical crash log sections, each a list of trimmed lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    pub compatibility: Vec<String>,
    pub system: Vec<String>,
    pub callstack: Vec<String>,
    pub all_modules: Vec<String>,
    pub xse_modules: Vec<String>,
    pub plugins: Vec<String>,
}

impl Segments {
    fn from_vec(segments: Vec<Vec<String>>) -> Self {
        let mut iter = segments.into_iter();
        let mut next = || iter.next().unwrap_or_default();
        Self {
            compatibility: next(),
            system: next(),
            callstack: next(),
            all_modules: next(),
            xse_modules: next(),
            plugins: next(),
        }
    }
}

/// A crash log after header parsing and segmentation.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub header: HeaderInfo,
    pub segments: Segments,
}

/// Scan the header fields.
///
/// Game and generator versions keep the last matching line; the main error
/// keeps the first one.
pub fn parse_crash_header<S: AsRef<str>>(
    lines: &[S],
    crashgen_name: &str,
    game_root_name: &str,
) -> HeaderInfo {
    let mut header = HeaderInfo::default();
    let mut main_error_seen = false;

    for line in lines {
        let line = line.as_ref();
        if !game_root_name.is_empty() && line.starts_with(game_root_name) {
            header.game_version = line.trim().to_string();
        }
        if !crashgen_name.is_empty() && line.starts_with(crashgen_name) {
            header.crashgen_version = line.trim().to_string();
        }
        if !main_error_seen && line.starts_with(MAIN_ERROR_PREFIX) {
            header.main_error = line.replacen('|', "\n", 1);
            main_error_seen = true;
        }
    }

    for field in [
        &mut header.game_version,
        &mut header.crashgen_version,
        &mut header.main_error,
    ] {
        if field.is_empty() {
            *field = UNKNOWN.to_string();
        }
    }

    header
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Waiting for the start marker of the current boundary pair
    Seeking,
    /// Inside a section whose first line is at `start`
    Collecting { start: usize },
}

/// Split `lines` into one segment per boundary pair.
///
/// A line can close one section and open the next. Reaching the end of
/// input while collecting closes the open section with the remaining lines.
/// The result always has `boundaries.len()` entries, with every line trimmed.
pub fn extract_segments<S: AsRef<str>>(
    lines: &[S],
    boundaries: &[(String, String)],
    eof_marker: &str,
) -> Vec<Vec<String>> {
    let mut segments: Vec<&[S]> = Vec::with_capacity(boundaries.len());
    let total = lines.len();
    let mut state = ScanState::Seeking;
    let mut pair = 0;
    let mut idx = 0;

    while idx < total && pair < boundaries.len() {
        let line = lines[idx].as_ref();
        let (start_marker, end_marker) = &boundaries[pair];

        match state {
            ScanState::Seeking => {
                if line.starts_with(start_marker.as_str()) {
                    let start = idx + 1;
                    if end_marker == eof_marker {
                        segments.push(&lines[start..]);
                        break;
                    }
                    state = ScanState::Collecting { start };
                }
            }
            ScanState::Collecting { start } => {
                if line.starts_with(end_marker.as_str()) {
                    segments.push(&lines[start..idx]);
                    pair += 1;
                    state = ScanState::Seeking;
                    // Re-check this line as the next section's start.
                    continue;
                }
            }
        }

        if let ScanState::Collecting { start } = state {
            if idx == total - 1 {
                segments.push(&lines[start..]);
                break;
            }
        }

        idx += 1;
    }

    let mut result: Vec<Vec<String>> = segments
        .into_iter()
        .map(|segment| segment.iter().map(|l| l.as_ref().trim().to_string()).collect())
        .collect();
    result.resize_with(boundaries.len(), Vec::new);
    result
}

/// Parse the header and all six sections of a crash log.
pub fn find_segments<S: AsRef<str>>(lines: &[S], game: &GameInfo) -> ParsedLog {
    let header = parse_crash_header(lines, &game.crashgen_name, &game.root_name);
    let boundaries = segment_boundaries(&game.xse_acronym);
    let segments = extract_segments(lines, &boundaries, EOF_MARKER);

    ParsedLog {
        header,
        segments: Segments::from_vec(segments),
    }
}

/// `(start, end)` markers for the six sections, in order.
pub fn segment_boundaries(xse_acronym: &str) -> Vec<(String, String)> {
    let xse = format!("{} PLUGINS:", xse_acronym.to_uppercase());
    vec![
        ("\t[Compatibility]".to_string(), "SYSTEM SPECS:".to_string()),
        ("SYSTEM SPECS:".to_string(), "PROBABLE CALL STACK:".to_string()),
        ("PROBABLE CALL STACK:".to_string(), "MODULES:".to_string()),
        ("MODULES:".to_string(), xse.clone()),
        (xse, "PLUGINS:".to_string()),
        ("PLUGINS:".to_string(), EOF_MARKER.to_string()),
    ]
}

/// Bare, lowercased DLL names from extender module lines such as
/// `achievements.dll v1.2.0`.
pub fn extract_module_names<S: AsRef<str>>(module_lines: &[S]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for text in module_lines {
        let text = text.as_ref().trim();
        if text.is_empty() {
            continue;
        }
        let name = match MODULE_NAME_RE.captures(text) {
            Some(caps) => caps[1].to_lowercase(),
            None => text.to_lowercase(),
        };
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
