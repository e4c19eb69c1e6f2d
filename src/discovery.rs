//! Finding crash logs on disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::report::REPORT_SUFFIX;

pub const LOG_PATTERN: &str = "crash-*.log";
/// Raw crash logs that were saved with the wrong extension.
pub const STRAY_PATTERN: &str = "crash-*.txt";

/// Crash logs under each root, sorted and deduplicated.
///
/// A root that is a file is taken as-is. Generated reports are skipped.
pub fn discover_logs(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut logs = Vec::new();
    for root in roots {
        if root.is_file() {
            logs.push(root.clone());
            continue;
        }
        logs.extend(
            glob_in(root, LOG_PATTERN)?
                .into_iter()
                .filter(|path| !is_generated_report(path)),
        );
    }
    logs.sort();
    logs.dedup();
    tracing::debug!("discovered {} crash logs", logs.len());
    Ok(logs)
}

/// Files in the root directories that look like crash logs but were never
/// picked up by [`discover_logs`].
pub fn find_stray_logs(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut strays = Vec::new();
    for root in roots.iter().filter(|r| r.is_dir()) {
        match glob_in(root, STRAY_PATTERN) {
            Ok(found) => strays.extend(found),
            Err(e) => tracing::debug!("stray log search failed in {}: {:#}", root.display(), e),
        }
    }
    strays.sort();
    strays.dedup();
    strays
}

fn glob_in(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = Path::new(&escaped).join(pattern);
    let full = full.to_string_lossy();

    let mut matches: Vec<PathBuf> = glob::glob(&full)
        .with_context(|| format!("Invalid search pattern: {}", full))?
        .filter_map(|path| path.ok())
        .filter(|path| path.is_file())
        .collect();
    matches.sort();
    Ok(matches)
}

fn is_generated_report(path: &Path) -> bool {
    let stem_suffix = REPORT_SUFFIX.trim_end_matches(".md");
    path.file_stem()
        .map(|stem| stem.to_string_lossy().ends_with(stem_suffix))
        .unwrap_or(false)
}
