use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Suffix added to a crash log's file stem to name its report.
pub const REPORT_SUFFIX: &str = "-AUTOSCAN.md";

/// Ordered report text for one crash log.
///
/// Entries carry their own line breaks; rendering is plain concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.concat()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

/// `crash-2024.log` -> `crash-2024-AUTOSCAN.md` in the same directory.
pub fn report_path_for(log_path: &Path) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    log_path.with_file_name(format!("{}{}", stem, REPORT_SUFFIX))
}

/// Write the rendered report next to its crash log and return its path.
pub fn write_report(log_path: &Path, lines: &[String]) -> Result<PathBuf> {
    let path = report_path_for(log_path);
    std::fs::write(&path, lines.concat())
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(path)
}
