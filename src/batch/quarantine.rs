//! Moving logs that could not be fully scanned out of the way.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_QUARANTINE_DIR: &str = "Unsolved Logs";

/// Folder for unsolved logs: the configured one, else `Unsolved Logs` next to the log.
pub fn quarantine_dir_for(log: &Path, configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(dir) => dir.to_path_buf(),
        None => log
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(DEFAULT_QUARANTINE_DIR),
    }
}

/// Move the log and its report into `dir`. When the log is already gone only
/// the report is moved. Returns the paths that were moved.
pub fn quarantine(log: &Path, report: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create quarantine folder: {}", dir.display()))?;

    let mut moved = Vec::with_capacity(2);
    for source in [log, report] {
        if !source.exists() {
            tracing::debug!("nothing to quarantine at {}", source.display());
            continue;
        }
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = dir.join(name);
        move_file(source, &target)?;
        moved.push(target);
    }
    Ok(moved)
}

/// Rename, falling back to copy and delete across file systems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))?;
    fs::remove_file(from).with_context(|| format!("Failed to remove {}", from.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_folder_sits_next_to_log() {
        let dir = quarantine_dir_for(Path::new("/logs/crash-1.log"), None);
        assert_eq!(dir, PathBuf::from("/logs/Unsolved Logs"));
        let dir = quarantine_dir_for(Path::new("/logs/crash-1.log"), Some(Path::new("/q")));
        assert_eq!(dir, PathBuf::from("/q"));
    }

    #[test]
    fn moves_log_and_report() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("crash-1.log");
        let report = tmp.path().join("crash-1-AUTOSCAN.md");
        fs::write(&log, "log").unwrap();
        fs::write(&report, "report").unwrap();

        let dir = tmp.path().join(DEFAULT_QUARANTINE_DIR);
        let moved = quarantine(&log, &report, &dir).unwrap();

        assert_eq!(moved.len(), 2);
        assert!(!log.exists());
        assert!(dir.join("crash-1.log").exists());
        assert!(dir.join("crash-1-AUTOSCAN.md").exists());
    }

    #[test]
    fn missing_log_moves_report_only() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("crash-2.log");
        let report = tmp.path().join("crash-2-AUTOSCAN.md");
        fs::write(&report, "report").unwrap();

        let dir = tmp.path().join("q");
        let moved = quarantine(&log, &report, &dir).unwrap();
        assert_eq!(moved, vec![dir.join("crash-2-AUTOSCAN.md")]);
    }
}
