//! Shared per-batch state: crash log contents and the session validation result.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::integrity::{IntegrityCheck, IntegrityResults};

/// Lines of each crash log, loaded on first access and immutable afterwards.
#[derive(Debug, Default)]
pub struct LogCache {
    logs: RwLock<HashMap<PathBuf, Arc<Vec<String>>>>,
}

impl LogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of `path`, reading the file on the first request.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn lines(&self, path: &Path) -> Result<Arc<Vec<String>>> {
        if let Some(lines) = self.read_guard().get(path) {
            tracing::trace!("log cache hit: {}", path.display());
            return Ok(Arc::clone(lines));
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read crash log: {}", path.display()))?;
        let lines: Vec<String> = String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect();

        let mut logs = self.write_guard();
        let entry = logs
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(lines));
        Ok(Arc::clone(entry))
    }

    /// Drop every cached log so the next batch reads files afresh.
    pub fn clear(&self) {
        self.write_guard().clear();
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Arc<Vec<String>>>> {
        match self.logs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked, recovering log cache");
                poisoned.into_inner()
            }
        }
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, Arc<Vec<String>>>> {
        match self.logs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked, recovering log cache");
                poisoned.into_inner()
            }
        }
    }
}

/// Integrity check results memoized for one batch.
///
/// The first caller runs the check while holding the lock; everyone else
/// waits and receives the stored result.
#[derive(Debug, Default)]
pub struct SessionValidationCache {
    state: Mutex<Option<IntegrityResults>>,
}

impl SessionValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, check: &dyn IntegrityCheck) -> IntegrityResults {
        let mut state = self.lock_state();
        if let Some(results) = state.as_ref() {
            return results.clone();
        }
        tracing::debug!("running session integrity check");
        let results = check.run();
        *state = Some(results.clone());
        results
    }

    /// Forget the stored result. Called at the start of every batch.
    pub fn reset(&self) {
        *self.lock_state() = None;
    }

    pub fn is_computed(&self) -> bool {
        self.lock_state().is_some()
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<IntegrityResults>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked, recovering session cache");
                poisoned.into_inner()
            }
        }
    }
}
