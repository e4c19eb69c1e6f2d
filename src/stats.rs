use serde::Serialize;
use std::time::Duration;

/// How a single crash log scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOutcome {
    /// All analyzers ran against a log that had a plugin list.
    Scanned,
    /// No plugin list in the log and no load-order file.
    Incomplete,
    /// The scan hit an unexpected error.
    Failed,
}

/// Per-batch scan counters. Each file contributes to exactly one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub scanned: usize,
    pub incomplete: usize,
    pub failed: usize,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_outcome(outcome: ScanOutcome) -> Self {
        let mut stats = Self::default();
        stats.record(outcome);
        stats
    }

    pub fn record(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::Scanned => self.scanned += 1,
            ScanOutcome::Incomplete => self.incomplete += 1,
            ScanOutcome::Failed => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &ScanStats) {
        self.scanned += other.scanned;
        self.incomplete += other.incomplete;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.scanned + self.incomplete + self.failed
    }

    /// Nothing usable came out of the batch.
    pub fn is_empty_batch(&self) -> bool {
        self.scanned == 0 && self.incomplete == 0
    }

    pub fn format_stats(&self, elapsed: Duration) -> String {
        format!(
            "Scanned all available logs in {:.2} seconds.\n\
             Number of Scanned Logs (No Autoscan Errors): {}\n\
             Number of Incomplete Logs (No Plugins List): {}\n\
             Number of Failed Logs (Autoscan Can't Scan): {}\n-----",
            elapsed.as_secs_f64(),
            self.scanned,
            self.incomplete,
            self.failed
        )
    }
}
