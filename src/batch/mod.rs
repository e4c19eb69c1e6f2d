//! Batch scanning over a bounded worker pool
//!
//! This module runs a [`LogProcessor`] over every discovered crash log:
//! - `worker`: worker threads draining the shared path queue
//! - `quarantine`: moving unsolved logs and their reports aside
//!
//! Statistics are merged in one place, the aggregator loop on the calling
//! thread, as results arrive in completion order.

mod quarantine;
mod worker;

pub use quarantine::{quarantine, quarantine_dir_for, DEFAULT_QUARANTINE_DIR};

use anyhow::Result;
use crossbeam_channel::unbounded;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::discovery::{discover_logs, find_stray_logs};
use crate::messages::MessageSink;
use crate::orchestrator::{FileScanResult, LogProcessor};
use crate::report::write_report;
use crate::stats::{ScanOutcome, ScanStats};

use worker::{worker_thread, WorkerMessage};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Worker count; 0 picks one from the available parallelism.
    pub threads: usize,
    pub move_unsolved: bool,
    pub quarantine_dir: Option<PathBuf>,
}

/// Totals for one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    #[serde(flatten)]
    pub stats: ScanStats,
    /// Logs that could not be fully scanned (incomplete or failed), sorted.
    pub failed_logs: Vec<PathBuf>,
    /// `crash-*.txt` files that discovery never picked up.
    pub stray_logs: Vec<PathBuf>,
    pub reports_written: usize,
    pub quarantined: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchSummary {
    /// At least one log was scanned or found incomplete.
    pub fn succeeded(&self) -> bool {
        !self.stats.is_empty_batch()
    }
}

/// Discover logs under `roots` and scan them all.
pub fn run_batch(
    processor: Arc<dyn LogProcessor>,
    roots: &[PathBuf],
    options: &BatchOptions,
    sink: &dyn MessageSink,
) -> Result<BatchSummary> {
    let files = discover_logs(roots)?;
    let mut summary = run_files(processor, files, options, sink);
    summary.stray_logs = find_stray_logs(roots);
    announce(&summary, sink);
    Ok(summary)
}

/// Scan an explicit list of logs. Messages about the outcome are left to the caller.
pub fn run_files(
    processor: Arc<dyn LogProcessor>,
    files: Vec<PathBuf>,
    options: &BatchOptions,
    sink: &dyn MessageSink,
) -> BatchSummary {
    let started = Instant::now();
    processor.begin_batch();

    let mut summary = BatchSummary::default();
    if files.is_empty() {
        summary.elapsed = started.elapsed();
        return summary;
    }

    let num_workers = pool_size(options.threads, files.len());
    tracing::info!("scanning {} logs with {} workers", files.len(), num_workers);

    let (work_sender, work_receiver) = unbounded::<PathBuf>();
    let (result_sender, result_receiver) = unbounded::<WorkerMessage>();

    let total = files.len();
    for path in files {
        // Receiver is alive until the workers exit, which they cannot do yet.
        let _ = work_sender.send(path);
    }
    drop(work_sender);

    let mut handles = Vec::with_capacity(num_workers);
    for worker_id in 0..num_workers {
        let processor = Arc::clone(&processor);
        let work_receiver = work_receiver.clone();
        let result_sender = result_sender.clone();
        handles.push(thread::spawn(move || {
            worker_thread(worker_id, processor, work_receiver, result_sender)
        }));
    }
    drop(result_sender);

    let mut progress = sink.progress("Scanning crash logs", total);
    for message in result_receiver.iter() {
        let label = match &message {
            WorkerMessage::Done(result) => display_name(&result.path),
            WorkerMessage::Panicked { path, .. } => display_name(path),
        };
        aggregate(message, options, sink, &mut summary);
        progress.update(1, &label);
    }
    progress.finish();

    for handle in handles {
        if handle.join().is_err() {
            tracing::warn!("batch worker thread panicked");
        }
    }

    summary.failed_logs.sort();
    summary.elapsed = started.elapsed();
    summary
}

/// Single merge point for per-file results.
fn aggregate(
    message: WorkerMessage,
    options: &BatchOptions,
    sink: &dyn MessageSink,
    summary: &mut BatchSummary,
) {
    let result: FileScanResult = match message {
        WorkerMessage::Done(result) => result,
        WorkerMessage::Panicked { path, reason } => {
            tracing::debug!("counting {} as failed: {}", path.display(), reason);
            summary.stats.record(ScanOutcome::Failed);
            summary.failed_logs.push(path);
            return;
        }
    };

    summary.stats.merge(&result.stats);
    if result.failed {
        summary.failed_logs.push(result.path.clone());
    }

    let report_path = match write_report(&result.path, &result.report) {
        Ok(path) => {
            summary.reports_written += 1;
            path
        }
        Err(e) => {
            sink.error(&format!("{:#}", e));
            return;
        }
    };

    if result.failed && options.move_unsolved {
        let dir = quarantine_dir_for(&result.path, options.quarantine_dir.as_deref());
        match quarantine(&result.path, &report_path, &dir) {
            Ok(_) => summary.quarantined += 1,
            Err(e) => sink.warning(&format!("Could not move unsolved log: {:#}", e)),
        }
    }
}

/// Final notices: unscannable logs, then the completion message.
fn announce(summary: &BatchSummary, sink: &dyn MessageSink) {
    if !summary.failed_logs.is_empty() || !summary.stray_logs.is_empty() {
        let mut notice = String::from("NOTICE : CRASHSCAN WAS UNABLE TO PROPERLY SCAN THE FOLLOWING LOG(S):\n");
        for path in summary.failed_logs.iter().chain(&summary.stray_logs) {
            notice.push_str(&display_name(path));
            notice.push('\n');
        }
        notice.push_str("===============================================================================\n");
        notice.push_str("Logs saved as crash-*.txt are not scanned. Rename them to crash-*.log and run the scan again.\n");
        notice.push_str("Failed logs may be truncated or were not written by a supported crash generator.");
        sink.warning(&notice);
    }

    if summary.succeeded() {
        sink.success(&summary.stats.format_stats(summary.elapsed));
    } else {
        sink.error("CRASHSCAN found no crash logs to scan or the scan failed.\n    There are no statistics to show.");
    }
}

fn pool_size(requested: usize, files: usize) -> usize {
    let workers = if requested > 0 {
        requested
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get().min(crate::config::MAX_WORKERS))
            .unwrap_or(crate::config::FALLBACK_WORKERS)
    };
    workers.clamp(1, files.max(1))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
