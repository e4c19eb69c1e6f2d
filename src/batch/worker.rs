//! Worker thread for the batch pool
//!
//! Each worker pulls log paths off the shared queue and sends one message per
//! file back to the aggregator.

use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use crate::orchestrator::{FileScanResult, LogProcessor};

/// What a worker reports for one file.
pub(crate) enum WorkerMessage {
    Done(FileScanResult),
    /// The processor panicked; the file has no report.
    Panicked { path: PathBuf, reason: String },
}

pub(crate) fn worker_thread(
    worker_id: usize,
    processor: Arc<dyn LogProcessor>,
    work_receiver: Receiver<PathBuf>,
    result_sender: Sender<WorkerMessage>,
) {
    tracing::trace!("worker {} started", worker_id);

    for path in work_receiver.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process_file(&path)));
        let message = match outcome {
            Ok(result) => WorkerMessage::Done(result),
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                tracing::warn!("scan of {} panicked: {}", path.display(), reason);
                WorkerMessage::Panicked { path, reason }
            }
        };

        if result_sender.send(message).is_err() {
            // Aggregator is gone, nothing left to report to.
            break;
        }
    }

    tracing::trace!("worker {} finished", worker_id);
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ScanOutcome;
    use crossbeam_channel::unbounded;
    use std::path::Path;

    struct Flaky;

    impl LogProcessor for Flaky {
        fn process_file(&self, path: &Path) -> FileScanResult {
            if path.ends_with("bad.log") {
                panic!("boom");
            }
            FileScanResult::new(path.to_path_buf(), vec!["ok\n".into()], ScanOutcome::Scanned)
        }
    }

    #[test]
    fn panics_become_messages() {
        let (work_tx, work_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();
        for name in ["a.log", "bad.log", "b.log"] {
            work_tx.send(PathBuf::from(name)).unwrap();
        }
        drop(work_tx);

        worker_thread(0, Arc::new(Flaky), work_rx, result_tx);

        let messages: Vec<WorkerMessage> = result_rx.iter().collect();
        assert_eq!(messages.len(), 3);
        let panicked: Vec<&str> = messages
            .iter()
            .filter_map(|m| match m {
                WorkerMessage::Panicked { reason, .. } => Some(reason.as_str()),
                WorkerMessage::Done(_) => None,
            })
            .collect();
        assert_eq!(panicked, vec!["boom"]);
    }
}
