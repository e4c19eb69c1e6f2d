// Core library for crashscan crash log diagnostics

pub mod analyzers;
pub mod batch;
pub mod cache;
pub mod cli;
pub mod colors;
pub mod config;
pub mod config_file;
pub mod discovery;
pub mod formid_db;
pub mod integrity;
pub mod messages;
pub mod orchestrator;
pub mod report;
pub mod rules;
pub mod segments;
pub mod stats;
pub mod tty;
pub mod version;

pub use batch::{run_batch, BatchOptions, BatchSummary};
pub use config::ScanConfig;
pub use orchestrator::{FileScanResult, LogProcessor, OrchestratorOptions, ScanOrchestrator};
pub use rules::RuleDatabase;
pub use stats::{ScanOutcome, ScanStats};

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use formid_db::CsvFormIdDatabase;

/// Load the rule database named in the configuration, or the built-in one.
pub fn load_rules(config: &ScanConfig) -> Result<RuleDatabase> {
    match &config.scan.rules {
        Some(path) => RuleDatabase::load(path),
        None => RuleDatabase::builtin(),
    }
}

/// Build the per-file pipeline for `config`.
pub fn build_orchestrator(config: &ScanConfig) -> Result<ScanOrchestrator> {
    let rules = Arc::new(load_rules(config)?);
    let options = OrchestratorOptions {
        fcx_mode: config.scan.fcx_mode,
        show_formid_values: config.scan.show_formid_values,
        loadorder: config.input.loadorder.clone(),
    };

    let mut orchestrator =
        ScanOrchestrator::new(rules, options).with_game_path(config.scan.game_path.clone());
    if let Some(path) = &config.scan.formid_db {
        let db = CsvFormIdDatabase::load(path)?;
        tracing::info!("loaded {} FormID entries from {}", db.len(), path.display());
        orchestrator = orchestrator.with_formid_db(Arc::new(db));
    }
    Ok(orchestrator)
}

/// Scan one crash log without writing its report.
pub fn scan_file(config: &ScanConfig, path: &Path) -> Result<FileScanResult> {
    let orchestrator = build_orchestrator(config)?;
    orchestrator.begin_batch();
    Ok(orchestrator.process_file(path))
}

pub fn batch_options(config: &ScanConfig) -> BatchOptions {
    BatchOptions {
        threads: config.effective_threads(),
        move_unsolved: config.output.move_unsolved,
        quarantine_dir: config.output.quarantine_dir.clone(),
    }
}
