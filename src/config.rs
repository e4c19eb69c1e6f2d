use clap::ValueEnum;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::config_file::ConfigFile;

/// Upper bound for the worker pool.
pub const MAX_WORKERS: usize = 8;
/// Worker count when available parallelism cannot be detected.
pub const FALLBACK_WORKERS: usize = 4;

/// Main configuration struct for crashscan
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub input: InputConfig,
    pub scan: ScanOptions,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
}

/// Input configuration
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    pub paths: Vec<PathBuf>,
    pub loadorder: Option<PathBuf>,
}

/// Analyzer configuration
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub fcx_mode: bool,
    pub show_formid_values: bool,
    pub rules: Option<PathBuf>,
    pub formid_db: Option<PathBuf>,
    pub game_path: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub move_unsolved: bool,
    pub quarantine_dir: Option<PathBuf>,
    pub color: ColorMode,
    pub summary_json: bool,
}

/// Performance configuration
#[derive(Debug, Clone, Default)]
pub struct PerformanceConfig {
    /// 0 means auto
    pub threads: usize,
}

/// Color output mode
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ScanConfig {
    /// Create configuration from CLI arguments layered over a config file.
    /// Boolean flags can only switch an option on.
    pub fn from_cli(cli: &Cli, file: &ConfigFile) -> Self {
        let f = &file.scan;
        let paths = if cli.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            cli.paths.clone()
        };

        Self {
            input: InputConfig {
                paths,
                loadorder: cli.loadorder.clone().or_else(|| f.loadorder.clone()),
            },
            scan: ScanOptions {
                fcx_mode: cli.fcx_mode || f.fcx_mode.unwrap_or(false),
                show_formid_values: cli.show_fid_values || f.show_formid_values.unwrap_or(false),
                rules: cli.rules.clone().or_else(|| f.rules.clone()),
                formid_db: cli.formid_db.clone().or_else(|| f.formid_db.clone()),
                game_path: cli.game_path.clone().or_else(|| f.game_path.clone()),
            },
            output: OutputConfig {
                move_unsolved: cli.move_unsolved || f.move_unsolved.unwrap_or(false),
                quarantine_dir: cli.quarantine_dir.clone().or_else(|| f.quarantine_dir.clone()),
                color: cli.color,
                summary_json: cli.summary_json,
            },
            performance: PerformanceConfig {
                threads: cli.threads.or(f.threads).unwrap_or(0),
            },
        }
    }

    /// Get effective worker count: explicit setting, else available
    /// parallelism capped at 8, else 4.
    pub fn effective_threads(&self) -> usize {
        if self.performance.threads > 0 {
            return self.performance.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().min(MAX_WORKERS))
            .unwrap_or(FALLBACK_WORKERS)
    }
}
