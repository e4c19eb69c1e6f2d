use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crashscan::cli::Cli;
use crashscan::config::ScanConfig;
use crashscan::config_file::ConfigFile;
use crashscan::messages::{CliSink, MessageLevel, MessageSink, MessageTarget};
use crashscan::{batch_options, build_orchestrator, run_batch, tty};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy)]
enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
}

impl ExitCode {
    fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.show_config {
        ConfigFile::show_config(cli.config.as_deref(), cli.ignore_config);
        ExitCode::Success.exit();
    }

    let file_config = match ConfigFile::load_with_custom_path(cli.config.as_deref(), cli.ignore_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("crashscan: Error: {:#}", e);
            ExitCode::InvalidUsage.exit();
        }
    };
    let config = ScanConfig::from_cli(&cli, &file_config);

    let use_colors = tty::should_use_colors_with_mode(&config.output.color);
    let sink = CliSink::new(use_colors, tty::is_stderr_tty());

    let orchestrator = match build_orchestrator(&config) {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(e) => {
            sink.error(&format!("{:#}", e));
            ExitCode::InvalidUsage.exit();
        }
    };
    let hints = orchestrator.rules().hints.clone();

    let summary = match run_batch(
        orchestrator,
        &config.input.paths,
        &batch_options(&config),
        &sink,
    ) {
        Ok(summary) => summary,
        Err(e) => {
            sink.error(&format!("{:#}", e));
            ExitCode::GeneralError.exit();
        }
    };

    if config.output.summary_json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!("failed to serialize summary: {}", e),
        }
    }

    if !summary.succeeded() {
        ExitCode::GeneralError.exit();
    }

    if !hints.is_empty() {
        let hint = &hints[fastrand::usize(..hints.len())];
        sink.message(MessageLevel::Info, MessageTarget::CliOnly, &format!("\n{}", hint));
    }
    ExitCode::Success.exit();
}
