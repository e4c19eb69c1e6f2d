// Command-line interface definitions

use clap::Parser;
use std::path::PathBuf;

use crate::config::ColorMode;

#[derive(Parser, Debug, Clone)]
#[command(name = "crashscan")]
#[command(about = "Scan game crash logs for known crash suspects")]
#[command(
    long_about = "Scan game crash logs for known crash suspects\n\nEvery crash-*.log file in the given directories is split into its sections, checked against\nthe rule database, and summarized in a crash-*-AUTOSCAN.md report written next to it.\n\nCOMMON EXAMPLES:\n  crashscan\n  crashscan ~/Documents/My\\ Games/Fallout4/F4SE --move-unsolved\n  crashscan logs/ --fcx-mode --game-path 'C:/Games/Fallout 4'\n  crashscan logs/ --summary-json"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Directories to scan for crash-*.log files, or individual log files (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Check game installation files once per batch and include the results in every report
    #[arg(long = "fcx-mode", help_heading = "Scan Options")]
    pub fcx_mode: bool,

    /// Show FormID descriptions from the FormID database
    #[arg(long = "show-fid-values", help_heading = "Scan Options")]
    pub show_fid_values: bool,

    /// Rule database (YAML). Defaults to the built-in Fallout 4 rules
    #[arg(long = "rules", help_heading = "Scan Options")]
    pub rules: Option<PathBuf>,

    /// FormID database (CSV with plugin,formid,entry columns)
    #[arg(long = "formid-db", help_heading = "Scan Options")]
    pub formid_db: Option<PathBuf>,

    /// Load-order file; when present its plugins replace the ones listed in each log
    #[arg(long = "loadorder", help_heading = "Scan Options")]
    pub loadorder: Option<PathBuf>,

    /// Game installation folder used by --fcx-mode
    #[arg(long = "game-path", help_heading = "Scan Options")]
    pub game_path: Option<PathBuf>,

    /// Move logs that could not be fully scanned into the quarantine folder
    #[arg(long = "move-unsolved", help_heading = "Output Options")]
    pub move_unsolved: bool,

    /// Folder for unsolved logs (default: "Unsolved Logs" next to each log)
    #[arg(long = "quarantine-dir", help_heading = "Output Options")]
    pub quarantine_dir: Option<PathBuf>,

    /// Color output mode
    #[arg(
        long = "color",
        value_enum,
        default_value = "auto",
        help_heading = "Output Options"
    )]
    pub color: ColorMode,

    /// Print the final statistics as a JSON object on stdout
    #[arg(long = "summary-json", help_heading = "Output Options")]
    pub summary_json: bool,

    /// Number of worker threads (0 = auto, capped at 8)
    #[arg(long = "threads", help_heading = "Performance Options")]
    pub threads: Option<usize>,

    /// Increase diagnostic logging (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Output Options")]
    pub verbose: u8,

    /// Use this configuration file instead of searching for one
    #[arg(long = "config", help_heading = "Configuration Options", conflicts_with = "ignore_config")]
    pub config: Option<PathBuf>,

    /// Ignore all configuration files
    #[arg(long = "ignore-config", help_heading = "Configuration Options")]
    pub ignore_config: bool,

    /// Show configuration file locations and active values, then exit
    #[arg(long = "show-config", help_heading = "Configuration Options")]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "crashscan",
            "logs",
            "--fcx-mode",
            "--threads",
            "3",
            "-vv",
            "--color",
            "never",
        ])
        .unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("logs")]);
        assert!(cli.fcx_mode);
        assert_eq!(cli.threads, Some(3));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.color, ColorMode::Never));
    }

    #[test]
    fn config_flags_conflict() {
        let result = Cli::try_parse_from(["crashscan", "--config", "a.ini", "--ignore-config"]);
        assert!(result.is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
