//! Per-file scan pipeline.
//!
//! One crash log goes through the segment extractor and then every analyzer
//! in a fixed order, all appending to a single report.

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyzers::gpu::gpu_report_lines;
use crate::analyzers::plugins::{limit_messages, read_loadorder};
use crate::analyzers::settings::check_crashgen_version;
use crate::analyzers::suspects::dll_crash_notice;
use crate::analyzers::{
    check_dll_crash, detect_gpu, extract_formids, CrashgenSettings, FormIdAnalyzer,
    PluginAnalyzer, RecordScanner, SettingsValidator, SuspectScanner,
};
use crate::cache::{LogCache, SessionValidationCache};
use crate::formid_db::FormIdLookup;
use crate::integrity::{GameFilesCheck, IntegrityCheck};
use crate::report::Report;
use crate::rules::RuleDatabase;
use crate::segments::{extract_module_names, find_segments, ParsedLog};
use crate::stats::{ScanOutcome, ScanStats};
use crate::version::Version;

/// Everything the batch runner needs back from one file.
#[derive(Debug, Clone)]
pub struct FileScanResult {
    pub path: PathBuf,
    pub report: Vec<String>,
    /// Set when the log could not be fully scanned and may be quarantined.
    pub failed: bool,
    pub outcome: ScanOutcome,
    pub stats: ScanStats,
}

impl FileScanResult {
    pub fn new(path: PathBuf, report: Vec<String>, outcome: ScanOutcome) -> Self {
        Self {
            path,
            report,
            failed: outcome != ScanOutcome::Scanned,
            outcome,
            stats: ScanStats::for_outcome(outcome),
        }
    }

    /// Result for a file whose scan never produced a report.
    pub fn failure(path: PathBuf, reason: &str) -> Self {
        let report = vec![format!(
            "# 💀 CRITICAL : CRASHSCAN COULD NOT SCAN THIS LOG: {} # \n-----\n",
            reason
        )];
        Self::new(path, report, ScanOutcome::Failed)
    }
}

/// Scans a single file. The batch runner drives this from its workers.
pub trait LogProcessor: Send + Sync {
    /// Called once before the first file of every batch.
    fn begin_batch(&self) {}

    fn process_file(&self, path: &Path) -> FileScanResult;
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    pub fcx_mode: bool,
    pub show_formid_values: bool,
    pub loadorder: Option<PathBuf>,
}

pub struct ScanOrchestrator {
    rules: Arc<RuleDatabase>,
    options: OrchestratorOptions,
    log_cache: Arc<LogCache>,
    session_cache: Arc<SessionValidationCache>,
    integrity: Arc<dyn IntegrityCheck>,
    formid_db: Option<Arc<dyn FormIdLookup>>,
}

impl ScanOrchestrator {
    pub fn new(rules: Arc<RuleDatabase>, options: OrchestratorOptions) -> Self {
        let integrity = Arc::new(GameFilesCheck::new(None, rules.game_files.clone()));
        Self {
            rules,
            options,
            log_cache: Arc::new(LogCache::new()),
            session_cache: Arc::new(SessionValidationCache::new()),
            integrity,
            formid_db: None,
        }
    }

    pub fn with_game_path(mut self, game_path: Option<PathBuf>) -> Self {
        self.integrity = Arc::new(GameFilesCheck::new(game_path, self.rules.game_files.clone()));
        self
    }

    pub fn with_formid_db(mut self, db: Arc<dyn FormIdLookup>) -> Self {
        self.formid_db = Some(db);
        self
    }

    pub fn with_integrity(mut self, check: Arc<dyn IntegrityCheck>) -> Self {
        self.integrity = check;
        self
    }

    pub fn with_log_cache(mut self, cache: Arc<LogCache>) -> Self {
        self.log_cache = cache;
        self
    }

    pub fn with_session_cache(mut self, cache: Arc<SessionValidationCache>) -> Self {
        self.session_cache = cache;
        self
    }

    pub fn rules(&self) -> &RuleDatabase {
        &self.rules
    }

    pub fn session_cache(&self) -> &SessionValidationCache {
        &self.session_cache
    }

    fn scan(&self, path: &Path) -> Result<(Report, ScanOutcome)> {
        let lines = self.log_cache.lines(path)?;
        let parsed = find_segments(lines.as_slice(), &self.rules.game);
        let mut report = Report::new();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.header_section(&file_name, &parsed, &mut report);
        self.suspects_section(&parsed, &mut report);
        let outcome = self.plugin_sections(&parsed, &mut report);
        self.records_section(&parsed, &mut report);
        self.settings_section(&parsed, &mut report);
        footer(&mut report);

        Ok((report, outcome))
    }

    fn header_section(&self, file_name: &str, parsed: &ParsedLog, report: &mut Report) {
        let game = &self.rules.game;
        let header = &parsed.header;
        let crashgen_version = Version::from_header(&header.crashgen_version);

        report.extend([
            format!("{} -> AUTOSCAN REPORT GENERATED BY crashscan v{} \n", file_name, env!("CARGO_PKG_VERSION")),
            "# FOR BEST VIEWING EXPERIENCE OPEN THIS FILE IN NOTEPAD++ OR SIMILAR # \n".to_string(),
            "# PLEASE READ EVERYTHING CAREFULLY AND BEWARE OF FALSE POSITIVES # \n".to_string(),
            "====================================================\n".to_string(),
            format!("Main Error: {}\n", header.main_error),
            "====================================================\n".to_string(),
            format!("Detected {} Version: {}\n", game.crashgen_name, header.crashgen_version),
            format!("Detected Game Version: {}\n", header.game_version),
            "====================================================\n".to_string(),
        ]);

        check_crashgen_version(
            &game.crashgen_name,
            &crashgen_version,
            game.crashgen_latest.as_ref(),
            report,
        );

        let modules = extract_module_names(&parsed.segments.xse_modules);
        report.extend(gpu_report_lines(&detect_gpu(&parsed.segments.system), &modules));
    }

    fn suspects_section(&self, parsed: &ParsedLog, report: &mut Report) {
        let width = self.rules.warn_width;
        let main_error = parsed.header.main_error.as_str();
        let callstack = parsed.segments.callstack.join("\n");
        let scanner = SuspectScanner::new(&self.rules);

        report.extend([
            "====================================================\n",
            "CHECKING IF LOG MATCHES ANY KNOWN CRASH SUSPECTS...\n",
            "====================================================\n",
        ]);

        let error_findings = scanner.scan_main_error(main_error, width);
        let stack_findings = scanner.scan_stack(main_error, &callstack, width);
        report.extend(error_findings.lines.iter().cloned());
        report.extend(stack_findings.lines.iter().cloned());

        if check_dll_crash(main_error) {
            report.extend(dll_crash_notice());
        }

        if error_findings.found() || stack_findings.found() {
            report.extend([
                "* FOR DETAILED DESCRIPTIONS AND POSSIBLE SOLUTIONS TO ANY ABOVE DETECTED CRASH SUSPECTS *\n",
                "* SEE THE CRASH SUSPECT NOTES THAT SHIP WITH YOUR RULE DATABASE *\n\n",
            ]);
        } else {
            report.extend([
                "# ❌ UNABLE TO FIND ANY CRASH SUSPECTS THAT MATCH THE CURRENT RULE SET # \n".to_string(),
                format!(
                    "* Check the crash log and the {} plugins list manually, and consider reporting this log so new rules can be added. * \n\n",
                    self.rules.game.xse_acronym
                ),
            ]);
        }
    }

    /// Plugin attribution and FormID cross-reference. Both need the same
    /// plugin map, so they share a step. Returns the file's outcome.
    fn plugin_sections(&self, parsed: &ParsedLog, report: &mut Report) -> ScanOutcome {
        let game = &self.rules.game;
        let header = &parsed.header;
        let segments = &parsed.segments;
        let game_version = Version::from_header(&header.game_version);
        let crashgen_version = Version::from_header(&header.crashgen_version);
        let analyzer = PluginAnalyzer::new(&self.rules);

        report.extend([
            "====================================================\n",
            "CHECKING FOR PLUGIN SUSPECTS IN THE CALL STACK...\n",
            "====================================================\n",
        ]);

        let loadorder = self
            .options
            .loadorder
            .as_deref()
            .filter(|path| path.is_file());

        let (mut plugins, limit_triggered, limit_check_disabled) = match loadorder {
            Some(path) => {
                let mut listed = read_loadorder(path, report);
                let (triggered, disabled) =
                    analyzer.scan_limit(&segments.plugins, &game_version, &crashgen_version);
                if listed.is_empty() {
                    tracing::debug!("load order empty, using plugins from the log");
                    listed = analyzer
                        .scan_log(&segments.plugins, &game_version, &crashgen_version)
                        .plugins;
                }
                (listed, triggered, disabled)
            }
            None => {
                let scanned = analyzer.scan_log(&segments.plugins, &game_version, &crashgen_version);
                (scanned.plugins, scanned.limit_triggered, scanned.limit_check_disabled)
            }
        };
        analyzer.filter_ignored(&mut plugins);

        let outcome = if segments.plugins.is_empty() && loadorder.is_none() {
            report.push(format!(
                "# ❌ CAUTION : THIS LOG HAS NO PLUGIN LIST, {} COULD NOT RECORD THE LOADED PLUGINS # \n-----\n",
                game.crashgen_name.to_uppercase()
            ));
            ScanOutcome::Incomplete
        } else {
            ScanOutcome::Scanned
        };

        limit_messages(limit_triggered, limit_check_disabled, &game.crashgen_name, report);
        analyzer.attribute(&segments.callstack, &plugins, report);

        report.extend([
            "====================================================\n",
            "CHECKING FOR FORM ID SUSPECTS IN THE CALL STACK...\n",
            "====================================================\n",
        ]);
        let formids = extract_formids(&segments.callstack);
        FormIdAnalyzer::new(
            &game.crashgen_name,
            self.options.show_formid_values,
            self.formid_db.as_deref(),
        )
        .report(&formids, &plugins, report);

        outcome
    }

    fn records_section(&self, parsed: &ParsedLog, report: &mut Report) {
        report.extend([
            "====================================================\n",
            "CHECKING FOR NAMED RECORDS IN THE CALL STACK...\n",
            "====================================================\n",
        ]);
        RecordScanner::new(&self.rules).report(&parsed.segments.callstack, report);
    }

    fn settings_section(&self, parsed: &ParsedLog, report: &mut Report) {
        let crashgen_name = &self.rules.game.crashgen_name;
        report.extend([
            "====================================================\n".to_string(),
            format!("CHECKING {} SETTINGS AND GAME FILES...\n", crashgen_name.to_uppercase()),
            "====================================================\n".to_string(),
        ]);

        self.fcx_messages(report);

        let settings = CrashgenSettings::parse(&parsed.segments.compatibility);
        let modules: HashSet<String> = extract_module_names(&parsed.segments.xse_modules)
            .into_iter()
            .collect();
        SettingsValidator::new(crashgen_name, &self.rules.crashgen_ignore)
            .validate(&settings, &modules, report);
    }

    fn fcx_messages(&self, report: &mut Report) {
        if self.options.fcx_mode {
            report.extend([
                "* NOTICE: FCX MODE IS ENABLED. CRASHSCAN CHECKS YOUR GAME FILES ONCE PER RUN. * \n",
                "[ Disable FCX mode if you only want to check the crash log itself. ]\n\n",
            ]);
            let results = self.session_cache.get_or_compute(self.integrity.as_ref());
            report.push(results.main_files);
            report.push(results.game_files);
        } else {
            report.extend([
                "❌ FCX Mode is disabled, skipping game files check... \n-----\n",
                "* NOTICE: FCX MODE IS DISABLED. YOU CAN ENABLE IT TO DETECT PROBLEMS IN YOUR GAME FILES. * \n",
                "[ Pass --fcx-mode or set fcx_mode = true in the [scan] config section. ]\n\n",
            ]);
        }
    }
}

fn footer(report: &mut Report) {
    report.extend([
        "====================================================\n".to_string(),
        format!("END OF AUTOSCAN | crashscan v{}\n", env!("CARGO_PKG_VERSION")),
    ]);
}

impl LogProcessor for ScanOrchestrator {
    fn begin_batch(&self) {
        self.log_cache.clear();
        self.session_cache.reset();
    }

    fn process_file(&self, path: &Path) -> FileScanResult {
        tracing::debug!("scanning {}", path.display());
        match self.scan(path) {
            Ok((report, outcome)) => {
                FileScanResult::new(path.to_path_buf(), report.into_lines(), outcome)
            }
            Err(e) => {
                tracing::warn!("failed to scan {}: {:#}", path.display(), e);
                FileScanResult::failure(path.to_path_buf(), &format!("{:#}", e))
            }
        }
    }
}
