mod common;
use common::*;

use std::path::Path;
use std::sync::Arc;

use crashscan::formid_db::CsvFormIdDatabase;
use crashscan::{LogProcessor, OrchestratorOptions, RuleDatabase, ScanOrchestrator, ScanOutcome};

fn orchestrator(options: OrchestratorOptions) -> ScanOrchestrator {
    ScanOrchestrator::new(Arc::new(RuleDatabase::builtin().unwrap()), options)
}

fn scan(log: &Path) -> (String, ScanOutcome) {
    let result = orchestrator(OrchestratorOptions::default()).process_file(log);
    (result.report.concat(), result.outcome)
}

#[test]
fn test_plain_signal_reported_once_with_severity() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .stack("[0] 0x7FF6 f4ee.dll+0x1234")
        .stack("[1] 0x7FF6 f4ee.dll+0x5678")
        .stack("[2] 0x7FF6 f4ee.dll+0x9ABC")
        .write(dir.path(), "crash-looks.log");

    let (report, outcome) = scan(&log);

    assert_eq!(outcome, ScanOutcome::Scanned);
    assert_eq!(report.matches("Looks Menu Crash").count(), 1);
    assert!(report.contains("# Checking for Looks Menu Crash.............. SUSPECT FOUND! > Severity : 3 # \n-----\n"));
}

#[test]
fn test_not_signal_vetoes_rule() {
    let dir = tempfile::tempdir().unwrap();
    // Player Character Crash needs 3x PlayerCharacter and no hkbBehaviorGraph.
    let log = CrashLog::new()
        .stack("PlayerCharacter")
        .stack("PlayerCharacter")
        .stack("PlayerCharacter")
        .stack("hkbBehaviorGraph")
        .write(dir.path(), "crash-not.log");

    let (report, _) = scan(&log);
    assert!(!report.contains("Player Character Crash"));
}

#[test]
fn test_min_count_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let below = CrashLog::new()
        .stack("PlayerCharacter")
        .stack("PlayerCharacter")
        .write(dir.path(), "crash-two.log");
    let exact = CrashLog::new()
        .stack("PlayerCharacter")
        .stack("PlayerCharacter")
        .stack("PlayerCharacter")
        .write(dir.path(), "crash-three.log");

    assert!(!scan(&below).0.contains("Player Character Crash"));
    assert!(scan(&exact).0.contains("Player Character Crash"));
}

#[test]
fn test_plugin_attribution_from_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .plugin("[05]     SomeMod.esp")
        .stack("[3] 0x7FF6 Script attached to somemod quest")
        .stack("[4] 0x7FF6 File: \"SomeMod.esp\"")
        .write(dir.path(), "crash-plugin.log");

    let (report, _) = scan(&log);
    assert!(report.contains("- somemod.esp | 1\n"), "{}", report);
}

#[test]
fn test_plugin_ranking_breaks_ties_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .plugin("[05]     Zeta.esp")
        .plugin("[06]     Alpha.esp")
        .plugin("[FE:001] Beta.esl")
        .stack("Zeta.esp")
        .stack("Alpha.esp")
        .stack("Beta.esl Beta.esl")
        .stack("Beta.esl")
        .write(dir.path(), "crash-rank.log");

    let (report, _) = scan(&log);
    let beta = report.find("- beta.esl | 2").unwrap();
    let alpha = report.find("- alpha.esp | 1").unwrap();
    let zeta = report.find("- zeta.esp | 1").unwrap();
    assert!(beta < alpha && alpha < zeta);
}

#[test]
fn test_loadorder_file_takes_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let loadorder = dir.path().join("loadorder.txt");
    std::fs::write(&loadorder, "# This file was automatically generated\nListed.esp\n\nListed.esp\n").unwrap();
    let log = CrashLog::new()
        .plugin("[05]     InLog.esp")
        .stack("Listed.esp")
        .stack("InLog.esp")
        .write(dir.path(), "crash-lo.log");

    let options = OrchestratorOptions {
        loadorder: Some(loadorder),
        ..Default::default()
    };
    let result = orchestrator(options).process_file(&log);
    let report = result.report.concat();

    assert!(report.contains("LOADORDER.TXT FILE FOUND"));
    assert!(report.contains("- listed.esp | 1"));
    assert!(!report.contains("- inlog.esp"));
    assert_eq!(result.outcome, ScanOutcome::Scanned);
}

#[test]
fn test_missing_plugin_list_is_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .without_plugins()
        .stack("nothing interesting")
        .write(dir.path(), "crash-incomplete.log");

    let result = orchestrator(OrchestratorOptions::default()).process_file(&log);
    assert_eq!(result.outcome, ScanOutcome::Incomplete);
    assert!(result.failed);
    assert_eq!(result.stats.incomplete, 1);
}

#[test]
fn test_formids_skip_plugin_limit_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .plugin("[05]     SomeMod.esp")
        .stack("Form ID: 0x05001234")
        .stack("Form ID: 0x05001234")
        .stack("Form ID: 0xFF000ABC")
        .write(dir.path(), "crash-formid.log");

    let (report, _) = scan(&log);
    assert!(report.contains("- Form ID: 05001234 | [SomeMod.esp] | 2\n"), "{}", report);
    assert!(!report.contains("FF000ABC"));
}

#[test]
fn test_formid_descriptions_from_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("formids.csv");
    std::fs::write(&db_path, "plugin,formid,entry\nSomeMod.esp,001234,Rusty Sword\n").unwrap();
    let log = CrashLog::new()
        .plugin("[05]     SomeMod.esp")
        .stack("Form ID: 0x05001234")
        .write(dir.path(), "crash-fid-db.log");

    let options = OrchestratorOptions {
        show_formid_values: true,
        ..Default::default()
    };
    let db = CsvFormIdDatabase::load(&db_path).unwrap();
    let report = orchestrator(options)
        .with_formid_db(Arc::new(db))
        .process_file(&log)
        .report
        .concat();

    assert!(report.contains("- Form ID: 05001234 | [SomeMod.esp] | Rusty Sword | 1\n"));
}

#[test]
fn test_named_records_use_register_offset() {
    let dir = tempfile::tempdir().unwrap();
    let register_line = format!("{:<30}{}", "[RSP+50 ] 0x1D4F1E5C3A0", "(char*) \"textures/armor.dds\"");
    let log = CrashLog::new()
        .stack(&register_line)
        .stack("File: \"textures/armor.dds\"")
        .write(dir.path(), "crash-records.log");

    let (report, _) = scan(&log);
    assert!(report.contains("- (char*) \"textures/armor.dds\" | 1\n"), "{}", report);
    assert!(report.contains("- File: \"textures/armor.dds\" | 1\n"), "{}", report);
}

#[test]
fn test_settings_conflicts_reported() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .xse_module("x-cell-fo4.dll v2.0")
        .setting("HavokMemorySystem: true")
        .write(dir.path(), "crash-settings.log");

    let (report, _) = scan(&log);
    assert!(report.contains("X-Cell is installed, but MemoryManager parameter is set to TRUE"));
    assert!(report.contains("X-Cell is installed, but HavokMemorySystem parameter is set to TRUE"));
    assert!(report.contains("ArchiveLimit parameter is correctly configured"));
}

#[test]
fn test_plugin_limit_marker() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .plugin("[FF]     Overflow.esp")
        .write(dir.path(), "crash-limit.log");
    let (report, _) = scan(&log);
    assert!(report.contains("REACHED THE PLUGIN LIMIT"));

    let newer = CrashLog::new()
        .game_version("1.10.984")
        .crashgen_version("1.31.1")
        .plugin("[FF]     Overflow.esp")
        .write(dir.path(), "crash-limit-new.log");
    let (report, _) = scan(&newer);
    assert!(!report.contains("REACHED THE PLUGIN LIMIT"));
    assert!(report.contains("cannot detect the plugin limit"));
}

#[test]
fn test_report_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .plugin("[05]     SomeMod.esp")
        .stack("SomeMod.esp")
        .stack("TESForm")
        .write(dir.path(), "crash-idem.log");

    let first = orchestrator(OrchestratorOptions::default()).process_file(&log);
    let second = orchestrator(OrchestratorOptions::default()).process_file(&log);
    assert_eq!(first.report.concat().as_bytes(), second.report.concat().as_bytes());
}

#[test]
fn test_scan_file_uses_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .plugin("[05]     SomeMod.esp")
        .stack("SomeMod.esp")
        .write(dir.path(), "crash-config.log");

    let mut config = crashscan::ScanConfig::default();
    config.scan.fcx_mode = true;
    let result = crashscan::scan_file(&config, &log).unwrap();

    assert_eq!(result.outcome, ScanOutcome::Scanned);
    let report = result.report.concat();
    assert!(report.contains("FCX MODE IS ENABLED"));
    assert!(report.contains("No game folder is configured"));
    assert!(!dir.path().join("crash-config-AUTOSCAN.md").exists());
}

#[test]
fn test_rival_vendor_module_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let log = CrashLog::new()
        .xse_module("amdfsr2.dll v1.0.2")
        .write(dir.path(), "crash-gpu.log");

    let (report, _) = scan(&log);
    assert!(report.contains("Primary GPU: Nvidia GeForce RTX 3070 (Nvidia)\n"));
    assert!(report.contains("# ❌ CAUTION : amdfsr2.dll looks like a mod for amd GPUs, but your primary GPU is Nvidia # \n-----\n"));
    assert!(!report.contains("buffout4.dll looks like"));
}
