// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

/// Run the crashscan binary in `dir` with the given arguments.
pub fn run_crashscan_in(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_crashscan"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute crashscan");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Builder for synthetic Buffout 4 crash logs.
#[derive(Debug, Clone)]
pub struct CrashLog {
    game_version: String,
    crashgen_version: String,
    main_error: String,
    settings: Vec<String>,
    system: Vec<String>,
    callstack: Vec<String>,
    modules: Vec<String>,
    xse_modules: Vec<String>,
    plugins: Option<Vec<String>>,
}

impl Default for CrashLog {
    fn default() -> Self {
        Self {
            game_version: "1.10.163".to_string(),
            crashgen_version: "1.37.0".to_string(),
            main_error: "\"EXCEPTION_PRIV_INSTRUCTION\" at 0x7FF6A1B2C3D4 Fallout4.exe+2A1B2C3".to_string(),
            settings: vec![
                "Achievements: true".to_string(),
                "MemoryManager: true".to_string(),
                "ArchiveLimit: false".to_string(),
            ],
            system: vec!["GPU #1: Nvidia GeForce RTX 3070".to_string()],
            callstack: Vec::new(),
            modules: vec!["Fallout4.exe".to_string()],
            xse_modules: vec!["buffout4.dll v1.37.0".to_string()],
            plugins: Some(vec!["[00]     Fallout4.esm".to_string()]),
        }
    }
}

impl CrashLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_error(mut self, error: &str) -> Self {
        self.main_error = error.to_string();
        self
    }

    pub fn game_version(mut self, version: &str) -> Self {
        self.game_version = version.to_string();
        self
    }

    pub fn crashgen_version(mut self, version: &str) -> Self {
        self.crashgen_version = version.to_string();
        self
    }

    pub fn setting(mut self, line: &str) -> Self {
        self.settings.push(line.to_string());
        self
    }

    pub fn stack(mut self, line: &str) -> Self {
        self.callstack.push(line.to_string());
        self
    }

    pub fn xse_module(mut self, line: &str) -> Self {
        self.xse_modules.push(line.to_string());
        self
    }

    pub fn plugin(mut self, line: &str) -> Self {
        self.plugins.get_or_insert_with(Vec::new).push(line.to_string());
        self
    }

    /// Drop the PLUGINS section entirely.
    pub fn without_plugins(mut self) -> Self {
        self.plugins = None;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Fallout 4 v{}\n", self.game_version));
        out.push_str(&format!("Buffout 4 v{}\n\n", self.crashgen_version));
        out.push_str(&format!("Unhandled exception {}\n\n", self.main_error));

        out.push_str("\t[Compatibility]\n");
        for line in &self.settings {
            out.push_str(&format!("\t\t{}\n", line));
        }
        push_section(&mut out, "SYSTEM SPECS:", &self.system);
        push_section(&mut out, "PROBABLE CALL STACK:", &self.callstack);
        push_section(&mut out, "MODULES:", &self.modules);
        push_section(&mut out, "F4SE PLUGINS:", &self.xse_modules);
        if let Some(plugins) = &self.plugins {
            push_section(&mut out, "PLUGINS:", plugins);
        }
        out
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.render()).expect("Failed to write crash log");
        path
    }
}

fn push_section(out: &mut String, header: &str, lines: &[String]) {
    out.push_str(header);
    out.push('\n');
    for line in lines {
        out.push('\t');
        out.push_str(line);
        out.push('\n');
    }
}

/// Read the report written next to `log`.
pub fn read_report(log: &Path) -> String {
    let stem = log.file_stem().unwrap().to_string_lossy();
    let path = log.with_file_name(format!("{}-AUTOSCAN.md", stem));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing report {}: {}", path.display(), e))
}
