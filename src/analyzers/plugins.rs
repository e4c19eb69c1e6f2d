//! Plugin list sourcing, ignore filtering and call stack attribution.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::report::Report;
use crate::rules::{GameInfo, RuleDatabase};
use crate::version::Version;

/// Status of every plugin sourced from a load-order file.
pub const LOADORDER_ORIGIN: &str = "LO";
pub const STATUS_DLL: &str = "DLL";
pub const STATUS_UNKNOWN: &str = "???";
/// Load-order id printed on the line that hits the plugin limit.
pub const PLUGIN_LIMIT_MARKER: &str = "[FF]";

const CALLSTACK_SKIP_MARKER: &str = "modified by:";

static PLUGIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:\[(FE:[0-9A-F]{3}|[0-9A-F]{2})\]\s*)?(.+?(?:\.es[pml])+)")
        .expect("failed to compile plugin regex")
});

/// Plugin name -> status tag, in first-seen order.
pub type PluginMap = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPlugins {
    pub plugins: PluginMap,
    pub limit_triggered: bool,
    pub limit_check_disabled: bool,
}

/// Parse a load-order listing: header line skipped, blanks dropped, first
/// occurrence wins.
pub fn parse_loadorder(content: &str) -> PluginMap {
    let mut plugins = PluginMap::new();
    for entry in content.lines().skip(1) {
        let entry = entry.trim();
        if !entry.is_empty() && !plugins.contains_key(entry) {
            plugins.insert(entry.to_string(), LOADORDER_ORIGIN.to_string());
        }
    }
    plugins
}

/// Read a load-order file, announcing it in the report.
///
/// Read errors are appended to the report and yield an empty map so the
/// caller falls back to the in-log plugin list.
pub fn read_loadorder(path: &Path, report: &mut Report) -> PluginMap {
    report.extend([
        "* ✔️ LOADORDER.TXT FILE FOUND! *\n",
        "Plugins listed in crash logs are ignored, only plugins in this file are detected.\n",
        "[ To disable this functionality, remove the load order file from your configuration. ]\n\n",
    ]);

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("load order read failed for {}: {}", path.display(), e);
            report.push(format!("Error reading loadorder.txt: {}\n", e));
            return PluginMap::new();
        }
    };
    parse_loadorder(&String::from_utf8_lossy(&bytes))
}

/// Classify one plugins-segment line. Returns `None` for lines that are not
/// plugin entries.
pub fn parse_plugin_line(line: &str) -> Option<(String, String)> {
    let caps = PLUGIN_RE.captures(line)?;
    let name = caps.get(2)?.as_str().to_string();
    if name.is_empty() {
        return None;
    }
    let status = match caps.get(1) {
        Some(id) => id.as_str().replace(':', ""),
        None if name.to_lowercase().contains("dll") => STATUS_DLL.to_string(),
        None => STATUS_UNKNOWN.to_string(),
    };
    Some((name, status))
}

pub struct PluginAnalyzer<'a> {
    game: &'a GameInfo,
    crashgen_name: &'a str,
    game_ignore: &'a HashSet<String>,
    ignore: &'a HashSet<String>,
}

impl<'a> PluginAnalyzer<'a> {
    pub fn new(rules: &'a RuleDatabase) -> Self {
        Self {
            game: &rules.game,
            crashgen_name: &rules.game.crashgen_name,
            game_ignore: &rules.game_ignore_plugins,
            ignore: &rules.ignore_plugins,
        }
    }

    /// Parse the in-log plugins segment, tracking the plugin limit marker.
    pub fn scan_log(
        &self,
        segment: &[String],
        game_version: &Version,
        crashgen_version: &Version,
    ) -> LogPlugins {
        let mut result = LogPlugins::default();
        let (original_game, new_game_old_crashgen) =
            self.limit_conditions(game_version, crashgen_version);

        for entry in segment {
            if entry.contains(PLUGIN_LIMIT_MARKER) {
                if original_game {
                    result.limit_triggered = true;
                } else if new_game_old_crashgen {
                    result.limit_check_disabled = true;
                }
            }

            if let Some((name, status)) = parse_plugin_line(entry) {
                result.plugins.entry(name).or_insert(status);
            }
        }

        result
    }

    /// Limit markers only, for when plugins come from a load-order file.
    pub fn scan_limit(
        &self,
        segment: &[String],
        game_version: &Version,
        crashgen_version: &Version,
    ) -> (bool, bool) {
        let scanned = self.scan_log(segment, game_version, crashgen_version);
        (scanned.limit_triggered, scanned.limit_check_disabled)
    }

    fn limit_conditions(&self, game_version: &Version, crashgen_version: &Version) -> (bool, bool) {
        if game_version.is_null() {
            return (false, false);
        }
        let original_game = [&self.game.version, &self.game.version_vr]
            .iter()
            .any(|v| !v.is_null() && *v == game_version);
        let new_game_old_crashgen = *game_version >= self.game.version_new
            && *crashgen_version < self.game.crashgen_limit_threshold;
        (original_game, new_game_old_crashgen)
    }

    /// Drop plugins named in the ignore list, compared case-insensitively.
    pub fn filter_ignored(&self, plugins: &mut PluginMap) {
        if self.ignore.is_empty() {
            return;
        }
        plugins.retain(|name, _| !self.ignore.contains(&name.to_lowercase()));
    }

    /// Count call stack lines mentioning each plugin and append the ranking.
    /// Returns whether any plugin was found.
    pub fn attribute(&self, callstack: &[String], plugins: &PluginMap, report: &mut Report) -> bool {
        let counts = self.count_matches(callstack, plugins);

        if counts.is_empty() {
            report.push("* COULDN'T FIND ANY PLUGIN SUSPECTS *\n\n");
            return false;
        }

        report.push("The following PLUGINS were found in the CRASH STACK:\n");
        for (plugin, count) in counts {
            report.push(format!("- {} | {}\n", plugin, count));
        }
        report.extend([
            "\n[Last number counts how many times each Plugin Suspect shows up in the crash log.]\n".to_string(),
            format!(
                "These Plugins were caught by {} and some of them might be responsible for this crash.\n",
                self.crashgen_name
            ),
            "You can try disabling these plugins and check if the game still crashes, though this method can be unreliable.\n\n".to_string(),
        ]);
        true
    }

    /// Hit counts sorted by descending count, then ascending name.
    pub fn count_matches(&self, callstack: &[String], plugins: &PluginMap) -> Vec<(String, usize)> {
        let candidates: BTreeSet<String> = plugins
            .keys()
            .map(|p| p.to_lowercase())
            .filter(|p| !self.game_ignore.contains(p))
            .collect();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for line in callstack {
            let line = line.to_lowercase();
            if line.contains(CALLSTACK_SKIP_MARKER) {
                continue;
            }
            for plugin in &candidates {
                if line.contains(plugin.as_str()) {
                    *counts.entry(plugin.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        // BTreeMap order already gives ascending names; the sort is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Plugin limit warnings for the report.
pub fn limit_messages(limit_triggered: bool, limit_check_disabled: bool, crashgen_name: &str, report: &mut Report) {
    if limit_triggered {
        report.extend([
            "# 💀 CRITICAL : THE '[FF]' PLUGIN PREFIX MEANS YOU REACHED THE PLUGIN LIMIT OF 254 PLUGINS # \n".to_string(),
            "-----\n".to_string(),
        ]);
    }
    if limit_check_disabled {
        report.push(format!(
            "* NOTICE : Your {} version cannot detect the plugin limit for this game version, update it to check the plugin limit. * \n-----\n",
            crashgen_name
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> RuleDatabase {
        RuleDatabase::builtin().unwrap()
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn loadorder_skips_header_and_duplicates() {
        let plugins = parse_loadorder("# header\nA.esp\n\nB.esm\nA.esp\n");
        let names: Vec<&str> = plugins.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A.esp", "B.esm"]);
        assert!(plugins.values().all(|s| s == LOADORDER_ORIGIN));
    }

    #[test]
    fn missing_loadorder_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new();
        let plugins = read_loadorder(&dir.path().join("loadorder.txt"), &mut report);
        assert!(plugins.is_empty());
        assert!(report.contains("Error reading loadorder.txt"));
    }

    #[test]
    fn classifies_plugin_lines() {
        assert_eq!(
            parse_plugin_line("[05] SomeMod.esp"),
            Some(("SomeMod.esp".into(), "05".into()))
        );
        assert_eq!(
            parse_plugin_line("  [FE:01A]   Light Mod.esl"),
            Some(("Light Mod.esl".into(), "FE01A".into()))
        );
        assert_eq!(
            parse_plugin_line("dllhelper.esp"),
            Some(("dllhelper.esp".into(), STATUS_DLL.into()))
        );
        assert_eq!(
            parse_plugin_line("Loose.esm"),
            Some(("Loose.esm".into(), STATUS_UNKNOWN.into()))
        );
        assert_eq!(parse_plugin_line("Light Plugins: 12"), None);
    }

    #[test]
    fn first_occurrence_wins() {
        let db = db();
        let analyzer = PluginAnalyzer::new(&db);
        let segment = lines(&["[01] A.esp", "[02] A.esp", "[03] B.esp"]);
        let v = Version::parse("1.10.163").unwrap();
        let parsed = analyzer.scan_log(&segment, &v, &v);
        assert_eq!(parsed.plugins.get("A.esp").map(String::as_str), Some("01"));
        assert_eq!(parsed.plugins.len(), 2);
    }

    #[test]
    fn limit_marker_depends_on_versions() {
        let db = db();
        let analyzer = PluginAnalyzer::new(&db);
        let segment = lines(&["[FF] Last.esp"]);

        let original = Version::parse("1.10.163").unwrap();
        let parsed = analyzer.scan_log(&segment, &original, &Version::parse("1.26.2").unwrap());
        assert!(parsed.limit_triggered);
        assert!(!parsed.limit_check_disabled);

        let new_game = Version::parse("1.10.984").unwrap();
        let parsed = analyzer.scan_log(&segment, &new_game, &Version::parse("1.30.0").unwrap());
        assert!(!parsed.limit_triggered);
        assert!(parsed.limit_check_disabled);

        let parsed = analyzer.scan_log(&segment, &new_game, &Version::parse("1.37.0").unwrap());
        assert!(!parsed.limit_triggered && !parsed.limit_check_disabled);

        let parsed = analyzer.scan_log(&segment, &Version::null(), &Version::null());
        assert!(!parsed.limit_triggered && !parsed.limit_check_disabled);
    }

    #[test]
    fn ignore_list_removes_plugins() {
        let mut db = db();
        db.ignore_plugins.insert("skip.esp".into());
        let analyzer = PluginAnalyzer::new(&db);
        let mut plugins = PluginMap::new();
        plugins.insert("Skip.ESP".into(), "01".into());
        plugins.insert("Keep.esp".into(), "02".into());
        analyzer.filter_ignored(&mut plugins);
        assert_eq!(plugins.len(), 1);
        assert!(plugins.contains_key("Keep.esp"));
    }

    #[test]
    fn attribution_ranks_by_count_then_name() {
        let db = db();
        let analyzer = PluginAnalyzer::new(&db);
        let mut plugins = PluginMap::new();
        for name in ["Zeta.esp", "Alpha.esp", "Beta.esp", "Fallout4.esm"] {
            plugins.insert(name.into(), "01".into());
        }
        let callstack = lines(&[
            "zeta.esp frame",
            "beta.esp frame",
            "alpha.esp frame",
            "ZETA.ESP again",
            "fallout4.esm frame",
            "Modified by: Alpha.esp",
        ]);
        let ranked = analyzer.count_matches(&callstack, &plugins);
        assert_eq!(
            ranked,
            vec![
                ("zeta.esp".to_string(), 2),
                ("alpha.esp".to_string(), 1),
                ("beta.esp".to_string(), 1),
            ]
        );
    }

    #[test]
    fn attribution_without_hits_reports_none() {
        let db = db();
        let analyzer = PluginAnalyzer::new(&db);
        let mut report = Report::new();
        assert!(!analyzer.attribute(&lines(&["nothing"]), &PluginMap::new(), &mut report));
        assert_eq!(report.render(), "* COULDN'T FIND ANY PLUGIN SUSPECTS *\n\n");
    }
}
