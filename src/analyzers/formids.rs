//! FormID extraction and plugin cross-reference.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::plugins::PluginMap;
use crate::formid_db::FormIdLookup;
use crate::report::Report;

static FORMID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*Form ID:\s*0x([0-9A-F]{8})").expect("failed to compile FormID regex")
});

/// Load-order id reserved for the plugin limit sentinel.
const LIMIT_PREFIX: &str = "FF";
const FORMID_LABEL: &str = "Form ID: ";

/// `Form ID: XXXXXXXX` for every non-sentinel FormID line, uppercased.
pub fn extract_formids(callstack: &[String]) -> Vec<String> {
    callstack
        .iter()
        .filter_map(|line| FORMID_RE.captures(line))
        .map(|caps| caps[1].to_uppercase())
        .filter(|id| !id.starts_with(LIMIT_PREFIX))
        .map(|id| format!("{}{}", FORMID_LABEL, id))
        .collect()
}

pub struct FormIdAnalyzer<'a> {
    crashgen_name: &'a str,
    show_values: bool,
    database: Option<&'a dyn FormIdLookup>,
}

impl<'a> FormIdAnalyzer<'a> {
    pub fn new(
        crashgen_name: &'a str,
        show_values: bool,
        database: Option<&'a dyn FormIdLookup>,
    ) -> Self {
        Self {
            crashgen_name,
            show_values,
            database,
        }
    }

    fn lookup(&self, suffix: &str, plugin: &str) -> Option<String> {
        if !self.show_values {
            return None;
        }
        self.database?.lookup(suffix, plugin)
    }

    /// Append one line per FormID group whose load-order id matches a plugin.
    /// Groups without a matching plugin are left out.
    pub fn report(&self, formids: &[String], plugins: &PluginMap, report: &mut Report) {
        if formids.is_empty() {
            report.push("* COULDN'T FIND ANY FORM ID SUSPECTS *\n\n");
            return;
        }

        let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
        for formid in formids {
            *groups.entry(formid.as_str()).or_insert(0) += 1;
        }

        for (formid_full, count) in groups {
            let Some(hex) = formid_full.strip_prefix(FORMID_LABEL) else {
                continue;
            };
            if hex.len() < 2 {
                continue;
            }
            let (load_id, suffix) = hex.split_at(2);

            let Some(plugin) = plugins
                .iter()
                .find(|(_, status)| status.as_str() == load_id)
                .map(|(name, _)| name)
            else {
                continue;
            };

            match self.lookup(suffix, plugin) {
                Some(description) => report.push(format!(
                    "- {} | [{}] | {} | {}\n",
                    formid_full, plugin, description, count
                )),
                None => report.push(format!("- {} | [{}] | {}\n", formid_full, plugin, count)),
            }
        }

        report.extend([
            "\n[Last number counts how many times each Form ID shows up in the crash log.]\n".to_string(),
            format!(
                "These Form IDs were caught by {} and some of them might be related to this crash.\n",
                self.crashgen_name
            ),
            "You can try searching any listed Form IDs in xEdit and see if they lead to relevant records.\n\n".to_string(),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct FixedLookup;

    impl FormIdLookup for FixedLookup {
        fn lookup(&self, suffix: &str, plugin: &str) -> Option<String> {
            (suffix == "00ABCD" && plugin == "SomeMod.esp").then(|| "Rusty Pipe".to_string())
        }
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn plugins() -> PluginMap {
        let mut map = PluginMap::new();
        map.insert("Fallout4.esm".into(), "00".into());
        map.insert("SomeMod.esp".into(), "05".into());
        map
    }

    #[test]
    fn extracts_and_uppercases() {
        let found = extract_formids(&lines(&[
            "Form ID: 0x0500abcd",
            "   form id:   0x00000014",
            "Form ID: 0xFF001234",
            "Name: Form ID: 0x05000001",
        ]));
        assert_eq!(found, vec!["Form ID: 0500ABCD", "Form ID: 00000014"]);
    }

    #[test]
    fn reports_sorted_groups_with_plugin() {
        let analyzer = FormIdAnalyzer::new("Buffout 4", false, None);
        let formids = lines(&["Form ID: 0500ABCD", "Form ID: 00000014", "Form ID: 0500ABCD"]);
        let mut report = Report::new();
        analyzer.report(&formids, &plugins(), &mut report);
        assert_eq!(report.lines()[0], "- Form ID: 00000014 | [Fallout4.esm] | 1\n");
        assert_eq!(report.lines()[1], "- Form ID: 0500ABCD | [SomeMod.esp] | 2\n");
    }

    #[test]
    fn unmatched_groups_are_dropped() {
        let analyzer = FormIdAnalyzer::new("Buffout 4", false, None);
        let mut report = Report::new();
        analyzer.report(&lines(&["Form ID: 2A000001"]), &plugins(), &mut report);
        assert!(!report.contains("2A000001"));
        assert!(report.contains("Last number counts"));
    }

    #[test]
    fn description_needs_flag_and_database() {
        let db = FixedLookup;
        let formids = lines(&["Form ID: 0500ABCD"]);

        let mut report = Report::new();
        FormIdAnalyzer::new("Buffout 4", true, Some(&db)).report(&formids, &plugins(), &mut report);
        assert_eq!(report.lines()[0], "- Form ID: 0500ABCD | [SomeMod.esp] | Rusty Pipe | 1\n");

        let mut report = Report::new();
        FormIdAnalyzer::new("Buffout 4", false, Some(&db)).report(&formids, &plugins(), &mut report);
        assert_eq!(report.lines()[0], "- Form ID: 0500ABCD | [SomeMod.esp] | 1\n");

        let mut report = Report::new();
        FormIdAnalyzer::new("Buffout 4", true, None).report(&formids, &plugins(), &mut report);
        assert_eq!(report.lines()[0], "- Form ID: 0500ABCD | [SomeMod.esp] | 1\n");
    }

    #[test]
    fn empty_input_reports_none() {
        let mut report = Report::new();
        FormIdAnalyzer::new("Buffout 4", false, None).report(&[], &plugins(), &mut report);
        assert_eq!(report.render(), "* COULDN'T FIND ANY FORM ID SUSPECTS *\n\n");
    }

    proptest! {
        #[test]
        fn sentinel_prefix_never_kept(hex in "[0-9A-Fa-f]{8}") {
            let found = extract_formids(&[format!("Form ID: 0x{}", hex)]);
            let upper = hex.to_uppercase();
            if upper.starts_with("FF") {
                prop_assert!(found.is_empty());
            } else {
                prop_assert_eq!(found, vec![format!("Form ID: {}", upper)]);
            }
        }
    }
}
