//! Named records (meshes, textures, scripts, record names) mentioned in the call stack.

use std::collections::BTreeMap;

use crate::report::Report;
use crate::rules::RuleDatabase;

/// Register-relative frames carry the record text after this column.
const RSP_MARKER: &str = "[RSP+";
const RSP_OFFSET: usize = 30;

pub struct RecordScanner<'a> {
    crashgen_name: &'a str,
    records: &'a [String],
    ignore: &'a [String],
}

impl<'a> RecordScanner<'a> {
    pub fn new(rules: &'a RuleDatabase) -> Self {
        Self {
            crashgen_name: &rules.game.crashgen_name,
            records: &rules.records,
            ignore: &rules.ignore_records,
        }
    }

    fn is_named_record(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.records.iter().any(|r| lower.contains(r.as_str()))
            && !self.ignore.iter().any(|r| lower.contains(r.as_str()))
    }

    /// Captured record text for every matching call stack line.
    pub fn extract(&self, callstack: &[String]) -> Vec<String> {
        callstack
            .iter()
            .filter(|line| self.is_named_record(line))
            .map(|line| capture(line))
            .collect()
    }

    pub fn report(&self, callstack: &[String], report: &mut Report) -> bool {
        let matches = self.extract(callstack);
        if matches.is_empty() {
            report.push("* COULDN'T FIND ANY NAMED RECORDS *\n\n");
            return false;
        }

        let mut groups: BTreeMap<String, usize> = BTreeMap::new();
        for record in matches {
            *groups.entry(record).or_insert(0) += 1;
        }
        for (record, count) in groups {
            report.push(format!("- {} | {}\n", record, count));
        }

        report.extend([
            "\n[Last number counts how many times each Named Record shows up in the crash log.]\n".to_string(),
            format!(
                "These records were caught by {} and some of them might be related to this crash.\n",
                self.crashgen_name
            ),
            "Named records should give extra info on involved game objects, record types or mod files.\n\n".to_string(),
        ]);
        true
    }
}

fn capture(line: &str) -> String {
    if line.contains(RSP_MARKER) {
        line.chars()
            .skip(RSP_OFFSET)
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        line.trim().to_string()
    }
}
