//! Suspect rule engine.
//!
//! Every rule is evaluated independently against the main error and the
//! concatenated call stack. Matches are reported in rule database order.

use crate::rules::{ErrorSuspect, RuleDatabase, Signal, SuspectRule};

/// Allocator library whose DLL name in the main error is not a mod problem.
const ALLOCATOR_DLL: &str = "tbbmalloc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspectMatch {
    pub severity: String,
    pub name: String,
}

/// Matches plus their formatted report lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuspectFindings {
    pub matches: Vec<SuspectMatch>,
    pub lines: Vec<String>,
}

impl SuspectFindings {
    pub fn found(&self) -> bool {
        !self.matches.is_empty()
    }

    fn record(&mut self, severity: &str, name: &str, width: usize) {
        self.lines.push(format_suspect(name, severity, width));
        self.matches.push(SuspectMatch {
            severity: severity.to_string(),
            name: name.to_string(),
        });
    }
}

#[derive(Debug, Default)]
struct MatchState {
    requires_main_error: bool,
    main_error_required_found: bool,
    main_error_optional_found: bool,
    stack_found: bool,
}

impl MatchState {
    fn verdict(&self) -> bool {
        if self.requires_main_error {
            self.main_error_required_found
        } else {
            self.main_error_optional_found || self.stack_found
        }
    }
}

/// Evaluate one stack rule. `NOT` signals short-circuit to a non-match.
pub fn rule_matches(rule: &SuspectRule, main_error: &str, callstack: &str) -> bool {
    let mut state = MatchState::default();

    for signal in &rule.signals {
        match signal {
            Signal::Plain(text) => {
                if callstack.contains(text.as_str()) {
                    state.stack_found = true;
                }
            }
            Signal::MainErrorRequired(text) => {
                state.requires_main_error = true;
                if main_error.contains(text.as_str()) {
                    state.main_error_required_found = true;
                }
            }
            Signal::MainErrorOptional(text) => {
                if main_error.contains(text.as_str()) {
                    state.main_error_optional_found = true;
                }
            }
            Signal::CallstackExclude(text) => {
                if callstack.contains(text.as_str()) {
                    return false;
                }
            }
            Signal::MinCount(min, text) => {
                if callstack.matches(text.as_str()).count() >= *min {
                    state.stack_found = true;
                }
            }
        }
    }

    state.verdict()
}

/// `name` right-padded with dots to `width` characters.
pub fn pad_name(name: &str, width: usize) -> String {
    let len = name.chars().count();
    let mut padded = name.to_string();
    if len < width {
        padded.extend(std::iter::repeat('.').take(width - len));
    }
    padded
}

pub fn format_suspect(name: &str, severity: &str, width: usize) -> String {
    format!(
        "# Checking for {} SUSPECT FOUND! > Severity : {} # \n-----\n",
        pad_name(name, width),
        severity
    )
}

/// True when the main error names a DLL other than the allocator.
pub fn check_dll_crash(main_error: &str) -> bool {
    let lower = main_error.to_lowercase();
    lower.contains(".dll") && !lower.contains(ALLOCATOR_DLL)
}

pub fn dll_crash_notice() -> [&'static str; 2] {
    [
        "* NOTICE : MAIN ERROR REPORTS THAT A DLL FILE WAS INVOLVED IN THIS CRASH! * \n",
        "If that dll file belongs to a mod, that mod is a prime suspect for the crash. \n-----\n",
    ]
}

pub struct SuspectScanner<'a> {
    error_suspects: &'a [ErrorSuspect],
    stack_suspects: &'a [SuspectRule],
}

impl<'a> SuspectScanner<'a> {
    pub fn new(rules: &'a RuleDatabase) -> Self {
        Self {
            error_suspects: &rules.error_suspects,
            stack_suspects: &rules.stack_suspects,
        }
    }

    /// Main-error-only suspects: a single substring test each.
    pub fn scan_main_error(&self, main_error: &str, width: usize) -> SuspectFindings {
        let mut findings = SuspectFindings::default();
        for suspect in self.error_suspects {
            if main_error.contains(suspect.signal.as_str()) {
                findings.record(&suspect.severity, &suspect.name, width);
            }
        }
        findings
    }

    pub fn scan_stack(&self, main_error: &str, callstack: &str, width: usize) -> SuspectFindings {
        let mut findings = SuspectFindings::default();
        for rule in self.stack_suspects {
            if rule_matches(rule, main_error, callstack) {
                findings.record(&rule.severity, &rule.name, width);
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(signals: &[&str]) -> SuspectRule {
        SuspectRule {
            severity: "5".into(),
            name: "Test Crash".into(),
            signals: signals
                .iter()
                .map(|s| Signal::parse("Test Crash", s).unwrap())
                .collect(),
        }
    }

    #[test]
    fn plain_signal_matches_callstack() {
        let r = rule(&["BSTextureDB"]);
        assert!(rule_matches(&r, "", "x BSTextureDB y"));
        assert!(!rule_matches(&r, "", "nothing"));
    }

    #[test]
    fn not_signal_disqualifies_even_when_everything_else_matches() {
        let r = rule(&["ME-OPT|ACCESS", "Foo", "2|Bar", "NOT|Havok"]);
        let stack = "Foo Bar Bar Havok";
        assert!(!rule_matches(&r, "ACCESS_VIOLATION", stack));
        assert!(rule_matches(&r, "ACCESS_VIOLATION", "Foo Bar Bar"));
    }

    #[test]
    fn not_signal_before_positive_signals_also_disqualifies() {
        let r = rule(&["NOT|Havok", "Foo"]);
        assert!(!rule_matches(&r, "", "Havok Foo"));
    }

    #[test]
    fn min_count_threshold_is_inclusive() {
        let r = rule(&["3|Scrap"]);
        assert!(!rule_matches(&r, "", "Scrap Scrap"));
        assert!(rule_matches(&r, "", "Scrap Scrap Scrap"));
    }

    #[test]
    fn required_main_error_overrides_stack_hits() {
        let r = rule(&["ME-REQ|EXCEPTION_ACCESS_VIOLATION", "TESForm"]);
        assert!(!rule_matches(&r, "EXCEPTION_STACK_OVERFLOW", "TESForm"));
        assert!(rule_matches(&r, "EXCEPTION_ACCESS_VIOLATION", ""));
    }

    #[test]
    fn optional_main_error_alone_is_enough() {
        let r = rule(&["ME-OPT|0x0", "NeverThere"]);
        assert!(rule_matches(&r, "at 0x0", ""));
    }

    #[test]
    fn formats_with_dot_padding() {
        assert_eq!(pad_name("Abc", 6), "Abc...");
        assert_eq!(pad_name("Abcdefg", 3), "Abcdefg");
        assert_eq!(
            format_suspect("Null Crash", "5", 12),
            "# Checking for Null Crash.. SUSPECT FOUND! > Severity : 5 # \n-----\n"
        );
    }

    #[test]
    fn dll_check_ignores_allocator() {
        assert!(check_dll_crash("Unhandled exception at Some.DLL+0x1"));
        assert!(!check_dll_crash("Unhandled exception at tbbmalloc.dll+0x1"));
        assert!(!check_dll_crash("Unhandled exception at Fallout4.exe"));
    }

    #[test]
    fn scanner_reports_in_database_order() {
        let yaml = r#"
game:
  root_name: Fallout 4
  xse_acronym: F4SE
  crashgen_name: Buffout 4
  version: 1.10.163
  version_new: 1.10.984
suspects_stack_list:
  "5 | Zulu":
    - zulu
  "1 | Alpha":
    - alpha
"#;
        let db = RuleDatabase::from_yaml_str(yaml).unwrap();
        let findings = SuspectScanner::new(&db).scan_stack("", "alpha zulu", 10);
        let names: Vec<&str> = findings.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "Alpha"]);
        assert!(findings.lines[0].contains("Zulu......"));
        assert!(findings.found());
    }
}
