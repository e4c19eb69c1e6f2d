//! Rule database: suspect tables, ignore lists and game constants.
//!
//! The on-disk format is YAML. It is decoded once into [`RawRuleFile`] and then
//! converted into the strongly typed [`RuleDatabase`], so analyzers never see
//! string-tagged signal modifiers or open-ended maps.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::version::Version;

const BUILTIN_RULES: &str = include_str!("../data/default_rules.yaml");

pub const DEFAULT_WARN_WIDTH: usize = 30;
pub const DEFAULT_LIMIT_THRESHOLD: &str = "1.37.0";

#[derive(Error, Debug, PartialEq)]
pub enum RuleError {
    #[error("suspect key '{0}' is not in 'severity | name' form")]
    MalformedKey(String),

    #[error("unknown signal modifier '{modifier}' in rule '{rule}'")]
    UnknownModifier { rule: String, modifier: String },

    #[error("signal '{signal}' in rule '{rule}' has an empty match string")]
    EmptySignal { rule: String, signal: String },

    #[error("invalid version '{value}' for '{field}'")]
    BadVersion { field: &'static str, value: String },
}

/// A single matching condition inside a suspect rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Substring that must appear in the call stack text.
    Plain(String),
    /// `ME-REQ|s`: the main error must contain `s` for the rule to match.
    MainErrorRequired(String),
    /// `ME-OPT|s`: the main error containing `s` is enough to match.
    MainErrorOptional(String),
    /// `NOT|s`: `s` anywhere in the call stack disqualifies the rule.
    CallstackExclude(String),
    /// `N|s`: the call stack contains `s` at least `N` times.
    MinCount(usize, String),
}

impl Signal {
    pub fn parse(rule: &str, raw: &str) -> Result<Self, RuleError> {
        let Some((modifier, text)) = raw.split_once('|') else {
            return Ok(Signal::Plain(raw.to_string()));
        };

        if text.is_empty() {
            return Err(RuleError::EmptySignal {
                rule: rule.to_string(),
                signal: raw.to_string(),
            });
        }

        let text = text.to_string();
        match modifier {
            "ME-REQ" => Ok(Signal::MainErrorRequired(text)),
            "ME-OPT" => Ok(Signal::MainErrorOptional(text)),
            "NOT" => Ok(Signal::CallstackExclude(text)),
            m if !m.is_empty() && m.chars().all(|c| c.is_ascii_digit()) => {
                let count = m.parse::<usize>().map_err(|_| RuleError::UnknownModifier {
                    rule: rule.to_string(),
                    modifier: m.to_string(),
                })?;
                Ok(Signal::MinCount(count, text))
            }
            other => Err(RuleError::UnknownModifier {
                rule: rule.to_string(),
                modifier: other.to_string(),
            }),
        }
    }
}

/// Call stack suspect with its ordered signal list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspectRule {
    pub severity: String,
    pub name: String,
    pub signals: Vec<Signal>,
}

/// Suspect matched by a single substring of the main error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSuspect {
    pub severity: String,
    pub name: String,
    pub signal: String,
}

#[derive(Debug, Clone)]
pub struct GameInfo {
    pub root_name: String,
    pub xse_acronym: String,
    pub crashgen_name: String,
    pub version: Version,
    pub version_vr: Version,
    pub version_new: Version,
    pub crashgen_latest: Option<Version>,
    pub crashgen_limit_threshold: Version,
}

/// Read-only rule configuration shared by every analyzer.
#[derive(Debug, Clone)]
pub struct RuleDatabase {
    pub game: GameInfo,
    pub warn_width: usize,
    pub error_suspects: Vec<ErrorSuspect>,
    pub stack_suspects: Vec<SuspectRule>,
    /// Lowercased plugins never attributed from the call stack.
    pub game_ignore_plugins: HashSet<String>,
    /// Lowercased plugins removed from the plugin map entirely.
    pub ignore_plugins: HashSet<String>,
    /// Lowercased substrings marking an interesting named record.
    pub records: Vec<String>,
    /// Lowercased substrings that veto a named record.
    pub ignore_records: Vec<String>,
    pub crashgen_ignore: HashSet<String>,
    pub game_files: Vec<String>,
    pub hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawGameInfo {
    pub root_name: String,
    pub xse_acronym: String,
    pub crashgen_name: String,
    pub version: String,
    #[serde(default)]
    pub version_vr: Option<String>,
    pub version_new: String,
    #[serde(default)]
    pub crashgen_latest: Option<String>,
    #[serde(default)]
    pub crashgen_limit_threshold: Option<String>,
}

/// Rule file as written on disk.
#[derive(Debug, Deserialize)]
pub struct RawRuleFile {
    pub game: RawGameInfo,
    #[serde(default)]
    pub warn_width: Option<usize>,
    #[serde(default)]
    pub suspects_error_list: IndexMap<String, String>,
    #[serde(default)]
    pub suspects_stack_list: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub game_ignore_plugins: Vec<String>,
    #[serde(default)]
    pub ignore_list: Vec<String>,
    #[serde(default)]
    pub records_list: Vec<String>,
    #[serde(default)]
    pub game_ignore_records: Vec<String>,
    #[serde(default)]
    pub crashgen_ignore: Vec<String>,
    #[serde(default)]
    pub game_files: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

fn split_key(key: &str) -> Result<(String, String), RuleError> {
    key.split_once(" | ")
        .map(|(sev, name)| (sev.trim().to_string(), name.to_string()))
        .ok_or_else(|| RuleError::MalformedKey(key.to_string()))
}

fn parse_version(field: &'static str, value: &str) -> Result<Version, RuleError> {
    Version::parse(value).ok_or_else(|| RuleError::BadVersion {
        field,
        value: value.to_string(),
    })
}

fn lowercase_all<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    items.into_iter().map(|s| s.to_lowercase()).collect()
}

impl TryFrom<RawRuleFile> for RuleDatabase {
    type Error = RuleError;

    fn try_from(raw: RawRuleFile) -> Result<Self, Self::Error> {
        let game = GameInfo {
            version: parse_version("game.version", &raw.game.version)?,
            version_vr: match raw.game.version_vr.as_deref() {
                Some(v) => parse_version("game.version_vr", v)?,
                None => Version::null(),
            },
            version_new: parse_version("game.version_new", &raw.game.version_new)?,
            crashgen_latest: raw
                .game
                .crashgen_latest
                .as_deref()
                .map(|v| parse_version("game.crashgen_latest", v))
                .transpose()?,
            crashgen_limit_threshold: parse_version(
                "game.crashgen_limit_threshold",
                raw.game
                    .crashgen_limit_threshold
                    .as_deref()
                    .unwrap_or(DEFAULT_LIMIT_THRESHOLD),
            )?,
            root_name: raw.game.root_name,
            xse_acronym: raw.game.xse_acronym,
            crashgen_name: raw.game.crashgen_name,
        };

        let mut error_suspects = Vec::with_capacity(raw.suspects_error_list.len());
        for (key, signal) in raw.suspects_error_list {
            let (severity, name) = split_key(&key)?;
            error_suspects.push(ErrorSuspect {
                severity,
                name,
                signal,
            });
        }

        let mut stack_suspects = Vec::with_capacity(raw.suspects_stack_list.len());
        for (key, signals) in raw.suspects_stack_list {
            let (severity, name) = split_key(&key)?;
            let signals = signals
                .iter()
                .map(|s| Signal::parse(&name, s))
                .collect::<Result<Vec<_>, _>>()?;
            stack_suspects.push(SuspectRule {
                severity,
                name,
                signals,
            });
        }

        Ok(Self {
            game,
            warn_width: raw.warn_width.unwrap_or(DEFAULT_WARN_WIDTH),
            error_suspects,
            stack_suspects,
            game_ignore_plugins: lowercase_all(&raw.game_ignore_plugins).into_iter().collect(),
            ignore_plugins: lowercase_all(&raw.ignore_list).into_iter().collect(),
            records: lowercase_all(&raw.records_list),
            ignore_records: lowercase_all(&raw.game_ignore_records),
            crashgen_ignore: raw.crashgen_ignore.into_iter().collect(),
            game_files: raw.game_files,
            hints: raw.hints,
        })
    }
}

impl RuleDatabase {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawRuleFile =
            serde_yaml::from_str(content).context("Failed to parse rule database YAML")?;
        Ok(Self::try_from(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule database: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid rule database: {}", path.display()))
    }

    /// Rules shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_RULES).context("Built-in rule database is invalid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_signal_kind() {
        assert_eq!(
            Signal::parse("r", "BSTextureDB").unwrap(),
            Signal::Plain("BSTextureDB".into())
        );
        assert_eq!(
            Signal::parse("r", "ME-REQ|ACCESS_VIOLATION").unwrap(),
            Signal::MainErrorRequired("ACCESS_VIOLATION".into())
        );
        assert_eq!(
            Signal::parse("r", "ME-OPT|0x0").unwrap(),
            Signal::MainErrorOptional("0x0".into())
        );
        assert_eq!(
            Signal::parse("r", "NOT|Havok").unwrap(),
            Signal::CallstackExclude("Havok".into())
        );
        assert_eq!(
            Signal::parse("r", "3|BSResource").unwrap(),
            Signal::MinCount(3, "BSResource".into())
        );
    }

    #[test]
    fn match_string_may_contain_pipes() {
        assert_eq!(
            Signal::parse("r", "NOT|a|b").unwrap(),
            Signal::CallstackExclude("a|b".into())
        );
    }

    #[test]
    fn rejects_unknown_modifier() {
        let err = Signal::parse("Broken", "MAYBE|x").unwrap_err();
        assert_eq!(
            err,
            RuleError::UnknownModifier {
                rule: "Broken".into(),
                modifier: "MAYBE".into()
            }
        );
    }

    #[test]
    fn rejects_malformed_key() {
        let yaml = r#"
game:
  root_name: Fallout 4
  xse_acronym: F4SE
  crashgen_name: Buffout 4
  version: 1.10.163
  version_new: 1.10.984
suspects_stack_list:
  "No separator here":
    - foo
"#;
        let err = RuleDatabase::from_yaml_str(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("severity | name"));
    }

    #[test]
    fn preserves_rule_order_and_lowercases_lists() {
        let yaml = r#"
game:
  root_name: Fallout 4
  xse_acronym: f4se
  crashgen_name: Buffout 4
  version: 1.10.163
  version_new: 1.10.984
suspects_stack_list:
  "5 | Zeta Crash":
    - zeta
  "2 | Alpha Crash":
    - alpha
game_ignore_plugins:
  - Fallout4.esm
records_list:
  - .NIF
"#;
        let db = RuleDatabase::from_yaml_str(yaml).unwrap();
        let names: Vec<&str> = db.stack_suspects.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta Crash", "Alpha Crash"]);
        assert!(db.game_ignore_plugins.contains("fallout4.esm"));
        assert_eq!(db.records, vec![".nif".to_string()]);
        assert_eq!(db.warn_width, DEFAULT_WARN_WIDTH);
        assert_eq!(db.game.crashgen_limit_threshold.to_string(), "1.37.0");
    }

    #[test]
    fn builtin_rules_load() {
        let db = RuleDatabase::builtin().unwrap();
        assert_eq!(db.game.crashgen_name, "Buffout 4");
        assert!(!db.stack_suspects.is_empty());
        assert!(!db.error_suspects.is_empty());
    }
}
