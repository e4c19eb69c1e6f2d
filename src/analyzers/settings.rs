//! Crash generator settings validation.
//!
//! The generator prints its own configuration in the compatibility section
//! as `Key: value` lines. They are decoded once into [`CrashgenSettings`];
//! the ordered map is only walked by the disabled-settings sweep.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

use crate::report::Report;
use crate::version::Version;

const ACHIEVEMENTS_DLLS: [&str; 2] = ["achievements.dll", "unlimitedsurvivalmode.dll"];
const XCELL_DLL: &str = "x-cell-fo4.dll";
const BAKA_SCRAPHEAP_DLL: &str = "bakascrapheap.dll";
const LOOKS_MENU_DLL: &str = "f4ee.dll";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SettingValue {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            return SettingValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return SettingValue::Bool(false);
        }
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return SettingValue::Int(n);
            }
        }
        SettingValue::Text(raw.to_string())
    }

    /// Truthiness as the generator treats it: zero and empty are off.
    pub fn is_enabled(&self) -> bool {
        match self {
            SettingValue::Bool(b) => *b,
            SettingValue::Int(n) => *n != 0,
            SettingValue::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(n) => write!(f, "{}", n),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashgenSettings {
    pub achievements: Option<bool>,
    pub memory_manager: Option<bool>,
    pub havok_memory_system: Option<bool>,
    pub bstexture_streamer_local_heap: Option<bool>,
    pub scaleform_allocator: Option<bool>,
    pub small_block_allocator: Option<bool>,
    pub archive_limit: Option<bool>,
    pub f4ee: Option<bool>,
    entries: IndexMap<String, SettingValue>,
}

impl CrashgenSettings {
    /// Decode `Key: value` lines; anything else (section headers, blanks) is skipped.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut entries = IndexMap::new();
        for line in lines {
            let Some((key, value)) = line.as_ref().split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                continue;
            }
            entries.insert(key.to_string(), SettingValue::parse(value));
        }

        let flag = |name: &str| entries.get(name).map(SettingValue::is_enabled);
        Self {
            achievements: flag("Achievements"),
            memory_manager: flag("MemoryManager"),
            havok_memory_system: flag("HavokMemorySystem"),
            bstexture_streamer_local_heap: flag("BSTextureStreamerLocalHeap"),
            scaleform_allocator: flag("ScaleformAllocator"),
            small_block_allocator: flag("SmallBlockAllocator"),
            archive_limit: flag("ArchiveLimit"),
            f4ee: flag("F4EE"),
            entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn caution(report: &mut Report, warning: &str, fix: &str) {
    report.push(format!("# ❌ CAUTION : {} # \n", warning));
    report.push(format!(" FIX: {}\n-----\n", fix));
}

fn confirm(report: &mut Report, message: &str) {
    report.push(format!("✔️ {} \n-----\n", message));
}

/// Memory checks print their confirmations flush against the separator.
fn confirm_memory(report: &mut Report, message: &str) {
    report.push(format!("✔️ {}\n-----\n", message));
}

pub struct SettingsValidator<'a> {
    crashgen_name: &'a str,
    ignore: &'a HashSet<String>,
}

impl<'a> SettingsValidator<'a> {
    pub fn new(crashgen_name: &'a str, ignore: &'a HashSet<String>) -> Self {
        Self {
            crashgen_name,
            ignore,
        }
    }

    /// Run every check in a fixed order.
    pub fn validate(&self, settings: &CrashgenSettings, modules: &HashSet<String>, report: &mut Report) {
        self.check_achievements(settings, modules, report);
        self.check_memory_management(settings, modules, report);
        self.check_archive_limit(settings, report);
        self.check_looks_menu(settings, modules, report);
        self.check_disabled(settings, report);
    }

    pub fn check_achievements(&self, settings: &CrashgenSettings, modules: &HashSet<String>, report: &mut Report) {
        let name = self.crashgen_name;
        let conflicting_mod = ACHIEVEMENTS_DLLS.iter().any(|dll| modules.contains(*dll));
        if settings.achievements.unwrap_or(false) && conflicting_mod {
            caution(
                report,
                "The Achievements Mod and/or Unlimited Survival Mode is installed, but Achievements is set to TRUE",
                &format!("Open {name}'s TOML file and change Achievements to FALSE, this prevents conflicts with {name}."),
            );
        } else {
            confirm(
                report,
                &format!("Achievements parameter is correctly configured in your {name} settings!"),
            );
        }
    }

    pub fn check_memory_management(&self, settings: &CrashgenSettings, modules: &HashSet<String>, report: &mut Report) {
        let name = self.crashgen_name;
        let has_xcell = modules.contains(XCELL_DLL);
        let has_baka = modules.contains(BAKA_SCRAPHEAP_DLL);

        if settings.memory_manager.unwrap_or(false) {
            if has_xcell {
                caution(
                    report,
                    "X-Cell is installed, but MemoryManager parameter is set to TRUE",
                    &format!("Open {name}'s TOML file and change MemoryManager to FALSE, this prevents conflicts with X-Cell."),
                );
            } else if has_baka {
                caution(
                    report,
                    &format!("The Baka ScrapHeap Mod is installed, but is redundant with {name}"),
                    &format!("Uninstall the Baka ScrapHeap Mod, this prevents conflicts with {name}."),
                );
            } else {
                confirm_memory(
                    report,
                    &format!("Memory Manager parameter is correctly configured in your {name} settings!"),
                );
            }
        } else if has_xcell {
            if has_baka {
                caution(
                    report,
                    "The Baka ScrapHeap Mod is installed, but is redundant with X-Cell",
                    "Uninstall the Baka ScrapHeap Mod, this prevents conflicts with X-Cell.",
                );
            } else {
                confirm_memory(
                    report,
                    &format!("Memory Manager parameter is correctly configured for use with X-Cell in your {name} settings!"),
                );
            }
        } else if has_baka {
            caution(
                report,
                &format!("The Baka ScrapHeap Mod is installed, but is redundant with {name}"),
                &format!(
                    "Uninstall the Baka ScrapHeap Mod and open {name}'s TOML file and change MemoryManager to TRUE, this improves performance."
                ),
            );
        }

        if !has_xcell {
            return;
        }

        let xcell_settings = [
            ("HavokMemorySystem", "Havok Memory System", settings.havok_memory_system),
            (
                "BSTextureStreamerLocalHeap",
                "BSTextureStreamerLocalHeap",
                settings.bstexture_streamer_local_heap,
            ),
            ("ScaleformAllocator", "Scaleform Allocator", settings.scaleform_allocator),
            ("SmallBlockAllocator", "Small Block Allocator", settings.small_block_allocator),
        ];
        for (key, display, value) in xcell_settings {
            if value.unwrap_or(false) {
                caution(
                    report,
                    &format!("X-Cell is installed, but {key} parameter is set to TRUE"),
                    &format!("Open {name}'s TOML file and change {key} to FALSE, this prevents conflicts with X-Cell."),
                );
            } else {
                confirm_memory(
                    report,
                    &format!("{display} parameter is correctly configured for use with X-Cell in your {name} settings!"),
                );
            }
        }
    }

    pub fn check_archive_limit(&self, settings: &CrashgenSettings, report: &mut Report) {
        let name = self.crashgen_name;
        if settings.archive_limit.unwrap_or(false) {
            caution(
                report,
                "ArchiveLimit is set to TRUE, this setting is known to cause instability.",
                &format!("Open {name}'s TOML file and change ArchiveLimit to FALSE."),
            );
        } else {
            confirm(
                report,
                &format!("ArchiveLimit parameter is correctly configured in your {name} settings!"),
            );
        }
    }

    /// Only reported when the generator prints an F4EE key at all.
    pub fn check_looks_menu(&self, settings: &CrashgenSettings, modules: &HashSet<String>, report: &mut Report) {
        let name = self.crashgen_name;
        let Some(enabled) = settings.f4ee else {
            return;
        };
        if !enabled && modules.contains(LOOKS_MENU_DLL) {
            caution(
                report,
                "Looks Menu is installed, but F4EE parameter under [Compatibility] is set to FALSE",
                &format!("Open {name}'s TOML file and change F4EE to TRUE, this prevents bugs and crashes from Looks Menu."),
            );
        } else {
            confirm(
                report,
                &format!("F4EE (Looks Menu) parameter is correctly configured in your {name} settings!"),
            );
        }
    }

    pub fn check_disabled(&self, settings: &CrashgenSettings, report: &mut Report) {
        for (key, value) in settings.entries() {
            if *value == SettingValue::Bool(false) && !self.ignore.contains(key) {
                report.push(format!(
                    "* NOTICE : {} is disabled in your {} settings, is this intentional? * \n-----\n",
                    key, self.crashgen_name
                ));
            }
        }
    }
}

/// Compare the log's generator version with the latest known release.
pub fn check_crashgen_version(
    crashgen_name: &str,
    current: &Version,
    latest: Option<&Version>,
    report: &mut Report,
) {
    let Some(latest) = latest else {
        return;
    };
    if current.is_null() {
        return;
    }
    if current < latest {
        report.push(format!(
            "# ❌ CAUTION : YOUR {} IS OUTDATED! PLEASE UPDATE TO VERSION {} # \n-----\n",
            crashgen_name.to_uppercase(),
            latest
        ));
    } else {
        report.push(format!(
            "✔️ You have the latest version of {}! \n-----\n",
            crashgen_name
        ));
    }
}
