use anyhow::{anyhow, Context, Result};
use std::env;
use std::fmt::Write;
use std::path::{Path, PathBuf};

const PROJECT_CONFIG_NAME: &str = ".crashscanrc";

/// Values from the `[scan]` section. Unset keys stay `None` so layers can merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSection {
    pub fcx_mode: Option<bool>,
    pub show_formid_values: Option<bool>,
    pub move_unsolved: Option<bool>,
    pub threads: Option<usize>,
    pub rules: Option<PathBuf>,
    pub formid_db: Option<PathBuf>,
    pub loadorder: Option<PathBuf>,
    pub game_path: Option<PathBuf>,
    pub quarantine_dir: Option<PathBuf>,
}

/// Configuration file handler for crashscan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub scan: ScanSection,
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(anyhow!("Invalid boolean for '{}': {}", key, value)),
    }
}

impl ConfigFile {
    /// Find project-level .crashscanrc by walking up from `start`
    pub fn find_project_config_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let config_path = current.join(PROJECT_CONFIG_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }
            if !current.pop() {
                // Reached filesystem root
                break;
            }
        }
        None
    }

    /// Find project-level .crashscanrc starting at the current directory
    pub fn find_project_config() -> Option<PathBuf> {
        let cwd = env::current_dir().ok()?;
        Self::find_project_config_from(&cwd)
    }

    /// Get list of user config file locations in order of preference
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if cfg!(windows) {
            if let Ok(appdata) = env::var("APPDATA") {
                paths.push(PathBuf::from(appdata).join("crashscan").join("config.ini"));
            }
            if let Ok(userprofile) = env::var("USERPROFILE") {
                paths.push(PathBuf::from(userprofile).join(PROJECT_CONFIG_NAME));
            }
        } else {
            // 1. $XDG_CONFIG_HOME/crashscan/config.ini
            // 2. ~/.config/crashscan/config.ini
            // 3. ~/.crashscanrc
            if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
                paths.push(PathBuf::from(xdg).join("crashscan").join("config.ini"));
            }
            if let Ok(home) = env::var("HOME") {
                let home = PathBuf::from(home);
                let xdg_fallback = home.join(".config").join("crashscan").join("config.ini");
                if !paths.contains(&xdg_fallback) {
                    paths.push(xdg_fallback);
                }
                paths.push(home.join(PROJECT_CONFIG_NAME));
            }
        }

        paths
    }

    /// Load configuration with proper precedence: project > user > defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // First existing user config file (lowest precedence)
        if let Some(path) = Self::get_user_config_paths().into_iter().find(|p| p.is_file()) {
            let user_config = Self::load_from_path(&path)?;
            config = Self::merge_configs(config, user_config);
        }

        if let Some(project_path) = Self::find_project_config() {
            let project_config = Self::load_from_path(&project_path)?;
            config = Self::merge_configs(config, project_config);
        }

        Ok(config)
    }

    /// Load configuration, honoring `--config` and `--ignore-config`
    pub fn load_with_custom_path(custom_path: Option<&Path>, ignore: bool) -> Result<Self> {
        match (custom_path, ignore) {
            (_, true) => Ok(Self::default()),
            (Some(path), false) => Self::load_from_path(path),
            (None, false) => Self::load(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse_ini_content(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse INI content from string
    pub fn parse_ini_content(content: &str) -> Result<Self> {
        let mut scan = ScanSection::default();
        let mut current_section = String::new();

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(anyhow!("Line {}: expected 'key = value'", idx + 1));
            };
            let key = key.trim();
            let value = value.trim();

            if current_section != "scan" {
                tracing::debug!("ignoring key '{}' outside [scan]", key);
                continue;
            }

            match key {
                "fcx_mode" => scan.fcx_mode = Some(parse_bool(key, value)?),
                "show_formid_values" => scan.show_formid_values = Some(parse_bool(key, value)?),
                "move_unsolved" => scan.move_unsolved = Some(parse_bool(key, value)?),
                "threads" => {
                    scan.threads = Some(
                        value
                            .parse()
                            .map_err(|_| anyhow!("Invalid thread count: {}", value))?,
                    )
                }
                "rules" => scan.rules = Some(PathBuf::from(value)),
                "formid_db" => scan.formid_db = Some(PathBuf::from(value)),
                "loadorder" => scan.loadorder = Some(PathBuf::from(value)),
                "game_path" => scan.game_path = Some(PathBuf::from(value)),
                "quarantine_dir" => scan.quarantine_dir = Some(PathBuf::from(value)),
                other => tracing::warn!("unknown config key in [scan]: {}", other),
            }
        }

        Ok(Self { scan })
    }

    /// Merge two configuration objects, with the second taking precedence
    pub fn merge_configs(base: Self, overlay: Self) -> Self {
        let (b, o) = (base.scan, overlay.scan);
        Self {
            scan: ScanSection {
                fcx_mode: o.fcx_mode.or(b.fcx_mode),
                show_formid_values: o.show_formid_values.or(b.show_formid_values),
                move_unsolved: o.move_unsolved.or(b.move_unsolved),
                threads: o.threads.or(b.threads),
                rules: o.rules.or(b.rules),
                formid_db: o.formid_db.or(b.formid_db),
                loadorder: o.loadorder.or(b.loadorder),
                game_path: o.game_path.or(b.game_path),
                quarantine_dir: o.quarantine_dir.or(b.quarantine_dir),
            },
        }
    }

    fn active_values(&self) -> Vec<(&'static str, String)> {
        let s = &self.scan;
        let mut values = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                values.push((key, value));
            }
        };
        push("fcx_mode", s.fcx_mode.map(|v| v.to_string()));
        push("show_formid_values", s.show_formid_values.map(|v| v.to_string()));
        push("move_unsolved", s.move_unsolved.map(|v| v.to_string()));
        push("threads", s.threads.map(|v| v.to_string()));
        push("rules", s.rules.as_ref().map(|p| p.display().to_string()));
        push("formid_db", s.formid_db.as_ref().map(|p| p.display().to_string()));
        push("loadorder", s.loadorder.as_ref().map(|p| p.display().to_string()));
        push("game_path", s.game_path.as_ref().map(|p| p.display().to_string()));
        push("quarantine_dir", s.quarantine_dir.as_ref().map(|p| p.display().to_string()));
        values
    }

    /// Show configuration information with precedence details
    pub fn show_config(custom_path: Option<&Path>, ignore: bool) {
        print!("{}", Self::describe_config(custom_path, ignore));
    }

    /// The `--show-config` text for the source that a scan would actually use.
    pub fn describe_config(custom_path: Option<&Path>, ignore: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Configuration precedence: CLI > project .crashscanrc > user config > defaults\n"
        );

        if ignore {
            let _ = writeln!(out, "Configuration files ignored (--ignore-config). Using defaults.");
            return out;
        }

        if let Some(path) = custom_path {
            match Self::load_from_path(path) {
                Ok(config) => {
                    let _ = writeln!(out, "Configuration loaded from:");
                    let _ = writeln!(out, "  Custom: {}", path.display());
                    Self::describe_values(&config, &mut out);
                }
                Err(e) => {
                    let _ = writeln!(out, "Error loading configuration: {:#}", e);
                }
            }
            return out;
        }

        let project_config_path = Self::find_project_config();
        let user_config_paths = Self::get_user_config_paths();
        let user_config_path = user_config_paths.iter().find(|p| p.is_file());

        match Self::load() {
            Ok(merged_config) => {
                let mut loaded_from = Vec::new();
                if let Some(project_path) = &project_config_path {
                    loaded_from.push(format!("Project: {}", project_path.display()));
                }
                if let Some(user_path) = user_config_path {
                    loaded_from.push(format!("User: {}", user_path.display()));
                }

                if loaded_from.is_empty() {
                    let _ = writeln!(out, "No configuration files found. Using defaults.");
                } else {
                    let _ = writeln!(out, "Configuration loaded from:");
                    for source in loaded_from {
                        let _ = writeln!(out, "  {}", source);
                    }
                }
                Self::describe_values(&merged_config, &mut out);
            }
            Err(e) => {
                let _ = writeln!(out, "Error loading configuration: {:#}", e);
            }
        }

        let _ = writeln!(out, "\nConfiguration search locations (in precedence order):");
        match &project_config_path {
            Some(project_path) => {
                let _ = writeln!(out, "  1. Project: {} (found)", project_path.display());
            }
            None => {
                let _ = writeln!(out, "  1. Project: .crashscanrc (searched up directory tree, not found)");
            }
        }
        for (i, path) in user_config_paths.iter().enumerate() {
            let status = if path.is_file() { "(found)" } else { "(not found)" };
            let _ = writeln!(out, "  {}. User: {} {}", i + 2, path.display(), status);
        }

        if project_config_path.is_none() && user_config_path.is_none() {
            let _ = writeln!(out, "\nExample configuration file (.crashscanrc):\n");
            let _ = writeln!(out, "[scan]");
            let _ = writeln!(out, "fcx_mode = true");
            let _ = writeln!(out, "move_unsolved = true");
            let _ = writeln!(out, "game_path = C:/Games/Fallout 4");
            let _ = writeln!(out, "formid_db = formids.csv");
        }
        out
    }

    fn describe_values(config: &ConfigFile, out: &mut String) {
        let values = config.active_values();
        if !values.is_empty() {
            let _ = writeln!(out, "\nActive [scan] values:");
            for (key, value) in values {
                let _ = writeln!(out, "  {} = {}", key, value);
            }
        }
    }
}
