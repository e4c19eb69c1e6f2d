//! Game installation checks run once per batch in FCX mode.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityResults {
    /// Report text for the installation folder itself.
    pub main_files: String,
    /// Report text for the individual game files.
    pub game_files: String,
}

pub trait IntegrityCheck: Send + Sync {
    fn run(&self) -> IntegrityResults;
}

/// Verifies that the game folder exists and holds every expected file.
#[derive(Debug, Clone)]
pub struct GameFilesCheck {
    game_path: Option<PathBuf>,
    expected: Vec<String>,
}

impl GameFilesCheck {
    pub fn new(game_path: Option<PathBuf>, expected: Vec<String>) -> Self {
        Self {
            game_path,
            expected,
        }
    }

    fn check_folder(&self) -> Result<&Path, String> {
        match self.game_path.as_deref() {
            None => Err(
                "# ❌ CAUTION : No game folder is configured, set game_path to enable game file checks. # \n-----\n"
                    .to_string(),
            ),
            Some(path) if !path.is_dir() => Err(format!(
                "# ❌ CAUTION : The configured game folder does not exist: {} # \n-----\n",
                path.display()
            )),
            Some(path) => Ok(path),
        }
    }
}

impl IntegrityCheck for GameFilesCheck {
    fn run(&self) -> IntegrityResults {
        let root = match self.check_folder() {
            Ok(root) => root,
            Err(message) => {
                return IntegrityResults {
                    main_files: message,
                    game_files: String::new(),
                }
            }
        };

        let main_files = format!("✔️ Game folder found: {} \n-----\n", root.display());

        let missing: Vec<&String> = self
            .expected
            .iter()
            .filter(|rel| !root.join(rel.as_str()).is_file())
            .collect();

        let game_files = if missing.is_empty() {
            "✔️ All expected game files are present. \n-----\n".to_string()
        } else {
            let mut text = String::new();
            for rel in missing {
                text.push_str(&format!("# ❌ CAUTION : Missing game file: {} # \n", rel));
            }
            text.push_str("-----\n");
            text
        };

        IntegrityResults {
            main_files,
            game_files,
        }
    }
}
