//! FormID description lookup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Resolves a FormID (without its load-order byte) inside a plugin to a
/// human readable description.
pub trait FormIdLookup: Send + Sync {
    fn lookup(&self, formid_suffix: &str, plugin: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct FormIdRow {
    plugin: String,
    formid: String,
    entry: String,
}

/// In-memory table loaded from a `plugin,formid,entry` CSV file.
#[derive(Debug, Default)]
pub struct CsvFormIdDatabase {
    entries: HashMap<(String, String), String>,
}

impl CsvFormIdDatabase {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open FormID database: {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Invalid FormID database: {}", path.display()))
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for (idx, row) in csv_reader.deserialize::<FormIdRow>().enumerate() {
            // Header is line 1.
            let row = row.with_context(|| format!("Malformed row at line {}", idx + 2))?;
            entries
                .entry(Self::key(&row.formid, &row.plugin))
                .or_insert(row.entry);
        }

        tracing::debug!("loaded {} FormID entries", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(formid: &str, plugin: &str) -> (String, String) {
        let formid = formid.trim_start_matches("0x").trim_start_matches("0X");
        (formid.to_uppercase(), plugin.to_lowercase())
    }
}

impl FormIdLookup for CsvFormIdDatabase {
    fn lookup(&self, formid_suffix: &str, plugin: &str) -> Option<String> {
        self.entries.get(&Self::key(formid_suffix, plugin)).cloned()
    }
}
