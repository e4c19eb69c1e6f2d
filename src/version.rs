use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)+").expect("version pattern is valid"));

/// Dotted numeric version compared component-wise.
///
/// Missing trailing components count as zero, so `1.10.163` and `1.10.163.0`
/// are equal. Anything that cannot be parsed becomes [`Version::null`].
#[derive(Debug, Clone, Default)]
pub struct Version {
    parts: Vec<u64>,
}

impl Version {
    pub fn null() -> Self {
        Self { parts: vec![0, 0, 0] }
    }

    /// Parse a bare version string such as `1.37.0`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_start_matches(['v', 'V']);
        if text.is_empty() {
            return None;
        }
        let parts = text
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self { parts })
    }

    /// Pull the first dotted version out of a header line like
    /// `Fallout 4 v1.10.163` or `Buffout 4 v1.28.6`.
    pub fn from_header(line: &str) -> Self {
        VERSION_RE
            .find(line)
            .and_then(|m| Self::parse(m.as_str()))
            .unwrap_or_else(Self::null)
    }

    pub fn is_null(&self) -> bool {
        self.parts.iter().all(|p| *p == 0)
    }

    fn component(&self, idx: usize) -> u64 {
        self.parts.get(idx).copied().unwrap_or(0)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for idx in 0..len {
            match self.component(idx).cmp(&other.component(idx)) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", text.join("."))
    }
}
