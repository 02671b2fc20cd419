use anyhow::Context;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;

const BUILTIN_EXPLANATIONS: &str = include_str!("../../data/explanations.toml");

/// Lookup from diagnostic code to a human-readable explanation.
pub trait Explain: Send + Sync {
    fn explain(&self, code: &str) -> Option<&str>;
}

impl<S: BuildHasher + Send + Sync> Explain for HashMap<String, String, S> {
    fn explain(&self, code: &str) -> Option<&str> {
        self.get(code).map(String::as_str)
    }
}

/// Explanation table loaded from TOML (`CODE = "text"` pairs).
#[derive(Debug, Clone, Default)]
pub struct ExplanationTable {
    entries: HashMap<String, String>,
}

impl ExplanationTable {
    /// The table shipped with the binary.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(BUILTIN_EXPLANATIONS).context("built-in explanation table is invalid")
    }

    /// The built-in table, with entries from `extra` (if any) added or overriding.
    pub fn load(extra: Option<&Path>) -> anyhow::Result<Self> {
        let mut table = Self::builtin()?;
        if let Some(path) = extra {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let added = Self::from_toml_str(&content)
                .with_context(|| format!("invalid explanation table {}", path.display()))?;
            tracing::info!(
                "Loaded {} extra explanations from {}",
                added.len(),
                path.display()
            );
            table.entries.extend(added.entries);
        }
        Ok(table)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let entries: HashMap<String, String> = toml::from_str(content)?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Explain for ExplanationTable {
    fn explain(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }
}
