/*!
 * Read-only symbol dictionary.
 *
 * Loaded once per process lifetime from a JSON file and shared behind an
 * `Arc` as immutable state; both the fuser and the locking engine consult
 * it. Lookups resolve alternate written forms to their canonical entry.
 */

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One dictionary entry: a symbol with ranked definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// The canonical symbol
    pub symbol: String,
    /// Definitions, most common first
    pub definitions: Vec<String>,
    /// Alternate written forms resolving to this entry
    #[serde(default)]
    pub variants: Vec<String>,
}

impl DictionaryEntry {
    /// The top-ranked definition, if any.
    pub fn primary_definition(&self) -> Option<&str> {
        self.definitions.first().map(|s| s.as_str())
    }
}

/// On-disk dictionary file shape.
#[derive(Debug, Deserialize)]
struct DictionaryFile {
    format_version: String,
    entries: Vec<DictionaryEntry>,
}

/// In-memory dictionary with variant resolution.
#[derive(Debug)]
pub struct Dictionary {
    /// Format version string reported by the source file
    format_version: String,
    entries: Vec<DictionaryEntry>,
    /// symbol or variant -> index into entries
    index: HashMap<String, usize>,
}

impl Dictionary {
    /// Build a dictionary from entries, indexing symbols and variants.
    ///
    /// When a variant collides with a canonical symbol the canonical entry
    /// wins.
    pub fn new(format_version: impl Into<String>, entries: Vec<DictionaryEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len() * 2);
        for (i, entry) in entries.iter().enumerate() {
            for variant in &entry.variants {
                index.entry(variant.clone()).or_insert(i);
            }
        }
        for (i, entry) in entries.iter().enumerate() {
            index.insert(entry.symbol.clone(), i);
        }
        Self {
            format_version: format_version.into(),
            entries,
            index,
        }
    }

    /// An empty dictionary; every lookup misses.
    pub fn empty() -> Self {
        Self::new("none", Vec::new())
    }

    /// Load a dictionary from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read dictionary file {:?}", path.as_ref()))?;
        let file: DictionaryFile =
            serde_json::from_str(&content).context("Failed to parse dictionary file")?;
        Ok(Self::new(file.format_version, file.entries))
    }

    /// Look up a symbol or one of its alternate forms.
    pub fn lookup(&self, symbol: &str) -> Option<&DictionaryEntry> {
        self.index.get(symbol).map(|&i| &self.entries[i])
    }

    /// Format version of the loaded dictionary.
    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    /// Number of canonical entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
