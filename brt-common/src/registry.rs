//! Line registry
//!
//! Static table of known transit lines: identifier, display name and the
//! nominal number of minutes until a detected bus reaches the stop. The
//! registry is built once at startup and shared read-only.
//!
//! Unknown identifiers are not errors. They fall back to
//! [`DEFAULT_NOMINAL_MINUTES`] and [`UNKNOWN_LINE_NAME`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Nominal minutes used for lines the registry does not know
pub const DEFAULT_NOMINAL_MINUTES: u32 = 6;

/// Display name stored for lines the registry does not know
pub const UNKNOWN_LINE_NAME: &str = "Linha desconhecida";

/// One known line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEntry {
    pub id: String,
    pub display_name: String,
    pub nominal_minutes: u32,
}

impl LineEntry {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, nominal_minutes: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            nominal_minutes,
        }
    }
}

/// Built-in line table (insertion order is significant for substring matching)
const BUILTIN_LINES: &[(&str, &str, u32)] = &[
    ("437", "TI Caxangá (Conde da Boa Vista)", 5),
    ("2441", "TI CDU (Conde da Boa Vista)", 6),
    ("2450", "TI Camaragibe (Conde da Boa Vista)", 7),
    ("2444", "TI Getúlio Vargas (Conde da Boa Vista)", 4),
    ("301", "Linha Demonstrativa 301", 3),
    ("723", "Linha Demonstrativa 723", 5),
    ("820", "Linha Demonstrativa 820", 2),
];

/// Immutable registry of known lines
///
/// Iteration order is the order entries were supplied in. The resolver
/// depends on this order when one candidate contains several known ids.
#[derive(Debug, Clone, Default)]
pub struct LineRegistry {
    entries: Vec<LineEntry>,
    index: HashMap<String, usize>,
}

impl LineRegistry {
    /// Build a registry from entries, rejecting blank ids, duplicate ids and
    /// zero durations
    ///
    /// An empty entry list is accepted here; callers that need at least one
    /// line check [`LineRegistry::is_empty`] at startup.
    pub fn new(entries: Vec<LineEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Line entry #{} has an empty id",
                    position + 1
                )));
            }
            if entry.nominal_minutes == 0 {
                return Err(Error::Config(format!(
                    "Line {} must have a positive nominal duration",
                    entry.id
                )));
            }
            if index.insert(entry.id.clone(), position).is_some() {
                return Err(Error::Config(format!("Duplicate line id: {}", entry.id)));
            }
        }

        Ok(Self { entries, index })
    }

    /// Registry with the built-in line table
    pub fn builtin() -> Self {
        let entries = BUILTIN_LINES
            .iter()
            .map(|(id, name, minutes)| LineEntry::new(*id, *name, *minutes))
            .collect::<Vec<_>>();
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();
        Self { entries, index }
    }

    pub fn lookup(&self, id: &str) -> Option<&LineEntry> {
        self.index.get(id).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Known ids in insertion order
    pub fn all_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.id.as_str())
    }

    pub fn entries(&self) -> &[LineEntry] {
        &self.entries
    }

    /// Nominal minutes for a line, or the default for unknown lines
    pub fn nominal_minutes(&self, id: &str) -> u32 {
        self.lookup(id)
            .map(|entry| entry.nominal_minutes)
            .unwrap_or(DEFAULT_NOMINAL_MINUTES)
    }

    /// Display name for a line, or the unknown-line sentinel
    pub fn display_name(&self, id: &str) -> &str {
        self.lookup(id)
            .map(|entry| entry.display_name.as_str())
            .unwrap_or(UNKNOWN_LINE_NAME)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
