use std::fmt;

use crate::{DataTable, Error, Result};

/// Snapshot of one bot run: an immutable mapping from app name to the CSV
/// bytes that app exported.
///
/// The key set is fixed at construction and iterates in construction order.
/// `get` reparses the owned byte source on every call, so repeated reads of
/// the same key always reproduce the same table.
#[derive(Debug, Clone)]
pub struct CsvStore {
    entries: Vec<(String, Vec<u8>)>,
}

impl CsvStore {
    pub fn new(entries: Vec<(String, Vec<u8>)>) -> Self {
        Self { entries }
    }

    pub fn from_text(entries: Vec<(String, String)>) -> Self {
        Self::new(
            entries
                .into_iter()
                .map(|(k, v)| (k, v.into_bytes()))
                .collect(),
        )
    }

    /// Parses the byte source behind `key` into a table. An empty source
    /// yields an empty table; an unknown key is an error regardless of what
    /// the sources contain.
    pub fn get(&self, key: &str) -> Result<DataTable> {
        let (_, bytes) = self
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?;
        DataTable::parse_csv(bytes)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for CsvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<CSVStore(")?;
        for (i, (key, _)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", key)?;
        }
        write!(f, ")>")
    }
}
