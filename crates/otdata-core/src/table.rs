use serde::Serialize;

use crate::{Error, Result};

/// A parsed CSV payload: one header row plus zero or more data rows.
///
/// An empty export is a valid payload meaning "no rows yet" and parses to a
/// table with no columns and no rows, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse_csv(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::empty());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);
        let columns = reader
            .headers()
            .map_err(Error::Csv)?
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(Error::Csv)?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one named column, in row order. `None` if the column does
    /// not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(|s| s.as_str()).unwrap_or(""))
                .collect(),
        )
    }

    /// Serializes the table back to CSV text, header row included.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns).map_err(Error::Csv)?;
        for row in &self.rows {
            writer.write_record(row).map_err(Error::Csv)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        String::from_utf8(bytes).map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }
}
