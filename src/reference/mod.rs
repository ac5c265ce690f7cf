use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::model::ReferenceRecord;
use crate::util::normalize_column_name;

mod sources;

use sources::*;

/// Read-only lookup over the master data, keyed by the raw identifier
/// string. Built once per run.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    source: String,
    identifier_column: String,
    columns: Vec<String>,
    records: Vec<ReferenceRecord>,
    by_identifier: HashMap<String, Vec<usize>>,
    skipped_rows: usize,
}

impl ReferenceIndex {
    pub fn load(path: &Path, identifier_column: &str) -> Result<Self> {
        let table = read_table(path)
            .with_context(|| format!("failed to read reference data: {}", path.display()))?;
        let index = Self::from_rows(
            path.display().to_string(),
            &table.header,
            table.rows,
            identifier_column,
        )?;

        info!(
            path = %path.display(),
            records = index.len(),
            identifier_column = index.identifier_column(),
            columns = index.columns().len(),
            duplicates = index.duplicate_identifier_count(),
            skipped_rows = index.skipped_rows,
            "loaded reference data"
        );
        Ok(index)
    }

    pub fn from_rows(
        source: String,
        header: &[String],
        rows: Vec<Vec<String>>,
        identifier_column: &str,
    ) -> Result<Self> {
        let columns = header
            .iter()
            .enumerate()
            .map(|(index, name)| normalize_column_name(name, index))
            .collect::<Vec<String>>();
        let identifier_column = normalize_column_name(identifier_column, 0);

        let Some(id_position) = columns.iter().position(|column| *column == identifier_column)
        else {
            bail!(
                "identifier column '{}' not found in {} (columns: {})",
                identifier_column,
                source,
                columns.join(", ")
            );
        };

        let mut records = Vec::with_capacity(rows.len());
        let mut by_identifier: HashMap<String, Vec<usize>> = HashMap::new();
        let mut skipped_rows = 0_usize;

        for (row_index, row) in rows.into_iter().enumerate() {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let identifier = row
                .get(id_position)
                .map(|cell| cell.trim().to_string())
                .unwrap_or_default();
            if identifier.is_empty() {
                skipped_rows += 1;
                continue;
            }

            let fields = columns
                .iter()
                .enumerate()
                .map(|(index, column)| (column.clone(), row.get(index).cloned().unwrap_or_default()))
                .collect();

            by_identifier
                .entry(identifier.clone())
                .or_default()
                .push(records.len());
            records.push(ReferenceRecord {
                identifier,
                row_number: row_index + 1,
                fields,
            });
        }

        if skipped_rows > 0 {
            warn!(source = %source, skipped_rows, "reference rows without an identifier were skipped");
        }

        let index = Self {
            source,
            identifier_column,
            columns,
            records,
            by_identifier,
            skipped_rows,
        };

        for (identifier, count) in index.duplicate_identifiers() {
            warn!(identifier = %identifier, rows = count, "duplicate identifier in reference data; first row wins");
        }

        Ok(index)
    }

    /// All rows for the identifier, in sheet order.
    pub fn lookup(&self, identifier: &str) -> Vec<&ReferenceRecord> {
        self.by_identifier
            .get(identifier)
            .map(|positions| positions.iter().map(|&position| &self.records[position]).collect())
            .unwrap_or_default()
    }

    /// The record used for comparison: the first row carrying the identifier.
    pub fn first(&self, identifier: &str) -> Option<&ReferenceRecord> {
        self.by_identifier
            .get(identifier)
            .and_then(|positions| positions.first())
            .map(|&position| &self.records[position])
    }

    /// Bounded prefix of the table, for payloads that send a reference sample.
    pub fn sample(&self, limit: usize) -> &[ReferenceRecord] {
        &self.records[..limit.min(self.records.len())]
    }

    pub fn duplicate_identifiers(&self) -> Vec<(&str, usize)> {
        let mut duplicates = self
            .by_identifier
            .iter()
            .filter(|(_, positions)| positions.len() > 1)
            .map(|(identifier, positions)| (identifier.as_str(), positions.len()))
            .collect::<Vec<(&str, usize)>>();
        duplicates.sort();
        duplicates
    }

    pub fn duplicate_identifier_count(&self) -> usize {
        self.by_identifier
            .values()
            .filter(|positions| positions.len() > 1)
            .count()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn identifier_column(&self) -> &str {
        &self.identifier_column
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
