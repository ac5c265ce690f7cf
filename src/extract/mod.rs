use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::DocumentError;
use crate::model::{ExtractedDocument, ExtractedTable, TableOrigin, TableProvenance};
use crate::util::normalize_column_name;

mod line_items;
mod tables;
mod text;

use line_items::*;
use tables::*;
use text::*;

/// Turns PDF bytes into page text plus any tabular rows found on the pages.
/// Holds only compiled patterns, so one instance serves a whole batch.
pub struct DocumentExtractor {
    cell_separator: Regex,
    line_item_patterns: LineItemPatterns,
}

impl DocumentExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cell_separator: Regex::new(r"\t+| {2,}")
                .context("failed to compile table cell separator regex")?,
            line_item_patterns: LineItemPatterns::new()?,
        })
    }

    pub fn extract(&self, data: &[u8], source_file: &str) -> Result<ExtractedDocument, DocumentError> {
        let pages = extract_pages(data)?;
        Ok(self.assemble(source_file, &pages))
    }

    /// Builds the document from already-extracted page text.
    pub fn assemble(&self, source_file: &str, pages: &[String]) -> ExtractedDocument {
        let mut tables = Vec::new();

        for (page_index, page_text) in pages.iter().enumerate() {
            let page = page_index + 1;
            let page_tables = detect_tables(page_text, &self.cell_separator);

            if page_tables.is_empty() {
                let items = self.line_item_patterns.parse(page_text);
                if !items.is_empty() {
                    debug!(source = source_file, page, rows = items.len(), "parsed line items from text");
                    tables.push(ExtractedTable {
                        provenance: TableProvenance {
                            source_file: source_file.to_string(),
                            page,
                            table_index: 1,
                            origin: TableOrigin::LineItems,
                        },
                        columns: LINE_ITEM_COLUMNS.iter().map(|column| column.to_string()).collect(),
                        rows: items,
                    });
                }
                continue;
            }

            for (table_offset, raw) in page_tables.into_iter().enumerate() {
                let columns = raw
                    .header
                    .iter()
                    .enumerate()
                    .map(|(index, name)| normalize_column_name(name, index))
                    .collect::<Vec<String>>();

                tables.push(ExtractedTable {
                    provenance: TableProvenance {
                        source_file: source_file.to_string(),
                        page,
                        table_index: table_offset + 1,
                        origin: TableOrigin::Layout,
                    },
                    columns,
                    rows: raw.rows,
                });
            }
        }

        let text = pages.join("\n");
        if text.trim().is_empty() {
            warn!(source = source_file, pages = pages.len(), "document has no extractable text layer");
        }

        ExtractedDocument {
            source_file: source_file.to_string(),
            identifier: None,
            text,
            page_count: pages.len(),
            tables,
        }
    }
}
