use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ReconcileConfig;

/// One row of the master data, keyed by its identifier column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRecord {
    pub identifier: String,
    /// 1-based row number in the source sheet, header excluded.
    pub row_number: usize,
    pub fields: Vec<(String, String)>,
}

impl ReferenceRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Field map in sheet column order.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrigin {
    Layout,
    LineItems,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableProvenance {
    pub source_file: String,
    pub page: usize,
    pub table_index: usize,
    pub origin: TableOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedTable {
    pub provenance: TableProvenance,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| {
                        (column.clone(), row.get(index).cloned().unwrap_or_default())
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedDocument {
    pub source_file: String,
    pub identifier: Option<String>,
    pub text: String,
    pub page_count: usize,
    pub tables: Vec<ExtractedTable>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    Name,
    Insurance,
    Date,
    Amount,
    Price,
    Quantity,
    MissingItem,
    Other,
}

impl DiscrepancyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Insurance => "insurance",
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Price => "price",
            Self::Quantity => "quantity",
            Self::MissingItem => "missing_item",
            Self::Other => "other",
        }
    }

    /// Maps a model-supplied type label (`"price"`, `"missing item"`,
    /// `"price/quantity"`) onto a kind; the first recognized token wins.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        for token in normalized.split(['/', ',', '|']) {
            let kind = match token.trim_matches('_') {
                "name" | "patient_name" => Self::Name,
                "insurance" | "insurer" | "company" | "organization" => Self::Insurance,
                "date" => Self::Date,
                "amount" | "total" => Self::Amount,
                "price" | "unit_price" => Self::Price,
                "quantity" | "qty" => Self::Quantity,
                "missing_item" | "missing" => Self::MissingItem,
                _ => continue,
            };
            return kind;
        }
        Self::Other
    }

    /// Infers a kind from a field label such as `"Patient Name"` or
    /// `"SWO Expiration Date"`.
    pub fn infer_from_field(field: &str) -> Self {
        let lowered = field.to_ascii_lowercase();
        let has = |needle: &str| lowered.contains(needle);

        if has("insurance") || has("insurer") || has("payer") || has("company") {
            Self::Insurance
        } else if has("name") {
            Self::Name
        } else if has("date") || has("dob") {
            Self::Date
        } else if has("price") || has("rate") {
            Self::Price
        } else if has("qty") || has("quantity") {
            Self::Quantity
        } else if has("amount") || has("total") || has("balance") || has("charge") {
            Self::Amount
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscrepancyEntry {
    pub source_file: String,
    pub identifier: Option<String>,
    pub kind: DiscrepancyKind,
    pub field_or_item_name: Option<String>,
    pub reference_value: Option<String>,
    pub document_value: Option<String>,
    pub numeric_difference: Option<f64>,
    pub description: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Clean,
    DataError,
    IdentifierNotFound,
    IdentifierUnmatched,
    ProcessingError,
}

impl OutcomeStatus {
    pub const ALL: [Self; 5] = [
        Self::Clean,
        Self::DataError,
        Self::IdentifierNotFound,
        Self::IdentifierUnmatched,
        Self::ProcessingError,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Clean => "Clean",
            Self::DataError => "Data Error",
            Self::IdentifierNotFound => "Identifier Not Found",
            Self::IdentifierUnmatched => "Identifier Unmatched",
            Self::ProcessingError => "Processing Error",
        }
    }

    /// True when the document could not be checked at all.
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Clean | Self::DataError)
    }
}

/// Facts about the input file itself, independent of how far it got.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DocumentFacts {
    pub sha256: Option<String>,
    pub size_bytes: u64,
    pub page_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationOutcome {
    pub source_file: String,
    pub identifier: Option<String>,
    pub status: OutcomeStatus,
    pub discrepancies: Vec<DiscrepancyEntry>,
    pub error: Option<String>,
    pub facts: DocumentFacts,
}

/// Outcomes in input order. Aggregates live in `report` and are computed
/// from this on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchReport {
    outcomes: Vec<ReconciliationOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: ReconciliationOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ReconciliationOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn discrepancies(&self) -> impl Iterator<Item = &DiscrepancyEntry> {
        self.outcomes
            .iter()
            .flat_map(|outcome| outcome.discrepancies.iter())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunArtifacts {
    pub full_report_csv: String,
    pub errors_only_csv: Option<String>,
    pub discrepancy_xlsx: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub reference_path: String,
    pub reference_record_count: usize,
    pub reference_duplicate_identifiers: usize,
    pub config: ReconcileConfig,
    pub summary: crate::report::ReportSummary,
    pub artifacts: RunArtifacts,
    pub outcomes: Vec<ReconciliationOutcome>,
}

/// Subset of the run manifest read back by `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunManifestHeader {
    pub run_id: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub reference_path: Option<String>,
    pub summary: Option<crate::report::ReportSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEntry {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub page_count: Option<usize>,
    pub table_count: Option<usize>,
    pub identifier: Option<String>,
    pub reference_matches: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub document_count: usize,
    pub documents: Vec<ScanEntry>,
}
