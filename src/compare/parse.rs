use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::DocumentError;
use crate::model::{DiscrepancyEntry, DiscrepancyKind};
use crate::util::parse_numeric;

/// Accepted "nothing to report" replies, compared after lower-casing and
/// stripping quotes and trailing punctuation.
const NO_DISCREPANCY_SENTINELS: [&str; 14] = [
    "no discrepancies",
    "no discrepancies found",
    "no discrepancies detected",
    "no discrepancies were found",
    "no discrepancies were detected",
    "there are no discrepancies",
    "no data errors",
    "no data errors found",
    "no data errors were found",
    "no actual data errors",
    "no actual data errors found",
    "all the data matches",
    "all data matches",
    "all the data is consistent",
];

pub(super) struct EntryContext<'a> {
    pub source_file: &'a str,
    pub identifier: Option<&'a str>,
}

impl EntryContext<'_> {
    fn entry(
        &self,
        kind: DiscrepancyKind,
        field_or_item_name: Option<String>,
        reference_value: Option<String>,
        document_value: Option<String>,
        numeric_difference: Option<f64>,
        description: String,
    ) -> DiscrepancyEntry {
        DiscrepancyEntry {
            source_file: self.source_file.to_string(),
            identifier: self.identifier.map(ToOwned::to_owned),
            kind,
            field_or_item_name,
            reference_value,
            document_value,
            numeric_difference,
            description,
        }
    }
}

/// True only when the whole reply is one of the accepted "no discrepancies"
/// phrasings. Anything after the phrase makes the reply a report.
pub(super) fn is_no_discrepancy_sentinel(response: &str) -> bool {
    let normalized = normalize_sentence(response);
    NO_DISCREPANCY_SENTINELS.contains(&normalized.as_str())
}

fn normalize_sentence(raw: &str) -> String {
    raw.trim()
        .trim_matches(|character: char| matches!(character, '"' | '\'' | '`' | '*'))
        .trim_end_matches(|character: char| matches!(character, '.' | '!' | ';' | ':'))
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

pub(super) struct ResponseParser {
    field_line: Regex,
}

impl ResponseParser {
    pub fn new() -> Result<Self> {
        let field_line = Regex::new(
            r#"(?i)^\s*(?:[-*•]\s*|\d+[.)]\s*)?(?P<field>[^:\n]+?)\s*:\s*(?:excel|reference|master(?:\s+data)?)\s+(?:has|shows)\s+['"](?P<reference>.*?)['"]\s*[,;]?\s*(?:and\s+|but\s+|while\s+)?(?:(?:the\s+)?pdf|document|invoice)\s+(?:has|shows)\s+['"](?P<document>.*?)['"]\s*(?:[.;,)]|$)"#,
        )
        .context("failed to compile free-text discrepancy regex")?;
        Ok(Self { field_line })
    }

    /// Each `Field: Excel has 'X', PDF has 'Y'` line becomes one entry. Any
    /// other line, apart from a bare sentinel, becomes its own `other` entry.
    pub fn parse_free_text(&self, response: &str, context: &EntryContext<'_>) -> Vec<DiscrepancyEntry> {
        let mut entries = Vec::new();

        for line in response.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let Some(captures) = self.field_line.captures(line) else {
                if !is_no_discrepancy_sentinel(line) {
                    entries.push(context.entry(
                        DiscrepancyKind::Other,
                        None,
                        None,
                        None,
                        None,
                        strip_bullet(line).to_string(),
                    ));
                }
                continue;
            };

            let field = captures["field"].trim().to_string();
            let reference_value = captures["reference"].trim().to_string();
            let document_value = captures["document"].trim().to_string();
            let kind = DiscrepancyKind::infer_from_field(&field);
            let numeric_difference = numeric_difference(kind, &reference_value, &document_value);
            let description = strip_bullet(line).to_string();

            entries.push(context.entry(
                kind,
                Some(field),
                Some(reference_value),
                Some(document_value),
                numeric_difference,
                description,
            ));
        }

        if entries.is_empty() {
            entries.push(context.entry(
                DiscrepancyKind::Other,
                None,
                None,
                None,
                None,
                response.trim().to_string(),
            ));
        }

        entries
    }
}

fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(|character: char| {
        matches!(character, '-' | '*' | '•') || character.is_whitespace()
    })
}

/// Only monetary and count fields feed the amount statistics.
fn numeric_difference(kind: DiscrepancyKind, reference: &str, document: &str) -> Option<f64> {
    if !matches!(
        kind,
        DiscrepancyKind::Amount | DiscrepancyKind::Price | DiscrepancyKind::Quantity
    ) {
        return None;
    }
    Some(parse_numeric(document)? - parse_numeric(reference)?)
}

#[derive(Debug, Deserialize)]
struct StructuredResponse {
    discrepancies: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDiscrepancy {
    #[serde(alias = "field", alias = "field_name")]
    item_name: Option<Value>,
    #[serde(alias = "type")]
    discrepancy_type: Option<Value>,
    #[serde(alias = "document_value", alias = "pdf_value")]
    invoice_value: Option<Value>,
    #[serde(alias = "reference_value", alias = "excel_value")]
    master_value: Option<Value>,
    #[serde(alias = "numeric_difference")]
    amount_difference: Option<Value>,
    description: Option<Value>,
}

/// Reads the first JSON object embedded in the reply. Prose before or after
/// the object is ignored.
pub(super) fn parse_structured(
    response: &str,
    context: &EntryContext<'_>,
) -> Result<Vec<DiscrepancyEntry>, DocumentError> {
    let parsed = first_json_object(response)?;
    let structured: StructuredResponse = serde_json::from_value(parsed).map_err(|err| {
        DocumentError::ResponseParseFailure(format!("unexpected response shape: {err}"))
    })?;

    let Some(items) = structured.discrepancies else {
        warn!(source = context.source_file, "structured response has no discrepancies array");
        return Ok(Vec::new());
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawDiscrepancy>(item.clone()) {
            Ok(raw) => entries.push(structured_entry(raw, context)),
            Err(err) => {
                warn!(source = context.source_file, index, error = %err, "keeping unreadable discrepancy entry as text");
                let description = value_text(&item).unwrap_or_else(|| item.to_string());
                entries.push(context.entry(DiscrepancyKind::Other, None, None, None, None, description));
            }
        }
    }

    Ok(entries)
}

fn structured_entry(raw: RawDiscrepancy, context: &EntryContext<'_>) -> DiscrepancyEntry {
    let item_name = raw.item_name.as_ref().and_then(value_text);
    let kind = match raw.discrepancy_type.as_ref().and_then(value_text) {
        Some(label) => DiscrepancyKind::from_label(&label),
        None => item_name
            .as_deref()
            .map(DiscrepancyKind::infer_from_field)
            .unwrap_or(DiscrepancyKind::Other),
    };
    let document_value = raw.invoice_value.as_ref().and_then(value_text);
    let reference_value = raw.master_value.as_ref().and_then(value_text);
    let numeric_difference = raw.amount_difference.as_ref().and_then(value_number);

    let description = raw
        .description
        .as_ref()
        .and_then(value_text)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "{}: reference has '{}', document has '{}'",
                item_name.as_deref().unwrap_or(kind.as_str()),
                reference_value.as_deref().unwrap_or(""),
                document_value.as_deref().unwrap_or(""),
            )
        });

    context.entry(
        kind,
        item_name,
        reference_value,
        document_value,
        numeric_difference,
        description,
    )
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_numeric(text),
        _ => None,
    }
}

/// Scans top-level brace-balanced spans left to right and returns the first
/// one that parses as a JSON object. Spans nested inside a rejected candidate
/// are not retried.
pub(super) fn first_json_object(response: &str) -> Result<Value, DocumentError> {
    let mut first_error = None;
    let mut cursor = 0_usize;

    while let Some(offset) = response[cursor..].find('{') {
        let start = cursor + offset;
        let Some(length) = balanced_object_end(&response[start..]) else {
            cursor = start + 1;
            continue;
        };

        match serde_json::from_str::<Value>(&response[start..start + length]) {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(_) => {}
            Err(err) => {
                first_error.get_or_insert_with(|| err.to_string());
            }
        }
        cursor = start + length;
    }

    Err(DocumentError::ResponseParseFailure(match first_error {
        Some(err) => format!("invalid JSON in response: {err}"),
        None => "no JSON object found in response".to_string(),
    }))
}

/// Byte length of the brace-balanced prefix of `text` (which starts with
/// `{`), skipping braces inside string literals.
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, character) in text.char_indices() {
        if in_string {
            match character {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match character {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }

    None
}
