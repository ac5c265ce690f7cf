use serde_json::{Value, json};

use crate::model::{ExtractedDocument, ReferenceRecord};
use crate::util::truncate_chars;

const STRICT_RULES: &str = r#"STRICT RULES:

1. IGNORE these situations (DO NOT REPORT):
   - Fields not found in PDF
   - Date format differences (2024-12-01 00:00:00 = 1-Dec-2024 = 12/01/2024)
   - Text format differences (BCBS = EXCEL BCBS = Finance Class BCBS)
   - Case differences (JOHN = John = john)
   - Extra spaces or punctuation
   - Different field labels

2. ONLY REPORT these situations:
   - Completely different names (John Smith != Jane Doe)
   - Different insurance companies (BCBS != Aetna)
   - Different calendar dates (Jan 1 != Dec 31)
   - Different amounts ($100 != $200)

EXAMPLES OF WHAT NOT TO REPORT:
   - "SWO Expiration Date: Excel has '2024-12-01 00:00:00', PDF has '1-Dec-2024'" = SAME DATE
   - "Field 'Last usage Date' not found in PDF" = IRRELEVANT
   - "Insurance: Excel has 'BCBS', PDF has 'Finance Class BCBS'" = SAME COMPANY

EXAMPLES OF WHAT TO REPORT:
   - "Patient Name: Excel has 'JOHN SMITH', PDF has 'JANE DOE'" = DIFFERENT PERSON
   - "Insurance: Excel has 'BCBS', PDF has 'AETNA'" = DIFFERENT COMPANY"#;

const FREE_TEXT_RESPONSE_FORMAT: &str = r#"RESPONSE FORMAT:
- If no actual data errors exist: "No discrepancies"
- If actual data errors found, one line per error: "Field Name: Excel has 'X', PDF has 'Y'"

Be very strict - only report genuine data errors, not formatting or missing field issues."#;

const STRUCTURED_RESPONSE_FORMAT: &str = r#"For line-item tables, a different unit price, total or quantity for the same item is a different amount. An item present in the document but absent from the reference data is a missing_item.

RESPONSE FORMAT (JSON only, no prose):
{
    "discrepancies": [
        {
            "item_name": "field or item name",
            "discrepancy_type": "name/insurance/date/amount/price/quantity/missing_item",
            "invoice_value": "value from the document",
            "master_value": "value from the reference data",
            "amount_difference": "numerical difference (document minus reference), or null",
            "description": "brief description of the discrepancy"
        }
    ]
}

If there are no genuine data errors, return {"discrepancies": []}."#;

pub(super) fn free_text_policy() -> String {
    format!(
        "You are a data verification assistant. Your ONLY job is to find ACTUAL DATA ERRORS.\n\n{STRICT_RULES}\n\n{FREE_TEXT_RESPONSE_FORMAT}"
    )
}

pub(super) fn structured_policy() -> String {
    format!(
        "You are a precise financial data analyst. Compare the document data with the reference data and report only genuine data errors. Always return valid JSON.\n\n{STRICT_RULES}\n\n{STRUCTURED_RESPONSE_FORMAT}"
    )
}

pub(super) fn free_text_payload(
    document: &ExtractedDocument,
    record: &ReferenceRecord,
    text_limit: usize,
) -> String {
    format!(
        "PDF Text:\n```\n{}\n```\n\nExcel Data:\n```json\n{}\n```",
        truncate_chars(&document.text, text_limit),
        pretty(&record.to_json()),
    )
}

/// Table-bearing documents send their row-records plus a bounded prefix of
/// the reference table; text-only documents fall back to the text prefix.
pub(super) fn structured_payload(
    document: &ExtractedDocument,
    record: &ReferenceRecord,
    reference_sample: &[ReferenceRecord],
    text_limit: usize,
) -> String {
    let mut payload = String::new();

    if document.tables.is_empty() {
        payload.push_str("DOCUMENT TEXT:\n```\n");
        payload.push_str(truncate_chars(&document.text, text_limit));
        payload.push_str("\n```\n\n");
    } else {
        let tables = document
            .tables
            .iter()
            .map(|table| {
                json!({
                    "page": table.provenance.page,
                    "table": table.provenance.table_index,
                    "rows": table.records(),
                })
            })
            .collect::<Vec<Value>>();
        payload.push_str("DOCUMENT DATA:\n```json\n");
        payload.push_str(&pretty(&Value::Array(tables)));
        payload.push_str("\n```\n\n");
    }

    payload.push_str("REFERENCE RECORD:\n```json\n");
    payload.push_str(&pretty(&record.to_json()));
    payload.push_str("\n```");

    if !document.tables.is_empty() && !reference_sample.is_empty() {
        let sample = reference_sample
            .iter()
            .map(ReferenceRecord::to_json)
            .collect::<Vec<Value>>();
        payload.push_str("\n\nREFERENCE DATA (sample):\n```json\n");
        payload.push_str(&pretty(&Value::Array(sample)));
        payload.push_str("\n```");
    }

    payload.push_str("\n\nReturn only the JSON response.");
    payload
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
