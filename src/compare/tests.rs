use std::cell::RefCell;

use super::*;
use crate::model::{DiscrepancyKind, ExtractedTable, OutcomeStatus, TableOrigin, TableProvenance};

struct CannedService {
    reply: Option<String>,
    requests: RefCell<Vec<ComparisonRequest>>,
}

impl CannedService {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl ComparisonService for CannedService {
    fn compare(&self, request: &ComparisonRequest) -> Result<String, ComparisonError> {
        self.requests.borrow_mut().push(request.clone());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(ComparisonError::Api {
                status: 401,
                message: "invalid api key".to_string(),
            }),
        }
    }
}

fn reference() -> ReferenceIndex {
    let header = ["Patient ID", "Name", "Insurance"].map(String::from);
    let rows = vec![
        ["123", "JOHN SMITH", "BCBS"].map(String::from).to_vec(),
        ["456", "JANE DOE", "Aetna"].map(String::from).to_vec(),
    ];
    ReferenceIndex::from_rows("memory".to_string(), &header, rows, "patient id").unwrap()
}

fn document(text: &str, tables: Vec<ExtractedTable>) -> ExtractedDocument {
    ExtractedDocument {
        source_file: "patient_123.pdf".to_string(),
        identifier: Some("123".to_string()),
        text: text.to_string(),
        page_count: 1,
        tables,
    }
}

fn widget_table() -> ExtractedTable {
    ExtractedTable {
        provenance: TableProvenance {
            source_file: "invoice.pdf".to_string(),
            page: 1,
            table_index: 1,
            origin: TableOrigin::Layout,
        },
        columns: vec!["item".to_string(), "unit_price".to_string()],
        rows: vec![vec!["Widget".to_string(), "12.50".to_string()]],
    }
}

fn structured_config() -> ReconcileConfig {
    ReconcileConfig {
        parse_mode: ParseMode::Structured,
        ..ReconcileConfig::default()
    }
}

fn run(
    config: &ReconcileConfig,
    service: &CannedService,
    document: &ExtractedDocument,
) -> Result<Vec<DiscrepancyEntry>, DocumentError> {
    let index = reference();
    let record = index.first("123").unwrap().clone();
    let extractor = DiscrepancyExtractor::new(config).unwrap();
    extractor.extract(service, document, &record, &index)
}

#[test]
fn sentinel_phrasings_are_recognized() {
    assert!(is_no_discrepancy_sentinel("No discrepancies"));
    assert!(is_no_discrepancy_sentinel("No discrepancies."));
    assert!(is_no_discrepancy_sentinel("\"No discrepancies found.\""));
    assert!(is_no_discrepancy_sentinel("  no   DATA errors  "));
    assert!(is_no_discrepancy_sentinel("No discrepancies were found."));
    assert!(!is_no_discrepancy_sentinel("All the data matches. Nothing else to add."));
    assert!(!is_no_discrepancy_sentinel(
        "No discrepancies found.\nInsurance: Excel has 'BCBS', PDF has 'AETNA'"
    ));
    assert!(!is_no_discrepancy_sentinel(
        "Patient Name: Excel has 'JOHN SMITH', PDF has 'JANE DOE'"
    ));
    assert!(!is_no_discrepancy_sentinel("No discrepancies in names, but the insurance differs"));
}

#[test]
fn sentinel_reply_yields_no_entries() {
    let service = CannedService::replying("No discrepancies.");
    let entries = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap();

    assert!(entries.is_empty());
    assert_eq!(service.requests.borrow().len(), 1);
}

#[test]
fn leading_sentinel_does_not_hide_later_fields() {
    let service = CannedService::replying(
        "No discrepancies found.\nInsurance: Excel has 'BCBS', PDF has 'AETNA'",
    );
    let entries = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, DiscrepancyKind::Insurance);
    assert_eq!(entries[0].document_value.as_deref(), Some("AETNA"));
}

#[test]
fn free_text_reply_is_split_into_one_entry_per_field() {
    let service = CannedService::replying(
        "Patient Name: Excel has 'JOHN SMITH', PDF has 'JANE DOE'\n\
         Insurance: Excel has 'BCBS', PDF has 'AETNA'",
    );
    let entries = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, DiscrepancyKind::Name);
    assert_eq!(entries[0].field_or_item_name.as_deref(), Some("Patient Name"));
    assert_eq!(entries[0].reference_value.as_deref(), Some("JOHN SMITH"));
    assert_eq!(entries[0].document_value.as_deref(), Some("JANE DOE"));
    assert_eq!(entries[0].numeric_difference, None);
    assert_eq!(entries[0].identifier.as_deref(), Some("123"));
    assert_eq!(entries[1].kind, DiscrepancyKind::Insurance);
    assert_eq!(entries[1].reference_value.as_deref(), Some("BCBS"));
    assert_eq!(entries[1].document_value.as_deref(), Some("AETNA"));
}

#[test]
fn free_text_amounts_carry_a_signed_difference() {
    let service = CannedService::replying("- Balance Due: Excel has '$100.00', PDF has '$1,200.00'");
    let entries = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, DiscrepancyKind::Amount);
    assert_eq!(entries[0].numeric_difference, Some(1100.0));
    assert!(entries[0].description.starts_with("Balance Due:"));
}

#[test]
fn free_text_lines_outside_the_field_pattern_are_kept() {
    let service = CannedService::replying(
        "Patient Name: Excel has 'JOHN SMITH', PDF has 'JANE DOE'\n\
         Date of Service: Excel shows Jan 1 2024 while PDF shows Dec 31 2024",
    );
    let entries = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, DiscrepancyKind::Name);
    assert_eq!(entries[1].kind, DiscrepancyKind::Other);
    assert_eq!(entries[1].field_or_item_name, None);
    assert!(entries[1].description.contains("Date of Service"));
}

#[test]
fn non_monetary_numeric_fields_have_no_difference() {
    let service = CannedService::replying("Zip Code: Excel has '12345', PDF has '54321'");
    let entries = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, DiscrepancyKind::Other);
    assert_eq!(entries[0].reference_value.as_deref(), Some("12345"));
    assert_eq!(entries[0].numeric_difference, None);
}

#[test]
fn undecomposable_free_text_is_kept_whole() {
    let reply = "The insurance carrier appears to differ between the two sources.";
    let service = CannedService::replying(reply);
    let entries = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, DiscrepancyKind::Other);
    assert_eq!(entries[0].description, reply);
    assert_eq!(entries[0].field_or_item_name, None);
}

#[test]
fn free_text_request_is_bounded_and_deterministic() {
    let config = ReconcileConfig::default();
    let service = CannedService::replying("No discrepancies");
    let long_text = "x".repeat(config.text_limit + 500);
    run(&config, &service, &document(&long_text, Vec::new())).unwrap();

    let requests = service.requests.borrow();
    let request = &requests[0];
    assert_eq!(request.temperature, 0.0);
    assert_eq!(request.max_tokens, config.max_tokens);
    assert!(request.system.contains("STRICT RULES"));
    assert!(request.system.contains("No discrepancies"));
    for reported in [
        "Completely different names",
        "Different insurance companies",
        "Different calendar dates",
        "Different amounts",
    ] {
        assert!(request.system.contains(reported), "missing report rule: {reported}");
    }
    for ignored in [
        "Fields not found in PDF",
        "Date format differences",
        "Case differences",
        "Different field labels",
    ] {
        assert!(request.system.contains(ignored), "missing ignore rule: {ignored}");
    }
    assert!(request.user.contains(&"x".repeat(config.text_limit)));
    assert!(!request.user.contains(&"x".repeat(config.text_limit + 1)));
    assert!(request.user.contains("\"name\": \"JOHN SMITH\""));
}

#[test]
fn structured_payload_sends_reference_sample_only_with_tables() {
    let config = structured_config();
    let index = reference();
    let record = index.first("123").unwrap();
    let extractor = DiscrepancyExtractor::new(&config).unwrap();

    let with_tables = extractor.build_request(&document("", vec![widget_table()]), record, &index);
    assert!(with_tables.user.contains("DOCUMENT DATA"));
    assert!(with_tables.user.contains("\"Widget\""));
    assert!(with_tables.user.contains("REFERENCE DATA (sample)"));
    assert!(with_tables.user.contains("JANE DOE"));
    assert!(with_tables.system.contains("\"discrepancies\""));

    let text_only = extractor.build_request(&document("Patient ID: 123", Vec::new()), record, &index);
    assert!(text_only.user.contains("DOCUMENT TEXT"));
    assert!(!text_only.user.contains("REFERENCE DATA (sample)"));
    assert!(text_only.user.ends_with("Return only the JSON response."));
}

#[test]
fn structured_reply_embedded_in_prose_is_parsed() {
    let service = CannedService::replying(
        r#"Here is the analysis:
{"discrepancies": [{"item_name": "Widget", "discrepancy_type": "price", "invoice_value": 12.5, "master_value": "10.00", "amount_difference": "2.50", "description": "Unit price differs"}]}
Let me know if you need more."#,
    );
    let entries = run(&structured_config(), &service, &document("", vec![widget_table()])).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, DiscrepancyKind::Price);
    assert_eq!(entries[0].field_or_item_name.as_deref(), Some("Widget"));
    assert_eq!(entries[0].document_value.as_deref(), Some("12.5"));
    assert_eq!(entries[0].reference_value.as_deref(), Some("10.00"));
    assert_eq!(entries[0].numeric_difference, Some(2.5));
    assert_eq!(entries[0].description, "Unit price differs");
}

#[test]
fn structured_entries_with_non_string_fields_are_kept() {
    let service = CannedService::replying(
        r#"{"discrepancies": [{"item_name": 4411, "discrepancy_type": "price", "invoice_value": 12.5, "master_value": 10, "amount_difference": 2.5, "description": "Unit price differs"}]}"#,
    );
    let entries = run(&structured_config(), &service, &document("", vec![widget_table()])).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, DiscrepancyKind::Price);
    assert_eq!(entries[0].field_or_item_name.as_deref(), Some("4411"));
    assert_eq!(entries[0].reference_value.as_deref(), Some("10"));
    assert_eq!(entries[0].numeric_difference, Some(2.5));
    assert_eq!(entries[0].description, "Unit price differs");
}

#[test]
fn unreadable_structured_items_still_count() {
    let service = CannedService::replying(
        r#"{"discrepancies": ["Widget price differs", {"item_name": "Gadget", "description": 42}]}"#,
    );
    let entries = run(&structured_config(), &service, &document("", vec![widget_table()])).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, DiscrepancyKind::Other);
    assert_eq!(entries[0].description, "Widget price differs");
    assert_eq!(entries[1].field_or_item_name.as_deref(), Some("Gadget"));
    assert_eq!(entries[1].description, "42");
}

#[test]
fn structured_reply_with_empty_array_is_clean() {
    let service = CannedService::replying(r#"{"discrepancies": []}"#);
    let entries = run(&structured_config(), &service, &document("", vec![widget_table()])).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn structured_entry_without_description_gets_one() {
    let service = CannedService::replying(
        r#"{"discrepancies": [{"field": "Insurance", "master_value": "BCBS", "invoice_value": "AETNA"}]}"#,
    );
    let entries = run(&structured_config(), &service, &document("", vec![widget_table()])).unwrap();

    assert_eq!(entries[0].kind, DiscrepancyKind::Insurance);
    assert_eq!(
        entries[0].description,
        "Insurance: reference has 'BCBS', document has 'AETNA'"
    );
}

#[test]
fn malformed_structured_reply_is_a_parse_failure() {
    let service = CannedService::replying(r#"{"discrepancies": [{"item_name": "Widget""#);
    let err = run(&structured_config(), &service, &document("", vec![widget_table()])).unwrap_err();

    assert!(matches!(err, DocumentError::ResponseParseFailure(_)));
    assert_eq!(err.status(), OutcomeStatus::ProcessingError);
}

#[test]
fn first_json_object_skips_invalid_candidates() {
    let value = first_json_object(r#"{not json} then {"discrepancies": []}"#).unwrap();
    assert_eq!(value["discrepancies"], serde_json::json!([]));

    let err = first_json_object("no braces here").unwrap_err();
    assert!(err.to_string().contains("no JSON object found"));
}

#[test]
fn service_failure_becomes_processing_error() {
    let service = CannedService::failing();
    let err = run(&ReconcileConfig::default(), &service, &document("Patient ID: 123", Vec::new())).unwrap_err();

    assert!(matches!(err, DocumentError::ComparisonServiceFailure(_)));
    assert_eq!(err.status(), OutcomeStatus::ProcessingError);
    assert!(err.to_string().contains("invalid api key"));
}
