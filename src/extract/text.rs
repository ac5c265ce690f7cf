use lopdf::Document;
use tracing::warn;

use crate::error::DocumentError;

pub(super) fn extract_pages(data: &[u8]) -> Result<Vec<String>, DocumentError> {
    let document = Document::load_mem(data)
        .map_err(|err| DocumentError::ExtractionFailure(format!("failed to parse PDF: {err}")))?;

    if document.is_encrypted() {
        return Err(DocumentError::ExtractionFailure(
            "PDF is encrypted".to_string(),
        ));
    }

    let page_numbers = document.get_pages().into_keys().collect::<Vec<u32>>();
    if page_numbers.is_empty() {
        return Err(DocumentError::ExtractionFailure(
            "PDF contains no pages".to_string(),
        ));
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        let text = match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(err) => {
                warn!(page = page_number, error = %err, "failed to extract page text");
                String::new()
            }
        };
        pages.push(text);
    }

    Ok(pages)
}
