use anyhow::{Context, Result};
use regex::Regex;

/// Finds the label-prefixed numeric identifier (`Patient ID: 12345`, `ID-42`)
/// in extracted text. The first occurrence wins.
pub struct IdentifierResolver {
    pattern: Regex,
}

impl IdentifierResolver {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"(?i)(?:Patient\s*ID|ID)\s*[:\-]?\s*(\d+)")
            .context("failed to compile identifier regex")?;
        Ok(Self { pattern })
    }

    pub fn resolve(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|digits| digits.as_str().to_string())
    }
}
