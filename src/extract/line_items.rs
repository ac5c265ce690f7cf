use anyhow::{Context, Result};
use regex::Regex;

pub(super) const LINE_ITEM_COLUMNS: [&str; 4] = ["item", "quantity", "unit_price", "total_price"];

/// Invoice line shapes for pages without a table layout:
/// `item qty price total` and `item price total`.
pub(super) struct LineItemPatterns {
    with_quantity: Regex,
    without_quantity: Regex,
}

impl LineItemPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            with_quantity: Regex::new(
                r"^(\w.*?)\s+(\d+)\s+\$?([\d,]+\.?\d*)\s+\$?([\d,]+\.?\d*)\s*$",
            )
            .context("failed to compile quantity line item regex")?,
            without_quantity: Regex::new(r"^(\w.*?)\s+\$?([\d,]+\.?\d*)\s+\$?([\d,]+\.?\d*)\s*$")
                .context("failed to compile line item regex")?,
        })
    }

    pub fn parse(&self, text: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();

        for line in text.lines().map(str::trim) {
            if let Some(captures) = self.with_quantity.captures(line) {
                rows.push(vec![
                    captures[1].trim().to_string(),
                    captures[2].to_string(),
                    strip_thousands(&captures[3]),
                    strip_thousands(&captures[4]),
                ]);
            } else if let Some(captures) = self.without_quantity.captures(line) {
                rows.push(vec![
                    captures[1].trim().to_string(),
                    String::new(),
                    strip_thousands(&captures[2]),
                    strip_thousands(&captures[3]),
                ]);
            }
        }

        rows
    }
}

fn strip_thousands(value: &str) -> String {
    value.replace(',', "")
}
