use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Header cleanup shared by PDF tables and the reference sheet so field names
/// line up between the two sources.
pub fn normalize_column_name(raw: &str, index: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("col_{index}")
    } else {
        trimmed.to_lowercase()
    }
}

/// Prefix of at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &input[..byte_index],
        None => input,
    }
}

/// Parses amounts like `"$1,234.50"`, `"-20"` or `" 5 "`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned = raw
        .chars()
        .filter(|character| !matches!(character, '$' | ',' | ' '))
        .collect::<String>();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_column_name_trims_lowercases_and_synthesizes() {
        assert_eq!(normalize_column_name("  Patient ID ", 0), "patient id");
        assert_eq!(normalize_column_name("", 3), "col_3");
        assert_eq!(normalize_column_name("   ", 1), "col_1");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[test]
    fn parse_numeric_strips_currency_formatting() {
        assert_eq!(parse_numeric("$1,234.50"), Some(1234.5));
        assert_eq!(parse_numeric("-20"), Some(-20.0));
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn sha256_bytes_is_hex_digest() {
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
