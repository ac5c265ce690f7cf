use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::file_name_string;

/// One document handed to the batch. A read failure is carried along so it
/// still gets its own outcome.
#[derive(Debug)]
pub struct DocumentInput {
    pub source_file: String,
    pub data: Result<Vec<u8>, String>,
}

impl DocumentInput {
    pub fn read(path: &Path) -> Self {
        match fs::read(path) {
            Ok(data) => Self::from_bytes(file_name_string(path), data),
            Err(err) => Self {
                source_file: file_name_string(path),
                data: Err(format!("failed to read {}: {err}", path.display())),
            },
        }
    }

    pub fn from_bytes(source_file: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            source_file: source_file.into(),
            data: Ok(data),
        }
    }
}

/// Non-recursive listing of `.pdf` files (any case), sorted by path.
pub fn discover_pdfs(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries = fs::read_dir(directory)
        .with_context(|| format!("failed to read {}", directory.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", directory.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        if has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }

    pdfs.sort();
    Ok(pdfs)
}

pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
