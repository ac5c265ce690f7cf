use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::ScanArgs;
use crate::extract::DocumentExtractor;
use crate::identifier::IdentifierResolver;
use crate::model::{ScanEntry, ScanManifest};
use crate::reconcile::discover_pdfs;
use crate::reference::ReferenceIndex;
use crate::util::{file_name_string, now_utc_string, sha256_bytes, write_json_pretty};

pub fn run(args: ScanArgs) -> Result<()> {
    let reference = args
        .reference
        .as_deref()
        .map(|path| ReferenceIndex::load(path, &args.identifier_column))
        .transpose()?;

    let manifest = build_manifest(&args.documents, reference.as_ref())?;
    let unresolved = manifest
        .documents
        .iter()
        .filter(|entry| entry.identifier.is_none())
        .count();

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            unresolved,
            source = %manifest.source_directory,
            "scan dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.documents.join("manifests").join("document_scan.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote scan manifest");
    info!(
        document_count = manifest.document_count,
        unresolved,
        "scan completed"
    );

    Ok(())
}

pub fn build_manifest(directory: &Path, reference: Option<&ReferenceIndex>) -> Result<ScanManifest> {
    let extractor = DocumentExtractor::new()?;
    let resolver = IdentifierResolver::new()?;

    let paths = discover_pdfs(directory)?;
    if paths.is_empty() {
        bail!("no PDFs found in {}", directory.display());
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = file_name_string(&path);
        let data = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;

        let mut entry = ScanEntry {
            filename,
            size_bytes: data.len() as u64,
            sha256: sha256_bytes(&data),
            page_count: None,
            table_count: None,
            identifier: None,
            reference_matches: None,
            error: None,
        };

        match extractor.extract(&data, &entry.filename) {
            Ok(document) => {
                entry.page_count = Some(document.page_count);
                entry.table_count = Some(document.tables.len());
                entry.identifier = resolver.resolve(&document.text);
                entry.reference_matches = reference
                    .zip(entry.identifier.as_deref())
                    .map(|(index, identifier)| index.lookup(identifier).len());
            }
            Err(err) => {
                warn!(document = %entry.filename, error = %err, "failed to extract document");
                entry.error = Some(err.to_string());
            }
        }

        documents.push(entry);
    }

    Ok(ScanManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: directory.display().to_string(),
        document_count: documents.len(),
        documents,
    })
}
