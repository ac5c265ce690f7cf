use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::RunManifestHeader;

const RUN_MANIFEST_PREFIX: &str = "reconcile_run_";

pub fn run(args: StatusArgs) -> Result<()> {
    info!(output_dir = %args.output_dir.display(), "status requested");

    let Some(manifest_path) = latest_run_manifest(&args.output_dir)? else {
        warn!(path = %args.output_dir.display(), "no reconcile run manifest found");
        return Ok(());
    };

    let raw = fs::read(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    let manifest: RunManifestHeader = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

    info!(
        path = %manifest_path.display(),
        run_id = %manifest.run_id,
        started_at = %manifest.started_at.unwrap_or_default(),
        completed_at = %manifest.completed_at.unwrap_or_default(),
        reference = %manifest.reference_path.unwrap_or_default(),
        "loaded run manifest"
    );

    match manifest.summary {
        Some(summary) => info!(
            documents = summary.total_documents,
            clean = summary.clean,
            data_errors = summary.data_error,
            identifier_not_found = summary.identifier_not_found,
            identifier_unmatched = summary.identifier_unmatched,
            processing_errors = summary.processing_error,
            discrepancies = summary.total_discrepancies,
            "run summary"
        ),
        None => warn!(path = %manifest_path.display(), "run manifest has no summary"),
    }

    Ok(())
}

/// Manifest names carry a compact UTC timestamp, so the lexically greatest
/// one is the newest.
fn latest_run_manifest(output_dir: &Path) -> Result<Option<PathBuf>> {
    if !output_dir.is_dir() {
        return Ok(None);
    }

    let entries = fs::read_dir(output_dir)
        .with_context(|| format!("failed to read {}", output_dir.display()))?;

    let mut latest: Option<PathBuf> = None;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", output_dir.display()))?;
        let path = entry.path();
        let is_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(RUN_MANIFEST_PREFIX) && name.ends_with(".json"))
            .unwrap_or(false);

        if is_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_newest_run_manifest() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "reconcile_run_20260101T000000Z.json",
            "reconcile_run_20260301T120000Z.json",
            "reconcile_run_20260201T000000Z.json",
            "validation_report_20260401T000000Z.csv",
        ] {
            fs::write(dir.path().join(name), b"{}").unwrap();
        }

        let latest = latest_run_manifest(dir.path()).unwrap().unwrap();
        assert_eq!(
            latest.file_name().unwrap(),
            "reconcile_run_20260301T120000Z.json"
        );
    }

    #[test]
    fn missing_output_dir_has_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(latest_run_manifest(&dir.path().join("absent")).unwrap(), None);
    }
}
