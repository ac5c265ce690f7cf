use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Reader, Sheets, open_workbook_auto};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub(super) struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub(super) fn read_table(path: &Path) -> Result<RawTable> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut rows = if extension == "csv" {
        read_csv_rows(path)?
    } else if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        read_spreadsheet_rows(path)?
    } else {
        bail!("unsupported reference format '{}'", extension);
    };

    if rows.is_empty() {
        bail!("reference data is empty");
    }

    let mut header = rows.remove(0);
    if let Some(first) = header.first_mut() {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }

    Ok(RawTable { header, rows })
}

fn read_spreadsheet_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|err| anyhow!("failed to open spreadsheet: {err}"))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("spreadsheet contains no sheets")?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| anyhow!("failed to read sheet '{sheet_name}': {err}"))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context("failed to open csv")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read csv record")?;
        rows.push(record.iter().map(ToOwned::to_owned).collect());
    }
    Ok(rows)
}

/// Raw text of a cell. Integral floats drop their `.0` so identifiers typed
/// as numbers still compare as the digits a document would show.
pub(super) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        Data::Float(value) => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{}", *value as i64)
            } else {
                format!("{value}")
            }
        }
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => if *value { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => value.as_f64().to_string(),
        },
        Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
        Data::Error(err) => format!("#{err:?}"),
    }
}
