use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub(super) struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub(super) fn split_cells(line: &str, separator: &Regex) -> Vec<String> {
    separator
        .split(line.trim())
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect()
}

/// Runs of two or more consecutive multi-cell lines with the same cell count.
/// The first line of a run is its header.
pub(super) fn detect_tables(page_text: &str, separator: &Regex) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    for line in page_text.lines() {
        let cells = split_cells(line, separator);

        if cells.len() < 2 {
            flush_run(&mut run, &mut tables);
            continue;
        }

        if run.first().is_some_and(|first| first.len() != cells.len()) {
            flush_run(&mut run, &mut tables);
        }
        run.push(cells);
    }
    flush_run(&mut run, &mut tables);

    tables
}

fn flush_run(run: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>) {
    if run.len() >= 2 {
        let mut rows = std::mem::take(run);
        let header = rows.remove(0);
        tables.push(RawTable { header, rows });
    } else {
        run.clear();
    }
}
