// Primitives for reading CSV files.

use std::io;

use crate::report::{
    io_common::{simplify_file_name, ColumnLayout},
    *,
};

/// Reads a whole table. The first row is the header; cells are trimmed.
pub fn read_table(path: &str) -> ReportResult<(Vec<String>, Vec<Vec<String>>)> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_table_from(rdr)
}

fn read_table_from<R: io::Read>(rdr: csv::Reader<R>) -> ReportResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.trim().to_string()).collect();
        if header.is_none() {
            header = Some(cells);
        } else if cells.iter().any(|c| !c.is_empty()) {
            rows.push(cells);
        }
    }
    match header {
        Some(h) => Ok((h, rows)),
        None => whatever!("The table is empty"),
    }
}

pub fn read_csv_records(path: &str, src: &RecordSource) -> ReportResult<Vec<RawRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_csv_records_from(rdr, src, &simplify_file_name(path))
}

/// Same as `read_csv_records`, over any reader.
pub fn read_csv_records_from<R: io::Read>(
    rdr: csv::Reader<R>,
    src: &RecordSource,
    name: &str,
) -> ReportResult<Vec<RawRecord>> {
    let (header, rows) = read_table_from(rdr)?;
    debug!("read_csv_records: {}: header: {:?}", name, header);
    let layout = ColumnLayout::from_header(&header, src, name)?;
    let names = src.municipality_names.as_ref();
    let res: Vec<RawRecord> = rows
        .iter()
        .enumerate()
        // The header is the first line.
        .map(|(idx, cells)| layout.to_raw(cells, idx + 2, names))
        .collect();
    Ok(res)
}
