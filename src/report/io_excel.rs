// Reading results from Excel workbooks.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::report::{
    io_common::{simplify_file_name, ColumnLayout},
    *,
};

/// The text of a cell, as it would appear in a CSV export.
///
/// Whole numbers are written without decimals so that a section stored as a number
/// reads the same as a section stored as text.
fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => String::new(),
        x => {
            debug!("cell_to_string: unsupported cell {:?}", x);
            String::new()
        }
    }
}

fn get_range(path: &str, src: &RecordSource) -> ReportResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, &src.excel_worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    let wrange = match &src.excel_worksheet_name {
        Some(worksheet_name) => workbook
            .worksheet_range(worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    Ok(wrange)
}

fn range_to_records(
    wrange: &Range<DataType>,
    src: &RecordSource,
    name: &str,
) -> ReportResult<Vec<RawRecord>> {
    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(h) => h.iter().map(cell_to_string).collect(),
        None => return EmptyExcelSnafu { path: name }.fail(),
    };
    debug!("read_excel_records: {}: header: {:?}", name, header);
    let layout = ColumnLayout::from_header(&header, src, name)?;
    let names = src.municipality_names.as_ref();
    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        res.push(layout.to_raw(&cells, idx + 2, names));
    }
    Ok(res)
}

pub fn read_excel_records(path: &str, src: &RecordSource) -> ReportResult<Vec<RawRecord>> {
    let wrange = get_range(path, src)?;
    range_to_records(&wrange, src, &simplify_file_name(path))
}
