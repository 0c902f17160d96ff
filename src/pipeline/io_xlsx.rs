// Primitives for reading the Excel workbooks.

use calamine::{DataType, Range, Reader, Xlsx};
use std::io::Cursor;

use log::debug;
use snafu::prelude::*;

use crate::pipeline::*;

pub type WorkbookBytes<'a> = Xlsx<Cursor<&'a [u8]>>;

static EMPTY_CELL: DataType = DataType::Empty;

pub fn sheet_range(workbook: &mut WorkbookBytes, sheet: &str) -> PipelineResult<Range<DataType>> {
    workbook
        .worksheet_range(sheet)
        .context(MissingSheetSnafu { sheet })?
        .context(OpeningExcelSnafu {
            origin: format!("sheet '{}'", sheet),
        })
}

pub fn first_sheet_range(workbook: &mut WorkbookBytes) -> PipelineResult<Range<DataType>> {
    workbook
        .worksheet_range_at(0)
        .context(EmptyWorkbookSnafu {})?
        .context(OpeningExcelSnafu {
            origin: "first sheet",
        })
}

/// The header cells of a sheet, converted to text.
pub fn header_row(range: &Range<DataType>, sheet: &str) -> PipelineResult<Vec<String>> {
    let header = range.rows().next().context(EmptySheetSnafu { sheet })?;
    debug!("header_row: sheet '{}' header: {:?}", sheet, header);
    Ok(header.iter().map(cell_to_string).collect())
}

/// Finds the position of a column whose (trimmed) header matches one of the
/// accepted spellings, tried in order.
pub fn find_column(headers: &[String], accepted: &[&str]) -> Option<usize> {
    for candidate in accepted.iter() {
        let wanted = candidate.trim();
        if let Some(idx) = headers.iter().position(|h| h.trim() == wanted) {
            return Some(idx);
        }
    }
    None
}

pub fn require_column(headers: &[String], accepted: &[&str], sheet: &str) -> PipelineResult<usize> {
    find_column(headers, accepted).context(MissingColumnSnafu {
        sheet,
        column: accepted[0],
    })
}

pub fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) => format!("{}", f),
        DataType::Int(i) => format!("{}", i),
        DataType::Bool(b) => format!("{}", b),
        DataType::DateTime(f) => format!("{}", f),
        _ => String::new(),
    }
}

/// Numeric view of a cell. Anything that cannot be parsed as a number is
/// absent here and coerced to zero downstream by the metric engine.
pub fn cell_to_score(cell: &DataType) -> Option<f64> {
    match cell {
        DataType::Float(f) => Some(*f),
        DataType::Int(i) => Some(*i as f64),
        DataType::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Row access that treats a short row as padded with empty cells.
pub fn row_cell<'a>(row: &'a [DataType], idx: usize) -> &'a DataType {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn find_column_exact_and_trimmed() {
        let hs = headers(&["Periodo", " DNI ", "Nombre"]);
        assert_eq!(find_column(&hs, &["DNI"]), Some(1));
        assert_eq!(find_column(&hs, &["Periodo"]), Some(0));
        assert_eq!(find_column(&hs, &["Apellido(s)"]), None);
    }

    #[test]
    fn find_column_tries_spellings_in_order() {
        let hs = headers(&["NRO DE DOCUMENTO", "N° DE DOCUMENTO DE IDENTIDAD"]);
        let accepted = ["N° DE DOCUMENTO DE IDENTIDAD", "NRO DE DOCUMENTO"];
        assert_eq!(find_column(&hs, &accepted), Some(1));
    }

    #[test]
    fn cell_conversions() {
        assert_eq!(cell_to_string(&DataType::Float(12345678.0)), "12345678");
        assert_eq!(cell_to_string(&DataType::Int(2024)), "2024");
        assert_eq!(cell_to_string(&DataType::Empty), "");

        assert_eq!(cell_to_score(&DataType::Float(17.5)), Some(17.5));
        assert_eq!(cell_to_score(&DataType::Int(15)), Some(15.0));
        assert_eq!(
            cell_to_score(&DataType::String(" 12.25 ".to_string())),
            Some(12.25)
        );
        assert_eq!(cell_to_score(&DataType::String("N/A".to_string())), None);
        assert_eq!(cell_to_score(&DataType::String("".to_string())), None);
        assert_eq!(cell_to_score(&DataType::Empty), None);
    }

    #[test]
    fn short_rows_read_as_empty() {
        let row = vec![DataType::Int(1)];
        assert_eq!(row_cell(&row, 5), &DataType::Empty);
    }
}
