use serde::Serialize;
use tracing::debug;

use super::cell::CellValue;
use super::grid::DecodedSheet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetIntrospection {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub non_empty_ratio: f64,
    /// Merged ranges are not reported by the grid decoder, so this is always
    /// `None`.
    pub merged_cells_count: Option<usize>,
    pub empty_rows_top: usize,
    pub empty_rows_bottom: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentIntrospection {
    pub file_size: usize,
    pub sheets: Vec<SheetIntrospection>,
}

pub fn introspect(file_size: usize, sheets: &[DecodedSheet]) -> DocumentIntrospection {
    let sheets = sheets.iter().map(introspect_sheet).collect::<Vec<_>>();

    for sheet in &sheets {
        debug!(
            sheet = %sheet.name,
            rows = sheet.rows,
            columns = sheet.columns,
            non_empty_ratio = sheet.non_empty_ratio,
            empty_rows_top = sheet.empty_rows_top,
            empty_rows_bottom = sheet.empty_rows_bottom,
            "sheet introspection"
        );
    }

    DocumentIntrospection { file_size, sheets }
}

fn introspect_sheet(sheet: &DecodedSheet) -> SheetIntrospection {
    let rows = sheet.rows.len();
    let columns = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
    let total_cells = (rows * columns).max(1);

    let non_empty = sheet
        .rows
        .iter()
        .flatten()
        .filter(|cell| !cell.is_blank())
        .count();

    let empty_rows_top = sheet
        .rows
        .iter()
        .take_while(|row| is_blank_row(row))
        .count();
    // A fully blank sheet is counted once, from the top.
    let empty_rows_bottom = if empty_rows_top == rows {
        0
    } else {
        sheet
            .rows
            .iter()
            .rev()
            .take_while(|row| is_blank_row(row))
            .count()
    };

    SheetIntrospection {
        name: sheet.name.clone(),
        rows,
        columns,
        non_empty_ratio: non_empty as f64 / total_cells as f64,
        merged_cells_count: None,
        empty_rows_top,
        empty_rows_bottom,
    }
}

fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_blank)
}
