use tracing::{debug, info};

use super::cell::CellValue;
use super::grid::DecodedSheet;
use crate::config::HeuristicConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub grid: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawWorkbook {
    pub sheets: Vec<RawSheet>,
}

const INVISIBLE_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

pub fn load_workbook(sheets: &[DecodedSheet], config: &HeuristicConfig) -> RawWorkbook {
    let mut loaded = Vec::with_capacity(sheets.len());

    for sheet in sheets {
        if config.is_ignored_sheet(&sheet.name) {
            info!(sheet = %sheet.name, "skipping ignored sheet");
            continue;
        }

        let grid = sheet
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| normalize_cell(cell, config))
                    .collect::<Vec<CellValue>>()
            })
            .filter(|row| row.iter().any(|cell| !cell.is_null()))
            .collect::<Vec<_>>();

        debug!(
            sheet = %sheet.name,
            decoded_rows = sheet.rows.len(),
            kept_rows = grid.len(),
            "loaded raw sheet"
        );

        if grid.is_empty() {
            continue;
        }

        loaded.push(RawSheet {
            name: sheet.name.clone(),
            grid,
        });
    }

    RawWorkbook { sheets: loaded }
}

fn normalize_cell(cell: &CellValue, config: &HeuristicConfig) -> CellValue {
    let Some(text) = cell.as_text() else {
        return cell.clone();
    };

    let cleaned = text
        .replace('\u{00A0}', " ")
        .replace(INVISIBLE_CHARS, "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || config.is_null_marker(cleaned) {
        return CellValue::Null;
    }

    CellValue::text(cleaned)
}
