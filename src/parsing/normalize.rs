use tracing::debug;

use super::cell::{CellValue, Row};
use super::raw_loader::RawSheet;
use super::sanitize::dedupe_keys;
use super::structure::DetectedTable;
use super::years::YearTokens;

pub const YEAR_COLUMN: &str = "year";
pub const VALUE_COLUMN: &str = "value";

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub name: String,
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub confidence: f64,
    pub unpivoted: bool,
    pub blank_rows_dropped: usize,
}

pub fn normalize_table(sheet: &RawSheet, table: &DetectedTable) -> NormalizedTable {
    // Lower-casing can merge labels such as "GDP" and "gdp"; suffix them so
    // neither value is overwritten.
    let columns = dedupe_keys(
        &table
            .columns
            .iter()
            .map(|column| column.to_lowercase())
            .collect::<Vec<String>>(),
    );

    let mut rows = Vec::new();
    let mut blank_rows_dropped = 0usize;

    let region = sheet
        .grid
        .iter()
        .take(table.data_end_row + 1)
        .skip(table.data_start_row);
    for values in region {
        let row = columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let value = values.get(index).cloned().unwrap_or(CellValue::Null);
                (column.clone(), value)
            })
            .collect::<Row>();

        if row.values().all(CellValue::is_blank) {
            blank_rows_dropped += 1;
            continue;
        }
        rows.push(row);
    }

    debug!(
        sheet = %table.sheet,
        rows = rows.len(),
        blank_rows_dropped,
        "normalized table"
    );

    NormalizedTable {
        name: format!("{}_table", table.sheet),
        sheet: table.sheet.clone(),
        columns,
        rows,
        confidence: table.confidence,
        unpivoted: false,
        blank_rows_dropped,
    }
}

/// Folds year-coded columns into long `(year, value)` rows. One output row is
/// emitted per non-null year cell; zero values are kept.
pub fn unpivot_years(table: &NormalizedTable, years: &YearTokens) -> NormalizedTable {
    let mut static_columns = Vec::<String>::new();
    let mut year_columns = Vec::<(String, i64)>::new();

    for column in &table.columns {
        match years.find(column) {
            Some(year) => year_columns.push((column.clone(), year)),
            None => static_columns.push(column.clone()),
        }
    }

    if year_columns.is_empty() {
        return table.clone();
    }

    // Static columns already called `year` or `value` move to a suffixed key.
    let mut keys = vec![YEAR_COLUMN.to_string(), VALUE_COLUMN.to_string()];
    keys.extend(static_columns.iter().cloned());
    let targets = dedupe_keys(&keys).split_off(2);
    let static_columns = static_columns
        .into_iter()
        .zip(targets)
        .collect::<Vec<(String, String)>>();

    let mut rows = Vec::new();
    for row in &table.rows {
        for (column, year) in &year_columns {
            let value = row.get(column).cloned().unwrap_or(CellValue::Null);
            if value.is_null() {
                continue;
            }

            let mut long_row = static_columns
                .iter()
                .map(|(source, target)| {
                    let cell = row.get(source).cloned().unwrap_or(CellValue::Null);
                    (target.clone(), cell)
                })
                .collect::<Row>();
            long_row.insert(YEAR_COLUMN.to_string(), CellValue::Integer(*year));
            long_row.insert(VALUE_COLUMN.to_string(), value);
            rows.push(long_row);
        }
    }

    debug!(
        table = %table.name,
        year_columns = year_columns.len(),
        wide_rows = table.rows.len(),
        long_rows = rows.len(),
        "unpivoted year columns"
    );

    let mut columns = static_columns
        .into_iter()
        .map(|(_, target)| target)
        .collect::<Vec<String>>();
    columns.push(YEAR_COLUMN.to_string());
    columns.push(VALUE_COLUMN.to_string());

    NormalizedTable {
        name: table.name.clone(),
        sheet: table.sheet.clone(),
        columns,
        rows,
        confidence: table.confidence,
        unpivoted: true,
        blank_rows_dropped: table.blank_rows_dropped,
    }
}
