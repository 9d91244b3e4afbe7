use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, warn};

use super::ParseError;
use super::cell::{CellValue, parse_finite_f64};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    Spreadsheet,
    Csv,
}

impl GridFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodedSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

pub fn decode_grids(
    content: &[u8],
    filename: &str,
    format: GridFormat,
) -> Result<Vec<DecodedSheet>, ParseError> {
    match format {
        GridFormat::Spreadsheet => decode_spreadsheet(content, filename),
        GridFormat::Csv => decode_csv(content, filename),
    }
}

fn decode_spreadsheet(content: &[u8], filename: &str) -> Result<Vec<DecodedSheet>, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content)).map_err(|err| {
        ParseError::UnreadableInput {
            filename: filename.to_string(),
            reason: err.to_string(),
        }
    })?;

    let sheet_names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());
    let mut failures = Vec::<String>::new();

    for name in sheet_names {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(err) => {
                warn!(sheet = %name, error = %err, "failed to read worksheet");
                failures.push(format!("{name}: {err}"));
                continue;
            }
        };

        let width = range.width();
        let leading_blank_rows = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let mut rows = Vec::with_capacity(leading_blank_rows + range.height());
        rows.extend((0..leading_blank_rows).map(|_| vec![CellValue::Null; width]));
        rows.extend(
            range
                .rows()
                .map(|row| row.iter().map(cell_from_data).collect::<Vec<CellValue>>()),
        );

        debug!(sheet = %name, rows = rows.len(), columns = width, "decoded worksheet");
        sheets.push(DecodedSheet { name, rows });
    }

    if sheets.is_empty() && !failures.is_empty() {
        return Err(ParseError::UnreadableInput {
            filename: filename.to_string(),
            reason: failures.join("; "),
        });
    }

    Ok(sheets)
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Int(value) => CellValue::Integer(*value),
        Data::Float(value) if value.is_finite() => CellValue::Number(*value),
        Data::Float(_) => CellValue::Null,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Bool(flag) => CellValue::text(if *flag { "TRUE" } else { "FALSE" }),
        Data::DateTime(value) => match value.as_datetime() {
            Some(timestamp) => CellValue::Text(render_timestamp(timestamp)),
            None => CellValue::Number(value.as_f64()),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        Data::Error(err) => CellValue::Text(err.to_string()),
    }
}

fn render_timestamp(timestamp: NaiveDateTime) -> String {
    if timestamp.num_seconds_from_midnight() == 0 {
        timestamp.format("%Y-%m-%d").to_string()
    } else {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// The whole file is a single sheet named after the file stem.
fn decode_csv(content: &[u8], filename: &str) -> Result<Vec<DecodedSheet>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut rows = Vec::<Vec<CellValue>>::new();
    for record in reader.records() {
        let record = record.map_err(|err| ParseError::UnreadableInput {
            filename: filename.to_string(),
            reason: err.to_string(),
        })?;
        rows.push(
            record
                .iter()
                .map(cell_from_field)
                .collect(),
        );
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, CellValue::Null);
    }

    let name = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("Sheet1")
        .to_string();

    Ok(vec![DecodedSheet { name, rows }])
}

/// Integers, then finite floats, else text. Bare years stay text so a
/// row of year labels still scores as a header.
fn cell_from_field(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    if is_bare_year(trimmed) {
        return CellValue::text(field);
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return CellValue::Integer(value);
    }
    match parse_finite_f64(trimmed) {
        Some(value) => CellValue::Number(value),
        None => CellValue::text(field),
    }
}

fn is_bare_year(field: &str) -> bool {
    field.len() == 4
        && field.bytes().all(|byte| byte.is_ascii_digit())
        && (field.starts_with("19") || field.starts_with("20"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_are_padded_to_rectangle() {
        let content = b"Country,2019,2020\nCanada,10\nMexico,,20\n";
        let sheets = decode_grids(content, "gdp.csv", GridFormat::Csv).unwrap();

        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "gdp");
        assert!(sheets[0].rows.iter().all(|row| row.len() == 3));
        assert_eq!(sheets[0].rows[1][2], CellValue::Null);
        assert_eq!(sheets[0].rows[2][1], CellValue::Null);
        assert_eq!(sheets[0].rows[2][2], CellValue::Integer(20));
    }

    #[test]
    fn csv_fields_are_typed_except_bare_years() {
        let content = b"Country,2019,Share
Canada, 38 ,12.5
Peru,NaN,1e3
";
        let sheets = decode_grids(content, "data.csv", GridFormat::Csv).unwrap();
        let rows = &sheets[0].rows;

        assert_eq!(rows[0][1], CellValue::text("2019"));
        assert_eq!(rows[1][0], CellValue::text("Canada"));
        assert_eq!(rows[1][1], CellValue::Integer(38));
        assert_eq!(rows[1][2], CellValue::Number(12.5));
        assert_eq!(rows[2][1], CellValue::text("NaN"));
        assert_eq!(rows[2][2], CellValue::Number(1000.0));
    }

    #[test]
    fn invalid_utf8_csv_is_unreadable() {
        let content = b"a,b\n\xff\xfe,c\n";
        let err = decode_grids(content, "broken.csv", GridFormat::Csv).unwrap_err();
        assert!(matches!(err, ParseError::UnreadableInput { .. }));
    }

    #[test]
    fn garbage_spreadsheet_is_unreadable() {
        let err = decode_grids(b"definitely not a workbook", "book.xlsx", GridFormat::Spreadsheet)
            .unwrap_err();
        assert!(matches!(err, ParseError::UnreadableInput { .. }));
    }

    #[test]
    fn extension_selects_format() {
        assert_eq!(GridFormat::from_extension("XLSX"), Some(GridFormat::Spreadsheet));
        assert_eq!(GridFormat::from_extension("csv"), Some(GridFormat::Csv));
        assert_eq!(GridFormat::from_extension("pdf"), None);
    }
}
