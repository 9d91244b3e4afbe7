use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::cell::{CellValue, Row, parse_finite_f64};
use super::normalize::NormalizedTable;
use crate::config::HeuristicConfig;

const NULL_EQUIVALENTS: &[&str] = &["", "-", "N/A", "n/a"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeStats {
    pub metadata_rows_dropped: usize,
    pub empty_rows_dropped: usize,
    /// Text cells left in columns inferred as numeric. Their value is kept.
    pub coercion_misses: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedTable {
    pub name: String,
    pub sheet: String,
    pub columns: Vec<String>,
    pub column_types: BTreeMap<String, ColumnType>,
    pub rows: Vec<Row>,
    pub confidence: f64,
    pub unpivoted: bool,
    pub stats: SanitizeStats,
}

pub fn sanitize_table(table: &NormalizedTable, config: &HeuristicConfig) -> SanitizedTable {
    let normalized = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let key = normalize_key(column);
            if key.is_empty() {
                format!("column_{index}")
            } else {
                key
            }
        })
        .collect::<Vec<String>>();
    let columns = dedupe_keys(&normalized);

    let mut stats = SanitizeStats::default();
    let mut rows = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let clean_row = table
            .columns
            .iter()
            .zip(&columns)
            .map(|(old_key, new_key)| {
                let value = row.get(old_key).map(clean_value).unwrap_or(CellValue::Null);
                (new_key.clone(), value)
            })
            .collect::<Row>();

        if is_metadata_row(&clean_row, config.metadata_string_ratio) {
            stats.metadata_rows_dropped += 1;
            continue;
        }

        if clean_row.values().all(CellValue::is_null) {
            stats.empty_rows_dropped += 1;
            continue;
        }

        rows.push(clean_row);
    }

    let column_types = columns
        .iter()
        .map(|column| {
            let column_type = infer_type(
                rows.iter().filter_map(|row| row.get(column)),
                config.numeric_column_ratio,
            );
            (column.clone(), column_type)
        })
        .collect::<BTreeMap<String, ColumnType>>();

    stats.coercion_misses = rows
        .iter()
        .flat_map(|row| row.iter())
        .filter(|(column, value)| {
            value.is_text() && column_types.get(*column) == Some(&ColumnType::Numeric)
        })
        .count();

    debug!(
        table = %table.name,
        rows = rows.len(),
        metadata_rows_dropped = stats.metadata_rows_dropped,
        empty_rows_dropped = stats.empty_rows_dropped,
        coercion_misses = stats.coercion_misses,
        "sanitized table"
    );

    SanitizedTable {
        name: table.name.clone(),
        sheet: table.sheet.clone(),
        columns,
        column_types,
        rows,
        confidence: table.confidence,
        unpivoted: table.unpivoted,
        stats,
    }
}

pub fn normalize_key(key: &str) -> String {
    let ascii = key.nfkd().filter(char::is_ascii).collect::<String>();
    let lowered = ascii.to_ascii_lowercase().replace('%', "percent");

    let mut out = String::with_capacity(lowered.len());
    let mut pending_separator = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch);
        } else {
            pending_separator = true;
        }
    }

    out
}

/// First occurrence keeps its name; later duplicates get `_2`, `_3`, ... in
/// order of appearance, skipping any name already taken.
pub fn dedupe_keys(keys: &[String]) -> Vec<String> {
    let mut seen = HashMap::<&str, usize>::new();
    let mut emitted = HashSet::<String>::new();
    let mut out = Vec::with_capacity(keys.len());

    for key in keys {
        let count = seen.entry(key.as_str()).or_insert(0);
        *count += 1;

        let mut candidate = if *count == 1 {
            key.clone()
        } else {
            format!("{key}_{count}")
        };
        while emitted.contains(&candidate) {
            *count += 1;
            candidate = format!("{key}_{count}");
        }

        emitted.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

pub fn clean_value(value: &CellValue) -> CellValue {
    match value {
        CellValue::Text(text) => {
            let trimmed = text.trim();
            if NULL_EQUIVALENTS.contains(&trimmed) {
                return CellValue::Null;
            }
            match parse_finite_f64(trimmed) {
                Some(number) => CellValue::Number(number),
                None => CellValue::text(trimmed),
            }
        }
        other => other.clone(),
    }
}

fn is_metadata_row(row: &Row, max_string_ratio: f64) -> bool {
    let non_null = row.values().filter(|value| !value.is_null()).count();
    if non_null == 0 {
        return false;
    }

    let strings = row.values().filter(|value| value.is_text()).count();
    strings as f64 / non_null as f64 > max_string_ratio
}

fn infer_type<'a>(values: impl Iterator<Item = &'a CellValue>, numeric_ratio: f64) -> ColumnType {
    let mut non_null = 0usize;
    let mut numeric = 0usize;
    for value in values.filter(|value| !value.is_null()) {
        non_null += 1;
        if value.is_numeric() {
            numeric += 1;
        }
    }

    if numeric as f64 / non_null.max(1) as f64 > numeric_ratio {
        ColumnType::Numeric
    } else {
        ColumnType::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn normalize_key_handles_accents_percent_and_punctuation() {
        assert_eq!(normalize_key("Pays / Région"), "pays_region");
        assert_eq!(normalize_key("  GDP growth (%) "), "gdp_growth_percent");
        assert_eq!(normalize_key("__Country--Name__"), "country_name");
        assert_eq!(normalize_key("2019"), "2019");
        assert_eq!(normalize_key("***"), "");
    }

    #[test]
    fn dedupe_keeps_first_and_suffixes_in_order() {
        assert_eq!(
            dedupe_keys(&keys(&["a", "b", "a", "a", "b"])),
            keys(&["a", "b", "a_2", "a_3", "b_2"])
        );
        assert_eq!(
            dedupe_keys(&keys(&["a", "a", "a_2"])),
            keys(&["a", "a_2", "a_2_2"])
        );
    }

    #[test]
    fn clean_value_coerces_numbers_and_keeps_misses() {
        assert_eq!(clean_value(&CellValue::text(" 12.5 ")), CellValue::Number(12.5));
        assert_eq!(clean_value(&CellValue::text("N/A")), CellValue::Null);
        assert_eq!(clean_value(&CellValue::text(" - ")), CellValue::Null);
        assert_eq!(clean_value(&CellValue::text(" 1,234 ")), CellValue::text("1,234"));
        assert_eq!(clean_value(&CellValue::Integer(0)), CellValue::Integer(0));
    }

    #[test]
    fn drops_metadata_and_empty_rows_and_infers_types() {
        let config = HeuristicConfig::default();
        let columns = keys(&["Country", "GDP %", "Source"]);
        let row = |country: CellValue, gdp: CellValue, source: CellValue| -> Row {
            [("Country", country), ("GDP %", gdp), ("Source", source)]
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect()
        };

        let table = NormalizedTable {
            name: "Data_table".to_string(),
            sheet: "Data".to_string(),
            columns,
            rows: vec![
                row(CellValue::text("Canada"), CellValue::text("1.5"), CellValue::Null),
                row(CellValue::text("Source: IMF"), CellValue::Null, CellValue::text("IMF")),
                row(CellValue::text("-"), CellValue::text("n/a"), CellValue::Null),
                row(CellValue::text("Mexico"), CellValue::Integer(2), CellValue::Null),
                row(CellValue::text("Peru"), CellValue::Number(3.0), CellValue::Null),
                row(CellValue::text("Chile"), CellValue::Number(4.0), CellValue::Null),
                row(CellValue::text("Bolivia"), CellValue::Number(5.0), CellValue::Null),
                row(CellValue::text("Cuba"), CellValue::text("est."), CellValue::Integer(1)),
            ],
            confidence: 0.9,
            unpivoted: false,
            blank_rows_dropped: 0,
        };

        let sanitized = sanitize_table(&table, &config);
        assert_eq!(sanitized.columns, keys(&["country", "gdp_percent", "source"]));
        assert_eq!(sanitized.stats.metadata_rows_dropped, 1);
        assert_eq!(sanitized.stats.empty_rows_dropped, 1);
        assert_eq!(sanitized.rows.len(), 6);
        assert_eq!(sanitized.rows[0]["gdp_percent"], CellValue::Number(1.5));
        assert_eq!(sanitized.column_types["country"], ColumnType::String);
        // 5 of 6 non-null values are numeric: 0.83 > 0.8.
        assert_eq!(sanitized.column_types["gdp_percent"], ColumnType::Numeric);
        assert_eq!(sanitized.stats.coercion_misses, 1);
        assert_eq!(sanitized.rows[5]["gdp_percent"], CellValue::text("est."));
    }
}
