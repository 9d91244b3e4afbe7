use serde::Serialize;
use tracing::{debug, warn};

use super::cell::{CellValue, Row, parse_finite_f64};
use super::semantic::{SemanticColumn, SemanticRole, SemanticTable};
use crate::config::HeuristicConfig;

const MISSING_VALUE_TOKENS: &[&str] = &[
    "..", "...", "NA", "N/A", "#N/A", "", "-", "--", "NaN", "nan",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub input_rows: usize,
    pub required_role_dropped: usize,
    pub density_dropped: usize,
    pub surviving_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TableDropReason {
    TooFewRows { surviving: usize, minimum: usize },
    MissingRoleCoverage { detail: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CleaningOutcome {
    Kept {
        table: SemanticTable,
        stats: CleaningStats,
    },
    Dropped {
        reason: TableDropReason,
        stats: CleaningStats,
    },
}

pub fn clean_table(table: &SemanticTable, config: &HeuristicConfig) -> CleaningOutcome {
    let mut stats = CleaningStats {
        input_rows: table.rows.len(),
        ..CleaningStats::default()
    };

    if config.enforce_role_coverage
        && let Some(detail) = missing_role_coverage(&table.columns)
    {
        warn!(table = %table.name, detail = %detail, "table dropped: role coverage");
        return CleaningOutcome::Dropped {
            reason: TableDropReason::MissingRoleCoverage { detail },
            stats,
        };
    }

    let mut rows = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let cleaned = clean_row(row, &table.columns);

        if !has_required_values(&cleaned, &table.columns) {
            stats.required_role_dropped += 1;
            continue;
        }

        if !has_enough_data(&cleaned, config.min_non_null_ratio) {
            stats.density_dropped += 1;
            continue;
        }

        rows.push(cleaned);
    }
    stats.surviving_rows = rows.len();

    debug!(
        table = %table.name,
        input_rows = stats.input_rows,
        required_role_dropped = stats.required_role_dropped,
        density_dropped = stats.density_dropped,
        surviving_rows = stats.surviving_rows,
        "cleaned semantic table"
    );

    if rows.len() < config.min_rows_per_table {
        warn!(
            table = %table.name,
            surviving_rows = rows.len(),
            minimum = config.min_rows_per_table,
            "table dropped: too few usable rows"
        );
        return CleaningOutcome::Dropped {
            reason: TableDropReason::TooFewRows {
                surviving: rows.len(),
                minimum: config.min_rows_per_table,
            },
            stats,
        };
    }

    CleaningOutcome::Kept {
        table: SemanticTable {
            name: table.name.clone(),
            sheet: table.sheet.clone(),
            columns: table.columns.clone(),
            rows,
            confidence: table.confidence,
        },
        stats,
    }
}

fn missing_role_coverage(columns: &[SemanticColumn]) -> Option<String> {
    let count = |role: SemanticRole| columns.iter().filter(|column| column.role == role).count();

    if count(SemanticRole::YearValue) == 0 {
        return Some("no year-value column".to_string());
    }
    if count(SemanticRole::Country) > 1 {
        return Some("more than one country column".to_string());
    }
    if count(SemanticRole::Indicator) == 0 {
        return Some("no indicator column".to_string());
    }
    None
}

fn clean_row(row: &Row, columns: &[SemanticColumn]) -> Row {
    columns
        .iter()
        .map(|column| {
            let value = row
                .get(&column.name)
                .map(|value| clean_value(value, column.role))
                .unwrap_or(CellValue::Null);
            (column.name.clone(), value)
        })
        .collect()
}

fn has_required_values(row: &Row, columns: &[SemanticColumn]) -> bool {
    columns
        .iter()
        .filter(|column| column.role.is_required())
        .all(|column| row.get(&column.name).is_some_and(|value| !value.is_null()))
}

fn has_enough_data(row: &Row, min_ratio: f64) -> bool {
    if row.is_empty() {
        return false;
    }
    let non_null = row.values().filter(|value| !value.is_null()).count();
    non_null as f64 / row.len() as f64 >= min_ratio
}

pub fn clean_value(value: &CellValue, role: SemanticRole) -> CellValue {
    match role {
        SemanticRole::YearValue => clean_year_value(value),
        SemanticRole::Country => map_text(value, |text| title_case(text.trim())),
        SemanticRole::Indicator => map_text(value, |text| {
            text.split_whitespace().collect::<Vec<&str>>().join(" ")
        }),
        SemanticRole::CountryCode | SemanticRole::IndicatorCode => {
            map_text(value, |text| text.trim().to_uppercase().replace(' ', ""))
        }
        SemanticRole::Unknown => map_text(value, |text| text.trim().to_string()),
    }
}

fn map_text(value: &CellValue, clean: impl Fn(&str) -> String) -> CellValue {
    match value {
        CellValue::Text(text) => CellValue::Text(clean(text)),
        other => other.clone(),
    }
}

fn clean_year_value(value: &CellValue) -> CellValue {
    match value {
        CellValue::Null => CellValue::Null,
        CellValue::Integer(number) => CellValue::Number(*number as f64),
        CellValue::Number(number) => CellValue::Number(*number),
        CellValue::Text(text) => {
            let trimmed = text.trim();
            if MISSING_VALUE_TOKENS.contains(&trimmed) {
                return CellValue::Null;
            }

            let digits = trimmed
                .chars()
                .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
                .collect::<String>();
            parse_finite_f64(&digits)
                .map(CellValue::Number)
                .unwrap_or(CellValue::Null)
        }
    }
}

fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_is_letter = false;

    for ch in input.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }

    out
}
