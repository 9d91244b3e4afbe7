use serde::Serialize;
use tracing::debug;

use super::cell::Row;
use super::normalize::VALUE_COLUMN;
use super::sanitize::SanitizedTable;
use super::years::YearTokens;

const COUNTRY_KEYS: &[&str] = &["country", "nation", "state"];
const COUNTRY_CODE_KEYS: &[&str] = &["iso", "code", "country_code"];
const INDICATOR_KEYS: &[&str] = &["indicator", "series", "metric", "name"];
const INDICATOR_CODE_KEYS: &[&str] = &["indicator_code", "series_code", "code"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    Country,
    CountryCode,
    Indicator,
    IndicatorCode,
    YearValue,
    Unknown,
}

impl SemanticRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticRole::Country => "country",
            SemanticRole::CountryCode => "country_code",
            SemanticRole::Indicator => "indicator",
            SemanticRole::IndicatorCode => "indicator_code",
            SemanticRole::YearValue => "year_value",
            SemanticRole::Unknown => "unknown",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            SemanticRole::Country | SemanticRole::Indicator | SemanticRole::YearValue
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticColumn {
    pub name: String,
    pub role: SemanticRole,
    pub year: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticTable {
    pub name: String,
    pub sheet: String,
    pub columns: Vec<SemanticColumn>,
    pub rows: Vec<Row>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticDocument {
    pub tables: Vec<SemanticTable>,
}

pub fn analyze_table(table: &SanitizedTable, years: &YearTokens) -> SemanticTable {
    let columns = table
        .columns
        .iter()
        .map(|column| {
            let (role, year) = infer_role(column, table.unpivoted, years);
            SemanticColumn {
                name: column.clone(),
                role,
                year,
            }
        })
        .collect::<Vec<_>>();

    for column in &columns {
        debug!(table = %table.name, column = %column.name, role = column.role.as_str(), "assigned role");
    }

    SemanticTable {
        name: table.name.clone(),
        sheet: table.sheet.clone(),
        columns,
        rows: table.rows.clone(),
        confidence: table.confidence,
    }
}

/// First match wins, in fixed priority order.
pub fn infer_role(column: &str, unpivoted: bool, years: &YearTokens) -> (SemanticRole, Option<i64>) {
    let name = column.to_lowercase();

    if let Some(year) = years.find(&name) {
        return (SemanticRole::YearValue, Some(year));
    }

    if unpivoted && name == VALUE_COLUMN {
        return (SemanticRole::YearValue, None);
    }

    let contains_any = |keys: &[&str]| keys.iter().any(|key| name.contains(key));

    let role = if contains_any(COUNTRY_KEYS) {
        SemanticRole::Country
    } else if contains_any(COUNTRY_CODE_KEYS) {
        SemanticRole::CountryCode
    } else if contains_any(INDICATOR_KEYS) {
        SemanticRole::Indicator
    } else if contains_any(INDICATOR_CODE_KEYS) {
        SemanticRole::IndicatorCode
    } else {
        SemanticRole::Unknown
    };

    (role, None)
}
