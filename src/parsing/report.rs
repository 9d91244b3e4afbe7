use serde::Serialize;

use super::cleaner::{CleaningStats, TableDropReason};
use super::introspect::DocumentIntrospection;
use super::sanitize::SanitizeStats;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseReport {
    pub document_id: String,
    pub filename: String,
    pub parser: String,
    pub introspection: Option<DocumentIntrospection>,
    pub tables: Vec<TableReport>,
    pub fact_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Emitted { facts: usize },
    NoDetectableTable,
    LowQualityTable { drop: TableDropReason },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowAccounting {
    pub data_rows: usize,
    pub blank_rows_dropped: usize,
    pub unpivoted_rows: usize,
    pub metadata_rows_dropped: usize,
    pub empty_rows_dropped: usize,
    pub coercion_misses: usize,
    pub required_role_dropped: usize,
    pub density_dropped: usize,
    pub surviving_rows: usize,
}

impl RowAccounting {
    pub fn record_sanitize(&mut self, stats: &SanitizeStats) {
        self.metadata_rows_dropped = stats.metadata_rows_dropped;
        self.empty_rows_dropped = stats.empty_rows_dropped;
        self.coercion_misses = stats.coercion_misses;
    }

    pub fn record_cleaning(&mut self, stats: &CleaningStats) {
        self.required_role_dropped = stats.required_role_dropped;
        self.density_dropped = stats.density_dropped;
        self.surviving_rows = stats.surviving_rows;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub sheet: String,
    pub table: Option<String>,
    pub header_row: Option<usize>,
    pub confidence: Option<f64>,
    pub outcome: TableOutcome,
    pub rows: RowAccounting,
}

impl TableReport {
    pub fn no_table(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            table: None,
            header_row: None,
            confidence: None,
            outcome: TableOutcome::NoDetectableTable,
            rows: RowAccounting::default(),
        }
    }
}
