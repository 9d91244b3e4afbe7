use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::parsing::ParseError;

pub const DEFAULT_PIPELINE_NAME: &str = "raw_ingestion";
pub const DEFAULT_PIPELINE_VERSION: &str = "v1";

const DEFAULT_IGNORED_SHEETS: &[&str] = &[
    "note",
    "notes",
    "instruction",
    "instructions",
    "readme",
    "read me",
    "about",
    "info",
    "code onu",
    "code onu_table",
    "code",
    "codes",
];

const DEFAULT_NULL_MARKERS: &[&str] = &["...", "..", "na", "n/a", "null", "none", "-"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Minimum header-likelihood score for a row to become a header candidate.
    pub header_threshold: f64,
    /// Minimum score for a candidate to be accepted as the final header.
    pub final_header_threshold: f64,
    /// Minimum share of non-empty cells on a final header row.
    pub min_non_empty_ratio: f64,
    /// The row after a final header must score below this.
    pub data_row_max_score: f64,
    /// Labels shorter than this on average earn the short-label bonus.
    pub short_label_max_len: usize,
    pub max_scan_rows: usize,
    pub metadata_string_ratio: f64,
    pub numeric_column_ratio: f64,
    pub min_non_null_ratio: f64,
    pub min_rows_per_table: usize,
    pub enforce_role_coverage: bool,
    pub ignored_sheets: Vec<String>,
    pub null_markers: Vec<String>,
    pub pipeline_name: String,
    pub pipeline_version: String,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            header_threshold: 0.6,
            final_header_threshold: 0.8,
            min_non_empty_ratio: 0.4,
            data_row_max_score: 0.3,
            short_label_max_len: 30,
            max_scan_rows: 100,
            metadata_string_ratio: 0.8,
            numeric_column_ratio: 0.8,
            min_non_null_ratio: 0.8,
            min_rows_per_table: 5,
            enforce_role_coverage: false,
            ignored_sheets: DEFAULT_IGNORED_SHEETS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            null_markers: DEFAULT_NULL_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            pipeline_name: DEFAULT_PIPELINE_NAME.to_string(),
            pipeline_version: DEFAULT_PIPELINE_VERSION.to_string(),
        }
    }
}

impl HeuristicConfig {
    pub fn validate(&self) -> Result<(), ParseError> {
        let ratios = [
            ("header_threshold", self.header_threshold),
            ("final_header_threshold", self.final_header_threshold),
            ("min_non_empty_ratio", self.min_non_empty_ratio),
            ("data_row_max_score", self.data_row_max_score),
            ("metadata_string_ratio", self.metadata_string_ratio),
            ("numeric_column_ratio", self.numeric_column_ratio),
            ("min_non_null_ratio", self.min_non_null_ratio),
        ];

        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParseError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.max_scan_rows == 0 {
            return Err(ParseError::InvalidConfig(
                "max_scan_rows must be greater than zero".to_string(),
            ));
        }

        if self.min_rows_per_table == 0 {
            return Err(ParseError::InvalidConfig(
                "min_rows_per_table must be greater than zero".to_string(),
            ));
        }

        if self.pipeline_version.trim().is_empty() {
            return Err(ParseError::InvalidConfig(
                "pipeline_version must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_ignored_sheet(&self, sheet_name: &str) -> bool {
        let normalized = sheet_name
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join(" ")
            .to_lowercase();
        self.ignored_sheets
            .iter()
            .any(|ignored| ignored.trim().to_lowercase() == normalized)
    }

    pub fn is_null_marker(&self, value: &str) -> bool {
        self.null_markers
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(value))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<HeuristicConfig> {
    let Some(path) = path else {
        return Ok(HeuristicConfig::default());
    };

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: HeuristicConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid heuristic config: {}", path.display()))?;

    info!(path = %path.display(), "loaded heuristic config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: HeuristicConfig =
            serde_json::from_str(r#"{"min_rows_per_table": 1}"#).unwrap();
        assert_eq!(config.min_rows_per_table, 1);
        assert_eq!(config.max_scan_rows, 100);
        assert_eq!(config.pipeline_name, "raw_ingestion");
    }

    #[test]
    fn validate_rejects_out_of_range_ratio() {
        let config = HeuristicConfig {
            min_non_null_ratio: 1.5,
            ..HeuristicConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ParseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_row_minimums() {
        let no_rows = HeuristicConfig {
            min_rows_per_table: 0,
            ..HeuristicConfig::default()
        };
        assert!(matches!(
            no_rows.validate(),
            Err(ParseError::InvalidConfig(message)) if message.contains("min_rows_per_table")
        ));

        let no_scan = HeuristicConfig {
            max_scan_rows: 0,
            ..HeuristicConfig::default()
        };
        assert!(no_scan.validate().is_err());
    }

    #[test]
    fn ignored_sheet_match_is_case_and_space_insensitive() {
        let config = HeuristicConfig::default();
        assert!(config.is_ignored_sheet("  NOTES "));
        assert!(config.is_ignored_sheet("Read   Me"));
        assert!(config.is_ignored_sheet("Code ONU"));
        assert!(!config.is_ignored_sheet("Data"));
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heuristics.json");
        fs::write(&path, r#"{"max_scan_rows": 20, "enforce_role_coverage": true}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.max_scan_rows, 20);
        assert!(config.enforce_role_coverage);
        assert!(load_config(None).unwrap() == HeuristicConfig::default());
    }
}
