use serde::Serialize;
use tracing::debug;

use super::cell::CellValue;
use super::raw_loader::RawSheet;
use crate::config::HeuristicConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedTable {
    pub sheet: String,
    pub header_row: usize,
    pub data_start_row: usize,
    /// Inclusive.
    pub data_end_row: usize,
    pub columns: Vec<String>,
    pub orientation: Orientation,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeaderCandidate {
    row: usize,
    score: f64,
}

/// Locates the header row and the data block beneath it. Returns `None` when
/// no row scores as a header candidate.
pub fn detect_table(sheet: &RawSheet, config: &HeuristicConfig) -> Option<DetectedTable> {
    let grid = &sheet.grid;
    let candidate = detect_final_header(grid, config)?;

    let columns = extract_columns(&grid[candidate.row]);
    let data_start_row = candidate.row + 1;
    let data_end_row = find_data_end(grid, data_start_row);

    debug!(
        sheet = %sheet.name,
        header_row = candidate.row,
        data_start_row,
        data_end_row,
        columns = columns.len(),
        confidence = candidate.score,
        "detected table"
    );

    Some(DetectedTable {
        sheet: sheet.name.clone(),
        header_row: candidate.row,
        data_start_row,
        data_end_row,
        columns,
        orientation: Orientation::Horizontal,
        confidence: candidate.score,
    })
}

fn detect_final_header(grid: &[Vec<CellValue>], config: &HeuristicConfig) -> Option<HeaderCandidate> {
    // The last row has no successor to confirm it as a header.
    let scan_limit = grid.len().saturating_sub(1).min(config.max_scan_rows);

    let candidates = (0..scan_limit)
        .map(|row| HeaderCandidate {
            row,
            score: header_likelihood_score(&grid[row], config),
        })
        .filter(|candidate| candidate.score >= config.header_threshold)
        .collect::<Vec<_>>();

    if let Some(final_header) = candidates
        .iter()
        .find(|candidate| is_final_header(&grid[candidate.row], &grid[candidate.row + 1], config))
    {
        return Some(*final_header);
    }

    // Best score wins; ties keep the earliest row.
    let mut best: Option<HeaderCandidate> = None;
    for candidate in candidates {
        if best.is_none_or(|current| candidate.score > current.score) {
            best = Some(candidate);
        }
    }
    best
}

pub fn header_likelihood_score(row: &[CellValue], config: &HeuristicConfig) -> f64 {
    let non_empty = row.iter().filter(|cell| !cell.is_blank()).collect::<Vec<_>>();
    if non_empty.len() < 2 {
        return 0.0;
    }

    let string_cells = non_empty
        .iter()
        .filter_map(|cell| cell.as_text())
        .collect::<Vec<&str>>();
    let string_count = string_cells.len();
    let numeric_count = non_empty.iter().filter(|cell| cell.is_numeric()).count();

    let mut score = string_count as f64 / non_empty.len() as f64;

    let total_len = string_cells
        .iter()
        .map(|text| text.chars().count())
        .sum::<usize>();
    let avg_len = total_len as f64 / string_count.max(1) as f64;
    if avg_len < config.short_label_max_len as f64 {
        score += 0.1;
    }

    if numeric_count > string_count {
        score -= 0.2;
    }

    score.clamp(0.0, 1.0)
}

fn non_empty_ratio(row: &[CellValue]) -> f64 {
    let non_empty = row.iter().filter(|cell| !cell.is_blank()).count();
    non_empty as f64 / row.len().max(1) as f64
}

fn is_final_header(row: &[CellValue], next_row: &[CellValue], config: &HeuristicConfig) -> bool {
    header_likelihood_score(row, config) >= config.final_header_threshold
        && non_empty_ratio(row) >= config.min_non_empty_ratio
        && header_likelihood_score(next_row, config) < config.data_row_max_score
}

fn extract_columns(row: &[CellValue]) -> Vec<String> {
    row.iter()
        .enumerate()
        .map(|(index, cell)| match cell.as_text().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("column_{index}"),
        })
        .collect()
}

fn find_data_end(grid: &[Vec<CellValue>], start: usize) -> usize {
    let mut end = start;
    for (index, row) in grid.iter().enumerate().skip(start) {
        if row.iter().all(CellValue::is_blank) {
            break;
        }
        end = index;
    }
    end
}
