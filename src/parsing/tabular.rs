use serde::Serialize;
use tracing::{info, warn};

use super::cleaner::{CleaningOutcome, clean_table};
use super::fact::{Fact, FactBuilder};
use super::grid::{GridFormat, decode_grids};
use super::introspect::{DocumentIntrospection, introspect};
use super::normalize::{normalize_table, unpivot_years};
use super::raw_loader::{RawWorkbook, load_workbook};
use super::report::{ParseReport, RowAccounting, TableOutcome, TableReport};
use super::sanitize::sanitize_table;
use super::semantic::{SemanticDocument, analyze_table};
use super::structure::{DetectedTable, detect_table};
use super::years::YearTokens;
use super::{DocumentParser, ParseError, ParsedDocument, SourceDocument};
use crate::config::HeuristicConfig;

pub const TABULAR_PARSER_TAG: &str = "excel";

#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub introspection: DocumentIntrospection,
    pub tables: Vec<DetectedTable>,
}

#[derive(Debug, Clone)]
pub struct TabularParser {
    config: HeuristicConfig,
    format: GridFormat,
    years: YearTokens,
    facts: FactBuilder,
}

impl TabularParser {
    pub fn new(config: HeuristicConfig, format: GridFormat) -> Result<Self, ParseError> {
        config.validate()?;
        let facts = FactBuilder::new(TABULAR_PARSER_TAG, &config);
        Ok(Self {
            config,
            format,
            years: YearTokens::new()?,
            facts,
        })
    }

    pub fn inspect(&self, content: &[u8], filename: &str) -> Result<Inspection, ParseError> {
        let sheets = decode_grids(content, filename, self.format)?;
        let introspection = introspect(content.len(), &sheets);
        let workbook = load_workbook(&sheets, &self.config);
        let tables = workbook
            .sheets
            .iter()
            .filter_map(|sheet| detect_table(sheet, &self.config))
            .collect();

        Ok(Inspection {
            introspection,
            tables,
        })
    }

    pub fn parse_workbook(
        &self,
        document_id: &str,
        workbook: &RawWorkbook,
    ) -> (Vec<Fact>, Vec<TableReport>) {
        let mut cleaned = SemanticDocument::default();
        let mut reports = Vec::with_capacity(workbook.sheets.len());

        for sheet in &workbook.sheets {
            let Some(detected) = detect_table(sheet, &self.config) else {
                info!(sheet = %sheet.name, "no header detected, sheet skipped");
                reports.push(TableReport::no_table(&sheet.name));
                continue;
            };

            let normalized = normalize_table(sheet, &detected);
            let reshaped = unpivot_years(&normalized, &self.years);
            let sanitized = sanitize_table(&reshaped, &self.config);
            let semantic = analyze_table(&sanitized, &self.years);

            let mut rows = RowAccounting {
                data_rows: normalized.rows.len(),
                blank_rows_dropped: normalized.blank_rows_dropped,
                unpivoted_rows: reshaped.rows.len(),
                ..RowAccounting::default()
            };
            rows.record_sanitize(&sanitized.stats);

            let outcome = match clean_table(&semantic, &self.config) {
                CleaningOutcome::Kept { table, stats } => {
                    rows.record_cleaning(&stats);
                    let facts = table.rows.len();
                    cleaned.tables.push(table);
                    TableOutcome::Emitted { facts }
                }
                CleaningOutcome::Dropped { reason, stats } => {
                    rows.record_cleaning(&stats);
                    TableOutcome::LowQualityTable { drop: reason }
                }
            };

            reports.push(TableReport {
                sheet: sheet.name.clone(),
                table: Some(semantic.name),
                header_row: Some(detected.header_row),
                confidence: Some(detected.confidence),
                outcome,
                rows,
            });
        }

        let facts = self.facts.build_document(document_id, &cleaned);
        (facts, reports)
    }
}

impl DocumentParser for TabularParser {
    fn parser_tag(&self) -> &'static str {
        TABULAR_PARSER_TAG
    }

    fn parse(&self, document: &SourceDocument<'_>) -> Result<ParsedDocument, ParseError> {
        let sheets = decode_grids(document.content, document.filename, self.format)?;
        let introspection = introspect(document.content.len(), &sheets);
        let workbook = load_workbook(&sheets, &self.config);

        if workbook.sheets.is_empty() {
            warn!(filename = %document.filename, "no usable sheets after loading");
        }

        let (facts, tables) = self.parse_workbook(document.document_id, &workbook);

        info!(
            document_id = %document.document_id,
            filename = %document.filename,
            sheets = sheets.len(),
            tables = tables.len(),
            facts = facts.len(),
            "parsed tabular document"
        );

        Ok(ParsedDocument {
            report: ParseReport {
                document_id: document.document_id.to_string(),
                filename: document.filename.to_string(),
                parser: TABULAR_PARSER_TAG.to_string(),
                introspection: Some(introspection),
                tables,
                fact_count: facts.len(),
            },
            facts,
        })
    }
}
