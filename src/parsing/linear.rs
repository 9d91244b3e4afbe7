use tracing::info;

use super::cell::{CellValue, Row};
use super::fact::FactBuilder;
use super::report::ParseReport;
use super::{DocumentParser, ParseError, ParsedDocument, SourceDocument};
use crate::config::HeuristicConfig;

pub const LINEAR_PARSER_TAG: &str = "text";

const PAGE_BREAK: char = '\u{000C}';
const MIN_LINE_CHARS: usize = 10;

#[derive(Debug, Clone)]
pub struct LinearTextParser {
    facts: FactBuilder,
}

impl LinearTextParser {
    pub fn new(config: &HeuristicConfig) -> Result<Self, ParseError> {
        config.validate()?;
        Ok(Self {
            facts: FactBuilder::new(LINEAR_PARSER_TAG, config),
        })
    }
}

impl DocumentParser for LinearTextParser {
    fn parser_tag(&self) -> &'static str {
        LINEAR_PARSER_TAG
    }

    fn parse(&self, document: &SourceDocument<'_>) -> Result<ParsedDocument, ParseError> {
        let text = std::str::from_utf8(document.content).map_err(|err| {
            ParseError::UnreadableInput {
                filename: document.filename.to_string(),
                reason: format!("not valid UTF-8: {err}"),
            }
        })?;

        let mut facts = Vec::new();
        let mut page_count = 0_usize;
        for (page_index, page) in text.split(PAGE_BREAK).enumerate() {
            page_count += 1;
            let page_number = (page_index + 1).to_string();

            let lines = page
                .lines()
                .map(|line| line.trim_matches(|ch: char| ch.is_whitespace() || ch == '\0'))
                .filter(|line| line.chars().count() > MIN_LINE_CHARS);

            for (line_index, line) in lines.enumerate() {
                let mut payload = Row::new();
                payload.insert("text".to_string(), CellValue::text(line));
                facts.push(
                    self.facts
                        .build(document.document_id, &page_number, line_index + 1, payload),
                );
            }
        }

        info!(
            document_id = %document.document_id,
            filename = %document.filename,
            pages = page_count,
            facts = facts.len(),
            "parsed text document"
        );

        Ok(ParsedDocument {
            report: ParseReport {
                document_id: document.document_id.to_string(),
                filename: document.filename.to_string(),
                parser: LINEAR_PARSER_TAG.to_string(),
                introspection: None,
                tables: Vec::new(),
                fact_count: facts.len(),
            },
            facts,
        })
    }
}
