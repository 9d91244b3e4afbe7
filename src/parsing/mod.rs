use std::path::Path;

use thiserror::Error;

use crate::config::HeuristicConfig;

pub mod cell;
pub mod cleaner;
pub mod fact;
pub mod grid;
pub mod introspect;
pub mod linear;
pub mod normalize;
pub mod raw_loader;
pub mod report;
pub mod sanitize;
pub mod semantic;
pub mod structure;
pub mod tabular;
pub mod years;

#[cfg(test)]
mod tests;

use fact::Fact;
use grid::GridFormat;
use linear::LinearTextParser;
use report::ParseReport;
use tabular::TabularParser;

const LINEAR_EXTENSIONS: &[&str] = &["txt", "md", "text"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported document format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("unreadable input {filename}: {reason}")]
    UnreadableInput { filename: String, reason: String },

    #[error("invalid heuristic configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to compile pattern")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SourceDocument<'a> {
    pub document_id: &'a str,
    pub content: &'a [u8],
    pub filename: &'a str,
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub facts: Vec<Fact>,
    pub report: ParseReport,
}

pub trait DocumentParser: Send + Sync {
    fn parser_tag(&self) -> &'static str;

    fn parse(&self, document: &SourceDocument<'_>) -> Result<ParsedDocument, ParseError>;
}

pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn is_supported(filename: &str) -> bool {
    let extension = file_extension(filename);
    GridFormat::from_extension(&extension).is_some()
        || LINEAR_EXTENSIONS.contains(&extension.as_str())
}

pub fn parser_for(
    filename: &str,
    config: &HeuristicConfig,
) -> Result<Box<dyn DocumentParser>, ParseError> {
    let extension = file_extension(filename);

    if let Some(format) = GridFormat::from_extension(&extension) {
        return Ok(Box::new(TabularParser::new(config.clone(), format)?));
    }

    if LINEAR_EXTENSIONS.contains(&extension.as_str()) {
        return Ok(Box::new(LinearTextParser::new(config)?));
    }

    Err(ParseError::UnsupportedFormat { extension })
}
