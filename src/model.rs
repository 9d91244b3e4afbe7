use serde::{Deserialize, Serialize};

use crate::parsing::report::TableReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub extension: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub document_count: usize,
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub output_dir: String,
    pub facts_dir: String,
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub document_count: usize,
    pub parsed_count: usize,
    pub failed_count: usize,
    pub fact_count: usize,
    pub tables_emitted: usize,
    pub tables_dropped: usize,
    pub sheets_without_table: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Parsed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub filename: String,
    pub document_id: Option<String>,
    pub sha256: Option<String>,
    pub parser: Option<String>,
    pub status: DocumentStatus,
    pub fact_count: usize,
    pub facts_path: Option<String>,
    pub failure_reason: Option<String>,
    pub tables: Vec<TableReport>,
}

impl DocumentResult {
    pub fn failed(filename: &str, sha256: Option<String>, reason: String) -> Self {
        Self {
            filename: filename.to_string(),
            document_id: None,
            sha256,
            parser: None,
            status: DocumentStatus::Failed,
            fact_count: 0,
            facts_path: None,
            failure_reason: Some(reason),
            tables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub pipeline: PipelineInfo,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub documents: Vec<DocumentResult>,
    pub warnings: Vec<String>,
}
