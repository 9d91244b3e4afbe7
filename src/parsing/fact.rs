use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::cell::{CellValue, Row};
use super::semantic::SemanticDocument;
use crate::config::HeuristicConfig;

pub const RAW_ROW_ENTITY: &str = "raw_row";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSource {
    pub document_id: String,
    pub sheet: String,
    pub parser: String,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub pipeline: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub entity_type: String,
    pub entity_id: String,
    pub source: FactSource,
    pub payload: Row,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct FactBuilder {
    parser: &'static str,
    provenance: Provenance,
}

impl FactBuilder {
    pub fn new(parser: &'static str, config: &HeuristicConfig) -> Self {
        Self {
            parser,
            provenance: Provenance {
                pipeline: config.pipeline_name.clone(),
                version: config.pipeline_version.clone(),
            },
        }
    }

    pub fn build(&self, document_id: &str, sheet: &str, row_index: usize, payload: Row) -> Fact {
        Fact {
            entity_type: RAW_ROW_ENTITY.to_string(),
            entity_id: fact_id(&payload),
            source: FactSource {
                document_id: document_id.to_string(),
                sheet: sheet.to_string(),
                parser: self.parser.to_string(),
                row: row_index,
            },
            payload,
            provenance: self.provenance.clone(),
        }
    }

    pub fn build_document(&self, document_id: &str, document: &SemanticDocument) -> Vec<Fact> {
        document
            .tables
            .iter()
            .flat_map(|table| {
                table
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| self.build(document_id, &table.sheet, index, row.clone()))
            })
            .collect()
    }
}

/// SHA-256 over the key-sorted JSON rendering of the payload. Depends on the
/// payload only, never on where the row came from.
pub fn fact_id(payload: &Row) -> String {
    let canonical = Value::Object(payload_to_json(payload)).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn payload_to_json(payload: &Row) -> Map<String, Value> {
    payload
        .iter()
        .map(|(key, value)| (key.clone(), cell_to_json(value)))
        .collect()
}

fn cell_to_json(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Integer(number) => Value::from(*number),
        CellValue::Number(number) => Value::from(*number),
        CellValue::Text(text) => Value::String(text.clone()),
    }
}

fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

impl Fact {
    pub fn embedding_text(&self) -> String {
        self.payload
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| format!("{key}: {}", normalize_whitespace(&value.to_string())))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_index_document(&self) -> IndexDocument {
        let mut metadata = Map::new();
        metadata.insert("id".to_string(), Value::String(self.entity_id.clone()));
        metadata.insert(
            "document_id".to_string(),
            Value::String(self.source.document_id.clone()),
        );
        metadata.insert("sheet".to_string(), Value::String(self.source.sheet.clone()));
        metadata.insert("parser".to_string(), Value::String(self.source.parser.clone()));
        metadata.insert("row".to_string(), Value::from(self.source.row));
        // Payload fields take precedence over source fields of the same name.
        metadata.extend(payload_to_json(&self.payload));

        IndexDocument {
            id: self.entity_id.clone(),
            text: self.embedding_text(),
            metadata,
        }
    }
}
