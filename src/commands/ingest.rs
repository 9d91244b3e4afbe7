use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::commands::inventory::{discover_documents, file_name};
use crate::config::{HeuristicConfig, load_config};
use crate::model::{
    DocumentResult, DocumentStatus, IngestCounts, IngestPaths, IngestRunManifest, PipelineInfo,
};
use crate::parsing::fact::{Fact, IndexDocument};
use crate::parsing::report::TableOutcome;
use crate::parsing::{ParseError, SourceDocument, parser_for};
use crate::util::{
    ensure_directory, now_utc_string, sha256_bytes, utc_compact_string, write_json_lines,
    write_json_pretty,
};

pub fn run(args: IngestArgs) -> Result<()> {
    let (manifest, manifest_path) = ingest(&args)?;

    info!(path = %manifest_path.display(), "wrote ingest run manifest");
    info!(
        run_id = %manifest.run_id,
        documents = manifest.counts.document_count,
        parsed = manifest.counts.parsed_count,
        failed = manifest.counts.failed_count,
        facts = manifest.counts.fact_count,
        "ingest completed"
    );

    Ok(())
}

pub fn ingest(args: &IngestArgs) -> Result<(IngestRunManifest, PathBuf)> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let config = load_config(args.config.as_deref())?;
    let inputs = resolve_inputs(args)?;

    if args.document_id.is_some() && inputs.len() != 1 {
        bail!(
            "--document-id requires exactly one input document, got {}",
            inputs.len()
        );
    }

    let facts_dir = args.output_dir.join("facts");
    let manifest_dir = args.output_dir.join("manifests");
    ensure_directory(&facts_dir)?;
    ensure_directory(&manifest_dir)?;

    info!(
        run_id = %run_id,
        documents = inputs.len(),
        output_dir = %args.output_dir.display(),
        "starting ingest"
    );

    let mut counts = IngestCounts {
        document_count: inputs.len(),
        ..IngestCounts::default()
    };
    let mut documents = Vec::with_capacity(inputs.len());
    let mut warnings = Vec::new();

    for path in &inputs {
        let result = ingest_document(path, args.document_id.as_deref(), &config, &facts_dir)?;

        match result.status {
            DocumentStatus::Parsed => {
                counts.parsed_count += 1;
                counts.fact_count += result.fact_count;
            }
            DocumentStatus::Failed => {
                counts.failed_count += 1;
                warnings.push(format!(
                    "{}: {}",
                    result.filename,
                    result.failure_reason.as_deref().unwrap_or("unknown failure")
                ));
            }
        }

        for table in &result.tables {
            match table.outcome {
                TableOutcome::Emitted { .. } => counts.tables_emitted += 1,
                TableOutcome::LowQualityTable { .. } => counts.tables_dropped += 1,
                TableOutcome::NoDetectableTable => counts.sheets_without_table += 1,
            }
        }

        documents.push(result);
    }

    let status = if counts.failed_count == 0 {
        "completed"
    } else {
        "completed_with_failures"
    };

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id,
        status: status.to_string(),
        started_at,
        completed_at: now_utc_string(),
        pipeline: PipelineInfo {
            name: config.pipeline_name.clone(),
            version: config.pipeline_version.clone(),
        },
        paths: IngestPaths {
            output_dir: args.output_dir.display().to_string(),
            facts_dir: facts_dir.display().to_string(),
            config_path: args.config.as_ref().map(|path| path.display().to_string()),
        },
        counts,
        documents,
        warnings,
    };

    let manifest_path = manifest_dir.join(format!(
        "ingest_run_{}.json",
        utc_compact_string(started_ts)
    ));
    write_json_pretty(&manifest_path, &manifest)?;

    Ok((manifest, manifest_path))
}

fn resolve_inputs(args: &IngestArgs) -> Result<Vec<PathBuf>> {
    if let Some(source_dir) = &args.source_dir {
        let documents = discover_documents(source_dir)?;
        if documents.is_empty() {
            bail!("no supported documents found in {}", source_dir.display());
        }
        return Ok(documents);
    }

    if args.files.is_empty() {
        bail!("either --file or --source-dir is required");
    }

    Ok(args.files.clone())
}

/// Parses one document and writes its facts and index documents. Unsupported
/// or unreadable documents come back as failed results; anything else aborts
/// the run.
fn ingest_document(
    path: &Path,
    document_id: Option<&str>,
    config: &HeuristicConfig,
    facts_dir: &Path,
) -> Result<DocumentResult> {
    let filename = file_name(path)?;

    let parser = match parser_for(&filename, config) {
        Ok(parser) => parser,
        Err(err @ ParseError::UnsupportedFormat { .. }) => {
            warn!(path = %path.display(), error = %err, "skipping document");
            return Ok(DocumentResult::failed(&filename, None, err.to_string()));
        }
        Err(err) => return Err(err).context("failed to build document parser"),
    };

    let content = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let sha256 = sha256_bytes(&content);
    let document_id = document_id.map(ToOwned::to_owned).unwrap_or_else(|| sha256.clone());

    let source = SourceDocument {
        document_id: &document_id,
        content: &content,
        filename: &filename,
    };

    let parsed = match parser.parse(&source) {
        Ok(parsed) => parsed,
        Err(err @ ParseError::UnreadableInput { .. }) => {
            warn!(path = %path.display(), error = %err, "document failed to parse");
            return Ok(DocumentResult::failed(&filename, Some(sha256), err.to_string()));
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to parse {}", path.display()));
        }
    };

    let facts_path = facts_dir.join(format!("{document_id}.facts.jsonl"));
    write_json_lines(&facts_path, &parsed.facts)?;

    let index = parsed
        .facts
        .iter()
        .map(Fact::to_index_document)
        .collect::<Vec<IndexDocument>>();
    let index_path = facts_dir.join(format!("{document_id}.index.jsonl"));
    write_json_lines(&index_path, &index)?;

    info!(
        path = %path.display(),
        document_id = %document_id,
        parser = parser.parser_tag(),
        facts = parsed.facts.len(),
        "ingested document"
    );

    Ok(DocumentResult {
        filename,
        document_id: Some(document_id),
        sha256: Some(sha256),
        parser: Some(parsed.report.parser),
        status: DocumentStatus::Parsed,
        fact_count: parsed.report.fact_count,
        facts_path: Some(facts_path.display().to_string()),
        failure_reason: None,
        tables: parsed.report.tables,
    })
}
