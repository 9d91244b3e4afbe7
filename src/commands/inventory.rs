use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{DocumentEntry, InventoryManifest};
use crate::parsing::{file_extension, is_supported};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.source_dir)?;

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.source_dir
            .join("manifests")
            .join("document_inventory.json")
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(document_count = manifest.document_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(source_dir: &Path) -> Result<InventoryManifest> {
    let paths = discover_documents(source_dir)?;

    if paths.is_empty() {
        bail!("no supported documents found in {}", source_dir.display());
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = file_name(&path)?;
        let size_bytes = fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();

        documents.push(DocumentEntry {
            extension: file_extension(&filename),
            sha256: sha256_file(&path)?,
            filename,
            size_bytes,
        });
    }

    Ok(InventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: source_dir.display().to_string(),
        document_count: documents.len(),
        documents,
    })
}

/// Regular files directly under `source_dir` that some parser accepts,
/// sorted by path.
pub fn discover_documents(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    let entries = fs::read_dir(source_dir)
        .with_context(|| format!("failed to read {}", source_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", source_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let supported = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_supported);

        if supported {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}

pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))
}
