use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "sheetfacts",
    version,
    about = "Turn messy spreadsheets into content-addressed semantic facts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Inspect(InspectArgs),
    Ingest(IngestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long)]
    pub source_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long = "file", conflicts_with = "source_dir", required_unless_present = "source_dir")]
    pub files: Vec<PathBuf>,

    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    #[arg(long, default_value = ".cache/sheetfacts")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the content hash as document id. Only valid with one file.
    #[arg(long)]
    pub document_id: Option<String>,
}
