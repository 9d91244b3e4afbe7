use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InspectArgs;
use crate::commands::inventory::file_name;
use crate::config::{HeuristicConfig, load_config};
use crate::parsing::file_extension;
use crate::parsing::grid::GridFormat;
use crate::parsing::tabular::{Inspection, TabularParser};

pub fn run(args: InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let inspection = inspect_file(&args.file, config)?;

    info!(
        path = %args.file.display(),
        sheets = inspection.introspection.sheets.len(),
        tables = inspection.tables.len(),
        "inspection complete"
    );

    if args.json {
        write_json_report(&inspection)
    } else {
        write_text_report(&args.file, &inspection)
    }
}

pub fn inspect_file(path: &Path, config: HeuristicConfig) -> Result<Inspection> {
    let filename = file_name(path)?;
    let extension = file_extension(&filename);
    let Some(format) = GridFormat::from_extension(&extension) else {
        bail!(
            "inspect supports spreadsheet and csv files only: {}",
            path.display()
        );
    };

    let content = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parser = TabularParser::new(config, format)?;
    parser
        .inspect(&content, &filename)
        .with_context(|| format!("failed to inspect {}", path.display()))
}

fn write_json_report(inspection: &Inspection) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, inspection)
        .context("failed to serialize inspection json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_report(path: &Path, inspection: &Inspection) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(
        output,
        "File: {} ({} bytes)",
        path.display(),
        inspection.introspection.file_size
    )?;

    for sheet in &inspection.introspection.sheets {
        writeln!(
            output,
            "Sheet {}\trows={} columns={} non_empty_ratio={:.3} empty_top={} empty_bottom={} merged={}",
            sheet.name,
            sheet.rows,
            sheet.columns,
            sheet.non_empty_ratio,
            sheet.empty_rows_top,
            sheet.empty_rows_bottom,
            sheet
                .merged_cells_count
                .map(|count| count.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        )?;
    }

    if inspection.tables.is_empty() {
        writeln!(output, "No tables detected")?;
    }

    for table in &inspection.tables {
        writeln!(
            output,
            "Table {}\theader_row={} data_rows={}..={} orientation={} confidence={:.3}",
            table.sheet,
            table.header_row,
            table.data_start_row,
            table.data_end_row,
            table.orientation.as_str(),
            table.confidence,
        )?;
        writeln!(output, "\tcolumns: {}", table.columns.join(", "))?;
    }

    output.flush()?;
    Ok(())
}
