//! sheetpress CLI - render spreadsheet templates against JSON view-models

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sheetpress::prelude::*;
use sheetpress::template::{ParsedText, RegionKind, TemplateLayout};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetpress")]
#[command(author, version, about = "Render data-driven spreadsheets from XLSX templates")]
struct Cli {
    /// More log output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template workbook with a view-model
    Render {
        /// Template workbook (xlsx, xlsm)
        template: PathBuf,

        /// JSON view-model file, or `-` for stdin
        model: PathBuf,

        /// Output workbook (xlsx)
        #[arg(short, long)]
        output: PathBuf,

        /// Only render these worksheets; the others are copied as-is
        #[arg(short, long = "sheet", value_name = "NAME")]
        sheets: Vec<String>,

        /// Keep worksheet names as written in the template
        #[arg(long)]
        keep_sheet_names: bool,

        /// Print a JSON report of region expansions to stdout
        #[arg(long)]
        report: bool,
    },

    /// Show the regions, conditions and placeholders of a template
    Inspect {
        /// Template workbook
        template: PathBuf,
    },

    /// Compare two workbooks; exits non-zero when they differ
    Compare {
        expected: PathBuf,
        actual: PathBuf,

        /// Side of the square grid compared cell by cell
        #[arg(short, long, default_value = "10")]
        grid: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Render {
            template,
            model,
            output,
            sheets,
            keep_sheet_names,
            report,
        } => {
            let options = RenderOptions {
                render_sheet_names: !keep_sheet_names,
                sheets: (!sheets.is_empty()).then_some(sheets),
                ..Default::default()
            };
            render(&template, &model, &output, options, report)
        }
        Commands::Inspect { template } => inspect(&template),
        Commands::Compare {
            expected,
            actual,
            grid,
        } => compare(&expected, &actual, grid),
    }
}

/// `RUST_LOG` wins over the flags when set.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open(path: &Path) -> Result<Workbook> {
    Workbook::open(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

fn render(
    template_path: &Path,
    model_path: &Path,
    output: &Path,
    options: RenderOptions,
    print_report: bool,
) -> Result<()> {
    let template = open(template_path)?;
    tracing::info!(
        template = %template_path.display(),
        sheets = template.sheet_count(),
        "loaded template"
    );

    let model = if model_path == Path::new("-") {
        sheetpress::read_view_model(io::stdin().lock()).context("Failed to read view-model from stdin")?
    } else {
        sheetpress::load_view_model(model_path)
            .with_context(|| format!("Failed to read view-model '{}'", model_path.display()))?
    };

    let (workbook, report) = Renderer::with_options(options)
        .render_with_report(&template, &model)
        .with_context(|| format!("Failed to render '{}'", template_path.display()))?;

    workbook
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    let rows: u32 = report.sheets.iter().map(|s| s.output_rows).sum();
    eprintln!(
        "Rendered {} sheets ({} rows) to '{}'",
        report.sheets.len(),
        rows,
        output.display()
    );

    if print_report {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let workbook = open(path)?;

    println!("File: {}", path.display());
    for sheet in workbook.worksheets() {
        println!();
        println!("Sheet '{}'", sheet.name());

        let layout = TemplateLayout::classify(sheet)
            .with_context(|| format!("Invalid template sheet '{}'", sheet.name()))?;
        println!("  Rows: {}", layout.row_count());

        for region in layout.regions() {
            let kind = match region.kind {
                RegionKind::Block => "FOR_EACH",
                RegionKind::Row => "REPEAT_ROW",
            };
            let indent = "  ".repeat(layout.chain(region.start_row).len());
            let gate = region
                .condition
                .as_ref()
                .map(|c| format!(" if {}{}", if c.negated { "not " } else { "" }, c.path))
                .unwrap_or_default();
            println!(
                "{indent}{kind} {} as {} (rows {}-{}){gate}",
                region.binding.path,
                region.binding.name,
                region.start_row + 1,
                region.end_row + 1
            );
        }

        for (row, condition) in layout.conditional_rows() {
            println!(
                "  Row {}: IF {}{}",
                row + 1,
                if condition.negated { "NOT " } else { "" },
                condition.path
            );
        }

        let mut current_row = None;
        for (row, col, data) in sheet.cells().iter() {
            if layout.is_marker(row, col) {
                continue;
            }
            let text = match &data.value {
                CellValue::String(text) => &**text,
                CellValue::Formula { text, .. } => text.as_str(),
                _ => continue,
            };
            let parsed = ParsedText::parse(text);
            if !parsed.has_placeholders() {
                continue;
            }
            if current_row != Some(row) {
                println!("  Row {}:", row + 1);
                current_row = Some(row);
            }
            let expressions: Vec<String> = parsed.expressions().map(ToString::to_string).collect();
            println!(
                "    {}: {}",
                CellAddress::new(row, col),
                expressions.join(", ")
            );
        }
    }
    Ok(())
}

fn compare(expected: &Path, actual: &Path, grid: u32) -> Result<()> {
    let expected_wb = open(expected)?;
    let actual_wb = open(actual)?;

    let differences = compare_workbooks(&expected_wb, &actual_wb, &CompareOptions { grid });
    if differences.is_empty() {
        println!("No differences");
        return Ok(());
    }
    for difference in &differences {
        println!("{difference}");
    }
    bail!(
        "'{}' and '{}' differ in {} places",
        expected.display(),
        actual.display(),
        differences.len()
    )
}
