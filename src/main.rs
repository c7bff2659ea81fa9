use clap::{Parser, Subcommand};
use sheetlens::cli;
use sheetlens::error::SheetResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetlens")]
#[command(about = "Workbook analysis: formula dependencies, circular references, embedded assets")]
#[command(long_about = "Sheetlens - workbook analysis engine

COMMANDS:
  summary     - Formula usage summary for a workbook
  circular    - List circular formula references
  calc        - Evaluate all formulas
  cell        - Evaluate the workbook and inspect one cell
  assets      - List embedded charts, images, and macro modules
  export-csv  - Export one sheet as CSV

EXAMPLES:
  sheetlens summary model.xlsx
  sheetlens circular model.xlsx --json
  sheetlens calc model.xlsx --ignore-circular
  sheetlens cell model.xlsx Sheet1 2 3
  sheetlens export-csv model.xlsx Data -o data.csv")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a formula usage summary
    Summary {
        /// Path to workbook file (.xlsx)
        file: PathBuf,

        /// Emit JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// List circular formula references
    Circular {
        /// Path to workbook file (.xlsx)
        file: PathBuf,

        /// Emit JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Evaluate all formulas in dependency order
    Calc {
        /// Path to workbook file (.xlsx)
        file: PathBuf,

        /// Report circular references instead of failing on them
        #[arg(long)]
        ignore_circular: bool,

        /// Emit JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Evaluate the workbook and inspect one cell
    Cell {
        /// Path to workbook file (.xlsx)
        file: PathBuf,

        /// Sheet name
        sheet: String,

        /// Row (1-based)
        row: u32,

        /// Column (1-based)
        col: u32,

        /// Emit JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// List embedded charts, images, and macro modules
    Assets {
        /// Path to workbook file (.xlsx)
        file: PathBuf,

        /// Emit JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Export one sheet as CSV
    ExportCsv {
        /// Path to workbook file (.xlsx)
        file: PathBuf,

        /// Sheet name
        sheet: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> SheetResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetlens=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { file, json } => cli::summary(file, json),
        Commands::Circular { file, json } => cli::circular(file, json),
        Commands::Calc {
            file,
            ignore_circular,
            json,
        } => cli::calc(file, ignore_circular, json),
        Commands::Cell {
            file,
            sheet,
            row,
            col,
            json,
        } => cli::cell(file, sheet, row, col, json),
        Commands::Assets { file, json } => cli::assets(file, json),
        Commands::ExportCsv {
            file,
            sheet,
            output,
        } => cli::export_csv(file, sheet, output),
    }
}
