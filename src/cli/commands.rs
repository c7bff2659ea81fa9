use crate::analysis::EvaluateOptions;
use crate::error::SheetResult;
use crate::session::WorkbookSession;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

fn print_json<T: Serialize>(value: &T) -> SheetResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute the summary command
pub fn summary(file: PathBuf, json: bool) -> SheetResult<()> {
    let session = WorkbookSession::open(&file)?;
    let summary = session.formula_summary();

    if json {
        return print_json(&summary);
    }

    println!("{}", "📊 Formula Summary".bold().green());
    println!("   File: {}", file.display());
    println!();
    println!("   Formulas:               {}", summary.total_formulas);
    println!("   Sheets with formulas:   {}", summary.sheets_with_formulas);
    if summary.circular_references > 0 {
        println!(
            "   Circular references:    {}",
            summary.circular_references.to_string().red().bold()
        );
    } else {
        println!("   Circular references:    0");
    }
    if !summary.custom_formulas.is_empty() {
        println!("   Custom formulas:        {}", summary.custom_formulas.join(", "));
    }
    Ok(())
}

/// Execute the circular command
pub fn circular(file: PathBuf, json: bool) -> SheetResult<()> {
    let session = WorkbookSession::open(&file)?;
    let cycles = session.find_circular_references();

    if json {
        return print_json(&cycles);
    }

    if cycles.is_empty() {
        println!("{}", "✅ No circular references".bold().green());
        return Ok(());
    }

    println!(
        "{}",
        format!("⚠️  {} circular reference(s) found", cycles.len())
            .bold()
            .red()
    );
    for cycle in &cycles {
        println!("   {}", cycle.path.join(" -> ").yellow());
    }
    Ok(())
}

/// Execute the calc command
pub fn calc(file: PathBuf, ignore_circular: bool, json: bool) -> SheetResult<()> {
    let mut session = WorkbookSession::open(&file)?;
    let options = EvaluateOptions { ignore_circular };
    let report = session.evaluate_all(&options)?;

    if json {
        return print_json(&report);
    }

    println!("{}", "✅ Evaluation complete".bold().green());
    println!("   Formulas evaluated: {}", report.evaluated.len());
    if !report.circular.is_empty() {
        println!(
            "   {}",
            format!("Circular references ignored: {}", report.circular.len()).yellow()
        );
    }
    Ok(())
}

/// Execute the cell command
pub fn cell(file: PathBuf, sheet: String, row: u32, col: u32, json: bool) -> SheetResult<()> {
    let mut session = WorkbookSession::open(&file)?;
    let result = session.evaluate_cell(&sheet, row, col);

    if json {
        return print_json(&result);
    }

    println!("{}", format!("🔎 {}", result.address).bold());
    println!("   Value: {} ({})", result.value.display(), result.type_tag);
    if let Some(formula) = &result.formula {
        println!("   Formula: {}", formula.cyan());
    }
    if let Some(error) = &result.error {
        println!("   {}", format!("Error: {}", error).red());
    }
    Ok(())
}

/// Execute the assets command
pub fn assets(file: PathBuf, json: bool) -> SheetResult<()> {
    let mut session = WorkbookSession::open(&file)?;

    if json {
        #[derive(Serialize)]
        struct AssetReport<'a> {
            charts: &'a [crate::assets::ChartInfo],
            images: &'a [crate::assets::ImageInfo],
            macros: &'a [crate::assets::MacroModule],
        }
        let charts = session.charts().to_vec();
        let images = session.images().to_vec();
        let macros = session.macros().to_vec();
        return print_json(&AssetReport {
            charts: &charts,
            images: &images,
            macros: &macros,
        });
    }

    println!("{}", "📦 Embedded Assets".bold().green());

    let charts = session.charts().to_vec();
    println!("\n   Charts: {}", charts.len());
    for chart in &charts {
        println!(
            "   - {} [{}] on {} at {} ({} series)",
            chart.name.cyan(),
            chart.chart_type,
            chart.sheet,
            chart.anchor,
            chart.series.len()
        );
    }

    let images = session.images().to_vec();
    println!("\n   Images: {}", images.len());
    for image in &images {
        println!(
            "   - {} ({}) on {} at {}",
            image.name.cyan(),
            image.media_type,
            image.sheet,
            image.anchor
        );
    }

    let macros = session.macros().to_vec();
    println!("\n   Macro modules: {}", macros.len());
    for module in &macros {
        println!("   - {}.{}", module.project, module.name.cyan());
    }
    Ok(())
}

/// Execute the export-csv command
pub fn export_csv(file: PathBuf, sheet: String, output: Option<PathBuf>) -> SheetResult<()> {
    let session = WorkbookSession::open(&file)?;
    let csv = session.to_csv(&sheet)?;

    match output {
        Some(path) => {
            fs::write(&path, csv)?;
            println!(
                "{}",
                format!("✅ Exported '{}' to {}", sheet, path.display())
                    .bold()
                    .green()
            );
        }
        None => print!("{}", csv),
    }
    Ok(())
}
