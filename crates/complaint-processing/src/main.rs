//! CLI entry point for the complaint reconciliation pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use complaint_processing::io::{load_optional_table, load_table};
use complaint_processing::schema::{
    ColumnMapping, ColumnResolver, FieldSpec, complaint_field_specs, reference_field_specs,
};
use complaint_processing::utils::truncate_str;
use complaint_processing::{
    DashboardView, Pipeline, PipelineConfig, PipelineResult, ProcessingReport, Ranking,
    ReportGenerator,
};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Complaint log reconciliation and lot-duplication detection",
    long_about = "Joins a complaint log with a product reference table, splits opening \
                  timestamps and flags product lots reported from several locations.\n\n\
                  EXAMPLES:\n  \
                  # Complaints only\n  \
                  complaint-processing -c reclamos.csv\n\n  \
                  # With product reference and canonical column order\n  \
                  complaint-processing -c reclamos.csv -r base.csv --canonical-order\n\n  \
                  # Check which columns are recognised\n  \
                  complaint-processing -c reclamos.csv -r base.csv --dry-run\n\n  \
                  # Dashboard data as JSON\n  \
                  complaint-processing -c reclamos.csv -r base.csv --json --no-save"
)]
struct Args {
    /// Path to the complaint log CSV
    #[arg(short, long)]
    complaints: String,

    /// Path to the product reference CSV
    ///
    /// If missing or unreadable, descriptions and suppliers come from the
    /// complaint log or the unclassified label.
    #[arg(short, long)]
    reference: Option<String>,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "informe_unificado"
    #[arg(long)]
    output_name: Option<String>,

    /// Write columns in the fixed canonical order
    ///
    /// Unresolved fields appear as empty columns; extra columns are left out.
    #[arg(long)]
    canonical_order: bool,

    /// Number of entries in each ranking
    #[arg(long, default_value = "10")]
    top_n: usize,

    /// Distinct locations at which a product lot becomes a notice
    #[arg(long, default_value = "2")]
    notice_threshold: usize,

    /// Distinct locations at which a product lot becomes an alert
    #[arg(long, default_value = "3")]
    alert_threshold: usize,

    /// Label for descriptions and suppliers that could not be classified
    #[arg(long, default_value = "No tipificado")]
    unclassified_label: String,

    /// Show column resolution for both files without processing
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    /// Useful for piping to other tools: `... --json | jq .dashboard.totals`
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <complaints_name>_report.json
    #[arg(long)]
    emit_report: bool,

    /// Do not write the unified CSV
    #[arg(long)]
    no_save: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.complaints).exists() {
        return Err(anyhow!("Complaints file not found: {}", args.complaints));
    }

    info!("Loading complaints from: {}", args.complaints);
    let complaints = load_table(&args.complaints)?;
    info!("Complaints loaded: {:?}", complaints.shape());

    let reference = load_optional_table(args.reference.as_deref().map(Path::new));
    if let Some(ref df) = reference {
        info!("Reference loaded: {:?}", df.shape());
    }

    if args.dry_run {
        run_dry_run(&args, &complaints, reference.as_ref());
        return Ok(());
    }

    // Reports are written here, with the real file names, not by the pipeline
    let mut config_builder = PipelineConfig::builder()
        .output_dir(&args.output)
        .top_n(args.top_n)
        .notice_threshold(args.notice_threshold)
        .alert_threshold(args.alert_threshold)
        .unclassified_label(&args.unclassified_label)
        .canonical_order(args.canonical_order)
        .save_to_disk(!args.no_save)
        .generate_reports(false);

    if let Some(ref name) = args.output_name {
        config_builder = config_builder.output_name(name);
    }

    let config = config_builder.build()?;
    let pipeline = build_pipeline(&args, config)?;

    info!("{}", "=".repeat(80));
    info!("Starting reconciliation pipeline...");
    info!("{}", "=".repeat(80));

    match pipeline.process(complaints, reference) {
        Ok(result) => handle_pipeline_output(&result, &args),
        Err(e) => {
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder()
        .config(config)
        .input_labels(args.complaints.clone(), args.reference.clone());

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Run dry-run mode - show how the headers resolve without processing.
///
/// Note: This function uses `println!` intentionally for user-facing CLI output.
fn run_dry_run(args: &Args, complaints: &DataFrame, reference: Option<&DataFrame>) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Column resolution preview");
    println!("{}\n", "=".repeat(80));

    println!("COMPLAINTS: {}", args.complaints);
    println!("  Rows: {}  Columns: {}", complaints.height(), complaints.width());
    let specs = complaint_field_specs();
    let mapping = ColumnResolver::resolve(&complaints.get_column_names(), &specs);
    print_mapping(&mapping, &specs);
    print_extra_columns(complaints, &mapping);

    match (args.reference.as_deref(), reference) {
        (Some(path), Some(df)) => {
            println!("REFERENCE: {}", path);
            println!("  Rows: {}  Columns: {}", df.height(), df.width());
            let specs = reference_field_specs();
            let mapping = ColumnResolver::resolve(&df.get_column_names(), &specs);
            print_mapping(&mapping, &specs);
        }
        (Some(path), None) => {
            println!("REFERENCE: {} (could not be loaded, enrichment will be skipped)", path);
            println!();
        }
        (None, _) => {
            println!("REFERENCE: none (enrichment will be skipped)");
            println!();
        }
    }

    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    if args.no_save {
        println!("  (none, --no-save)");
    } else {
        let output_name = args.output_name.as_deref().unwrap_or("informe_unificado");
        println!("  - {}/{}.csv", args.output, output_name);
    }
    if args.emit_report {
        println!(
            "  - {}/{}_report.json",
            args.output,
            extract_file_stem(&args.complaints)
        );
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute the reconciliation, run without --dry-run");
    println!("{}", "=".repeat(80));
}

fn print_mapping(mapping: &ColumnMapping, specs: &[FieldSpec]) {
    println!("{}", "-".repeat(70));
    println!("  {:<22} {:<30} {:<10}", "Field", "Column", "Status");
    println!("{}", "-".repeat(70));
    for spec in specs {
        let (column, status) = match mapping.get(spec.field) {
            Some(column) => (truncate_str(column, 29), "ok"),
            None if spec.required => ("-".to_string(), "MISSING"),
            None => ("-".to_string(), "absent"),
        };
        println!("  {:<22} {:<30} {:<10}", spec.field.key(), column, status);
    }
    println!();
}

fn print_extra_columns(df: &DataFrame, mapping: &ColumnMapping) {
    let extras: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| !mapping.claims_column(name.as_str()))
        .map(|name| name.to_string())
        .collect();
    if !extras.is_empty() {
        println!("  Kept as extra columns: {}", extras.join(", "));
        println!();
    }
}

/// Handle pipeline output based on CLI flags.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_pipeline_output(result: &PipelineResult, args: &Args) -> Result<()> {
    let report =
        ReportGenerator::build_report(&args.complaints, args.reference.as_deref(), result);

    if args.emit_report {
        let generator = ReportGenerator::new(PathBuf::from(&args.output), None);
        let report_path =
            generator.write_report_to_file(&report, &extract_file_stem(&args.complaints))?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the run.
fn print_human_readable_summary(report: &ProcessingReport) {
    let summary = &report.summary;
    let dashboard = &report.dashboard;

    println!();
    println!("{}", "=".repeat(80));
    println!("RECONCILIATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Complaints: {} ({} rows)", report.complaints_file, summary.complaint_rows);
    match report.reference_file {
        Some(ref path) if !summary.enrichment_skipped => {
            println!("Reference:  {} ({} rows)", path, summary.reference_rows)
        }
        Some(ref path) => println!("Reference:  {} (not used)", path),
        None => println!("Reference:  none"),
    }
    if let Some(ref output_file) = report.output_file {
        println!("Output:     {} ({} rows)", output_file, summary.unified_rows);
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Matched: {} of {} ({:.1}%)",
        summary.matched_rows,
        summary.complaint_rows,
        summary.match_percentage()
    );
    println!("  Unparsed timestamps: {}", summary.unparsed_timestamps);
    println!(
        "  Suppliers: {}  Products: {}",
        dashboard.totals.suppliers, dashboard.totals.products
    );
    println!();

    print_duplication(dashboard);
    print_ranking("Top suppliers", &dashboard.top_suppliers);
    print_ranking("Top products", &dashboard.top_products);

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}

fn print_duplication(dashboard: &DashboardView) {
    if !dashboard.duplication.is_available() {
        println!("Duplication: unavailable (lot or location column missing)");
        println!();
        return;
    }

    println!(
        "Duplication: {} alerts, {} notices",
        dashboard.totals.alerts, dashboard.totals.notices
    );
    for signal in dashboard.alerts.iter().chain(dashboard.notices.iter()).take(10) {
        println!(
            "  [{}] {} / lot {}: {} locations ({})",
            signal.severity,
            signal.product_id,
            signal.lot,
            signal.location_count,
            signal.locations.join(", ")
        );
    }
    let shown = dashboard.alerts.len() + dashboard.notices.len();
    if shown > 10 {
        println!("  ... and {} more", shown - 10);
    }
    println!();
}

fn print_ranking(title: &str, ranking: &Ranking) {
    if !ranking.availability.is_available() || ranking.is_empty() {
        return;
    }
    println!("{}:", title);
    for (position, entry) in ranking.entries.iter().enumerate() {
        println!(
            "  {:>2}. {:<50} {:>6}",
            position + 1,
            truncate_str(&entry.value, 50),
            entry.count
        );
    }
    println!();
}
