//! wiresheet CLI - post-process WireViz outputs from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use wiresheet::layout::format_px;
use wiresheet::{
    find_source_yaml, Diagnostic, LayoutPreview, LayoutSpec, PageArea, PostprocessOptions,
    PostprocessResult, Severity, SheetSize, WiresheetCore,
};

#[derive(Parser)]
#[command(name = "wiresheet")]
#[command(about = "WireViz BOM photo merging and sheet layout tool", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the BOM and inject the sheet layout into WireViz outputs
    Postprocess {
        /// Harness YAML file (default: drawing.yaml)
        #[arg(value_name = "YAML")]
        yaml: Option<PathBuf>,

        /// Directory holding the WireViz outputs (default: <yaml dir>/output)
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Base name of the outputs (default: YAML file stem)
        #[arg(short = 'O', long, value_name = "NAME")]
        output_name: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code if any warning is reported
        #[arg(long)]
        fail_on_warning: bool,

        /// Do not inject layout CSS into the HTML sheet
        #[arg(long)]
        no_layout: bool,
    },

    /// Resolve and print the sheet layout without touching outputs
    Layout {
        /// Harness YAML file (default: drawing.yaml)
        #[arg(value_name = "YAML")]
        yaml: Option<PathBuf>,

        /// Directory holding the WireViz outputs (default: <yaml dir>/output)
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Assume this many BOM rows instead of reading the BOM
        #[arg(long, value_name = "N")]
        bom_rows: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: LayoutFormat,
    },

    /// List supported sheet sizes
    Sheets,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
    /// GitHub Actions format
    Github,
}

#[derive(Clone, ValueEnum)]
enum LayoutFormat {
    Human,
    Json,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Postprocess {
            yaml,
            output_dir,
            output_name,
            format,
            fail_on_warning,
            no_layout,
        } => {
            let options = PostprocessOptions {
                output_dir,
                output_name,
                apply_layout: !no_layout,
                ..Default::default()
            };
            handle_postprocess(yaml.as_deref(), &options, format, fail_on_warning)
        }
        Commands::Layout {
            yaml,
            output_dir,
            bom_rows,
            format,
        } => {
            let options = PostprocessOptions {
                output_dir,
                ..Default::default()
            };
            handle_layout(yaml.as_deref(), &options, bom_rows, format)
        }
        Commands::Sheets => {
            handle_sheets();
            0
        }
    };

    process::exit(exit_code);
}

fn locate_yaml(yaml: Option<&Path>) -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    Ok(find_source_yaml(yaml, &cwd)?)
}

fn run_postprocess(
    yaml: Option<&Path>,
    options: &PostprocessOptions,
) -> anyhow::Result<PostprocessResult> {
    let yaml = locate_yaml(yaml)?;
    WiresheetCore::postprocess(&yaml, options)
        .with_context(|| format!("post-processing {} failed", yaml.display()))
}

fn handle_postprocess(
    yaml: Option<&Path>,
    options: &PostprocessOptions,
    format: OutputFormat,
    fail_on_warning: bool,
) -> i32 {
    match run_postprocess(yaml, options) {
        Ok(result) => {
            output_result(&result, &format);
            if fail_on_warning && result.has_warnings() {
                return 1;
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn output_result(result: &PostprocessResult, format: &OutputFormat) {
    match format {
        OutputFormat::Human => output_human(result),
        OutputFormat::Json => output_json(result),
        OutputFormat::Github => output_github(result),
    }
}

fn print_diagnostics(title: &str, diagnostics: &[&Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("\n  {}:", title);
    for d in diagnostics {
        println!("    - {}", d.message);
        if let Some(ref suggestion) = d.suggestion {
            println!("      Suggestion: {}", suggestion);
        }
    }
}

fn describe_layout(spec: &LayoutSpec) -> String {
    format!(
        "notes {} | drawing {} x {} | BOM {}",
        format_px(spec.notes_width),
        format_px(spec.drawing_width),
        format_px(spec.drawing_height),
        format_px(spec.bom_height)
    )
}

fn output_human(result: &PostprocessResult) {
    println!("\nSource: {}", result.source.display());
    println!("{}", "─".repeat(60));

    if result.files.is_empty() {
        println!("  No WireViz outputs found in {}", result.output_dir.display());
    }
    for file in &result.files {
        let notes = if file.notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", file.notes.join(", "))
        };
        println!("  {}{}", file.path.display(), notes);
    }

    if let Some(ref spec) = result.layout {
        println!("\n  Layout ({}): {}", result.sheet_size, describe_layout(spec));
    }

    let warnings: Vec<_> = result.diagnostics.iter().filter(|d| d.is_warning()).collect();
    let info: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| matches!(d.severity, Severity::Info))
        .collect();
    print_diagnostics("WARNINGS", &warnings);
    print_diagnostics("INFO", &info);

    println!("\n  Summary:");
    println!("    Warnings: {}", result.stats.warnings);
    println!("    Info:     {}", result.stats.info);
}

fn output_json(result: &PostprocessResult) {
    let output = serde_json::json!({
        "source": result.source.display().to_string(),
        "output_dir": result.output_dir.display().to_string(),
        "sheet_size": result.sheet_size,
        "files": result.files.iter().map(|f| {
            serde_json::json!({
                "path": f.path.display().to_string(),
                "notes": f.notes,
                "written": f.written,
            })
        }).collect::<Vec<_>>(),
        "layout": result.layout,
        "diagnostics": result.diagnostics,
        "summary": {
            "warnings": result.stats.warnings,
            "info": result.stats.info,
        },
        "processed_at": result.processed_at,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn severity_to_github(d: &Diagnostic) -> &'static str {
    match d.severity {
        Severity::Warning => "warning",
        Severity::Info => "notice",
    }
}

fn output_github(result: &PostprocessResult) {
    for d in &result.diagnostics {
        println!(
            "::{} file={},title={}::{}",
            severity_to_github(d),
            result.source.display(),
            d.kind,
            d.message.replace('\n', " ")
        );
    }
}

fn handle_layout(
    yaml: Option<&Path>,
    options: &PostprocessOptions,
    bom_rows: Option<usize>,
    format: LayoutFormat,
) -> i32 {
    let preview = locate_yaml(yaml).and_then(|yaml| {
        WiresheetCore::preview_layout(&yaml, options, bom_rows)
            .with_context(|| format!("resolving the layout of {} failed", yaml.display()))
    });
    match preview {
        Ok(preview) => {
            match format {
                LayoutFormat::Human => output_layout_human(&preview),
                LayoutFormat::Json => match serde_json::to_string_pretty(&preview) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return 1;
                    }
                },
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn output_layout_human(preview: &LayoutPreview) {
    let spec = &preview.spec;
    println!("\nSource: {}", preview.source.display());
    println!("{}", "─".repeat(60));
    println!(
        "  Sheet:   {} ({} x {} working area)",
        preview.sheet_size,
        format_px(preview.page.width),
        format_px(preview.page.height)
    );
    println!(
        "  Content: BOM {}, notes {}, drawing {} x {}",
        format_px(preview.content.bom.height),
        format_px(preview.content.notes.height),
        format_px(preview.content.drawing.width),
        format_px(preview.content.drawing.height)
    );
    println!("  Layout:  {}", describe_layout(spec));
    println!(
        "  Modes:   bom_height_mode={:?} height_priority={:?} width_priority={:?}",
        spec.bom_height_mode, spec.height_priority, spec.width_priority
    );
    println!("\n  CSS:\n    {}", spec.to_css());

    let all: Vec<_> = preview.diagnostics.iter().collect();
    print_diagnostics("DIAGNOSTICS", &all);
}

fn handle_sheets() {
    println!("Supported sheet sizes (landscape):\n");
    for size in SheetSize::ALL {
        let (w, h) = size.dimensions_mm();
        let page = PageArea::for_sheet(size, 0.0);
        println!(
            "  {:<8} {} x {} mm  ({} x {})",
            size.as_str(),
            w,
            h,
            format_px(page.width),
            format_px(page.height)
        );
    }
}
