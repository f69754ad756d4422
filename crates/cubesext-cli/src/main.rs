use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use cubesext_core::{Config, Report, Severity};
use cubesext_engine::{sql_to_cubes, ModelBuild};
use cubesext_server::{NotebookSession, SlicerOrchestrator, StaticViewer};

/// Cubesext - OLAP models inferred from relational schemas
#[derive(Parser)]
#[command(name = "cubesext")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: cubesext.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer a model from a database and write it as JSON
    Infer {
        #[command(flatten)]
        source: SourceArgs,

        /// Also write an inference report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Infer a model and start the slicer server on it
    ///
    /// Each invocation launches a new slicer. A slicer started by an earlier
    /// run is not stopped; stop it first or pick another port.
    Serve {
        #[command(flatten)]
        source: SourceArgs,

        /// Slicer host
        #[arg(long)]
        host: Option<String>,

        /// Slicer port
        #[arg(long)]
        port: Option<u16>,

        /// Serve the viewer once the slicer is running
        #[arg(long)]
        viewer: bool,
    },

    /// Serve the static viewer
    Viewer {
        /// Slicer URL the viewer talks to
        #[arg(long)]
        cubes_url: Option<String>,

        /// Viewer port
        #[arg(long)]
        port: Option<u16>,

        /// Do not open a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Print notebook HTML embedding a viewer for a cube
    Embed {
        /// Cube name
        cube: String,

        /// Serialized view (JSON) instead of the default explore view
        #[arg(long)]
        view: Option<String>,

        /// Slicer URL the viewer talks to
        #[arg(long)]
        cubes_url: Option<String>,

        /// Number of embeds to render
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
}

/// Database and inference options shared by `infer` and `serve`
#[derive(Args)]
struct SourceArgs {
    /// Database URL (sqlite:///path.db, postgresql://...)
    #[arg(env = "CUBESEXT_DB_URL")]
    db_url: String,

    /// Output file for the model (default: a temporary file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Column to always treat as a dimension
    #[arg(short = 'd', long = "dimension")]
    dimensions: Vec<String>,

    /// Only read these tables
    #[arg(short = 't', long = "table")]
    tables: Vec<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Infer { source, report } => {
            infer_command(&mut config, &source, report.as_deref(), cli.verbose)
        }
        Commands::Serve {
            source,
            host,
            port,
            viewer,
        } => {
            if let Some(host) = host {
                config.slicer.host = host;
            }
            if let Some(port) = port {
                config.slicer.port = port;
            }
            serve_command(&mut config, &source, viewer, cli.verbose)
        }
        Commands::Viewer {
            cubes_url,
            port,
            no_browser,
        } => {
            if let Some(port) = port {
                config.viewer.port = port;
            }
            if no_browser {
                config.viewer.open_browser = false;
            }
            let cubes_url = cubes_url.unwrap_or_else(|| config.slicer.base_url());
            viewer_command(&config, &cubes_url)
        }
        Commands::Embed {
            cube,
            view,
            cubes_url,
            count,
        } => {
            let cubes_url = cubes_url.unwrap_or_else(|| config.slicer.base_url());
            embed_command(&config, &cube, view.as_deref(), &cubes_url, count)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)?
    } else if Path::new("cubesext.toml").exists() {
        Config::from_file(Path::new("cubesext.toml"))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };
    Ok(config)
}

/// Apply command-line inference flags and build the model
fn build(config: &mut Config, source: &SourceArgs, verbose: bool) -> Result<ModelBuild> {
    config
        .inference
        .force_dimensions
        .extend(source.dimensions.iter().cloned());
    config.inference.tables.extend(source.tables.iter().cloned());

    if verbose {
        eprintln!("{} {}", "Reading schema from:".cyan(), source.db_url);
    }

    let build = sql_to_cubes(&source.db_url, &config.inference, source.output.as_deref())
        .with_context(|| format!("Failed to build a model for {}", source.db_url))?;

    println!("{} {}", "Model written to:".green(), build.path.display());
    Ok(build)
}

/// Infer command - write a model and print its summary
fn infer_command(
    config: &mut Config,
    source: &SourceArgs,
    report_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let build = build(config, source, verbose)?;
    let report = build.report();

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    print_report_summary(&report);
    Ok(())
}

/// Serve command - write a model and start the slicer on it
fn serve_command(
    config: &mut Config,
    source: &SourceArgs,
    with_viewer: bool,
    verbose: bool,
) -> Result<()> {
    let build = build(config, source, verbose)?;
    if verbose {
        print_report_summary(&build.report());
    }

    let mut orchestrator = SlicerOrchestrator::new(&config.slicer);
    let outcome = orchestrator.start_or_restart(&source.db_url, &build.path)?;

    println!(
        "{} {} (pid {})",
        "Slicer started at".green(),
        config.slicer.base_url(),
        outcome.pid
    );
    if verbose {
        eprintln!("{} {}", "Slicer config:".cyan(), outcome.config_path.display());
    }

    if with_viewer {
        viewer_command(config, &config.slicer.base_url())?;
    }

    Ok(())
}

/// Viewer command - serve the static viewer until interrupted
fn viewer_command(config: &Config, cubes_url: &str) -> Result<()> {
    let viewer = StaticViewer::from_settings(&config.viewer, config.static_dir());
    println!("{}", "Press Ctrl+C to stop".dimmed());
    viewer.serve(cubes_url, config.viewer.open_browser)?;
    Ok(())
}

/// Embed command - print notebook fragments
fn embed_command(
    config: &Config,
    cube: &str,
    view: Option<&str>,
    cubes_url: &str,
    count: u32,
) -> Result<()> {
    let mut session = NotebookSession::from_settings(&config.viewer, cubes_url);
    for _ in 0..count {
        let html = session.embed(cube, view)?;
        println!("{}", html);
    }
    Ok(())
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Model Inference Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    if let Some(path) = &report.model_path {
        println!("Model: {}", path);
    }
    println!("Timestamp: {}", report.timestamp);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Tables:        {}", summary.tables);
    println!("  Cubes:         {}", summary.facts.to_string().green());
    println!("  Dimensions:    {}", summary.dimensions);
    println!("  Measures:      {}", summary.measures);
    println!("  Mapping rules: {}", summary.mapping_rules);

    if summary.dropped_columns > 0 {
        println!("  Dropped:       {}", summary.dropped_columns.to_string().yellow());
    }
    if summary.warnings > 0 {
        println!("  Warnings:      {}", summary.warnings.to_string().yellow());
    } else {
        println!("  Warnings:      {}", summary.warnings.to_string().green());
    }
    println!("  Info:          {}", summary.info);
    println!();

    let notable: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity != Severity::Info)
        .collect();

    if notable.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in notable {
            let severity_str = match diag.severity {
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                println!("    at {}", loc);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
