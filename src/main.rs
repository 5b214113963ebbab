//! cpgscope CLI - scope and call resolution over frontend event files

use clap::{Parser, Subcommand, ValueEnum};
use cpgscope::call::CallResolutionKind;
use cpgscope::config::{self, CpgscopeConfig};
use cpgscope::diagnostic::Diagnostic;
use cpgscope::linker::{CallOutcome, Linker, LinkerStats};
use cpgscope::pipeline::{Pipeline, UnitFailure};
use cpgscope::scope::MergeStats;
use cpgscope::ui::{self, Icons};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "cpgscope")]
#[command(version)]
#[command(about = "Scope, symbol and call resolution for a language-agnostic code property graph")]
#[command(long_about = r#"
cpgscope replays per-translation-unit frontend event files (JSON), builds one
scope tree per unit in parallel, merges them and resolves every reference
and call site:
  • Scope tree with namespaces, records, functions and blocks
  • Qualified, relative and alias-aware name lookup
  • Overload resolution with implicit casts and default arguments

Example usage:
  cpgscope resolve events/
  cpgscope resolve a.json b.json --format json --calls
  cpgscope languages
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve references and calls in event files
    Resolve {
        /// Event files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Worker threads (defaults to the config, then the CPU count)
        #[arg(short, long)]
        workers: Option<usize>,

        /// List every call site with its targets
        #[arg(long)]
        calls: bool,
    },

    /// List the configured languages
    Languages,

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    units: usize,
    merge: MergeStats,
    linker: &'a LinkerStats,
    failures: &'a [UnitFailure],
    diagnostics: &'a [Diagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    calls: Option<&'a [CallOutcome]>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(settings.log_level.as_deref().unwrap_or("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Resolve { paths, format, workers, calls } => {
            resolve(&settings, &paths, format, workers, calls)?;
        }

        Commands::Languages => {
            let registry = settings.registry();
            println!("{}", ui::languages_table(registry.languages().iter().map(|l| l.as_ref())));
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let defaults = CpgscopeConfig {
                log_level: Some("info".to_string()),
                workers: None,
                languages: Vec::new(),
            };
            config::write_config(&path, &defaults, force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

fn resolve(
    settings: &CpgscopeConfig,
    paths: &[PathBuf],
    format: OutputFormat,
    workers: Option<usize>,
    list_calls: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let inputs = collect_inputs(paths)?;
    if inputs.is_empty() {
        anyhow::bail!("no event files found");
    }
    let units = inputs.len();

    let registry = settings.registry();
    let mut pipeline = Pipeline::new(&registry);
    if let Some(workers) = workers.or(settings.workers) {
        pipeline = pipeline.with_workers(workers);
    }
    let mut output = pipeline.process_files(inputs)?;
    let (stats, outcomes) = Linker::new(&mut output.manager).run();
    let manager = &output.manager;

    if format == OutputFormat::Json {
        let report = Report {
            units,
            merge: output.merge,
            linker: &stats,
            failures: &output.failures,
            diagnostics: manager.diagnostics(),
            calls: list_calls.then_some(outcomes.as_slice()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ui::header(&format!("Resolving {} event files", units));
    for failure in &output.failures {
        ui::error(&format!("{}: {}", failure.path, failure.error));
    }
    for diagnostic in manager.diagnostics() {
        ui::diagnostic(diagnostic);
    }

    ui::section("Scopes");
    println!(
        "{}",
        ui::stats_table(&[
            ("Units merged", output.merge.units.to_string()),
            ("Scopes", manager.scope_count().to_string()),
            ("Nodes", manager.nodes().len().to_string()),
            ("Named scopes coalesced", output.merge.coalesced.to_string()),
            ("Diagnostics", manager.diagnostics().len().to_string()),
        ])
    );

    ui::section("Linking");
    ui::status(Icons::LINK, "References", &stats.references.to_string());
    ui::status(Icons::FILE, "Calls", &stats.calls.to_string());
    for (kind, count) in [
        (CallResolutionKind::Successful, stats.resolved),
        (CallResolutionKind::Ambiguous, stats.ambiguous),
        (CallResolutionKind::Problematic, stats.problematic),
        (CallResolutionKind::Unresolved, stats.unresolved),
    ] {
        ui::summary_row(&ui::resolution(kind), &count.to_string());
    }

    if list_calls && !outcomes.is_empty() {
        ui::section("Calls");
        println!("{}", ui::calls_table(&outcomes, manager));
    }

    println!();
    ui::status(
        Icons::STATS,
        "Done",
        &ui::muted(&format!("{:.2?}", started.elapsed())),
    );
    Ok(())
}

/// Event files named on the command line, directories walked for `*.json`
fn collect_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_file() {
            inputs.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("no such file or directory: {}", path.display());
        }

        let mut found: Vec<PathBuf> = ignore::WalkBuilder::new(path)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|p| is_event_file(p))
            .collect();
        found.sort();
        inputs.extend(found);
    }
    Ok(inputs)
}

fn is_event_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
