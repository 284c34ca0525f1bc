//! CLI binary for checking and querying flag manifests.
//!
//! This binary loads a manifest through the same code path a service uses,
//! so operators can verify a manifest before shipping it.
//!
//! # Commands
//!
//! - `check`: Load a manifest and print a summary
//! - `query`: Print the state of one or more flags
//! - `list`: List flags, optionally filtered by service
//! - `watch`: Reload a manifest periodically and report changes

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use flagstore::{
    ContainerShape, FlagDefinition, FlagStore, FlagStoreConfig, LoadError, SourceFormat,
    SourceSchema, StartupPolicy,
};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Environment variable controlling log output.
const LOG_ENV: &str = "FLAGSTORE_LOG";

/// CLI for checking and querying feature flag manifests
#[derive(Parser)]
#[command(name = "flagctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a manifest and print a summary
    Check {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the load summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the state of one or more flags
    Query {
        #[command(flatten)]
        source: SourceArgs,

        /// Flag names to look up
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List flags sorted by name
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// Only list flags declared under this service
        #[arg(short, long)]
        service: Option<String>,

        /// Only list enabled flags
        #[arg(short, long)]
        enabled_only: bool,

        /// Print flags as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reload a manifest periodically and report changes
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        /// Delay between reloads in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many reloads
        #[arg(long)]
        iterations: Option<u64>,
    },
}

/// Location and layout of the manifest
#[derive(Args)]
struct SourceArgs {
    /// Path to the manifest file
    file: PathBuf,

    /// Manifest format (json or yaml)
    #[arg(short, long, default_value = "json")]
    format: String,

    /// The manifest root is an object keyed by flag name
    #[arg(short, long)]
    keyed: bool,

    /// State token that enables a flag
    #[arg(long, default_value = flagstore::model::DEFAULT_ENABLED_TOKEN)]
    enabled_token: String,
}

impl SourceArgs {
    fn open(&self) -> Result<FlagStore, LoadError> {
        let format: SourceFormat = self.format.parse()?;
        let container = if self.keyed {
            ContainerShape::Keyed
        } else {
            ContainerShape::Array
        };
        let schema = SourceSchema::default()
            .with_format(format)
            .with_container(container)
            .with_enabled_token(self.enabled_token.clone());

        FlagStore::open(
            FlagStoreConfig::new(&self.file)
                .with_schema(schema)
                .with_startup_policy(StartupPolicy::Strict),
        )
    }
}

fn state_label(enabled: bool) -> colored::ColoredString {
    if enabled {
        "enabled".green()
    } else {
        "disabled".red()
    }
}

/// Run the check command.
fn run_check(source: &SourceArgs, json: bool) -> Result<(), LoadError> {
    let start = Instant::now();
    let store = source.open()?;
    let duration = start.elapsed();
    let table = store.snapshot();

    if json {
        let summary = serde_json::json!({
            "source": store.source_description(),
            "flags": table.len(),
            "enabled": table.enabled_count(),
            "services": table.service_counts(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_else(|_| summary.to_string())
        );
        return Ok(());
    }

    println!(
        "{} Loaded {} flags from {}",
        "✓".green(),
        table.len(),
        store.source_description()
    );
    println!("  Enabled: {}", table.enabled_count().to_string().green());
    println!(
        "  Disabled: {}",
        (table.len() - table.enabled_count()).to_string().red()
    );
    println!("Time: {:?}", duration);

    let services = table.service_counts();
    if !services.is_empty() {
        println!();
        println!("{}", "Flags by service:".bold());
        for (service, count) in services {
            println!("  {}: {}", service.cyan(), count);
        }
    }
    Ok(())
}

/// Run the query command.
fn run_query(source: &SourceArgs, names: &[String]) -> Result<(), LoadError> {
    let store = source.open()?;
    let table = store.snapshot();

    for name in names {
        match table.get(name) {
            Some(enabled) => println!("{}: {}", name, state_label(enabled)),
            None => println!("{}: {} {}", name, state_label(false), "(not declared)".dimmed()),
        }
    }
    Ok(())
}

/// Run the list command.
fn run_list(
    source: &SourceArgs,
    service: Option<&str>,
    enabled_only: bool,
    json: bool,
) -> Result<(), LoadError> {
    let store = source.open()?;
    let table = store.snapshot();

    let flags: Vec<FlagDefinition> = table
        .sorted_flags()
        .into_iter()
        .filter(|(name, _)| service.is_none() || table.service_of(name) == service)
        .filter(|(_, enabled)| !enabled_only || *enabled)
        .map(|(name, enabled)| FlagDefinition {
            name: name.to_string(),
            enabled,
            service: table.service_of(name).map(str::to_string),
        })
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&flags).unwrap_or_else(|_| "[]".to_string())
        );
        return Ok(());
    }

    for flag in &flags {
        match &flag.service {
            Some(service) => println!(
                "{} {} {}",
                flag.name,
                state_label(flag.enabled),
                format!("[{}]", service).dimmed()
            ),
            None => println!("{} {}", flag.name, state_label(flag.enabled)),
        }
    }
    println!();
    println!("{} flag(s)", flags.len());
    Ok(())
}

/// Run the watch command.
fn run_watch(source: &SourceArgs, interval_ms: u64, iterations: Option<u64>) -> Result<(), LoadError> {
    let store = source.open()?;
    println!(
        "{} Watching {} (generation {})",
        "✓".green(),
        store.source_description(),
        store.generation()
    );

    let interval = Duration::from_millis(interval_ms);
    let mut completed = 0;
    while iterations.map_or(true, |limit| completed < limit) {
        thread::sleep(interval);
        completed += 1;

        match store.reload() {
            Ok(summary) if summary.changed_flags.is_empty() => {}
            Ok(summary) => {
                println!(
                    "{} Generation {}: {} flag(s) changed",
                    "✓".green(),
                    summary.generation,
                    summary.changed_flags.len()
                );
                for name in &summary.changed_flags {
                    println!("  {}: {}", name, state_label(store.is_enabled(name)));
                }
            }
            Err(e) => {
                println!("{} Reload failed, keeping previous flags", "✗".red());
                println!("Error: {}", e.to_string().red());
            }
        }
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("flagstore=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Check { source, json } => run_check(source, *json),
        Commands::Query { source, names } => run_query(source, names),
        Commands::List {
            source,
            service,
            enabled_only,
            json,
        } => run_list(source, service.as_deref(), *enabled_only, *json),
        Commands::Watch {
            source,
            interval_ms,
            iterations,
        } => run_watch(source, *interval_ms, *iterations),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
