//! Tabscope - tabular dataset analysis server for AI agents
//!
//! Loads CSV and JSON datasets into named slots and serves statistics,
//! correlations, grouping, quality checks, insights, filtering and export
//! as tools over newline-delimited JSON-RPC on stdio.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, preload failure, etc.)
//!   2 - A one-shot --call reported a tool error

mod analysis;
mod cli;
mod config;
mod error;
mod history;
mod loader;
mod models;
mod registry;
mod report;
mod server;
mod tools;
mod workspace;

use anyhow::{bail, Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use serde_json::{json, Value};
use server::McpServer;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{debug, error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use workspace::Workspace;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (config, config_note) = load_config(&args)?;

    if let Err(e) = init_logging(&args, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    info!("Tabscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    if let Some(note) = config_note {
        info!("{}", note);
    }

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Server failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .tabscope.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize delimiters, null markers, thresholds and export.");
    Ok(())
}

/// Initialize logging. Log lines go to stderr, and also to the configured
/// log file when one is set. `RUST_LOG` overrides the verbosity flags.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    match config.general.log_file {
        Some(ref log_file) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .with_context(|| format!("Failed to open log file: {}", log_file))?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
    }

    Ok(())
}

/// Preload datasets, then either answer one --call or serve stdio.
/// Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let mut server = McpServer::new(Workspace::new(config));

    for (name, path) in args.preloads() {
        let result = server.call_tool(
            "load_dataset",
            &json!({"path": path.display().to_string(), "name": name}),
        );
        if !result.success {
            bail!("Failed to preload '{}': {}", name, result.text());
        }
        info!("Preloaded '{}' from {}", name, path.display());
    }

    if let Some(ref tool) = args.call {
        let arguments: Value = match args.args {
            Some(ref raw) => serde_json::from_str(raw).context("Failed to parse --args")?,
            None => json!({}),
        };
        let result = server.call_tool(tool, &arguments);
        println!("{}", result.text());
        return Ok(if result.success { 0 } else { 2 });
    }

    server.run_stdio().await?;
    Ok(0)
}

/// Load configuration from file or use defaults, then apply CLI overrides.
///
/// Runs before logging is up, so it returns a note to log afterwards.
fn load_config(args: &Args) -> Result<(Config, Option<String>)> {
    let (mut config, note) = if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        (
            config,
            Some(format!("Loaded config from: {}", config_path.display())),
        )
    } else {
        match Config::load_default() {
            Ok(Some(config)) => (
                config,
                Some(format!("Loaded default config from {}", CONFIG_FILE_NAME)),
            ),
            Ok(None) => (Config::default(), None),
            Err(e) => {
                eprintln!("Warning: failed to load {}: {:#}", CONFIG_FILE_NAME, e);
                (Config::default(), None)
            }
        }
    };

    config.merge_with_args(args);
    Ok((config, note))
}
