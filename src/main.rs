//! sdigital orders - command-line entry point
//!
//! This binary provides three subcommands:
//! - whoami: Check the API key
//! - orders: Create, confirm, inspect and wait on orders
//! - recipients: Manage payees

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sdigital_orders::AppConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::orders::OrdersCommand;
use commands::recipients::RecipientsCommand;
use commands::CommandContext;

/// Environment variable holding the API key, read after loading `.env`
const API_KEY_VAR: &str = "SDIGITAL_API_KEY";

#[derive(Parser, Debug)]
#[command(name = "sdigital-orders")]
#[command(about = "Client for the sdigital fiat/crypto orders API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API key (falls back to SDIGITAL_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify the API key
    Whoami,

    /// Order operations
    Orders {
        #[command(subcommand)]
        command: OrdersCommand,
    },

    /// Recipient operations
    Recipients {
        #[command(subcommand)]
        command: RecipientsCommand,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // stdout carries the JSON output, so the console layer writes to stderr
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn resolve_api_key(flag: Option<String>) -> Result<String> {
    let key = match flag {
        Some(key) => key,
        None => std::env::var(API_KEY_VAR)
            .with_context(|| format!("No API key: pass --api-key or set {}", API_KEY_VAR))?,
    };
    if key.trim().is_empty() {
        anyhow::bail!("API key is empty");
    }
    Ok(key)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Whoami => "whoami",
        Commands::Orders { .. } => "orders",
        Commands::Recipients { .. } => "recipients",
    };
    setup_logging(cli.verbose, command_name)?;

    let config = match &cli.config {
        Some(path) => {
            let config = AppConfig::from_file(path)?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => AppConfig::default(),
    };

    let ctx = CommandContext {
        config,
        api_key: resolve_api_key(cli.api_key)?,
    };

    match cli.command {
        Commands::Whoami => commands::whoami(&ctx),
        Commands::Orders { command } => commands::orders::run(&ctx, command),
        Commands::Recipients { command } => commands::recipients::run(&ctx, command),
    }
}
