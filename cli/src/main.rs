//! formkit CLI
//!
//! Developer harness for the formkit engine.
//!
//! # Usage
//!
//! ```bash
//! formkit inspect --schema product.json --strict
//! formkit run --schema product.json --set PREMIUM=2000 --blur NOMINEE_NAME --validate
//! formkit eval "@PREMIUM * 10" --value PREMIUM=1250 --format json
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "formkit")]
#[command(version)]
#[command(about = "Inspect form schemas and replay form sessions", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, env = "FORMKIT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a schema for one transaction/step
    Inspect(commands::inspect::InspectArgs),
    /// Replay events against a schema and print the final state
    Run(commands::run::RunArgs),
    /// Evaluate one expression
    Eval(commands::eval::EvalArgs),
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = config::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Inspect(args) => commands::inspect::handle(args, &config, cli.format),
        Commands::Run(args) => commands::run::handle(args, &config, cli.format),
        Commands::Eval(args) => commands::eval::handle(args, &config, cli.format),
    });

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
