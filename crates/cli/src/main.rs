//! Ciclo CLI
//!
//! Usage:
//!   ciclo run extrato.csv --holder "Isabela Valonni"   Classify and summarize a statement
//!   ciclo rules                                        List category rules
//!   ciclo competence 2025-11-28                        Show a date's competence month

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run {
            file,
            cycle_start_day,
            holder,
            date_format,
            delimiter,
            format,
            transactions,
        } => {
            let overrides = commands::Overrides {
                cycle_start_day,
                holder,
                date_format,
            };
            commands::cmd_run(config_path, &file, overrides, delimiter, format, transactions)
        }
        Commands::Rules => commands::cmd_rules(config_path),
        Commands::Competence {
            date,
            cycle_start_day,
        } => commands::cmd_competence(config_path, &date, cycle_start_day),
    }
}
