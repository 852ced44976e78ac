//! CLI argument definitions using clap
//!
//! Command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Ciclo - classify bank statements and total them by competence month
#[derive(Parser)]
#[command(name = "ciclo")]
#[command(about = "Personal finance statement pipeline with competence-cycle summaries", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a statement through the pipeline and print the summaries
    Run {
        /// Statement export (.csv, .txt, .xls or .xlsx)
        file: PathBuf,

        /// Day of month on which a new cycle begins (1-31)
        #[arg(long)]
        cycle_start_day: Option<u32>,

        /// Account holder name used to detect internal transfers
        #[arg(long)]
        holder: Option<String>,

        /// chrono date format tried before the built-in ones
        #[arg(long)]
        date_format: Option<String>,

        /// Field delimiter (auto-detected if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Also list the classified transactions
        #[arg(long)]
        transactions: bool,
    },

    /// List the active category rules in match order
    Rules,

    /// Show which competence month a date falls in
    Competence {
        /// Date, e.g. 2025-11-28 or 28/11/2025
        date: String,

        /// Day of month on which a new cycle begins (1-31)
        #[arg(long)]
        cycle_start_day: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
