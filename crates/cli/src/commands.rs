use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use ciclo_core::{Competence, CycleStartDay, SummaryRow};
use ciclo_import::{
    parse_date, read_path, CategoryRuleEngine, Pipeline, PipelineConfig, PipelineOutput,
};
use comfy_table::{Cell, Table};

use crate::cli::OutputFormat;

/// Rows shown by `run --transactions`.
pub const TRANSACTION_LIST_LIMIT: usize = 1000;

/// Command-line values that win over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub cycle_start_day: Option<u32>,
    pub holder: Option<String>,
    pub date_format: Option<String>,
}

impl Overrides {
    pub fn apply(self, config: &mut PipelineConfig) -> Result<()> {
        if let Some(day) = self.cycle_start_day {
            config.cycle_start_day = CycleStartDay::new(day)?;
        }
        if self.holder.is_some() {
            config.holder_name = self.holder;
        }
        if self.date_format.is_some() {
            config.date_format = self.date_format;
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "ciclo", "Ciclo")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// An explicit path must exist; the default location is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = explicit {
        return PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    match default_config_path() {
        Some(path) => Ok(PipelineConfig::load_or_default(&path)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn delimiter_byte(c: char) -> Result<u8> {
    if !c.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{c}'");
    }
    Ok(c as u8)
}

pub fn cmd_run(
    config_path: Option<&Path>,
    file: &Path,
    overrides: Overrides,
    delimiter: Option<char>,
    format: OutputFormat,
    list_transactions: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config)?;
    let delimiter = delimiter.map(delimiter_byte).transpose()?;

    let table = read_path(file, delimiter)
        .with_context(|| format!("Failed to read statement {}", file.display()))?;
    let output = Pipeline::from_config(&config)?.run(&table)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Table => print!("{}", render_report(&output, list_transactions)),
    }
    Ok(())
}

pub fn cmd_rules(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = config.rule_engine()?;
    println!("{}", rules_table(&engine));
    Ok(())
}

pub fn cmd_competence(
    config_path: Option<&Path>,
    date: &str,
    cycle_start_day: Option<u32>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    Overrides {
        cycle_start_day,
        ..Overrides::default()
    }
    .apply(&mut config)?;

    let Some(date) = parse_date(date, config.date_format.as_deref()) else {
        bail!("Unrecognized date: {date}");
    };
    println!("{}", competence_line(date, config.cycle_start_day));
    Ok(())
}

pub fn competence_line(date: NaiveDate, start: CycleStartDay) -> String {
    let competence = Competence::for_date(date, start);
    match competence.date_range(start) {
        Some(range) => format!("{date} falls in competence {competence} (cycle {range})"),
        None => format!("{date} falls in competence {competence}"),
    }
}

fn flag(set: bool) -> &'static str {
    if set {
        "x"
    } else {
        ""
    }
}

fn summary_table(rows: &[SummaryRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Competence", "Category", "Fixed", "Extra", "Total", "Count"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.key.competence),
            Cell::new(&row.key.category),
            Cell::new(flag(row.key.is_fixed)),
            Cell::new(flag(row.key.is_extraordinary)),
            Cell::new(row.total_amount),
            Cell::new(row.transaction_count),
        ]);
    }
    table
}

fn section(out: &mut String, title: &str, rows: &[SummaryRow], empty_note: &str) {
    let _ = writeln!(out, "\n{title}");
    if rows.is_empty() {
        let _ = writeln!(out, "{empty_note}");
    } else {
        let _ = writeln!(out, "{}", summary_table(rows));
    }
}

pub fn render_report(output: &PipelineOutput, list_transactions: bool) -> String {
    let mut out = String::new();
    let needs_review = output
        .transactions
        .iter()
        .filter(|t| t.classification.needs_review())
        .count();

    let _ = writeln!(
        out,
        "{} transactions, {} duplicates removed (by {}), {} internal transfers resolved, {} to review",
        output.transactions.len(),
        output.duplicates_removed,
        output.dedup_key,
        output.transfers_rescued,
        needs_review,
    );
    if output.report.missing_date_column {
        let _ = writeln!(out, "No date column found; nothing can be assigned a competence.");
    }
    if !output.report.unrecognized_columns.is_empty() {
        let _ = writeln!(
            out,
            "Unrecognized columns: {}",
            output.report.unrecognized_columns.join(", ")
        );
    }
    for issue in &output.report.issues {
        let _ = writeln!(out, "  {issue}");
    }

    section(
        &mut out,
        "Personal",
        &output.partitions.personal,
        "No personal movements.",
    );
    section(
        &mut out,
        "Pass-through (Valonni)",
        &output.partitions.pass_through,
        "No pass-through movements.",
    );
    section(
        &mut out,
        "Investments",
        &output.partitions.investment,
        "No investment movements.",
    );

    if !output.category_totals.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Total"]);
        for total in &output.category_totals {
            table.add_row(vec![Cell::new(&total.category), Cell::new(total.total_amount)]);
        }
        let _ = writeln!(out, "\nPersonal totals by category\n{table}");
    }

    if list_transactions {
        let _ = writeln!(out, "\n{}", transactions_table(output));
        if output.transactions.len() > TRANSACTION_LIST_LIMIT {
            let _ = writeln!(
                out,
                "Showing {TRANSACTION_LIST_LIMIT} of {} transactions.",
                output.transactions.len()
            );
        }
    }
    out
}

fn transactions_table(output: &PipelineOutput) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Date",
        "Competence",
        "Description",
        "Amount",
        "Category",
        "Subcategory",
    ]);
    for tx in output.transactions.iter().take(TRANSACTION_LIST_LIMIT) {
        table.add_row(vec![
            Cell::new(tx.date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(tx.competence.map(|c| c.to_string()).unwrap_or_default()),
            Cell::new(tx.text()),
            Cell::new(tx.amount.map(|a| a.to_string()).unwrap_or_default()),
            Cell::new(tx.category()),
            Cell::new(&tx.classification.subcategory),
        ]);
    }
    table
}

pub fn rules_table(engine: &CategoryRuleEngine) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Category", "Subcategory", "Keywords", "Flags"]);
    for (i, rule) in engine.rules().enumerate() {
        let flags: Vec<&str> = [
            (rule.is_fixed, "fixed"),
            (rule.is_extraordinary, "extraordinary"),
            (rule.is_investment, "investment"),
            (rule.is_valonni, "valonni"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&rule.category),
            Cell::new(rule.subcategory.as_deref().unwrap_or_default()),
            Cell::new(rule.keywords.join(", ")),
            Cell::new(flags.join(", ")),
        ]);
    }
    table
}
