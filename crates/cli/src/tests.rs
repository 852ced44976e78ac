//! CLI command tests

use std::path::Path;

use chrono::NaiveDate;
use clap::Parser;
use ciclo_core::CycleStartDay;
use ciclo_import::{read_csv, CategoryRuleEngine, Pipeline, PipelineConfig, PipelineOutput};

use crate::cli::{Cli, Commands, OutputFormat};
use crate::commands::{self, Overrides};

const STATEMENT: &str = "\
data;descrição;valor;identificador
03/11/2025;Outback Steakhouse;-189,90;a1
10/11/2025;Supermercados Mundial;-1.250,35;a2
29/11/2025;Wise Brasil;-300,00;a3
";

fn write_fixture(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn run_statement(csv: &str) -> PipelineOutput {
    let table = read_csv(csv.as_bytes(), None).unwrap();
    Pipeline::new(
        CategoryRuleEngine::with_default_rules().unwrap(),
        "Isabela Valonni",
        CycleStartDay::default(),
    )
    .run(&table)
    .unwrap()
}

// ========== Argument Parsing ==========

#[test]
fn test_parse_run_arguments() {
    let cli = Cli::try_parse_from([
        "ciclo",
        "-v",
        "run",
        "extrato.csv",
        "--cycle-start-day",
        "5",
        "--holder",
        "Fulana",
        "--format",
        "json",
        "--transactions",
    ])
    .unwrap();
    assert!(cli.verbose);
    match cli.command {
        Commands::Run {
            file,
            cycle_start_day,
            holder,
            format,
            transactions,
            ..
        } => {
            assert_eq!(file, Path::new("extrato.csv"));
            assert_eq!(cycle_start_day, Some(5));
            assert_eq!(holder.as_deref(), Some("Fulana"));
            assert_eq!(format, OutputFormat::Json);
            assert!(transactions);
        }
        _ => panic!("expected run"),
    }
}

#[test]
fn test_parse_competence_arguments() {
    let cli = Cli::try_parse_from(["ciclo", "competence", "2025-11-28"]).unwrap();
    assert!(matches!(cli.command, Commands::Competence { ref date, cycle_start_day: None } if date == "2025-11-28"));
}

// ========== Config ==========

#[test]
fn test_overrides_win_over_config() {
    let mut config = PipelineConfig::from_toml("cycle_start_day = 10\nholder_name = \"A\"").unwrap();
    Overrides {
        cycle_start_day: Some(3),
        holder: Some("B".into()),
        date_format: None,
    }
    .apply(&mut config)
    .unwrap();
    assert_eq!(config.cycle_start_day.day(), 3);
    assert_eq!(config.holder_name.as_deref(), Some("B"));
}

#[test]
fn test_overrides_reject_invalid_cycle_start_day() {
    let mut config = PipelineConfig::default();
    let result = Overrides {
        cycle_start_day: Some(0),
        ..Overrides::default()
    }
    .apply(&mut config);
    assert!(result.is_err());
    assert_eq!(config.cycle_start_day.day(), 28);
}

#[test]
fn test_explicit_missing_config_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(commands::load_config(Some(&dir.path().join("missing.toml"))).is_err());
}

// ========== Commands ==========

#[test]
fn test_cmd_run_table_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fixture(dir.path(), "extrato.csv", STATEMENT);
    let config = write_fixture(dir.path(), "config.toml", "holder_name = \"Isabela Valonni\"\n");

    for format in [OutputFormat::Table, OutputFormat::Json] {
        let result = commands::cmd_run(
            Some(&config),
            &file,
            Overrides::default(),
            None,
            format,
            true,
        );
        assert!(result.is_ok(), "{result:?}");
    }
}

#[test]
fn test_cmd_run_rejects_unsupported_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fixture(dir.path(), "extrato.pdf", "%PDF-1.4");
    let config = write_fixture(dir.path(), "config.toml", "");
    let result = commands::cmd_run(
        Some(&config),
        &file,
        Overrides::default(),
        None,
        OutputFormat::Table,
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_run_rejects_non_ascii_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fixture(dir.path(), "extrato.csv", STATEMENT);
    let config = write_fixture(dir.path(), "config.toml", "");
    let result = commands::cmd_run(
        Some(&config),
        &file,
        Overrides::default(),
        Some('§'),
        OutputFormat::Table,
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_rules_and_competence() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "config.toml", "");
    assert!(commands::cmd_rules(Some(&config)).is_ok());
    assert!(commands::cmd_competence(Some(&config), "28/11/2025", None).is_ok());
    assert!(commands::cmd_competence(Some(&config), "ontem", None).is_err());
}

// ========== Rendering ==========

#[test]
fn test_competence_line_shows_cycle() {
    let date = NaiveDate::from_ymd_opt(2025, 11, 28).unwrap();
    let line = commands::competence_line(date, CycleStartDay::default());
    assert_eq!(
        line,
        "2025-11-28 falls in competence 2025-12-01 (cycle 2025-11-28 to 2025-12-27)"
    );
}

#[test]
fn test_render_report_sections() {
    let output = run_statement(STATEMENT);
    let text = commands::render_report(&output, false);
    assert!(text.starts_with("3 transactions, 0 duplicates removed (by operation_id)"));
    assert!(!text.contains("Outback"));
    assert!(text.contains("Empresa Valonni"));
    assert!(text.contains("No investment movements."));
    assert!(text.contains("Personal totals by category"));
}

#[test]
fn test_render_report_empty_partitions() {
    let output = run_statement("date,description,amount\n");
    let text = commands::render_report(&output, true);
    assert!(text.contains("No personal movements."));
    assert!(text.contains("No pass-through movements."));
    assert!(text.contains("No investment movements."));
    assert!(!text.contains("Personal totals by category"));
}

#[test]
fn test_render_report_lists_transactions() {
    let output = run_statement(STATEMENT);
    let text = commands::render_report(&output, true);
    assert!(text.contains("Supermercados Mundial"));
    assert!(text.contains("Mercado"));
}

#[test]
fn test_rules_table_lists_in_order() {
    let engine = CategoryRuleEngine::with_default_rules().unwrap();
    let rendered = commands::rules_table(&engine).to_string();
    let moradia = rendered.find("Moradia").unwrap();
    let valonni = rendered.find("Empresa Valonni").unwrap();
    assert!(moradia < valonni);
    assert!(rendered.contains("valonni"));
    assert!(rendered.contains("investment"));
}
