//! Maps arbitrary statement headers onto the canonical transaction schema and
//! coerces dates and locale-formatted amounts.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use ciclo_core::{Money, Transaction};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::table::RawTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Column {
    Date,
    Title,
    Description,
    Amount,
    Currency,
    PaymentMethod,
    Status,
    OperationId,
    ActivityId,
}

impl Column {
    /// Resolves a raw header through the alias table. Matching ignores case
    /// and surrounding whitespace.
    pub fn from_header(header: &str) -> Option<Column> {
        let column = match header.trim().to_lowercase().as_str() {
            "date" | "data" | "data da compra" | "data lançamento" | "data lancamento" => {
                Column::Date
            }
            "title" | "título" | "titulo" | "estabelecimento" => Column::Title,
            "description" | "descrição" | "descricao" | "histórico" | "historico" => {
                Column::Description
            }
            "amount" | "valor" | "valor (r$)" => Column::Amount,
            "currency" | "moeda" => Column::Currency,
            "paymentmethod" | "payment_method" | "payment method" | "forma de pagamento" => {
                Column::PaymentMethod
            }
            "status" | "situação" | "situacao" => Column::Status,
            "operation_id" | "operationid" | "identificador" => Column::OperationId,
            "activity_id" | "activityid" => Column::ActivityId,
            _ => return None,
        };
        Some(column)
    }

    pub fn canonical_name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Title => "title",
            Column::Description => "description",
            Column::Amount => "amount",
            Column::Currency => "currency",
            Column::PaymentMethod => "paymentmethod",
            Column::Status => "status",
            Column::OperationId => "operation_id",
            Column::ActivityId => "activity_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Missing required column: {0}")]
    MissingRequiredColumn(String),
}

/// A cell that could not be coerced. The field is left empty and the row is
/// kept. `row` counts data rows from 1.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Unparseable {column} at row {row}: '{value}'")]
pub struct UnparseableValue {
    pub row: usize,
    pub column: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Headers with no canonical meaning (trimmed, lower-cased). They are
    /// carried in each transaction's `extra` map.
    pub unrecognized_columns: Vec<String>,
    pub missing_date_column: bool,
    pub issues: Vec<UnparseableValue>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub transactions: Vec<Transaction>,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Tried before the built-in formats.
    pub date_format: Option<String>,
}

pub fn normalize(table: &RawTable, options: &NormalizeOptions) -> Result<NormalizedBatch, NormalizeError> {
    // A zero-byte export has no header line at all; it is still an empty batch.
    if table.headers.is_empty() && table.rows.is_empty() {
        return Ok(NormalizedBatch::default());
    }

    let mut mapped: BTreeMap<usize, Column> = BTreeMap::new();
    let mut extras: Vec<(usize, String)> = Vec::new();

    for (idx, header) in table.headers.iter().enumerate() {
        match Column::from_header(header) {
            Some(col) if !mapped.values().any(|c| *c == col) => {
                mapped.insert(idx, col);
            }
            _ => extras.push((idx, header.trim().to_lowercase())),
        }
    }

    if !mapped.values().any(|c| *c == Column::Amount) {
        return Err(NormalizeError::MissingRequiredColumn(
            Column::Amount.canonical_name().to_string(),
        ));
    }

    let mut report = NormalizeReport {
        unrecognized_columns: extras.iter().map(|(_, name)| name.clone()).collect(),
        missing_date_column: !mapped.values().any(|c| *c == Column::Date),
        issues: Vec::new(),
    };
    if report.missing_date_column {
        tracing::warn!("No date column found; transactions will have no competence");
    }
    if !report.unrecognized_columns.is_empty() {
        tracing::debug!(columns = ?report.unrecognized_columns, "Passing through unrecognized columns");
    }

    let date_format = options.date_format.as_deref();
    let mut transactions = Vec::with_capacity(table.rows.len());

    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;
        let mut tx = Transaction::default();

        for (&idx, &col) in &mapped {
            let raw = row.get(idx).map(|s| s.trim()).unwrap_or_default();
            let text = (!raw.is_empty()).then(|| raw.to_string());
            match col {
                Column::Date => {
                    tx.date = text.as_deref().and_then(|s| parse_date(s, date_format));
                    if tx.date.is_none() && !raw.is_empty() {
                        report.issues.push(unparseable(row_no, col, raw));
                    }
                }
                Column::Amount => {
                    tx.amount = text.as_deref().and_then(parse_amount);
                    if tx.amount.is_none() && !raw.is_empty() {
                        report.issues.push(unparseable(row_no, col, raw));
                    }
                }
                Column::Title => tx.title = text,
                Column::Description => tx.description = text,
                Column::Currency => tx.currency = text,
                Column::PaymentMethod => tx.payment_method = text,
                Column::Status => tx.status = text,
                Column::OperationId => tx.operation_id = text,
                Column::ActivityId => tx.activity_id = text,
            }
        }

        for (idx, name) in &extras {
            if let Some(cell) = row.get(*idx) {
                tx.extra.insert(name.clone(), cell.clone());
            }
        }

        transactions.push(tx);
    }

    for issue in &report.issues {
        tracing::warn!("{issue}");
    }
    tracing::debug!(
        rows = transactions.len(),
        issues = report.issues.len(),
        "Normalized statement"
    );

    Ok(NormalizedBatch { transactions, report })
}

fn unparseable(row: usize, column: Column, value: &str) -> UnparseableValue {
    UnparseableValue {
        row,
        column: column.canonical_name(),
        value: value.to_string(),
    }
}

// `%y` comes before `%Y`: chrono's `%Y` would read `25` as the year 25.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%d.%m.%y",
    "%d.%m.%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Built-in formats never yield a year before this.
const MIN_YEAR: i32 = 1000;

/// Amounts at or above this many reais are rejected as unparseable, which
/// keeps any realistic batch total far inside `Decimal` range.
const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000_000;

/// Parses a statement date. Slash-separated dates are read day-first and
/// two-digit years land in 1970-2069.
pub fn parse_date(s: &str, preferred: Option<&str>) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(fmt) = preferred {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    let plausible = |date: NaiveDate| (date.year() >= MIN_YEAR).then_some(date);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().and_then(plausible))
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                NaiveDateTime::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|dt| plausible(dt.date()))
            })
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .and_then(|dt| plausible(dt.date_naive()))
        })
}

fn is_thousands_grouped(s: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[1-9]\d{0,2}(\.\d{3})+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// Parses a locale-formatted amount into minor-unit money.
///
/// `1.234,56` (decimal comma), `1,234.56` and `45.90` (decimal point) are all
/// accepted. A lone dot followed by exactly three digits is a thousands
/// separator (`1.234` is one thousand two hundred thirty-four). Negatives may
/// be written with a leading or trailing minus or in parentheses. Values of a
/// quadrillion or more are rejected.
pub fn parse_amount(s: &str) -> Option<Money> {
    let mut s: String = s
        .trim()
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();
    if s.is_empty() {
        return None;
    }

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }
    if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }

    let plain = match (s.rfind(','), s.rfind('.')) {
        // 1,234.56
        (Some(comma), Some(dot)) if dot > comma => s.replace(',', ""),
        // 1.234,56 or 12,5
        (Some(_), _) => s.replace('.', "").replace(',', "."),
        (None, Some(_)) if is_thousands_grouped(&s) => s.replace('.', ""),
        _ => s,
    };

    let value = Decimal::from_str(&plain).ok()?;
    if value.abs() >= Decimal::from(MAX_AMOUNT_UNITS) {
        return None;
    }
    let money = Money::from_decimal(value);
    Some(if negative { -money } else { money })
}
