use chrono::NaiveDate;
use ciclo_core::{Money, Transaction};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Which identity a batch is deduplicated on. Chosen once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    OperationId,
    ActivityId,
    /// Date, classification text and amount together.
    Composite,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::OperationId => write!(f, "operation_id"),
            IdentityKey::ActivityId => write!(f, "activity_id"),
            IdentityKey::Composite => write!(f, "date+description+amount"),
        }
    }
}

impl IdentityKey {
    /// `operation_id` when any row carries one, else `activity_id` when any
    /// row carries one, else the composite key.
    pub fn choose(transactions: &[Transaction]) -> Self {
        if transactions.iter().any(|t| has_id(&t.operation_id)) {
            IdentityKey::OperationId
        } else if transactions.iter().any(|t| has_id(&t.activity_id)) {
            IdentityKey::ActivityId
        } else {
            IdentityKey::Composite
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity<'a> {
    Id(&'a str),
    Composite(Option<NaiveDate>, &'a str, Option<Money>),
}

fn identity(tx: &Transaction, key: IdentityKey) -> Identity<'_> {
    let id = match key {
        IdentityKey::OperationId => tx.operation_id.as_deref(),
        IdentityKey::ActivityId => tx.activity_id.as_deref(),
        IdentityKey::Composite => None,
    };
    match id.filter(|s| !s.trim().is_empty()) {
        Some(id) => Identity::Id(id),
        // Rows without the chosen id never collapse on a shared empty id.
        None => Identity::Composite(tx.date, tx.text(), tx.amount),
    }
}

fn has_id(id: &Option<String>) -> bool {
    id.as_deref().is_some_and(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct Deduplicated {
    pub transactions: Vec<Transaction>,
    pub removed: usize,
    pub key: IdentityKey,
}

/// Drops repeated records, keeping the first occurrence of each identity and
/// the input order of the survivors.
pub fn deduplicate(transactions: Vec<Transaction>) -> Deduplicated {
    let key = IdentityKey::choose(&transactions);

    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(transactions.len());
        transactions
            .iter()
            .map(|tx| seen.insert(identity(tx, key)))
            .collect()
    };

    let before = transactions.len();
    let transactions: Vec<Transaction> = transactions
        .into_iter()
        .zip(keep)
        .filter_map(|(tx, keep)| keep.then_some(tx))
        .collect();
    let removed = before - transactions.len();

    tracing::debug!(%key, removed, kept = transactions.len(), "Deduplicated statement");
    Deduplicated {
        transactions,
        removed,
        key,
    }
}
