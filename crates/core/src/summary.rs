//! Aggregation of classified, competence-tagged transactions into summary
//! rows, and the purpose partitions built on top of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::competence::Competence;
use crate::money::Money;
use crate::transaction::Transaction;

/// Grouping key of a summary row. Ordering follows field order, so rows sort
/// by competence first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SummaryKey {
    pub competence: Competence,
    pub category: String,
    pub is_fixed: bool,
    pub is_extraordinary: bool,
    pub is_investment: bool,
    pub is_valonni: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(flatten)]
    pub key: SummaryKey,
    pub total_amount: Money,
    pub transaction_count: usize,
}

impl SummaryRow {
    /// Neither pass-through nor investment.
    pub fn is_personal(&self) -> bool {
        !self.key.is_valonni && !self.key.is_investment
    }

    pub fn is_pass_through(&self) -> bool {
        self.key.is_valonni
    }

    pub fn is_investment(&self) -> bool {
        self.key.is_investment
    }
}

/// Groups transactions by competence, category and purpose flags and sums
/// their amounts. Transactions without a competence are left out; missing
/// amounts count as zero.
pub fn summarize(transactions: &[Transaction]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<SummaryKey, (Money, usize)> = BTreeMap::new();

    for tx in transactions {
        let Some(competence) = tx.competence else {
            continue;
        };
        let c = &tx.classification;
        let key = SummaryKey {
            competence,
            category: c.category.clone(),
            is_fixed: c.is_fixed,
            is_extraordinary: c.is_extraordinary,
            is_investment: c.is_investment,
            is_valonni: c.is_valonni,
        };
        let entry = groups.entry(key).or_insert((Money::zero(), 0));
        entry.0 += tx.amount.unwrap_or_default();
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (total_amount, transaction_count))| SummaryRow {
            key,
            total_amount,
            transaction_count,
        })
        .collect()
}

/// The summary split by purpose. Pass-through and investment are only
/// disjoint as long as no rule sets both flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitions {
    pub personal: Vec<SummaryRow>,
    pub pass_through: Vec<SummaryRow>,
    pub investment: Vec<SummaryRow>,
}

impl Partitions {
    pub fn is_empty(&self) -> bool {
        self.personal.is_empty() && self.pass_through.is_empty() && self.investment.is_empty()
    }

    /// Rows that landed in both the pass-through and the investment view.
    pub fn overlapping(&self) -> Vec<&SummaryRow> {
        self.pass_through
            .iter()
            .filter(|row| row.is_investment())
            .collect()
    }
}

pub fn partition(rows: &[SummaryRow]) -> Partitions {
    let pick = |f: fn(&SummaryRow) -> bool| -> Vec<SummaryRow> {
        rows.iter().filter(|r| f(r)).cloned().collect()
    };
    Partitions {
        personal: pick(SummaryRow::is_personal),
        pass_through: pick(SummaryRow::is_pass_through),
        investment: pick(SummaryRow::is_investment),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total_amount: Money,
}

/// Folds rows across competences and flags into one total per category,
/// largest total first.
pub fn category_totals(rows: &[SummaryRow]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, Money> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.key.category.as_str()).or_default() += row.total_amount;
    }

    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total_amount)| CategoryTotal {
            category: category.to_string(),
            total_amount,
        })
        .collect();
    // Stable sort keeps alphabetical order among equal totals.
    out.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    out
}

/// Sum of all summary rows of one competence.
pub fn competence_total(rows: &[SummaryRow], competence: Competence) -> Money {
    rows.iter()
        .filter(|r| r.key.competence == competence)
        .map(|r| r.total_amount)
        .sum()
}
