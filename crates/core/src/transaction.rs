use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::competence::Competence;
use super::money::Money;

/// Category given to transactions no rule could classify.
pub const REVIEW_CATEGORY: &str = "Revisar";

/// Category given to unmatched transactions that mention the account holder.
pub const INTERNAL_TRANSFER_CATEGORY: &str = "Transferência interna";

/// The category, subcategory and purpose flags copied from a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub subcategory: String,
    pub is_fixed: bool,
    pub is_extraordinary: bool,
    pub is_investment: bool,
    pub is_valonni: bool,
}

impl Classification {
    /// The "needs review" default: no subcategory, every flag cleared.
    pub fn review() -> Self {
        Classification {
            category: REVIEW_CATEGORY.to_string(),
            subcategory: String::new(),
            is_fixed: false,
            is_extraordinary: false,
            is_investment: false,
            is_valonni: false,
        }
    }

    pub fn needs_review(&self) -> bool {
        self.category == REVIEW_CATEGORY
    }
}

impl Default for Classification {
    fn default() -> Self {
        Classification::review()
    }
}

/// One row of a normalized statement, enriched in place by each pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: Option<NaiveDate>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub operation_id: Option<String>,
    pub activity_id: Option<String>,
    /// Input columns with no canonical meaning, keyed by trimmed lower-cased header.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(flatten)]
    pub classification: Classification,
    pub competence: Option<Competence>,
}

impl Transaction {
    pub fn new(date: Option<NaiveDate>, description: &str, amount: Option<Money>) -> Self {
        Transaction {
            date,
            title: None,
            description: Some(description.to_string()),
            amount,
            currency: None,
            payment_method: None,
            status: None,
            operation_id: None,
            activity_id: None,
            extra: BTreeMap::new(),
            classification: Classification::review(),
            competence: None,
        }
    }

    /// Text used for classification: the title when present and non-empty,
    /// else the description.
    pub fn text(&self) -> &str {
        non_empty(&self.title)
            .or_else(|| non_empty(&self.description))
            .unwrap_or_default()
    }

    /// Free-text description, falling back to the title for sources that
    /// only carry a title column.
    pub fn free_text(&self) -> &str {
        non_empty(&self.description)
            .or_else(|| non_empty(&self.title))
            .unwrap_or_default()
    }

    pub fn category(&self) -> &str {
        &self.classification.category
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> Transaction {
        Transaction::new(NaiveDate::from_ymd_opt(2025, 11, 3), "Pix enviado", None)
    }

    #[test]
    fn new_transaction_needs_review() {
        let t = tx();
        assert_eq!(t.category(), REVIEW_CATEGORY);
        assert!(t.classification.needs_review());
        assert_eq!(t.classification.subcategory, "");
        assert!(!t.classification.is_fixed);
        assert!(t.competence.is_none());
    }

    #[test]
    fn text_prefers_title() {
        let mut t = tx();
        t.title = Some("Outback Steakhouse".into());
        assert_eq!(t.text(), "Outback Steakhouse");
        assert_eq!(t.free_text(), "Pix enviado");
    }

    #[test]
    fn blank_title_falls_back_to_description() {
        let mut t = tx();
        t.title = Some("   ".into());
        assert_eq!(t.text(), "Pix enviado");
    }

    #[test]
    fn free_text_falls_back_to_title() {
        let mut t = tx();
        t.description = None;
        t.title = Some("Petshop Amigo".into());
        assert_eq!(t.free_text(), "Petshop Amigo");
    }

    #[test]
    fn text_is_empty_without_any_field() {
        let mut t = tx();
        t.description = None;
        assert_eq!(t.text(), "");
        assert_eq!(t.free_text(), "");
    }
}
