use ciclo_core::{Classification, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_RULES: &str = include_str!("default_rules.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub is_extraordinary: bool,
    #[serde(default)]
    pub is_investment: bool,
    #[serde(default)]
    pub is_valonni: bool,
}

impl CategoryRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        CategoryRule {
            category: category.to_string(),
            subcategory: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            is_fixed: false,
            is_extraordinary: false,
            is_investment: false,
            is_valonni: false,
        }
    }

    pub fn classification(&self) -> Classification {
        Classification {
            category: self.category.clone(),
            subcategory: self.subcategory.clone().unwrap_or_default(),
            is_fixed: self.is_fixed,
            is_extraordinary: self.is_extraordinary,
            is_investment: self.is_investment,
            is_valonni: self.is_valonni,
        }
    }

    fn validate(&self, index: usize) -> Result<(), RuleError> {
        if self.category.trim().is_empty() {
            return Err(RuleError::EmptyCategory { index });
        }
        if self.keywords.is_empty() {
            return Err(RuleError::NoKeywords {
                index,
                category: self.category.clone(),
            });
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(RuleError::EmptyKeyword {
                index,
                category: self.category.clone(),
            });
        }
        if self.is_investment && self.is_valonni {
            return Err(RuleError::ConflictingPurpose {
                index,
                category: self.category.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Rule #{index} has an empty category")]
    EmptyCategory { index: usize },
    #[error("Rule #{index} ({category}) has no keywords")]
    NoKeywords { index: usize, category: String },
    #[error("Rule #{index} ({category}) has an empty keyword")]
    EmptyKeyword { index: usize, category: String },
    #[error("Rule #{index} ({category}) is marked both investment and pass-through")]
    ConflictingPurpose { index: usize, category: String },
    #[error("Failed to parse rules: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<CategoryRule>,
}

/// A rule with its keywords lower-cased once up front.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: CategoryRule,
    keywords: Vec<String>,
}

/// Per-rule match counts from one classification pass, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleHits {
    pub by_rule: Vec<usize>,
    pub unmatched: usize,
}

/// First-match keyword classifier. Rules are tried in the order given and
/// never reordered.
#[derive(Debug, Clone)]
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

impl CategoryRuleEngine {
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self, RuleError> {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                rule.validate(index)?;
                let keywords = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
                Ok(CompiledRule { rule, keywords })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self { rules })
    }

    /// Parses a `[[rules]]` table array.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile =
            toml::from_str(toml_content).map_err(|e| RuleError::Parse(e.to_string()))?;
        Self::new(file.rules)
    }

    pub fn default_rules() -> Result<Vec<CategoryRule>, RuleError> {
        let file: RuleFile =
            toml::from_str(DEFAULT_RULES).map_err(|e| RuleError::Parse(e.to_string()))?;
        Ok(file.rules)
    }

    pub fn with_default_rules() -> Result<Self, RuleError> {
        Self::new(Self::default_rules()?)
    }

    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn find_matching_index(&self, text: &str) -> Option<usize> {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .position(|cr| cr.keywords.iter().any(|k| text.contains(k.as_str())))
    }

    pub fn find_matching_rule(&self, text: &str) -> Option<&CategoryRule> {
        self.find_matching_index(text).map(|i| &self.rules[i].rule)
    }

    pub fn classify(&self, tx: &Transaction) -> Classification {
        self.find_matching_rule(tx.text())
            .map(CategoryRule::classification)
            .unwrap_or_else(Classification::review)
    }

    /// Overwrites the classification of every transaction.
    pub fn classify_all(&self, transactions: &mut [Transaction]) -> RuleHits {
        let mut hits = RuleHits {
            by_rule: vec![0; self.rules.len()],
            unmatched: 0,
        };
        for tx in transactions.iter_mut() {
            tx.classification = match self.find_matching_index(tx.text()) {
                Some(i) => {
                    hits.by_rule[i] += 1;
                    self.rules[i].rule.classification()
                }
                None => {
                    hits.unmatched += 1;
                    Classification::review()
                }
            };
        }
        tracing::debug!(
            classified = transactions.len() - hits.unmatched,
            unmatched = hits.unmatched,
            "Classified transactions"
        );
        hits
    }
}
