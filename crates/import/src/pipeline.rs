//! Runs a raw statement table through every stage: normalize → deduplicate →
//! classify → resolve transfers → assign competence → summarize.

use ciclo_core::{
    assign_competences, category_totals, partition, summarize, CategoryTotal, CycleStartDay,
    Partitions, SummaryRow, Transaction,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::dedup::{deduplicate, IdentityKey};
use crate::normalize::{normalize, NormalizeError, NormalizeOptions, NormalizeReport};
use crate::rules::{CategoryRuleEngine, RuleError, RuleHits};
use crate::table::RawTable;
use crate::transfer::TransferDisambiguator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub transactions: Vec<Transaction>,
    pub summary: Vec<SummaryRow>,
    pub partitions: Partitions,
    /// Personal partition folded by category, largest total first.
    pub category_totals: Vec<CategoryTotal>,
    pub report: NormalizeReport,
    pub dedup_key: IdentityKey,
    pub duplicates_removed: usize,
    pub transfers_rescued: usize,
    pub rule_hits: RuleHits,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    engine: CategoryRuleEngine,
    transfers: TransferDisambiguator,
    cycle_start_day: CycleStartDay,
    normalize_options: NormalizeOptions,
}

impl Pipeline {
    pub fn new(
        engine: CategoryRuleEngine,
        holder_name: &str,
        cycle_start_day: CycleStartDay,
    ) -> Self {
        Self {
            engine,
            transfers: TransferDisambiguator::new(holder_name),
            cycle_start_day,
            normalize_options: NormalizeOptions::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let holder = config.holder_name.as_deref().unwrap_or_default();
        let mut pipeline = Self::new(config.rule_engine()?, holder, config.cycle_start_day);
        pipeline.normalize_options.date_format = config.date_format.clone();
        Ok(pipeline)
    }

    pub fn engine(&self) -> &CategoryRuleEngine {
        &self.engine
    }

    pub fn cycle_start_day(&self) -> CycleStartDay {
        self.cycle_start_day
    }

    /// A missing amount column aborts the whole batch; nothing is classified.
    pub fn run(&self, table: &RawTable) -> Result<PipelineOutput, PipelineError> {
        if !self.transfers.is_enabled() {
            tracing::warn!("No account holder name configured; internal transfer detection is off");
        }

        let batch = normalize(table, &self.normalize_options)?;
        let deduped = deduplicate(batch.transactions);
        let mut transactions = deduped.transactions;

        let rule_hits = self.engine.classify_all(&mut transactions);
        let transfers_rescued = self.transfers.apply(&mut transactions);
        assign_competences(&mut transactions, self.cycle_start_day);

        let summary = summarize(&transactions);
        let partitions = partition(&summary);
        let category_totals = category_totals(&partitions.personal);

        for row in partitions.overlapping() {
            tracing::warn!(
                category = %row.key.category,
                competence = %row.key.competence,
                "Summary row is marked both investment and pass-through"
            );
        }

        tracing::info!(
            rows = table.len(),
            kept = transactions.len(),
            duplicates = deduped.removed,
            unmatched = rule_hits.unmatched.saturating_sub(transfers_rescued),
            transfers = transfers_rescued,
            summary_rows = summary.len(),
            "Pipeline complete"
        );

        Ok(PipelineOutput {
            transactions,
            summary,
            partitions,
            category_totals,
            report: batch.report,
            dedup_key: deduped.key,
            duplicates_removed: deduped.removed,
            transfers_rescued,
            rule_hits,
        })
    }
}
