use ciclo_core::{Transaction, INTERNAL_TRANSFER_CATEGORY};

/// Residual pass that turns unmatched transactions mentioning the account
/// holder into internal transfers. Explicit rule matches are never touched.
#[derive(Debug, Clone)]
pub struct TransferDisambiguator {
    holder: Option<String>,
}

impl TransferDisambiguator {
    /// A blank holder name disables the pass.
    pub fn new(holder_name: &str) -> Self {
        let holder = holder_name.trim().to_lowercase();
        Self {
            holder: (!holder.is_empty()).then_some(holder),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.holder.is_some()
    }

    /// Returns how many transactions were reclassified.
    pub fn apply(&self, transactions: &mut [Transaction]) -> usize {
        let Some(holder) = self.holder.as_deref() else {
            return 0;
        };

        let mut rescued = 0;
        for tx in transactions
            .iter_mut()
            .filter(|tx| tx.classification.needs_review())
        {
            if tx.free_text().to_lowercase().contains(holder) {
                tx.classification.category = INTERNAL_TRANSFER_CATEGORY.to_string();
                rescued += 1;
            }
        }
        tracing::debug!(rescued, "Resolved internal transfers");
        rescued
    }
}
