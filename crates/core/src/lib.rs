pub mod competence;
pub mod money;
pub mod summary;
pub mod transaction;

pub use competence::{assign_competences, Competence, CompetenceError, CycleStartDay, DateRange};
pub use money::Money;
pub use summary::{
    category_totals, competence_total, partition, summarize, CategoryTotal, Partitions,
    SummaryKey, SummaryRow,
};
pub use transaction::{Classification, Transaction, INTERNAL_TRANSFER_CATEGORY, REVIEW_CATEGORY};
