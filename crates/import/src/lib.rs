pub mod config;
pub mod dedup;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod table;
pub mod transfer;

pub use config::{ConfigError, PipelineConfig};
pub use dedup::{deduplicate, Deduplicated, IdentityKey};
pub use normalize::{
    normalize, parse_amount, parse_date, Column, NormalizeError, NormalizeOptions,
    NormalizeReport, NormalizedBatch, UnparseableValue,
};
pub use pipeline::{Pipeline, PipelineError, PipelineOutput};
pub use rules::{CategoryRule, CategoryRuleEngine, RuleError, RuleHits};
pub use table::{read_csv, read_path, read_xlsx, RawTable, TableError};
pub use transfer::TransferDisambiguator;
