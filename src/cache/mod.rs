//! Retention and pattern bookkeeping for the semantic verdict cache.

pub mod patterns;
pub mod pruner;

pub use patterns::{derive_pattern_key, PatternRecord, PatternStatistics, PatternTable};
pub use pruner::{EntryMetadata, PruneStats, RetentionPolicy};
