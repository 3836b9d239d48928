// Export modules for library usage
pub mod analyzers;
pub mod cache;
pub mod cli;
pub mod complexity;
pub mod config;
pub mod core;
pub mod embeddings;
pub mod errors;
pub mod io;
pub mod llm;
pub mod observability;
pub mod pipeline;

// Re-export commonly used types
pub use crate::core::{
    content_hash, source, Scope, ValidationRequest, ValidationStatus, Verdict,
};

pub use crate::core::ast::{PythonSource, SyntaxError};

pub use crate::core::cache::{CacheEntry, CacheStats, SemanticCache, SimilarMatch};

pub use crate::analyzers::{python::syntax_error_verdict, Rule, StaticRuleEngine};

pub use crate::complexity::{
    analyze as analyze_complexity, ComplexityReport, FunctionComplexity, GrowthClass,
};

pub use crate::cache::{PruneStats, RetentionPolicy};

pub use crate::config::{load_config, CodevetConfig};

pub use crate::embeddings::{cosine_similarity, EmbeddingModel, StructuralEmbedder};

pub use crate::errors::{CodevetError, ErrorCategory, Result};

pub use crate::llm::{ModelCascade, ModelProfile, ModelTransport};

pub use crate::pipeline::{
    DirectoryReport, SweepStatus, ValidationOrchestrator, ValidationStats,
};
