use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, info, warn};

use super::stats::{Resolution, ValidationStats};
use crate::analyzers::python::syntax_error_verdict;
use crate::analyzers::StaticRuleEngine;
use crate::cache::{derive_pattern_key, RetentionPolicy};
use crate::complexity::{self, ComplexityReport};
use crate::config::CodevetConfig;
use crate::core::ast::{dedent, PythonSource};
use crate::core::cache::{CacheStats, SemanticCache};
use crate::core::{content_hash, source, Scope, ValidationRequest, ValidationStatus, Verdict};
use crate::embeddings::{EmbeddingModel, StructuralEmbedder};
use crate::errors::Result;
use crate::io::find_python_files;
use crate::llm::ModelCascade;

/// Default minimum cosine similarity for the fuzzy layer.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;
/// Rule verdicts at or above this confidence never reach paid layers.
pub const HARD_FAILURE_CONFIDENCE: f64 = 0.9;

/// Outcome of a directory sweep.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SweepStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub status: SweepStatus,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub files: Vec<Verdict>,
    /// Number of files per verdict status
    pub counts: BTreeMap<String, usize>,
    pub total_cost: f64,
}

impl DirectoryReport {
    fn failed(path: &Path, error: String) -> Self {
        Self {
            status: SweepStatus::Error,
            path: path.to_path_buf(),
            error: Some(error),
            files: Vec::new(),
            counts: BTreeMap::new(),
            total_cost: 0.0,
        }
    }

    fn from_verdicts(path: &Path, files: Vec<Verdict>) -> Self {
        let mut counts = BTreeMap::new();
        for verdict in &files {
            *counts.entry(verdict.status.as_str().to_string()).or_insert(0) += 1;
        }
        let total_cost: f64 = files.iter().map(|v| v.cost).sum();
        Self {
            status: SweepStatus::Success,
            path: path.to_path_buf(),
            error: None,
            files,
            counts,
            total_cost,
        }
    }
}

/// Outcome of the single-flight model step.
enum ModelStep {
    /// This caller paid for the call.
    Called(Verdict),
    /// Another caller already resolved this content.
    Shared(Verdict),
    /// No billed reply; fall back to the rule verdict.
    Failed(String),
}

/// Composes the layers into a strict-priority, short-circuiting pipeline:
/// exact cache, static rules, fuzzy cache, paid model, rule fallback.
///
/// Each instance owns its cache, cascade and statistics, so independent
/// orchestrators never share state. All public operations return a
/// [`Verdict`]; errors are converted at the layer that hits them.
pub struct ValidationOrchestrator {
    rules: StaticRuleEngine,
    cache: SemanticCache,
    cascade: Option<ModelCascade>,
    similarity_threshold: f64,
    in_flight: DashMap<String, Arc<OnceCell<ModelStepResult>>>,
    stats: Mutex<ValidationStats>,
}

/// Shared result of one in-flight model call. `Err` carries the reason no
/// billed reply came back.
#[derive(Clone)]
struct ModelStepResult {
    outcome: std::result::Result<Verdict, String>,
    from_cache: bool,
}

impl ValidationOrchestrator {
    pub fn new(cache: SemanticCache) -> Self {
        Self {
            rules: StaticRuleEngine::default(),
            cache,
            cascade: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            in_flight: DashMap::new(),
            stats: Mutex::new(ValidationStats::default()),
        }
    }

    /// Build every layer from configuration.
    pub fn from_config(config: &CodevetConfig) -> Result<Self> {
        let embedder: Option<Arc<dyn EmbeddingModel>> = if config.embeddings.enabled {
            Some(Arc::new(StructuralEmbedder::new(config.embeddings.dimensions)))
        } else {
            None
        };
        let cache = SemanticCache::open(
            config.cache.resolved_dir(),
            embedder,
            RetentionPolicy::new(config.cache.max_entries, config.cache.max_age_days),
        )?;

        let mut orchestrator = Self::new(cache)
            .with_rules(StaticRuleEngine::new(&config.rules))
            .with_similarity_threshold(config.embeddings.similarity_threshold);
        if config.models.enabled {
            orchestrator = orchestrator.with_cascade(ModelCascade::from_config(&config.models)?);
        }
        Ok(orchestrator)
    }

    pub fn with_rules(mut self, rules: StaticRuleEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_cascade(mut self, cascade: ModelCascade) -> Self {
        self.cascade = Some(cascade);
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn cache(&self) -> &SemanticCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn get_stats(&self) -> ValidationStats {
        self.stats.lock().clone()
    }

    /// Validate a fragment through the layered pipeline.
    pub fn validate_code(&self, code: &str, scope: Scope) -> Verdict {
        let started = Instant::now();
        let hash = content_hash(code);
        let span = debug_span!("validate", hash = short_hash(&hash), scope = scope.describe());
        let _enter = span.enter();

        let (mut verdict, resolution) = self.resolve(code, scope, &hash);
        verdict.execution_time = started.elapsed().as_secs_f64();

        self.stats.lock().record(resolution);
        debug!(
            layer = resolution.as_str(),
            status = %verdict.status,
            cost = verdict.cost,
            "request resolved"
        );
        verdict
    }

    /// Validate a request: its named function when one is given, otherwise
    /// the whole fragment. The request's file path is attached to the result.
    pub fn validate(&self, request: &ValidationRequest) -> Verdict {
        let verdict = match request.function_name.as_deref() {
            Some(name) => self.validate_function(&request.code, name),
            None => self.validate_code(&request.code, request.scope),
        };
        match &request.file_path {
            Some(path) => verdict.with_file_path(path.clone()),
            None => verdict,
        }
    }

    /// Validate one named function, extracted from `code` by line span.
    pub fn validate_function(&self, code: &str, name: &str) -> Verdict {
        let started = Instant::now();
        let parsed = match PythonSource::parse(code) {
            Ok(parsed) => parsed,
            Err(err) => {
                let mut verdict = syntax_error_verdict(&err);
                verdict.execution_time = started.elapsed().as_secs_f64();
                return verdict;
            }
        };

        let Some(function) = parsed.find_function(name) else {
            debug!(function = name, "function not found");
            let mut verdict = Verdict::error(
                format!("Function '{name}' not found in the provided code"),
                source::EXTRACTION,
            );
            verdict.execution_time = started.elapsed().as_secs_f64();
            return verdict;
        };

        let (start, end) = parsed.line_span(function);
        let slice: Vec<&str> = code
            .lines()
            .skip(start)
            .take(end.saturating_sub(start) + 1)
            .collect();
        self.validate_code(&dedent(&slice.join("\n")), Scope::Function)
    }

    /// Read and validate one file. Read failures become an ERROR verdict
    /// carrying the path.
    pub fn validate_file(&self, path: &Path) -> Verdict {
        match std::fs::read_to_string(path) {
            Ok(code) => self.validate_code(&code, Scope::All).with_file_path(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file");
                Verdict::error(
                    format!("Failed to read {}: {e}", path.display()),
                    source::FILESYSTEM,
                )
                .with_file_path(path)
            }
        }
    }

    /// Validate every Python file under `path` in parallel. One file's
    /// failure never aborts the sweep.
    pub fn validate_directory(&self, path: &Path, recursive: bool) -> DirectoryReport {
        let files = match find_python_files(path, recursive) {
            Ok(files) => files,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot walk directory");
                return DirectoryReport::failed(path, e.to_string());
            }
        };

        info!(path = %path.display(), files = files.len(), "validating directory");
        let verdicts: Vec<Verdict> = files
            .par_iter()
            .map(|file| self.validate_file(file))
            .collect();
        DirectoryReport::from_verdicts(path, verdicts)
    }

    fn resolve(&self, code: &str, scope: Scope, hash: &str) -> (Verdict, Resolution) {
        if let Some(verdict) = self.cache.get(hash) {
            return (verdict, Resolution::Cached);
        }

        let report = complexity::analyze(code);
        let rule_verdict = self.rules.validate(code).with_complexity(report.clone());
        if rule_verdict.status == ValidationStatus::NotValid
            && rule_verdict.confidence >= HARD_FAILURE_CONFIDENCE
        {
            return (self.store(hash, rule_verdict), Resolution::Rule);
        }

        if self.cache.has_embeddings() {
            if let Some(found) = self.cache.find_similar(code, self.similarity_threshold) {
                debug!(
                    similarity = found.similarity,
                    matched = short_hash(&found.content_hash),
                    "similar code cached"
                );
                let mut verdict = found.verdict;
                verdict.similarity = Some(found.similarity);
                verdict.source = source::EMBEDDINGS.to_string();
                verdict.cost = 0.0;
                verdict.complexity_analysis = Some(report);
                return (self.store(hash, verdict), Resolution::Similarity);
            }
        }

        match self.cascade.as_ref().filter(|c| c.is_available()) {
            Some(cascade) => match self.call_model_once(cascade, code, scope, hash, &report) {
                ModelStep::Called(verdict) => (verdict, Resolution::Model),
                ModelStep::Shared(verdict) => (verdict, Resolution::Cached),
                ModelStep::Failed(error) => {
                    debug!(error = %error, "model layer failed; using rule verdict");
                    (rule_verdict, Resolution::Fallback)
                }
            },
            None => (rule_verdict, Resolution::Fallback),
        }
    }

    /// At most one model call per content hash is in flight; concurrent
    /// callers for the same hash wait for and share its result.
    fn call_model_once(
        &self,
        cascade: &ModelCascade,
        code: &str,
        scope: Scope,
        hash: &str,
        report: &ComplexityReport,
    ) -> ModelStep {
        let cell = self
            .in_flight
            .entry(hash.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let mut leader = false;
        let result = cell
            .get_or_init(|| {
                leader = true;
                // A previous leader may have finished between our cache
                // lookup and claiming the slot.
                if let Some(verdict) = self.cache.peek(hash) {
                    return ModelStepResult {
                        outcome: Ok(verdict),
                        from_cache: true,
                    };
                }

                let model = cascade.select_model();
                let outcome = match cascade.try_validate_code(code, scope, Some(report), &model) {
                    // Billed, whatever status the model reported.
                    Ok(mut verdict) => {
                        self.stats.lock().record_model_call(&model, verdict.cost);
                        verdict.complexity_analysis = Some(report.clone());
                        let verdict = self.store(hash, verdict);
                        self.cache.get_embedding(code);
                        Ok(verdict)
                    }
                    Err(e) => {
                        self.stats.lock().model_failures += 1;
                        Err(e.to_string())
                    }
                };
                ModelStepResult {
                    outcome,
                    from_cache: false,
                }
            })
            .clone();

        if leader {
            self.in_flight.remove(hash);
        }

        match (result.outcome, leader && !result.from_cache) {
            (Err(error), _) => ModelStep::Failed(error),
            (Ok(verdict), true) => ModelStep::Called(verdict),
            (Ok(verdict), false) => ModelStep::Shared(verdict),
        }
    }

    /// Stamp the pattern key and persist. A failed write is logged and the
    /// verdict is still returned.
    fn store(&self, hash: &str, mut verdict: Verdict) -> Verdict {
        verdict.pattern_key = Some(derive_pattern_key(&verdict));
        if let Err(e) = self.cache.set(hash, &verdict) {
            warn!(error = %e, category = %e.category(), "failed to cache verdict");
        }
        verdict
    }
}

/// Log-friendly prefix of a content hash.
fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
