// Test utility module for codevet integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use codevet::cache::RetentionPolicy;
use codevet::errors::{CodevetError, Result};
use codevet::llm::{CompletionRequest, ModelCascade, ModelProfile, ModelTransport};
use codevet::{EmbeddingModel, SemanticCache, StructuralEmbedder, ValidationOrchestrator};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const VALID_REPLY: &str = r#"{"status": "VALID", "confidence": 0.85, "explanation": "The code is correct and readable.", "suggestions": ["Consider adding type hints"]}"#;

pub const ERROR_REPLY: &str = r#"{"status": "ERROR", "confidence": 0.9, "explanation": "Unable to judge this fragment.", "suggestions": []}"#;

/// Transport that returns a fixed reply and counts calls.
pub struct MockTransport {
    reply: std::result::Result<String, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelTransport for MockTransport {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(CodevetError::Transport)
    }
}

/// One cheap profile so cost and selection are predictable.
pub fn single_profile() -> ModelProfile {
    ModelProfile::new("test-model", "test-model-v1", 1.0, 0.001, 0.002)
}

pub fn open_cache(dir: &Path, embeddings: bool) -> SemanticCache {
    let embedder: Option<Arc<dyn EmbeddingModel>> = if embeddings {
        Some(Arc::new(StructuralEmbedder::new(256)))
    } else {
        None
    };
    SemanticCache::open(dir, embedder, RetentionPolicy::default()).unwrap()
}

pub fn cascade_with(transport: Arc<MockTransport>, timeout: Duration) -> ModelCascade {
    let transport: Arc<dyn ModelTransport> = transport;
    ModelCascade::new(vec![single_profile()], Some(transport), timeout, 512).unwrap()
}

/// Orchestrator with free layers only.
pub fn free_orchestrator(dir: &TempDir, embeddings: bool) -> ValidationOrchestrator {
    ValidationOrchestrator::new(open_cache(dir.path(), embeddings))
}

/// Orchestrator backed by a mock model.
pub fn model_orchestrator(
    dir: &TempDir,
    embeddings: bool,
    transport: Arc<MockTransport>,
) -> ValidationOrchestrator {
    ValidationOrchestrator::new(open_cache(dir.path(), embeddings))
        .with_cascade(cascade_with(transport, Duration::from_secs(5)))
}
