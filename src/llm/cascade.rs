use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::profiles::{ModelProfile, ModelSelector};
use super::prompt::build_prompt;
use super::response::parse_response;
use super::transport::{AnthropicTransport, CompletionRequest, ModelTransport};
use crate::complexity::ComplexityReport;
use crate::config::ModelsConfig;
use crate::core::{source, Scope, Verdict};
use crate::errors::{CodevetError, Result};

/// Weighted selection among paid models plus the call/parse/cost pipeline.
///
/// The transport is asynchronous; [`ModelCascade::validate_code`] runs it to
/// completion on a runtime owned by the cascade so that callers on blocking
/// paths (including rayon workers) never need their own executor.
pub struct ModelCascade {
    selector: ModelSelector,
    transport: Option<Arc<dyn ModelTransport>>,
    runtime: Runtime,
    timeout: Duration,
    max_tokens: u32,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for ModelCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCascade")
            .field("profiles", &self.selector.profiles().len())
            .field("available", &self.is_available())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelCascade {
    pub fn new(
        profiles: Vec<ModelProfile>,
        transport: Option<Arc<dyn ModelTransport>>,
        timeout: Duration,
        max_tokens: u32,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("codevet-model")
            .enable_all()
            .build()
            .map_err(|e| CodevetError::Transport(format!("failed to start runtime: {e}")))?;

        Ok(Self {
            selector: ModelSelector::new(profiles)?,
            transport,
            runtime,
            timeout,
            max_tokens,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Cascade wired to the Anthropic endpoint. Without an API key in the
    /// configured environment variable the cascade is unavailable.
    pub fn from_config(config: &ModelsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let transport: Option<Arc<dyn ModelTransport>> = match config.api_key() {
            Some(key) if config.enabled => Some(Arc::new(AnthropicTransport::new(
                config.base_url.clone(),
                key,
                timeout,
            )?)),
            _ => None,
        };
        Self::new(config.profile_table(), transport, timeout, config.max_tokens)
    }

    /// Make selection reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn profiles(&self) -> &[ModelProfile] {
        self.selector.profiles()
    }

    /// True when a configured transport is present.
    pub fn is_available(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_configured())
    }

    /// Pick a model by weight with one uniform draw.
    pub fn select_model(&self) -> String {
        let draw: f64 = self.rng.lock().gen();
        self.select_with(draw).name.clone()
    }

    pub fn select_with(&self, draw: f64) -> &ModelProfile {
        self.selector.select_with(draw)
    }

    /// Ask `model` to review `code`. Every failure becomes an ERROR verdict
    /// with zero confidence and zero cost.
    pub async fn validate(
        &self,
        code: &str,
        scope: Scope,
        complexity: Option<&ComplexityReport>,
        model: &str,
    ) -> Verdict {
        self.try_validate(code, scope, complexity, model)
            .await
            .unwrap_or_else(|e| Verdict::error(e.to_string(), source::model(model)))
    }

    /// Like [`ModelCascade::validate`], but a call that never produced a
    /// billed reply is an `Err`. An `Ok` verdict was paid for, whatever
    /// status the model reported.
    pub async fn try_validate(
        &self,
        code: &str,
        scope: Scope,
        complexity: Option<&ComplexityReport>,
        model: &str,
    ) -> Result<Verdict> {
        let started = Instant::now();

        let profile = self
            .selector
            .get(model)
            .ok_or_else(|| CodevetError::Transport(format!("Unknown model '{model}'")))?;
        let transport = self
            .transport
            .as_ref()
            .filter(|t| t.is_configured())
            .ok_or_else(|| CodevetError::Transport("Model transport is not configured".into()))?;

        let request = CompletionRequest {
            model: profile.api_model.clone(),
            prompt: build_prompt(code, scope, complexity),
            max_tokens: self.max_tokens,
        };

        let reply = match tokio::time::timeout(self.timeout, transport.complete(&request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(model, error = %e, category = %e.category(), "model call failed");
                return Err(e);
            }
            Err(_) => {
                let e = CodevetError::Timeout(self.timeout.as_secs());
                warn!(model, error = %e, "model call timed out");
                return Err(e);
            }
        };

        let parsed = parse_response(&reply);
        let cost = profile.cost(request.prompt.chars().count(), reply.chars().count());
        debug!(model, cost, status = %parsed.status, "model verdict");

        let mut verdict = Verdict::new(
            parsed.status,
            parsed.confidence,
            parsed.explanation,
            source::model(model),
        )
        .with_suggestions(parsed.suggestions)
        .with_cost(cost);
        verdict.execution_time = started.elapsed().as_secs_f64();
        Ok(verdict)
    }

    /// Blocking adapter over [`ModelCascade::validate`].
    ///
    /// Must not be called from inside an async context.
    pub fn validate_code(
        &self,
        code: &str,
        scope: Scope,
        complexity: Option<&ComplexityReport>,
        model: &str,
    ) -> Verdict {
        self.runtime
            .block_on(self.validate(code, scope, complexity, model))
    }

    /// Blocking adapter over [`ModelCascade::try_validate`].
    pub fn try_validate_code(
        &self,
        code: &str,
        scope: Scope,
        complexity: Option<&ComplexityReport>,
        model: &str,
    ) -> Result<Verdict> {
        self.runtime
            .block_on(self.try_validate(code, scope, complexity, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ValidationStatus;
    use async_trait::async_trait;

    struct Scripted {
        reply: Result<String>,
        delay: Duration,
    }

    #[async_trait]
    impl ModelTransport for Scripted {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(CodevetError::Transport(e.to_string())),
            }
        }
    }

    fn cascade(reply: Result<String>, delay: Duration) -> ModelCascade {
        ModelCascade::new(
            ModelProfile::defaults(),
            Some(Arc::new(Scripted { reply, delay })),
            Duration::from_millis(200),
            256,
        )
        .unwrap()
    }

    #[test]
    fn test_successful_call_is_priced() {
        let reply = r#"{"status": "VALID", "confidence": 0.9, "explanation": "Fine.", "suggestions": []}"#;
        let c = cascade(Ok(reply.to_string()), Duration::ZERO);
        let verdict = c.validate_code("x = 1", Scope::All, None, "claude-3-haiku");

        assert_eq!(verdict.status, ValidationStatus::Valid);
        assert_eq!(verdict.source, "model:claude-3-haiku");
        let prompt = build_prompt("x = 1", Scope::All, None);
        let expected = ModelProfile::defaults()[0].cost(prompt.chars().count(), reply.chars().count());
        assert!((verdict.cost - expected).abs() < 1e-12);
        assert!(verdict.cost > 0.0);
    }

    #[test]
    fn test_transport_error_is_error_verdict() {
        let c = cascade(Err(CodevetError::Transport("boom".into())), Duration::ZERO);
        let verdict = c.validate_code("x = 1", Scope::All, None, "claude-3-opus");
        assert_eq!(verdict.status, ValidationStatus::Error);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.cost, 0.0);
    }

    #[test]
    fn test_timeout_is_error_verdict() {
        let c = cascade(Ok("{}".to_string()), Duration::from_secs(5));
        let started = Instant::now();
        let verdict = c.validate_code("x = 1", Scope::All, None, "claude-3-haiku");
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(verdict.status, ValidationStatus::Error);
        assert!(verdict.explanation.contains("timed out"));
        assert_eq!(verdict.cost, 0.0);
    }

    #[test]
    fn test_model_reported_error_is_still_billed() {
        let reply = r#"{"status": "ERROR", "confidence": 0.8, "explanation": "Cannot tell.", "suggestions": []}"#;
        let c = cascade(Ok(reply.to_string()), Duration::ZERO);
        let verdict = c
            .try_validate_code("x = 1", Scope::All, None, "claude-3-haiku")
            .unwrap();
        assert_eq!(verdict.status, ValidationStatus::Error);
        assert!(verdict.cost > 0.0);

        let failing = cascade(Err(CodevetError::Transport("boom".into())), Duration::ZERO);
        assert!(failing
            .try_validate_code("x = 1", Scope::All, None, "claude-3-haiku")
            .is_err());
    }

    #[test]
    fn test_unavailable_without_transport() {
        let c = ModelCascade::new(ModelProfile::defaults(), None, Duration::from_secs(1), 16).unwrap();
        assert!(!c.is_available());
        let verdict = c.validate_code("x = 1", Scope::All, None, "claude-3-haiku");
        assert!(verdict.is_error());
    }

    #[test]
    fn test_unknown_model_is_error() {
        let c = cascade(Ok("{}".to_string()), Duration::ZERO);
        let verdict = c.validate_code("x = 1", Scope::All, None, "gpt-nothing");
        assert!(verdict.is_error());
        assert!(verdict.explanation.contains("gpt-nothing"));
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let a = cascade(Ok("{}".to_string()), Duration::ZERO).with_seed(7);
        let b = cascade(Ok("{}".to_string()), Duration::ZERO).with_seed(7);
        let picks_a: Vec<String> = (0..20).map(|_| a.select_model()).collect();
        let picks_b: Vec<String> = (0..20).map(|_| b.select_model()).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|name| a.profiles().iter().any(|p| &p.name == name)));
    }
}
