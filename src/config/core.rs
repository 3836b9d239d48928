use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::llm::ModelProfile;

/// Root configuration structure for codevet
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CodevetConfig {
    /// Verdict cache location and retention
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fuzzy (embedding) cache layer
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Paid model cascade
    #[serde(default)]
    pub models: ModelsConfig,

    /// Static rule thresholds
    #[serde(default)]
    pub rules: RulesConfig,
}

impl CodevetConfig {
    /// Replace out-of-range values with their defaults, warning for each.
    pub fn normalized(mut self) -> Self {
        let threshold = self.embeddings.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            warn!(
                value = threshold,
                "embeddings.similarity_threshold must be in (0, 1]; using default"
            );
            self.embeddings.similarity_threshold = default_similarity_threshold();
        }
        if self.embeddings.dimensions == 0 {
            warn!("embeddings.dimensions must be positive; using default");
            self.embeddings.dimensions = default_dimensions();
        }
        if self.cache.max_entries == 0 {
            warn!("cache.max_entries must be positive; using default");
            self.cache.max_entries = default_max_entries();
        }
        if self.models.timeout_secs == 0 {
            warn!("models.timeout_secs must be positive; using default");
            self.models.timeout_secs = default_timeout_secs();
        }
        if self.rules.max_function_statements == 0 || self.rules.max_nesting_depth == 0 {
            warn!("rules thresholds must be positive; using defaults");
            self.rules = RulesConfig::default();
        }

        let before = self.models.profiles.len();
        self.models.profiles.retain(|profile| match profile.validate() {
            Ok(()) => true,
            Err(reason) => {
                warn!(model = %profile.name, %reason, "dropping invalid model profile");
                false
            }
        });
        if before > 0 && self.models.profiles.is_empty() {
            warn!("no valid model profiles configured; using built-in table");
        }

        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Cache directory; defaults to the platform cache dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_entries: default_max_entries(),
            max_age_days: default_max_age_days(),
        }
    }
}

impl CacheConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("codevet")
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Minimum cosine similarity for a fuzzy cache hit.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dimensions: default_dimensions(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Overrides the built-in profile table when non-empty.
    #[serde(default)]
    pub profiles: Vec<ModelProfile>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            profiles: Vec::new(),
        }
    }
}

impl ModelsConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn profile_table(&self) -> Vec<ModelProfile> {
        if self.profiles.is_empty() {
            ModelProfile::defaults()
        } else {
            self.profiles.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulesConfig {
    #[serde(default = "default_max_function_statements")]
    pub max_function_statements: usize,

    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_function_statements: default_max_function_statements(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_entries() -> usize {
    10_000
}
fn default_max_age_days() -> u64 {
    90
}
fn default_dimensions() -> usize {
    256
}
fn default_similarity_threshold() -> f64 {
    0.85
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_function_statements() -> usize {
    50
}
fn default_max_nesting_depth() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodevetConfig::default();
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.cache.max_age_days, 90);
        assert_eq!(config.embeddings.similarity_threshold, 0.85);
        assert_eq!(config.models.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.rules.max_nesting_depth, 4);
        assert_eq!(config.models.profile_table().len(), 3);
    }

    #[test]
    fn test_normalized_replaces_invalid_values() {
        let mut config = CodevetConfig::default();
        config.embeddings.similarity_threshold = 1.5;
        config.cache.max_entries = 0;
        config.rules.max_nesting_depth = 0;
        config.models.profiles = vec![ModelProfile::new("broken", "broken-id", -1.0, 0.1, 0.1)];

        let config = config.normalized();
        assert_eq!(config.embeddings.similarity_threshold, 0.85);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.rules, RulesConfig::default());
        assert!(config.models.profiles.is_empty());
        assert_eq!(config.models.profile_table(), ModelProfile::defaults());
    }

    #[test]
    fn test_explicit_cache_dir_wins() {
        let config = CacheConfig {
            dir: Some(PathBuf::from("/tmp/codevet-test")),
            ..CacheConfig::default()
        };
        assert_eq!(config.resolved_dir(), PathBuf::from("/tmp/codevet-test"));
    }
}
