use serde::Serialize;
use std::collections::BTreeMap;

/// Which layer settled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Cached,
    Rule,
    Similarity,
    Model,
    Fallback,
}

impl Resolution {
    pub fn is_paid(&self) -> bool {
        matches!(self, Resolution::Model)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Cached => "cached",
            Resolution::Rule => "rule_resolved",
            Resolution::Similarity => "similarity_resolved",
            Resolution::Model => "model_resolved",
            Resolution::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ModelUsage {
    pub calls: u64,
    pub cost: f64,
}

/// Running counters owned by one orchestrator.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationStats {
    pub total_validations: u64,
    pub free_validations: u64,
    pub paid_validations: u64,
    pub cache_hits: u64,
    pub rule_resolutions: u64,
    pub similarity_resolutions: u64,
    pub model_resolutions: u64,
    pub fallback_resolutions: u64,
    /// Model calls that ended in an error verdict
    pub model_failures: u64,
    pub models: BTreeMap<String, ModelUsage>,
    pub total_cost: f64,
}

impl ValidationStats {
    pub fn record(&mut self, resolution: Resolution) {
        self.total_validations += 1;
        if resolution.is_paid() {
            self.paid_validations += 1;
        } else {
            self.free_validations += 1;
        }

        let counter = match resolution {
            Resolution::Cached => &mut self.cache_hits,
            Resolution::Rule => &mut self.rule_resolutions,
            Resolution::Similarity => &mut self.similarity_resolutions,
            Resolution::Model => &mut self.model_resolutions,
            Resolution::Fallback => &mut self.fallback_resolutions,
        };
        *counter += 1;
    }

    pub fn record_model_call(&mut self, model: &str, cost: f64) {
        let usage = self.models.entry(model.to_string()).or_default();
        usage.calls += 1;
        usage.cost += cost;
        self.total_cost += cost;
    }

    pub fn average_cost_per_paid(&self) -> f64 {
        if self.paid_validations == 0 {
            0.0
        } else {
            self.total_cost / self.paid_validations as f64
        }
    }
}

impl std::fmt::Display for ValidationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Validations: {} total, {} free, {} paid",
            self.total_validations, self.free_validations, self.paid_validations
        )?;
        writeln!(
            f,
            "Resolved by: cache {}, rules {}, similarity {}, model {}, fallback {}",
            self.cache_hits,
            self.rule_resolutions,
            self.similarity_resolutions,
            self.model_resolutions,
            self.fallback_resolutions
        )?;
        for (model, usage) in &self.models {
            writeln!(f, "  {model}: {} calls, ${:.6}", usage.calls, usage.cost)?;
        }
        write!(
            f,
            "Total cost: ${:.6} (avg ${:.6} per paid call)",
            self.total_cost,
            self.average_cost_per_paid()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_and_paid_split() {
        let mut stats = ValidationStats::default();
        stats.record(Resolution::Rule);
        stats.record(Resolution::Cached);
        stats.record(Resolution::Model);
        stats.record_model_call("m", 0.25);

        assert_eq!(stats.total_validations, 3);
        assert_eq!(stats.free_validations, 2);
        assert_eq!(stats.paid_validations, 1);
        assert_eq!(stats.models["m"].calls, 1);
        assert_eq!(stats.average_cost_per_paid(), 0.25);
    }

    #[test]
    fn test_average_without_paid_calls() {
        assert_eq!(ValidationStats::default().average_cost_per_paid(), 0.0);
    }

    #[test]
    fn test_display_lists_models() {
        let mut stats = ValidationStats::default();
        stats.record(Resolution::Model);
        stats.record_model_call("claude-3-haiku", 0.001);
        let text = stats.to_string();
        assert!(text.contains("1 total, 0 free, 1 paid"));
        assert!(text.contains("claude-3-haiku: 1 calls"));
    }
}
