use serde::{Deserialize, Serialize};

use crate::errors::{CodevetError, Result};

/// Selection weight and per-1K-token pricing for one paid model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelProfile {
    /// Short name used in verdict sources and statistics
    pub name: String,
    /// Identifier sent to the inference endpoint
    pub api_model: String,
    pub weight: f64,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
}

impl ModelProfile {
    pub fn new(
        name: impl Into<String>,
        api_model: impl Into<String>,
        weight: f64,
        input_cost_per_1k: f64,
        output_cost_per_1k: f64,
    ) -> Self {
        Self {
            name: name.into(),
            api_model: api_model.into(),
            weight,
            input_cost_per_1k,
            output_cost_per_1k,
        }
    }

    /// Built-in table; the cheap model takes most of the traffic.
    pub fn defaults() -> Vec<ModelProfile> {
        vec![
            ModelProfile::new(
                "claude-3-haiku",
                "claude-3-haiku-20240307",
                0.70,
                0.00025,
                0.00125,
            ),
            ModelProfile::new(
                "claude-3-sonnet",
                "claude-3-sonnet-20240229",
                0.25,
                0.003,
                0.015,
            ),
            ModelProfile::new(
                "claude-3-opus",
                "claude-3-opus-20240229",
                0.05,
                0.015,
                0.075,
            ),
        ]
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() || self.api_model.trim().is_empty() {
            return Err("name and api_model must be non-empty".to_string());
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(format!("weight must be positive, got {}", self.weight));
        }
        if !(self.input_cost_per_1k >= 0.0 && self.output_cost_per_1k >= 0.0) {
            return Err("rates must be non-negative".to_string());
        }
        Ok(())
    }

    /// Cost of one call, approximating tokens as characters / 4.
    pub fn cost(&self, input_chars: usize, output_chars: usize) -> f64 {
        approx_tokens(input_chars) / 1000.0 * self.input_cost_per_1k
            + approx_tokens(output_chars) / 1000.0 * self.output_cost_per_1k
    }
}

pub fn approx_tokens(chars: usize) -> f64 {
    chars as f64 / 4.0
}

/// Cumulative-weight table sampled with one uniform draw.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    profiles: Vec<ModelProfile>,
    /// Upper bound of each profile's interval in `[0, 1)`, ascending.
    cumulative: Vec<f64>,
}

impl ModelSelector {
    pub fn new(profiles: Vec<ModelProfile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(CodevetError::Config("no model profiles configured".into()));
        }
        if let Some(invalid) = profiles.iter().find_map(|p| p.validate().err()) {
            return Err(CodevetError::Config(invalid));
        }

        let total: f64 = profiles.iter().map(|p| p.weight).sum();
        let mut running = 0.0;
        let cumulative = profiles
            .iter()
            .map(|p| {
                running += p.weight / total;
                running
            })
            .collect();

        Ok(Self {
            profiles,
            cumulative,
        })
    }

    pub fn profiles(&self) -> &[ModelProfile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&ModelProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Profile whose interval contains `draw` (clamped to `[0, 1)`).
    pub fn select_with(&self, draw: f64) -> &ModelProfile {
        let draw = if draw.is_finite() { draw.clamp(0.0, 1.0) } else { 0.0 };
        let index = self
            .cumulative
            .iter()
            .position(|upper| draw < *upper)
            // Rounding can leave the last bound just under 1.0.
            .unwrap_or(self.profiles.len() - 1);
        &self.profiles[index]
    }

    /// Probability of selecting each profile, in table order.
    pub fn probabilities(&self) -> Vec<(&str, f64)> {
        let mut previous = 0.0;
        self.profiles
            .iter()
            .zip(&self.cumulative)
            .map(|(profile, upper)| {
                let p = upper - previous;
                previous = *upper;
                (profile.name.as_str(), p)
            })
            .collect()
    }
}
