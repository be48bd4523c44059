//! Price oracle trait — per-model token pricing for cost estimation.
//!
//! Cost is advisory: an unknown model yields no price and a `None` cost,
//! never an error.

use serde::{Deserialize, Serialize};

use crate::usage::Usage;

/// Per-million-token pricing for a model, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M prompt tokens.
    pub prompt_per_m: f64,
    /// Price per 1M completion tokens.
    pub completion_per_m: f64,
}

impl ModelPricing {
    pub fn new(prompt_per_m: f64, completion_per_m: f64) -> Self {
        Self {
            prompt_per_m,
            completion_per_m,
        }
    }

    /// Compute the cost of the given usage at this price.
    pub fn cost(&self, usage: &Usage) -> f64 {
        (usage.prompt_tokens as f64 / 1_000_000.0) * self.prompt_per_m
            + (usage.completion_tokens as f64 / 1_000_000.0) * self.completion_per_m
    }
}

/// The core PriceOracle trait.
pub trait PriceOracle: Send + Sync {
    /// Look up pricing for a model. `None` if the model is unknown.
    fn price_for(&self, model: &str) -> Option<ModelPricing>;
}

/// An oracle that knows no prices; every cost comes back `None`.
pub struct NoopOracle;

impl PriceOracle for NoopOracle {
    fn price_for(&self, _model: &str) -> Option<ModelPricing> {
        None
    }
}
