//! Built-in pricing table for common LLM models.
//!
//! Each model has a prompt and a completion price per 1M tokens. Custom
//! pricing can be installed at runtime; the background refresh task
//! (see [`crate::spawn_refresh`]) replaces entries wholesale.

use std::collections::HashMap;
use std::sync::RwLock;

use openrelay_core::pricing::{ModelPricing, PriceOracle};

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PriceTable {
    prices: RwLock<HashMap<String, ModelPricing>>,
}

impl PriceTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();

        // ── Anthropic ──────────────────────────────────────────────
        prices.insert(
            "anthropic/claude-sonnet-4".into(),
            ModelPricing::new(3.0, 15.0),
        );
        prices.insert(
            "anthropic/claude-opus-4".into(),
            ModelPricing::new(15.0, 75.0),
        );
        prices.insert(
            "anthropic/claude-3.5-haiku".into(),
            ModelPricing::new(0.8, 4.0),
        );

        // ── OpenAI ─────────────────────────────────────────────────
        prices.insert("openai/gpt-4o".into(), ModelPricing::new(2.5, 10.0));
        prices.insert("openai/gpt-4o-mini".into(), ModelPricing::new(0.15, 0.6));
        prices.insert("openai/o3-mini".into(), ModelPricing::new(1.1, 4.4));

        // ── Google ─────────────────────────────────────────────────
        prices.insert(
            "google/gemini-2.0-flash".into(),
            ModelPricing::new(0.1, 0.4),
        );
        prices.insert(
            "google/gemini-2.0-pro".into(),
            ModelPricing::new(1.25, 10.0),
        );

        // ── Meta ───────────────────────────────────────────────────
        prices.insert(
            "meta-llama/llama-3.1-70b".into(),
            ModelPricing::new(0.52, 0.75),
        );

        // ── DeepSeek ───────────────────────────────────────────────
        prices.insert("deepseek/deepseek-v3".into(), ModelPricing::new(0.27, 1.1));

        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        let mut prices = self.prices.write().unwrap();
        prices.insert(model.into(), pricing);
    }

    /// Replace the whole table (used by the refresh task).
    pub fn replace(&self, new_prices: HashMap<String, ModelPricing>) {
        let mut prices = self.prices.write().unwrap();
        *prices = new_prices;
    }

    /// List all known model names, sorted.
    pub fn models(&self) -> Vec<String> {
        let prices = self.prices.read().unwrap();
        let mut names: Vec<String> = prices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of models in the pricing table.
    pub fn len(&self) -> usize {
        self.prices.read().unwrap().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PriceOracle for PriceTable {
    /// Look up pricing for a model.
    ///
    /// Supports flexible matching: exact match first, then common provider
    /// prefixes (`gpt-4o` → `openai/gpt-4o`), then the longest known model
    /// whose bare name is a prefix of the queried one (so
    /// `gpt-4o-mini-2024-07-18` matches `gpt-4o-mini`).
    fn price_for(&self, model: &str) -> Option<ModelPricing> {
        let prices = self.prices.read().unwrap();

        // 1. Exact match
        if let Some(p) = prices.get(model) {
            return Some(*p);
        }

        // 2. Try with common provider prefixes
        let prefixed_names = [
            format!("openai/{model}"),
            format!("anthropic/{model}"),
            format!("google/{model}"),
            format!("deepseek/{model}"),
            format!("meta-llama/{model}"),
        ];
        for name in &prefixed_names {
            if let Some(p) = prices.get(name.as_str()) {
                return Some(*p);
            }
        }

        // 3. Prefix match — responses often carry a version suffix
        let model_lower = model.to_lowercase();
        let bare_model = model_lower.split('/').next_back().unwrap_or(&model_lower);

        let mut best: Option<(&str, &ModelPricing)> = None;
        for (key, pricing) in prices.iter() {
            let bare_key = key.split('/').next_back().unwrap_or(key);
            if bare_model.starts_with(&bare_key.to_lowercase())
                && best.is_none_or(|(b, _)| bare_key.len() > b.len())
            {
                best = Some((bare_key, pricing));
            }
        }

        best.map(|(_, p)| *p)
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrelay_core::usage::Usage;

    #[test]
    fn default_table_has_models() {
        let table = PriceTable::with_defaults();
        assert!(table.len() >= 10);
        assert!(!table.is_empty());
    }

    #[test]
    fn known_model_cost() {
        let table = PriceTable::with_defaults();
        let pricing = table.price_for("anthropic/claude-sonnet-4").unwrap();
        let usage = Usage {
            prompt_tokens: 1000,
            completion_tokens: 500,
            total_tokens: 1500,
        };
        // (1000 * 3.0 + 500 * 15.0) / 1M = 0.0105
        assert!((pricing.cost(&usage) - 0.0105).abs() < 1e-10);
    }

    #[test]
    fn unknown_model_has_no_price() {
        let table = PriceTable::with_defaults();
        assert!(table.price_for("unknown/model-xyz").is_none());
    }

    #[test]
    fn bare_model_matches_provider_prefixed_entry() {
        let table = PriceTable::with_defaults();
        assert!(table.price_for("gpt-4o").is_some());
    }

    #[test]
    fn versioned_model_prefix_matches_longest_key() {
        let table = PriceTable::with_defaults();
        let mini = table.price_for("gpt-4o-mini-2024-07-18").unwrap();
        let expected = table.price_for("openai/gpt-4o-mini").unwrap();
        // Must match gpt-4o-mini, not the shorter gpt-4o
        assert_eq!(mini, expected);
    }

    #[test]
    fn custom_pricing() {
        let table = PriceTable::empty();
        assert!(table.is_empty());

        table.set("custom/model", ModelPricing::new(1.0, 2.0));
        assert_eq!(table.len(), 1);
        assert!(table.price_for("custom/model").is_some());
    }

    #[test]
    fn replace_swaps_whole_table() {
        let table = PriceTable::with_defaults();
        let mut new_prices = HashMap::new();
        new_prices.insert("only/model".to_string(), ModelPricing::new(9.0, 9.0));
        table.replace(new_prices);

        assert_eq!(table.len(), 1);
        assert!(table.price_for("openai/gpt-4o").is_none());
        assert!(table.price_for("only/model").is_some());
    }

    #[test]
    fn list_models_sorted() {
        let table = PriceTable::with_defaults();
        let models = table.models();
        assert!(models.contains(&"openai/gpt-4o".to_string()));
        assert!(models.windows(2).all(|w| w[0] <= w[1]));
    }
}
