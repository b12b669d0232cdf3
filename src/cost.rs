//! Token-usage cost estimation against a static pricing table.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::backend::TokenUsage;

/// Per-model prices in USD per one million tokens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricingEntry {
    pub input: f64,
    pub cached_input: f64,
    pub output: f64,
}

/// Model id -> pricing, loaded once at startup and never mutated.
pub type PricingTable = HashMap<String, PricingEntry>;

/// Cost breakdown for one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

/// Built-in pricing table, current as of the last release.
///
/// A `pricing.json` file in the config directory replaces it wholesale.
pub fn default_table() -> PricingTable {
    let entries: [(&str, f64, f64, f64); 14] = [
        ("gpt-5.2", 1.75, 0.175, 14.00),
        ("gpt-5.1", 1.25, 0.125, 10.00),
        ("gpt-5", 1.25, 0.125, 10.00),
        ("gpt-5-mini", 0.25, 0.025, 2.00),
        ("gpt-5-nano", 0.05, 0.005, 0.40),
        ("gpt-4.1", 2.00, 0.50, 8.00),
        ("gpt-4.1-mini", 0.40, 0.10, 1.60),
        ("gpt-4.1-nano", 0.10, 0.025, 0.40),
        ("gpt-4o", 2.50, 1.25, 10.00),
        ("gpt-4o-mini", 0.15, 0.075, 0.60),
        ("gpt-realtime", 4.00, 0.40, 16.00),
        ("gpt-realtime-mini", 0.60, 0.06, 2.40),
        ("o1", 15.00, 7.50, 60.00),
        ("o3", 2.00, 0.50, 8.00),
    ];

    entries
        .into_iter()
        .map(|(model, input, cached_input, output)| {
            (
                model.to_string(),
                PricingEntry {
                    input,
                    cached_input,
                    output,
                },
            )
        })
        .collect()
}

/// Load the pricing table, preferring a JSON override at `override_path`.
///
/// Pricing is display-only, so an unreadable or malformed file warns and
/// keeps the built-in table instead of failing the run.
pub fn load_table(override_path: &Path) -> PricingTable {
    match fs::read_to_string(override_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(table) => table,
            Err(e) => {
                warn!(
                    "Failed to parse pricing file {}: {e}",
                    override_path.display()
                );
                default_table()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => default_table(),
        Err(e) => {
            warn!(
                "Failed to load pricing file {}: {e}",
                override_path.display()
            );
            default_table()
        }
    }
}

/// Estimate the USD cost of a generation.
///
/// `None` for models absent from the table; never an error. Missing token
/// counts default to zero, and the total falls back to prompt + completion.
pub fn estimate(model: &str, usage: &TokenUsage, table: &PricingTable) -> Option<CostEstimate> {
    let pricing = table.get(model)?;

    let prompt_tokens = usage.prompt_tokens.unwrap_or(0);
    let completion_tokens = usage.completion_tokens.unwrap_or(0);
    let total_tokens = usage
        .total_tokens
        .unwrap_or(prompt_tokens + completion_tokens);

    let cost_usd = (prompt_tokens as f64 / 1e6) * pricing.input
        + (completion_tokens as f64 / 1e6) * pricing.output;

    Some(CostEstimate {
        prompt_tokens,
        completion_tokens,
        total_tokens,
        cost_usd,
    })
}
