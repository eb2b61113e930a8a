//! Pricing lookup and cost attribution for LLM spans
//!
//! Prices are quoted per 1000 tokens and keyed by exact model id. A
//! `PricingSource` hands out a fresh `PricingTable` snapshot for every
//! ingestion batch; nothing is cached between batches.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::data::types::StatusCode;

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Failed to parse pricing data: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// PRICING DATA STRUCTURES
// ============================================================================

/// Price of one model, per 1000 tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPricing {
    #[serde(alias = "promptPricePer1K")]
    pub prompt_price: f64,
    #[serde(alias = "completionPricePer1K")]
    pub completion_price: f64,
}

/// Model id → pricing dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingTable {
    models: FxHashMap<String, ModelPricing>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `{ "<model>": { "promptPrice": .., "completionPrice": .. } }`
    pub fn from_json_str(json: &str) -> Result<Self, PricingError> {
        let models: FxHashMap<String, ModelPricing> =
            serde_json::from_str(json).map_err(|e| PricingError::ParseError(e.to_string()))?;
        Ok(Self { models })
    }

    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.models.insert(model.into(), pricing);
        self
    }

    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

// ============================================================================
// COST CALCULATION
// ============================================================================

/// Cost-relevant fields of one span
#[derive(Debug, Clone, Default)]
pub struct SpanCostInput<'a> {
    pub model: Option<&'a str>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub status: StatusCode,
    /// Cost reported by the instrumentation, if any
    pub explicit_cost: Option<f64>,
}

/// Resolve the stored cost of a span.
///
/// The explicit cost is the default. A priced recomputation replaces it only
/// when the call did not fail, a model is named, both token counts are known
/// and the model has pricing.
pub fn calculate_cost(table: &PricingTable, input: &SpanCostInput<'_>) -> f64 {
    let fallback = input.explicit_cost.unwrap_or(0.0);

    if input.status == StatusCode::Error {
        return fallback;
    }
    let model = match input.model {
        Some(m) if !m.is_empty() => m,
        _ => return fallback,
    };
    let (Some(input_tokens), Some(output_tokens)) = (input.input_tokens, input.output_tokens)
    else {
        return fallback;
    };
    let Some(pricing) = table.get(model) else {
        tracing::trace!(model, "No pricing found for model");
        return fallback;
    };

    let cost = (input_tokens as f64 / 1000.0) * pricing.prompt_price
        + (output_tokens as f64 / 1000.0) * pricing.completion_price;

    tracing::trace!(model, input_tokens, output_tokens, cost, "Calculated span cost");
    cost
}

// ============================================================================
// PRICING SOURCES
// ============================================================================

/// Supplies a pricing snapshot before each ingestion batch
#[async_trait]
pub trait PricingSource: Send + Sync {
    async fn snapshot(&self) -> Result<PricingTable, PricingError>;
}

/// Fixed in-process table
#[derive(Debug, Clone, Default)]
pub struct StaticPricingSource {
    table: PricingTable,
}

impl StaticPricingSource {
    pub fn new(table: PricingTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl PricingSource for StaticPricingSource {
    async fn snapshot(&self) -> Result<PricingTable, PricingError> {
        Ok(self.table.clone())
    }
}

/// JSON file re-read on every snapshot. A missing file yields an empty table.
#[derive(Debug, Clone)]
pub struct FilePricingSource {
    path: PathBuf,
}

impl FilePricingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PricingSource for FilePricingSource {
    async fn snapshot(&self) -> Result<PricingTable, PricingError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Pricing file not found, using empty table");
                return Ok(PricingTable::new());
            }
            Err(e) => return Err(PricingError::Io(e)),
        };
        let table = PricingTable::from_json_str(&content)?;
        tracing::debug!(path = %self.path.display(), models = table.len(), "Loaded pricing table");
        Ok(table)
    }
}
