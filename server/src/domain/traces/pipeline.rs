//! Ingestion pipeline
//!
//! ```text
//! records ──▶ pricing snapshot ──▶ normalize + cost ──▶ export (one transaction)
//! ```

use std::sync::Arc;

use thiserror::Error;

use super::normalize::normalize_batch;
use crate::data::error::DataError;
use crate::data::traits::SpanRepository;
use crate::data::types::SpanRecord;
use crate::domain::pricing::{PricingError, PricingSource};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Pricing lookup failed: {0}")]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Outcome of one ingested batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub skipped: usize,
}

pub struct TraceIngestor {
    repo: Arc<dyn SpanRepository>,
    pricing: Arc<dyn PricingSource>,
}

impl TraceIngestor {
    pub fn new(repo: Arc<dyn SpanRepository>, pricing: Arc<dyn PricingSource>) -> Self {
        Self { repo, pricing }
    }

    /// Normalize and persist one batch.
    ///
    /// Records without identity are skipped; the rest are stored together or
    /// not at all.
    pub async fn ingest(&self, records: Vec<SpanRecord>) -> Result<IngestSummary, IngestError> {
        if records.is_empty() {
            return Ok(IngestSummary::default());
        }

        let table = self.pricing.snapshot().await?;
        let batch = normalize_batch(records, &table);
        let summary = IngestSummary {
            accepted: batch.spans.len(),
            skipped: batch.skipped,
        };

        if !batch.spans.is_empty() {
            self.repo.export_traces(batch.spans).await?;
        }

        tracing::debug!(
            accepted = summary.accepted,
            skipped = summary.skipped,
            "Ingested span batch"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::duckdb::DuckdbService;
    use crate::data::types::TraceQuery;
    use crate::domain::pricing::{FilePricingSource, ModelPricing, PricingTable, StaticPricingSource};
    use serde_json::json;
    use tempfile::TempDir;

    fn records(value: serde_json::Value) -> Vec<SpanRecord> {
        serde_json::from_value(value).unwrap()
    }

    fn setup(pricing: Arc<dyn PricingSource>) -> (Arc<DuckdbService>, TraceIngestor) {
        let db = Arc::new(DuckdbService::open_in_memory().unwrap());
        let repo: Arc<dyn SpanRepository> = Arc::new(Arc::clone(&db));
        (db, TraceIngestor::new(repo, pricing))
    }

    fn static_pricing() -> Arc<dyn PricingSource> {
        Arc::new(StaticPricingSource::new(PricingTable::new().with_model(
            "m",
            ModelPricing {
                prompt_price: 5.0,
                completion_price: 15.0,
            },
        )))
    }

    #[tokio::test]
    async fn test_ingest_computes_cost_and_stores() {
        let (db, ingestor) = setup(static_pricing());
        let summary = ingestor
            .ingest(records(json!([
                {"traceId": "t1", "spanId": "root", "name": "agent", "startTime": 100},
                {"traceId": "t1", "spanId": "g", "parentSpanId": "root", "type": "GENERATION",
                 "model": "m", "inputTokens": 100, "outputTokens": 50, "startTime": 110},
                {"spanId": "orphan"}
            ])))
            .await
            .unwrap();

        assert_eq!(summary, IngestSummary { accepted: 2, skipped: 1 });

        let detail = db.get_trace("t1").await.unwrap().unwrap();
        assert_eq!(detail.trace.name, "agent");
        assert_eq!(detail.trace.cost, 1.25);
        assert_eq!(detail.trace.tokens, 150);
    }

    #[tokio::test]
    async fn test_ingest_empty_batch() {
        let (_db, ingestor) = setup(static_pricing());
        assert_eq!(ingestor.ingest(vec![]).await.unwrap(), IngestSummary::default());
    }

    #[tokio::test]
    async fn test_pricing_refreshed_per_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pricing.json");
        let (db, ingestor) = setup(Arc::new(FilePricingSource::new(&path)));
        let generation = |span_id: &str| {
            records(json!([{"traceId": span_id, "spanId": span_id, "type": "GENERATION",
                "model": "m", "inputTokens": 1000, "outputTokens": 0}]))
        };

        ingestor.ingest(generation("before")).await.unwrap();
        tokio::fs::write(&path, r#"{"m": {"promptPrice": 2, "completionPrice": 0}}"#)
            .await
            .unwrap();
        ingestor.ingest(generation("after")).await.unwrap();

        let traces = db.list_traces(&TraceQuery::default()).await.unwrap();
        let cost_of = |id: &str| traces.iter().find(|t| t.id == id).unwrap().cost;
        assert_eq!(cost_of("before"), 0.0);
        assert_eq!(cost_of("after"), 2.0);
    }

    #[tokio::test]
    async fn test_pricing_failure_aborts_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pricing.json");
        tokio::fs::write(&path, "garbage").await.unwrap();
        let (db, ingestor) = setup(Arc::new(FilePricingSource::new(&path)));

        let result = ingestor
            .ingest(records(json!([{"traceId": "t", "spanId": "s"}])))
            .await;
        assert!(matches!(result, Err(IngestError::Pricing(_))));
        assert!(db.list_spans("t").await.unwrap().is_empty());
    }
}
