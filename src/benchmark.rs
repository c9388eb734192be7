//! Sequential comparison of several models on the same description.

use log::{info, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Instant;

use crate::builder::ExtractionRequest;
use crate::error::ExtractError;
use crate::invoker::usage::round_secs;
use crate::pipeline::{DishExtractor, Extraction};

/// Outcome of one model in a benchmark run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRow {
    pub model: String,
    pub latency_s: f64,
    pub valid: bool,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_est_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkRow {
    fn from_outcome(
        model: &str,
        started: Instant,
        outcome: Result<Extraction, ExtractError>,
    ) -> Self {
        match outcome {
            Ok(extraction) => BenchmarkRow {
                model: model.to_string(),
                latency_s: round_secs(started.elapsed()),
                valid: true,
                tokens_in: extraction.metrics.tokens_in,
                tokens_out: extraction.metrics.tokens_out,
                cost_est_usd: extraction.metrics.cost_estimate,
                error: None,
            },
            Err(e) => BenchmarkRow {
                model: model.to_string(),
                latency_s: round_secs(started.elapsed()),
                valid: false,
                tokens_in: 0,
                tokens_out: 0,
                cost_est_usd: 0.0,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Column a benchmark table can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BenchmarkMetric {
    #[default]
    Latency,
    Validity,
    Cost,
    TokensIn,
    TokensOut,
    Model,
}

impl BenchmarkMetric {
    /// Validity reads best highest-first, everything else lowest-first
    pub fn default_ascending(&self) -> bool {
        !matches!(self, BenchmarkMetric::Validity)
    }

    fn compare(&self, a: &BenchmarkRow, b: &BenchmarkRow) -> Ordering {
        match self {
            BenchmarkMetric::Latency => a.latency_s.total_cmp(&b.latency_s),
            BenchmarkMetric::Validity => a.valid.cmp(&b.valid),
            BenchmarkMetric::Cost => a.cost_est_usd.total_cmp(&b.cost_est_usd),
            BenchmarkMetric::TokensIn => a.tokens_in.cmp(&b.tokens_in),
            BenchmarkMetric::TokensOut => a.tokens_out.cmp(&b.tokens_out),
            BenchmarkMetric::Model => a.model.cmp(&b.model),
        }
    }
}

/// Stable sort of `rows` by `metric`
pub fn sort_rows(rows: &mut [BenchmarkRow], metric: BenchmarkMetric, ascending: bool) {
    rows.sort_by(|a, b| {
        let ordering = metric.compare(a, b);
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

/// Run `description` through every model in turn, one row per model
///
/// Failures become rows with `valid == false`; the run never stops early.
pub async fn benchmark(
    extractor: &DishExtractor,
    description: &str,
    models: &[String],
    temperature: f64,
    max_tokens: u32,
) -> Vec<BenchmarkRow> {
    let mut rows = Vec::with_capacity(models.len());

    for model in models {
        info!("Benchmarking {}", model);
        let started = Instant::now();

        let outcome = match ExtractionRequest::builder()
            .description(description)
            .model(model.as_str())
            .temperature(temperature)
            .max_tokens(max_tokens)
            .build(extractor.config())
            .await
        {
            Ok(request) => extractor.extract(&request).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            warn!("Benchmark of {} failed: {}", model, e);
        }
        rows.push(BenchmarkRow::from_outcome(model, started, outcome));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn row(model: &str, latency_s: f64, valid: bool, cost: f64) -> BenchmarkRow {
        BenchmarkRow {
            model: model.to_string(),
            latency_s,
            valid,
            tokens_in: 0,
            tokens_out: 0,
            cost_est_usd: cost,
            error: None,
        }
    }

    #[test]
    fn test_sort_rows() {
        let mut rows = vec![
            row("b", 2.5, true, 0.01),
            row("a", 0.7, false, 0.0),
            row("c", 1.1, true, 0.002),
        ];

        sort_rows(&mut rows, BenchmarkMetric::Latency, true);
        assert_eq!(rows.iter().map(|r| r.model.as_str()).collect::<Vec<_>>(), ["a", "c", "b"]);

        let metric = BenchmarkMetric::Validity;
        sort_rows(&mut rows, metric, metric.default_ascending());
        assert!(rows[0].valid && rows[1].valid && !rows[2].valid);

        sort_rows(&mut rows, BenchmarkMetric::Cost, false);
        assert_eq!(rows[0].model, "b");

        sort_rows(&mut rows, BenchmarkMetric::Model, true);
        assert_eq!(rows[0].model, "a");
    }

    #[test]
    fn test_row_serialization() {
        let value = serde_json::to_value(row("m", 1.0, true, 0.0)).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["valid"], true);
    }

    #[tokio::test]
    async fn test_benchmark_in_mock_mode() {
        let config = AppConfig {
            mock_mode: true,
            ..AppConfig::default()
        };
        let extractor = DishExtractor::new(config).unwrap();
        let models = vec![
            "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string(),
            "amazon.titan-text-lite-v1".to_string(),
            "meta.llama3-8b-instruct-v1:0".to_string(),
        ];

        let description = "Hãy cho tôi nguyên liệu của món phở bò.";
        let rows = benchmark(&extractor, description, &models, 0.2, 512).await;
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.valid && r.error.is_none()));
        assert_eq!(rows[1].model, "amazon.titan-text-lite-v1");
    }

    #[tokio::test]
    async fn test_invalid_parameters_become_failed_rows() {
        let config = AppConfig {
            mock_mode: true,
            ..AppConfig::default()
        };
        let extractor = DishExtractor::new(config).unwrap();

        let rows = benchmark(&extractor, "phở", &["x".to_string()], 2.0, 512).await;
        assert!(!rows[0].valid);
        assert!(rows[0].error.as_deref().unwrap().contains("Temperature"));
    }
}
