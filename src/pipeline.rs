use log::{debug, info, warn};
use serde_json::Value;

use crate::builder::ExtractionRequest;
use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::invoker::{
    BackendInvoker, CannedTransport, HttpTransport, InvocationMetrics, RetryPolicy, Transport,
};
use crate::json_repair::extract_json;
use crate::model::Dish;
use crate::normalizer::normalize;
use crate::prompt::build_request;
use crate::sink::ResultSink;
use crate::validator::validate;

/// A validated record together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub dish: Dish,
    pub metrics: InvocationMetrics,
    /// Backend payload exactly as returned
    pub raw: Value,
}

/// Runs build -> invoke -> normalize -> extract -> validate for one request
pub struct DishExtractor {
    config: AppConfig,
    invoker: BackendInvoker,
}

impl DishExtractor {
    /// Create an extractor talking to Bedrock, or to canned responses in mock mode
    pub fn new(config: AppConfig) -> Result<Self, ExtractError> {
        let transport: Box<dyn Transport> = if config.mock_mode {
            info!("Mock mode enabled, backend calls return canned responses");
            Box::new(CannedTransport::new())
        } else {
            Box::new(HttpTransport::new(&config)?)
        };
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: AppConfig, transport: Box<dyn Transport>) -> Self {
        let invoker = BackendInvoker::new(transport, RetryPolicy::from(&config.retry));
        DishExtractor { config, invoker }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Extract a dish record; every stage failure comes back typed.
    ///
    /// Decoding failures carry the backend payload, see [`ExtractError::raw_payload`].
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<Extraction, ExtractError> {
        let backend_request = build_request(
            &request.model_id,
            &request.prompt_input(),
            request.prompt_version,
            request.schema_policy,
        );
        debug!(
            "Built {:?} request for {}",
            backend_request.family, request.model_id
        );

        let invocation = self.invoker.invoke(&request.model_id, &backend_request).await?;
        let raw = invocation.raw;

        let dish = decode_dish(&raw, request).map_err(|error| {
            warn!("Extraction from {} failed: {}", request.model_id, error);
            error.with_raw(&raw)
        })?;

        info!(
            "Extracted {:?} with {} ingredient(s) from {}",
            dish.dish_name,
            dish.ingredients.len(),
            request.model_id
        );

        Ok(Extraction {
            dish,
            metrics: invocation.metrics,
            raw,
        })
    }

    /// Extract and report the outcome to `sink` under `label`
    pub async fn extract_into(
        &self,
        request: &ExtractionRequest,
        sink: &mut dyn ResultSink,
        label: &str,
    ) -> Result<Extraction, ExtractError> {
        match self.extract(request).await {
            Ok(extraction) => {
                sink.on_success(&extraction.dish, &extraction.metrics, label);
                Ok(extraction)
            }
            Err(error) => {
                sink.on_failure(&error, error.raw_payload(), label);
                Err(error)
            }
        }
    }
}

fn decode_dish(raw: &Value, request: &ExtractionRequest) -> Result<Dish, ExtractError> {
    let envelope = normalize(raw)?;
    let candidate = extract_json(&envelope.text);
    validate(&candidate, request.schema_policy)
}
