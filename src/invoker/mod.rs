mod canned;
mod retry;
mod transport;
pub mod usage;

pub use canned::CannedTransport;
pub use retry::RetryPolicy;
pub use transport::{classify, HttpTransport, BEARER_TOKEN_ENV};
pub use usage::{InvocationMetrics, TokenUsage};

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tokio::time::sleep;

use crate::catalog;
use crate::error::ExtractError;
use crate::prompt::BackendRequest;

/// Successful HTTP exchange, before the body is interpreted
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
}

/// Something that can run a request body against a model
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get the transport name (e.g., "bedrock", "canned")
    fn name(&self) -> &str;

    /// Run `body` against `model_id`; non-success statuses come back as classified errors
    async fn invoke(&self, model_id: &str, body: &Value) -> Result<RawResponse, ExtractError>;

    /// Input token count of `body` without running the model
    async fn count_tokens(&self, model_id: &str, body: &Value) -> Result<u64, ExtractError>;
}

/// Raw payload of a successful call plus its measurements
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub raw: Value,
    pub metrics: InvocationMetrics,
}

/// Runs built requests with retries and collects usage metadata
pub struct BackendInvoker {
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
}

impl BackendInvoker {
    pub fn new(transport: Box<dyn Transport>, retry: RetryPolicy) -> Self {
        BackendInvoker { transport, retry }
    }

    /// Invoke `model_id`, retrying transient failures with exponential backoff
    pub async fn invoke(
        &self,
        model_id: &str,
        request: &BackendRequest,
    ) -> Result<Invocation, ExtractError> {
        info!(
            "Invoking {} via {} (body keys: {:?}, {} bytes)",
            model_id,
            self.transport.name(),
            request.keys(),
            request.body.to_string().len()
        );

        let started = Instant::now();
        let response = self.invoke_with_retry(model_id, &request.body).await?;
        let latency = started.elapsed();

        debug!(
            "Raw response: {} bytes, head: {}",
            response.body.len(),
            response.body.chars().take(200).collect::<String>()
        );

        let raw = parse_body(&response.body)?;
        let usage = usage::from_headers(&response.headers).or(usage::from_body(&raw));

        let tokens_in = match usage.input_tokens {
            Some(tokens) => tokens,
            None => self.preflight_tokens(model_id, &request.body).await,
        };
        let tokens_out = usage.output_tokens.unwrap_or(0);

        let metrics = InvocationMetrics {
            latency,
            tokens_in,
            tokens_out,
            cost_estimate: catalog::estimate_cost(model_id, tokens_in, tokens_out),
        };
        info!("Invocation of {} finished: {}", model_id, metrics);

        Ok(Invocation { raw, metrics })
    }

    async fn invoke_with_retry(
        &self,
        model_id: &str,
        body: &Value,
    ) -> Result<RawResponse, ExtractError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(
                "Calling {} (attempt {}/{})",
                model_id, attempt, max_attempts
            );

            let error = match self.transport.invoke(model_id, body).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                warn!(
                    "Model {} failed (attempt {}/{}): {}",
                    model_id, attempt, max_attempts, error
                );
                return Err(error);
            }

            let delay = self.retry.delay(attempt);
            warn!(
                "Model {} failed (attempt {}/{}): {}; retrying in {:?}",
                model_id, attempt, max_attempts, error, delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Input tokens from the count-tokens endpoint, 0 when it is unavailable
    async fn preflight_tokens(&self, model_id: &str, body: &Value) -> u64 {
        match self.transport.count_tokens(model_id, body).await {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!("count-tokens unavailable for {}: {}", model_id, e);
                0
            }
        }
    }
}

fn parse_body(body: &str) -> Result<Value, ExtractError> {
    if body.trim().is_empty() {
        return Err(ExtractError::InvalidResponse {
            message: "empty response body".to_string(),
            body: String::new(),
        });
    }

    serde_json::from_str(body).map_err(|e| ExtractError::InvalidResponse {
        message: format!("response body is not JSON: {}", e),
        body: body.to_string(),
    })
}
