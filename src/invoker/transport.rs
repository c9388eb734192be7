use async_trait::async_trait;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{RawResponse, Transport};
use crate::config::AppConfig;
use crate::error::ExtractError;

pub const BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Bedrock runtime over HTTPS with bearer-token auth
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport from configuration
    pub fn new(config: &AppConfig) -> Result<Self, ExtractError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(BEARER_TOKEN_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ExtractError::MissingCredentials(format!(
                    "{} not found in config or environment",
                    BEARER_TOKEN_ENV
                ))
            })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(HttpTransport {
            client,
            endpoint: config.endpoint_url(),
            api_key,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        HttpTransport {
            client: Client::new(),
            endpoint: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, model_id: &str, operation: &str) -> String {
        format!(
            "{}/model/{}/{}",
            self.endpoint,
            model_id.trim().replace(':', "%3A"),
            operation
        )
    }

    async fn post(&self, url: &str, body: &Value) -> Result<RawResponse, ExtractError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let headers = header_map(response.headers());
        let text = response.text().await?;

        if status.is_success() {
            return Ok(RawResponse {
                status: status.as_u16(),
                body: text,
                headers,
            });
        }

        debug!("Backend returned {}: {}", status, text);
        Err(error_from_response(status, &headers, &text))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn invoke(&self, model_id: &str, body: &Value) -> Result<RawResponse, ExtractError> {
        let url = self.url(model_id, "invoke");
        debug!("POST {}", url);
        self.post(&url, body).await
    }

    async fn count_tokens(&self, model_id: &str, body: &Value) -> Result<u64, ExtractError> {
        let url = self.url(model_id, "count-tokens");
        let request = json!({
            "input": {
                "invokeModel": {
                    "body": body.to_string()
                }
            }
        });

        let response = self.post(&url, &request).await?;
        let parsed: Value =
            serde_json::from_str(&response.body).map_err(|e| ExtractError::InvalidResponse {
                message: format!("count-tokens: {}", e),
                body: response.body.clone(),
            })?;

        parsed["inputTokens"]
            .as_u64()
            .ok_or_else(|| ExtractError::InvalidResponse {
                message: "count-tokens response has no inputTokens".to_string(),
                body: response.body,
            })
    }
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}

/// Error code from the `x-amzn-ErrorType` header, or `__type` / `code` in the body
fn error_code(headers: &HashMap<String, String>, body: &Value) -> String {
    if let Some(header) = headers.get(ERROR_TYPE_HEADER) {
        let code = header.split(':').next().unwrap_or_default().trim();
        if !code.is_empty() {
            return code.to_string();
        }
    }

    body.get("__type")
        .and_then(Value::as_str)
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .or_else(|| body.get("code").and_then(Value::as_str).map(String::from))
        .unwrap_or_default()
}

fn error_from_response(
    status: StatusCode,
    headers: &HashMap<String, String>,
    text: &str,
) -> ExtractError {
    let body: Value = serde_json::from_str(text).unwrap_or(Value::Null);
    let code = error_code(headers, &body);
    let message = body
        .get("message")
        .or_else(|| body.get("Message"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| text.trim().to_string());

    classify(status.as_u16(), &code, message)
}

/// Map a failed backend call onto the error taxonomy
///
/// Throttling and timeouts are told apart by code first, then by status.
pub fn classify(status: u16, code: &str, message: String) -> ExtractError {
    let lowered = code.to_lowercase();
    let label = if code.is_empty() {
        status.to_string()
    } else {
        code.to_string()
    };

    if lowered.contains("throttl") || lowered.contains("toomanyrequests") || status == 429 {
        ExtractError::RateLimited {
            message: format!("{}: {}", label, message),
        }
    } else if lowered.contains("timeout") || status == 408 || status == 504 {
        ExtractError::TimedOut {
            message: format!("{}: {}", label, message),
        }
    } else if lowered.contains("serviceunavailable")
        || lowered.contains("internalserver")
        || lowered.contains("modelnotready")
        || status >= 500
    {
        ExtractError::transport(format!("{}: {}", label, message))
    } else {
        ExtractError::BadRequest {
            code: label,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_classify_by_status() {
        assert_eq!(classify(429, "", "slow".into()).kind(), ErrorKind::RateLimited);
        assert_eq!(classify(408, "", "late".into()).kind(), ErrorKind::TimedOut);
        assert_eq!(classify(504, "", "late".into()).kind(), ErrorKind::TimedOut);
        assert_eq!(classify(503, "", "down".into()).kind(), ErrorKind::Transport);
        assert_eq!(classify(400, "", "bad".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(classify(403, "", "denied".into()).kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_classify_by_code() {
        assert_eq!(
            classify(400, "ThrottlingException", "x".into()).kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            classify(424, "ModelTimeoutException", "x".into()).kind(),
            ErrorKind::TimedOut
        );
        assert_eq!(
            classify(400, "ServiceUnavailableException", "x".into()).kind(),
            ErrorKind::Transport
        );

        match classify(400, "ValidationException", "max_tokens too large".into()) {
            ExtractError::BadRequest { code, message } => {
                assert_eq!(code, "ValidationException");
                assert_eq!(message, "max_tokens too large");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_code_sources() {
        let headers = HashMap::from([(
            ERROR_TYPE_HEADER.to_string(),
            "ThrottlingException:http://internal.amazon.com/coral/".to_string(),
        )]);
        assert_eq!(error_code(&headers, &Value::Null), "ThrottlingException");

        let body = serde_json::json!({"__type": "com.amazon.coral#AccessDeniedException"});
        assert_eq!(error_code(&HashMap::new(), &body), "AccessDeniedException");

        let body = serde_json::json!({"code": "ValidationException"});
        assert_eq!(error_code(&HashMap::new(), &body), "ValidationException");
    }

    #[test]
    fn test_url_encodes_model_version() {
        let transport =
            HttpTransport::with_base_url("k".to_string(), "http://localhost:1234/".to_string());
        assert_eq!(
            transport.url("amazon.nova-lite-v1:0", "invoke"),
            "http://localhost:1234/model/amazon.nova-lite-v1%3A0/invoke"
        );
    }

    #[test]
    fn test_new_with_configured_key() {
        let config = AppConfig {
            api_key: Some("token".to_string()),
            ..AppConfig::default()
        };
        assert!(HttpTransport::new(&config).is_ok());
    }
}
