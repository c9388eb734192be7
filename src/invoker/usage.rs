use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const INPUT_TOKEN_HEADERS: [&str; 2] = [
    "x-amzn-bedrock-input-token-count",
    "x-amzn-bedrock-input-tokens",
];
pub const OUTPUT_TOKEN_HEADERS: [&str; 2] = [
    "x-amzn-bedrock-output-token-count",
    "x-amzn-bedrock-output-tokens",
];

/// Token counts reported by a backend, `None` where it said nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl TokenUsage {
    /// Fill gaps in `self` from `other`
    pub fn or(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.or(other.input_tokens),
            output_tokens: self.output_tokens.or(other.output_tokens),
        }
    }
}

fn first_header(headers: &HashMap<String, String>, names: &[&str]) -> Option<u64> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.trim().parse().ok())
}

/// Token counts from InvokeModel response headers (names lowercased)
pub fn from_headers(headers: &HashMap<String, String>) -> TokenUsage {
    TokenUsage {
        input_tokens: first_header(headers, &INPUT_TOKEN_HEADERS),
        output_tokens: first_header(headers, &OUTPUT_TOKEN_HEADERS),
    }
}

fn first_u64(raw: &Value, paths: &[&[&str]]) -> Option<u64> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(raw, |value, key| value.get(key))
            .and_then(Value::as_u64)
    })
}

/// Token counts carried in the payload itself
///
/// Covers `usage` blocks (Claude, Nova), Llama's `*_token_count` fields and
/// Titan's `inputTextTokenCount`.
pub fn from_body(raw: &Value) -> TokenUsage {
    let titan_output = raw
        .get("results")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("tokenCount"))
        .and_then(Value::as_u64);

    TokenUsage {
        input_tokens: first_u64(
            raw,
            &[
                &["usage", "inputTokens"],
                &["usage", "input_tokens"],
                &["prompt_token_count"],
                &["inputTextTokenCount"],
            ],
        ),
        output_tokens: first_u64(
            raw,
            &[
                &["usage", "outputTokens"],
                &["usage", "output_tokens"],
                &["generation_token_count"],
            ],
        )
        .or(titan_output),
    }
}

/// Side-channel measurements of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct InvocationMetrics {
    #[serde(rename = "latency_s", serialize_with = "serialize_secs")]
    pub latency: Duration,
    pub tokens_in: u64,
    pub tokens_out: u64,
    #[serde(rename = "cost_est_usd")]
    pub cost_estimate: f64,
}

fn serialize_secs<S: serde::Serializer>(latency: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_secs(*latency))
}

/// Seconds rounded to two decimals
pub fn round_secs(latency: Duration) -> f64 {
    (latency.as_secs_f64() * 100.0).round() / 100.0
}

impl fmt::Display for InvocationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "latency {:.2}s, tokens in {}, tokens out {}, est. cost ${:.6}",
            self.latency.as_secs_f64(),
            self.tokens_in,
            self.tokens_out,
            self.cost_estimate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_headers() {
        let headers = HashMap::from([
            ("x-amzn-bedrock-input-token-count".to_string(), "321".to_string()),
            ("x-amzn-bedrock-output-tokens".to_string(), " 87 ".to_string()),
        ]);
        assert_eq!(
            from_headers(&headers),
            TokenUsage {
                input_tokens: Some(321),
                output_tokens: Some(87),
            }
        );
        assert_eq!(from_headers(&HashMap::new()), TokenUsage::default());
    }

    #[test]
    fn test_from_body_variants() {
        let claude = json!({"usage": {"input_tokens": 10, "output_tokens": 20}});
        let nova = json!({"usage": {"inputTokens": 11, "outputTokens": 21}});
        let llama = json!({
            "generation": "x",
            "prompt_token_count": 12,
            "generation_token_count": 22
        });
        let titan = json!({
            "inputTextTokenCount": 13,
            "results": [{"tokenCount": 23, "outputText": "x"}]
        });

        assert_eq!(from_body(&claude).input_tokens, Some(10));
        assert_eq!(from_body(&claude).output_tokens, Some(20));
        assert_eq!(from_body(&nova).output_tokens, Some(21));
        assert_eq!(from_body(&llama).input_tokens, Some(12));
        assert_eq!(from_body(&llama).output_tokens, Some(22));
        assert_eq!(from_body(&titan).input_tokens, Some(13));
        assert_eq!(from_body(&titan).output_tokens, Some(23));
        assert_eq!(from_body(&json!({"text": "x"})), TokenUsage::default());
    }

    #[test]
    fn test_headers_take_precedence() {
        let headers = TokenUsage {
            input_tokens: Some(5),
            output_tokens: None,
        };
        let body = TokenUsage {
            input_tokens: Some(50),
            output_tokens: Some(60),
        };
        assert_eq!(
            headers.or(body),
            TokenUsage {
                input_tokens: Some(5),
                output_tokens: Some(60),
            }
        );
    }

    #[test]
    fn test_metrics_serialize_rounded() {
        let metrics = InvocationMetrics {
            latency: Duration::from_millis(1234),
            tokens_in: 100,
            tokens_out: 50,
            cost_estimate: 0.00105,
        };
        let value = serde_json::to_value(metrics).unwrap();
        assert_eq!(value["latency_s"], 1.23);
        assert_eq!(value["cost_est_usd"], 0.00105);
        assert!(metrics.to_string().starts_with("latency 1.23s"));
    }
}
