use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{RawResponse, Transport};
use crate::error::ExtractError;
use crate::model::{example_dish, Dish, Ingredient};

const QUOTE: &str = "\"\"\"";

/// Offline transport answering every call with a fixed Claude-shaped dish
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedTransport;

impl CannedTransport {
    pub fn new() -> Self {
        CannedTransport
    }

    fn dish_for(description: &str) -> Dish {
        if description.to_lowercase().contains("phở") {
            return example_dish();
        }

        Dish {
            dish_name: Some("Món ăn".to_string()),
            cuisine: Some("Việt Nam".to_string()),
            ingredients: vec![
                Ingredient {
                    name: "thịt".to_string(),
                    quantity: "200".to_string(),
                    unit: Some("g".to_string()),
                },
                Ingredient {
                    name: "hành lá".to_string(),
                    quantity: "1".to_string(),
                    unit: Some("ít".to_string()),
                },
            ],
            notes: None,
        }
    }
}

/// Text between the first pair of triple quotes found in any string of the body
fn quoted_description(body: &Value) -> Option<String> {
    match body {
        Value::String(s) => {
            let start = s.find(QUOTE)? + QUOTE.len();
            let end = s[start..].find(QUOTE)? + start;
            Some(s[start..end].to_string())
        }
        Value::Array(items) => items.iter().find_map(quoted_description),
        Value::Object(map) => map.values().find_map(quoted_description),
        _ => None,
    }
}

#[async_trait]
impl Transport for CannedTransport {
    fn name(&self) -> &str {
        "canned"
    }

    async fn invoke(&self, _model_id: &str, body: &Value) -> Result<RawResponse, ExtractError> {
        let description = quoted_description(body).unwrap_or_default();
        let dish = Self::dish_for(&description);
        let text = serde_json::to_string(&dish).map_err(|e| ExtractError::InvalidResponse {
            message: e.to_string(),
            body: String::new(),
        })?;

        let payload = json!({
            "id": "msg_mock",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 0, "output_tokens": 0}
        });

        Ok(RawResponse {
            status: 200,
            body: payload.to_string(),
            headers: HashMap::new(),
        })
    }

    async fn count_tokens(&self, _model_id: &str, _body: &Value) -> Result<u64, ExtractError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_description_searches_nested_strings() {
        let body = json!({
            "system": "no quotes here",
            "messages": [{"content": [{"type": "text", "text": "Mô tả: \"\"\"Phở bò tái\"\"\""}]}]
        });
        assert_eq!(quoted_description(&body).as_deref(), Some("Phở bò tái"));
        assert_eq!(quoted_description(&json!({"prompt": "\"\"\"open"})), None);
    }

    #[tokio::test]
    async fn test_canned_pho() {
        let body = json!({"inputText": "\"\"\"PHỞ gà\"\"\""});
        let response = CannedTransport::new()
            .invoke("amazon.titan-text-lite-v1", &body)
            .await
            .unwrap();

        let payload: Value = serde_json::from_str(&response.body).unwrap();
        let dish: Dish =
            serde_json::from_str(payload["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(dish.dish_name.as_deref(), Some("Phở bò"));
        assert!(dish
            .ingredients
            .iter()
            .all(|i| i.quantity.parse::<f64>().is_ok()));
    }

    #[tokio::test]
    async fn test_canned_generic_dish() {
        let body = json!({"prompt": "\"\"\"bún chả\"\"\""});
        let response = CannedTransport::new().invoke("x", &body).await.unwrap();
        assert!(response.body.contains("Món ăn"));
        assert_eq!(CannedTransport::new().count_tokens("x", &body).await.unwrap(), 0);
    }
}
