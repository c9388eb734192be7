use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::error::ExtractError;

/// Canonical text-bearing wrapper every backend payload is reduced to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEnvelope {
    pub text: String,
}

/// Known backend response shapes, listed in decoding precedence order.
///
/// Backend families share field names (`output`, `text`, ...), so the order
/// in [`PRECEDENCE`] is part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"content": [{"type": "text", "text": ...}]}` (Claude messages)
    ContentList,
    /// `{"output": {"message": {"content": [{"text": ...}]}}}` (Nova messages-v1)
    NovaMessage,
    /// `{"results": [{"outputText": ...}]}` (Titan)
    TitanResults,
    /// `{"outputText": ...}` at the root
    OutputText,
    /// `{"generation": ...}` (Llama)
    Generation,
    /// One of the generic string keys
    Generic(&'static str),
}

pub const PRECEDENCE: [ResponseShape; 9] = [
    ResponseShape::ContentList,
    ResponseShape::NovaMessage,
    ResponseShape::TitanResults,
    ResponseShape::OutputText,
    ResponseShape::Generation,
    ResponseShape::Generic("result"),
    ResponseShape::Generic("output"),
    ResponseShape::Generic("completion"),
    ResponseShape::Generic("text"),
];

fn trimmed(value: &Value) -> Option<String> {
    value.as_str().map(|s| s.trim().to_string())
}

fn decode_content_list(raw: &Value) -> Option<String> {
    let first = raw.get("content")?.as_array()?.first()?;
    if first.get("type")?.as_str()? != "text" {
        return None;
    }
    Some(first.get("text").and_then(trimmed).unwrap_or_default())
}

fn decode_nova_message(raw: &Value) -> Option<String> {
    trimmed(raw.get("output")?.get("message")?.get("content")?.get(0)?.get("text")?)
}

fn decode_titan_results(raw: &Value) -> Option<String> {
    trimmed(raw.get("results")?.get(0)?.get("outputText")?)
}

fn decode_root_key(raw: &Value, key: &str) -> Option<String> {
    trimmed(raw.get(key)?)
}

impl ResponseShape {
    /// Read the trimmed text out of `raw` assuming this shape.
    ///
    /// Returns `Some("")` when the shape is present but its text is blank.
    pub fn decode(self, raw: &Value) -> Option<String> {
        match self {
            ResponseShape::ContentList => decode_content_list(raw),
            ResponseShape::NovaMessage => decode_nova_message(raw),
            ResponseShape::TitanResults => decode_titan_results(raw),
            ResponseShape::OutputText => decode_root_key(raw, "outputText"),
            ResponseShape::Generation => decode_root_key(raw, "generation"),
            ResponseShape::Generic(key) => decode_root_key(raw, key),
        }
    }
}

/// First shape in precedence order that yields non-blank text
pub fn detect_shape(raw: &Value) -> Option<(ResponseShape, String)> {
    PRECEDENCE.iter().find_map(|shape| {
        shape
            .decode(raw)
            .filter(|text| !text.is_empty())
            .map(|text| (*shape, text))
    })
}

/// Whether some known shape is present but carries only blank text
fn has_blank_shape(raw: &Value) -> bool {
    PRECEDENCE
        .iter()
        .any(|shape| shape.decode(raw).is_some_and(|text| text.is_empty()))
}

/// Reduce a raw backend payload to a [`NormalizedEnvelope`].
///
/// Unknown shapes are stringified whole. Empty, `null` and `{}` texts, and
/// known shapes whose text is blank, are rejected with
/// [`ExtractError::EmptyOrUnsupportedResponse`].
pub fn normalize(raw: &Value) -> Result<NormalizedEnvelope, ExtractError> {
    if let Some(keys) = raw.as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()) {
        debug!("Normalizing payload with keys: {:?}", keys);
    }

    let text = match detect_shape(raw) {
        Some((shape, text)) => {
            info!("Extracted response text via {:?}", shape);
            text
        }
        None if has_blank_shape(raw) => {
            warn!("Response text field is present but blank");
            return Err(ExtractError::EmptyOrUnsupportedResponse { raw: raw.clone() });
        }
        None => {
            warn!("No specific field matched; using JSON stringify fallback");
            if raw.is_null() {
                String::new()
            } else {
                raw.to_string()
            }
        }
    };

    if matches!(text.trim(), "" | "null" | "{}") {
        return Err(ExtractError::EmptyOrUnsupportedResponse { raw: raw.clone() });
    }

    Ok(NormalizedEnvelope { text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_claude_content_list() {
        let raw = json!({"content": [{"type": "text", "text": " {\"a\":1} "}]});
        assert_eq!(normalize(&raw).unwrap().text, "{\"a\":1}");
    }

    #[test]
    fn test_nova_message() {
        let raw = json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "{}x"}]}},
            "usage": {"inputTokens": 10, "outputTokens": 4}
        });
        assert_eq!(detect_shape(&raw).unwrap().0, ResponseShape::NovaMessage);
        assert_eq!(normalize(&raw).unwrap().text, "{}x");
    }

    #[test]
    fn test_titan_beats_generation() {
        let raw = json!({
            "results": [{"outputText": "from titan"}],
            "generation": "from llama"
        });
        let (shape, text) = detect_shape(&raw).unwrap();
        assert_eq!(shape, ResponseShape::TitanResults);
        assert_eq!(text, "from titan");
    }

    #[test]
    fn test_llama_generation() {
        let raw = json!({"generation": "{\"dish_name\":\"Bún bò\"}", "stop_reason": "stop"});
        assert_eq!(detect_shape(&raw).unwrap().0, ResponseShape::Generation);
    }

    #[test]
    fn test_generic_keys_in_order() {
        let raw = json!({"text": "last", "completion": "first"});
        let (shape, text) = detect_shape(&raw).unwrap();
        assert_eq!(shape, ResponseShape::Generic("completion"));
        assert_eq!(text, "first");
    }

    #[test]
    fn test_object_output_is_not_generic_text() {
        // Nova's `output` is an object; without a message it must not match the generic key
        let raw = json!({"output": {"other": 1}, "text": "fallback"});
        assert_eq!(normalize(&raw).unwrap().text, "fallback");
    }

    #[test]
    fn test_blank_fields_fall_through() {
        let raw = json!({"outputText": "   ", "generation": "ok"});
        assert_eq!(normalize(&raw).unwrap().text, "ok");
    }

    #[test]
    fn test_stringify_fallback() {
        let raw = json!({"answer": {"dish_name": "Gỏi cuốn"}});
        let envelope = normalize(&raw).unwrap();
        assert!(envelope.text.contains("Gỏi cuốn"));
    }

    #[test]
    fn test_empty_output_text_rejected() {
        let err = normalize(&json!({"outputText": ""})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyOrUnsupportedResponse);
    }

    #[test]
    fn test_empty_content_text_rejected() {
        let raw = json!({"content": [{"type": "text", "text": ""}]});
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyOrUnsupportedResponse);
    }

    #[test]
    fn test_null_and_empty_object_rejected() {
        assert!(normalize(&Value::Null).is_err());
        assert!(normalize(&json!({})).is_err());
    }
}
