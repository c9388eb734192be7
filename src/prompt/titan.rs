use serde_json::{json, Value};

use super::{PromptInput, DEFAULT_TOP_P};

pub(super) fn text_body(system: &str, user_text: &str, input: &PromptInput<'_>) -> Value {
    json!({
        "inputText": format!("{}\n\n{}", system.trim_end(), user_text),
        "textGenerationConfig": {
            "temperature": input.temperature,
            "topP": DEFAULT_TOP_P,
            "maxTokenCount": input.max_tokens,
            "stopSequences": [],
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_generation_config() {
        let input = PromptInput {
            description: "cơm tấm",
            image: None,
            temperature: 0.0,
            max_tokens: 1024,
        };
        let body = text_body("sys", "user", &input);

        assert_eq!(body["inputText"], "sys\n\nuser");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 1024);
        assert_eq!(body["textGenerationConfig"]["stopSequences"], json!([]));
    }
}
