use serde_json::{json, Value};

use super::instructions::SYSTEM_INSTRUCTIONS_IMAGE;
use super::{ImageInput, PromptInput, DEFAULT_TOP_P};

pub(super) fn text_body(system: &str, user_text: &str, input: &PromptInput<'_>) -> Value {
    json!({
        "inputText": format!("{}\n\n{}", system.trim_end(), user_text),
        "inferenceConfig": {
            "temperature": input.temperature,
            "topP": DEFAULT_TOP_P,
            "maxTokenCount": input.max_tokens,
        }
    })
}

/// Nova multimodal request in the messages-v1 schema
pub(super) fn image_body(user_text: &str, image: &ImageInput, input: &PromptInput<'_>) -> Value {
    json!({
        "schemaVersion": "messages-v1",
        "system": [{"text": SYSTEM_INSTRUCTIONS_IMAGE.trim()}],
        "messages": [
            {
                "role": "user",
                "content": [
                    {
                        "image": {
                            "format": image.format(),
                            "source": {"bytes": image.to_base64()}
                        }
                    },
                    {"text": user_text}
                ]
            }
        ],
        "inferenceConfig": {
            "temperature": input.temperature,
            "topP": DEFAULT_TOP_P,
            "maxTokens": input.max_tokens,
        }
    })
}
