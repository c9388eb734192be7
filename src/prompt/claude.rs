use serde_json::{json, Value};

use super::instructions::SYSTEM_INSTRUCTIONS_IMAGE;
use super::{ImageInput, PromptInput};

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

pub(super) fn text_body(system: &str, user_text: &str, input: &PromptInput<'_>) -> Value {
    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "system": system,
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": user_text}]}
        ],
        "temperature": input.temperature,
        "max_tokens": input.max_tokens,
    })
}

pub(super) fn image_body(user_text: &str, image: &ImageInput, input: &PromptInput<'_>) -> Value {
    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "system": SYSTEM_INSTRUCTIONS_IMAGE,
        "messages": [
            {
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": image.media_type(),
                            "data": image.to_base64(),
                        }
                    },
                    {"type": "text", "text": user_text}
                ]
            }
        ],
        "temperature": input.temperature,
        "max_tokens": input.max_tokens,
    })
}
