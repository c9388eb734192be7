use serde_json::{json, Value};

use super::{PromptInput, DEFAULT_TOP_P};

/// Wrap system and user text in the Llama 3 instruct chat template
fn chat_template(system: &str, user_text: &str) -> String {
    format!(
        "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|>\
         <|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|>\
         <|start_header_id|>assistant<|end_header_id|>\n\n",
        system.trim(),
        user_text
    )
}

pub(super) fn text_body(system: &str, user_text: &str, input: &PromptInput<'_>) -> Value {
    json!({
        "prompt": chat_template(system, user_text),
        "temperature": input.temperature,
        "top_p": DEFAULT_TOP_P,
        "max_gen_len": input.max_tokens,
    })
}
