//! Known Bedrock models, their display names and per-1K-token prices.

/// Models offered for text descriptions: (model id, display name)
pub const TEXT_MODELS: [(&str, &str); 4] = [
    ("anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet"),
    ("amazon.titan-text-lite-v1", "Titan Text G1 - Lite"),
    ("meta.llama3-8b-instruct-v1:0", "Llama 3 8B"),
    ("us.anthropic.claude-3-5-haiku-20241022-v1:0", "Claude 3.5 Haiku"),
];

/// Models offered for photos: (model id, display name)
pub const IMAGE_MODELS: [(&str, &str); 3] = [
    ("anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet"),
    ("amazon.nova-pro-v1:0", "Amazon Nova Pro"),
    ("amazon.nova-lite-v1:0", "Amazon Nova Lite"),
];

/// USD per 1K (input, output) tokens
const PRICES_PER_1K_IN_OUT: [(&str, (f64, f64)); 7] = [
    ("anthropic.claude-3-5-sonnet-20240620-v1:0", (0.003, 0.015)),
    ("us.anthropic.claude-3-5-haiku-20241022-v1:0", (0.0008, 0.004)),
    ("amazon.nova-lite-v1:0", (0.00006, 0.00024)),
    ("amazon.nova-pro-v1:0", (0.0008, 0.0032)),
    ("amazon.titan-text-lite-v1", (0.00015, 0.0002)),
    ("amazon.titan-text-express-v1", (0.0002, 0.0006)),
    ("meta.llama3-8b-instruct-v1:0", (0.0003, 0.0006)),
];

/// Human-readable name for a model id, falling back to the id itself
pub fn display_name(model_id: &str) -> &str {
    TEXT_MODELS
        .iter()
        .chain(IMAGE_MODELS.iter())
        .find(|(id, _)| *id == model_id)
        .map(|(_, name)| *name)
        .unwrap_or(model_id)
}

/// Suggested output token limit; models that tend to write long answers get more room
pub fn default_max_tokens(model_id: &str, default: u32) -> u32 {
    if model_id.contains("titan-text-lite")
        || model_id.contains("titan-text-express")
        || model_id.contains("claude-3-5-sonnet")
    {
        1024
    } else {
        default
    }
}

/// Per-1K (input, output) prices; unknown models cost nothing
pub fn cost_per_1k(model_id: &str) -> (f64, f64) {
    PRICES_PER_1K_IN_OUT
        .iter()
        .find(|(id, _)| *id == model_id)
        .map(|(_, prices)| *prices)
        .unwrap_or((0.0, 0.0))
}

/// Estimated USD cost, rounded to 6 decimals
pub fn estimate_cost(model_id: &str, tokens_in: u64, tokens_out: u64) -> f64 {
    let (price_in, price_out) = cost_per_1k(model_id);
    let cost = (tokens_in as f64 / 1000.0) * price_in + (tokens_out as f64 / 1000.0) * price_out;
    (cost * 1_000_000.0).round() / 1_000_000.0
}
