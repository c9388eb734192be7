mod claude;
pub mod instructions;
mod llama;
mod nova;
mod titan;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::SchemaPolicy;

pub const DEFAULT_TOP_P: f64 = 0.9;

/// A class of hosted models sharing one request/response wire shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendFamily {
    /// Messages API with a `system` field (the default)
    Claude,
    /// Single `inputText` with an `inferenceConfig` block; messages-v1 for images
    Nova,
    /// Single `inputText` with a `textGenerationConfig` block
    Titan,
    /// Raw chat-templated prompt with top-level sampling fields
    Llama,
}

/// Routing table: the first keyword found in the lowercased model id wins
pub const ROUTES: [(&str, BackendFamily); 3] = [
    ("nova", BackendFamily::Nova),
    ("titan", BackendFamily::Titan),
    ("llama", BackendFamily::Llama),
];

pub const DEFAULT_FAMILY: BackendFamily = BackendFamily::Claude;

/// Select the backend family for a model id. Total: unknown ids map to Claude.
pub fn route(model_id: &str) -> BackendFamily {
    let id = model_id.trim().to_lowercase();
    ROUTES
        .iter()
        .find(|(keyword, _)| id.contains(keyword))
        .map(|(_, family)| *family)
        .unwrap_or(DEFAULT_FAMILY)
}

/// Prompt strategy for text requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVersion {
    /// Long Vietnamese prompt with full formatting rules (v0)
    #[default]
    Legacy,
    /// Short instruction set (v1)
    Terse,
    /// Vietnamese and English instructions side by side (v2)
    Bilingual,
    /// Asks the model to classify the input as dish, ingredient or neither (v3)
    Classified,
}

impl PromptVersion {
    pub fn from_number(version: u8) -> Option<Self> {
        match version {
            0 => Some(PromptVersion::Legacy),
            1 => Some(PromptVersion::Terse),
            2 => Some(PromptVersion::Bilingual),
            3 => Some(PromptVersion::Classified),
            _ => None,
        }
    }
}

/// Image bytes plus the MIME type they were uploaded with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Format token derived from the MIME type, `png` when unrecognized
    pub fn format(&self) -> &'static str {
        let mime = self.mime.trim().to_lowercase();
        match mime.strip_prefix("image/").unwrap_or(&mime) {
            "jpeg" | "jpg" | "pjpeg" => "jpeg",
            "webp" => "webp",
            "gif" => "gif",
            _ => "png",
        }
    }

    /// MIME type matching [`ImageInput::format`]
    pub fn media_type(&self) -> String {
        format!("image/{}", self.format())
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Caller-supplied input for one request
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub description: &'a str,
    pub image: Option<&'a ImageInput>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Family-specific JSON request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendRequest {
    pub family: BackendFamily,
    pub body: Value,
}

impl BackendRequest {
    /// Top-level keys of the body, for logging
    pub fn keys(&self) -> Vec<&str> {
        self.body
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Build the request body for `model_id`.
///
/// Image requests go to the Nova multimodal body for Nova models and to the
/// Claude multimodal body otherwise. For images `version` only decides
/// between the two-step and the classifying prompt.
pub fn build_request(
    model_id: &str,
    input: &PromptInput<'_>,
    version: PromptVersion,
    policy: SchemaPolicy,
) -> BackendRequest {
    let family = route(model_id);
    info!("Building {:?} prompt for model: {} ({:?})", family, model_id, version);

    let body = match input.image {
        Some(image) => {
            let text = instructions::image_text(version, input.description, policy);
            debug!("Image request: {} bytes, format {}", image.bytes.len(), image.format());
            match family {
                BackendFamily::Nova => nova::image_body(&text, image, input),
                _ => claude::image_body(&text, image, input),
            }
        }
        None => {
            let system = instructions::system_instructions(version);
            let text = instructions::user_text(version, input.description, policy);
            match family {
                BackendFamily::Claude => claude::text_body(system, &text, input),
                BackendFamily::Nova => nova::text_body(system, &text, input),
                BackendFamily::Titan => titan::text_body(system, &text, input),
                BackendFamily::Llama => llama::text_body(system, &text, input),
            }
        }
    };

    let family = match (input.image, family) {
        (Some(_), BackendFamily::Nova) => BackendFamily::Nova,
        (Some(_), _) => BackendFamily::Claude,
        (None, family) => family,
    };

    BackendRequest { family, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_input(description: &str) -> PromptInput<'_> {
        PromptInput {
            description,
            image: None,
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    #[test]
    fn test_route_known_families() {
        assert_eq!(route("amazon.nova-lite-v1:0"), BackendFamily::Nova);
        assert_eq!(route("amazon.titan-text-lite-v1"), BackendFamily::Titan);
        assert_eq!(route("meta.llama3-8b-instruct-v1:0"), BackendFamily::Llama);
        assert_eq!(
            route("anthropic.claude-3-5-sonnet-20240620-v1:0"),
            BackendFamily::Claude
        );
    }

    #[test]
    fn test_route_fallback_and_case() {
        assert_eq!(route(""), BackendFamily::Claude);
        assert_eq!(route("ai21.jamba-1-5-mini-v1:0"), BackendFamily::Claude);
        assert_eq!(route("  US.AMAZON.NOVA-PRO-V1:0 "), BackendFamily::Nova);
        assert_eq!(route("Meta.Llama3"), BackendFamily::Llama);
    }

    #[test]
    fn test_route_precedence() {
        // "nova" is listed before "llama"
        assert_eq!(route("llama-nova-merge"), BackendFamily::Nova);
        assert_eq!(route("titan-llama"), BackendFamily::Titan);
    }

    #[test]
    fn test_route_is_stable_across_calls() {
        let ids = ["amazon.nova-pro-v1:0", "x", "meta.llama3", "amazon.titan-text-express-v1"];
        let first: Vec<_> = ids.iter().map(|id| route(id)).collect();
        for _ in 0..3 {
            let again: Vec<_> = ids.iter().rev().map(|id| route(id)).rev().collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_prompt_version_numbers() {
        assert_eq!(PromptVersion::from_number(0), Some(PromptVersion::Legacy));
        assert_eq!(PromptVersion::from_number(3), Some(PromptVersion::Classified));
        assert_eq!(PromptVersion::from_number(4), None);
    }

    #[test]
    fn test_image_format_token() {
        let image = |mime: &str| ImageInput::new(vec![1, 2, 3], mime);
        assert_eq!(image("image/png").format(), "png");
        assert_eq!(image("image/jpeg").format(), "jpeg");
        assert_eq!(image("image/jpg").format(), "jpeg");
        assert_eq!(image("IMAGE/WEBP").format(), "webp");
        assert_eq!(image("image/gif").format(), "gif");
        assert_eq!(image("image/tiff").format(), "png");
        assert_eq!(image("application/octet-stream").format(), "png");
        assert_eq!(image("image/jpg").media_type(), "image/jpeg");
        assert_eq!(image("image/png").to_base64(), "AQID");
    }

    #[test]
    fn test_build_request_per_family() {
        let input = text_input("phở bò");
        let cases = [
            ("anthropic.claude-3-5-haiku", BackendFamily::Claude, "messages"),
            ("amazon.nova-lite-v1:0", BackendFamily::Nova, "inputText"),
            ("amazon.titan-text-lite-v1", BackendFamily::Titan, "textGenerationConfig"),
            ("meta.llama3-8b-instruct-v1:0", BackendFamily::Llama, "prompt"),
        ];

        for (model, family, key) in cases {
            let request =
                build_request(model, &input, PromptVersion::Legacy, SchemaPolicy::Lenient);
            assert_eq!(request.family, family);
            assert!(request.keys().contains(&key), "{model} missing {key}");
        }
    }

    #[test]
    fn test_image_request_routing() {
        let image = ImageInput::new(vec![0xff, 0xd8], "image/jpeg");
        let input = PromptInput {
            description: "",
            image: Some(&image),
            temperature: 0.2,
            max_tokens: 1024,
        };

        let nova = build_request(
            "amazon.nova-pro-v1:0",
            &input,
            PromptVersion::Legacy,
            SchemaPolicy::Lenient,
        );
        assert_eq!(nova.family, BackendFamily::Nova);
        assert_eq!(nova.body["schemaVersion"], "messages-v1");

        let llama = build_request(
            "meta.llama3-8b-instruct-v1:0",
            &input,
            PromptVersion::Terse,
            SchemaPolicy::Lenient,
        );
        assert_eq!(llama.family, BackendFamily::Claude);
        assert_eq!(llama.body["messages"][0]["content"][0]["type"], "image");
    }

    #[test]
    fn test_classified_image_prompt_in_both_multimodal_bodies() {
        let image = ImageInput::new(vec![0x89, 0x50], "image/png");
        let input = PromptInput {
            description: "",
            image: Some(&image),
            temperature: 0.2,
            max_tokens: 1024,
        };

        let claude = build_request(
            "anthropic.claude-3-5-sonnet-20240620-v1:0",
            &input,
            PromptVersion::Classified,
            SchemaPolicy::Lenient,
        );
        let text = claude.body["messages"][0]["content"][1]["text"].as_str().unwrap();
        assert!(text.contains("ảnh chỉ chụp một NGUYÊN LIỆU"));
        assert!(text.contains("classification: ingredient"));

        let nova = build_request(
            "amazon.nova-lite-v1:0",
            &input,
            PromptVersion::Classified,
            SchemaPolicy::Lenient,
        );
        let text = nova.body["messages"][0]["content"][1]["text"].as_str().unwrap();
        assert!(text.contains("ảnh KHÔNG có đồ ăn"));
        assert!(text.contains("classification: dish"));

        let legacy = build_request(
            "amazon.nova-lite-v1:0",
            &input,
            PromptVersion::Legacy,
            SchemaPolicy::Lenient,
        );
        let text = legacy.body["messages"][0]["content"][1]["text"].as_str().unwrap();
        assert!(text.starts_with("Bước 1"));
    }
}
