//! Prompt texts, loaded from `templates/` at compile time.
//!
//! User templates carry `{{DESCRIPTION}}`, `{{SCHEMA}}`, `{{EXAMPLE}}` and
//! `{{UNIT_RULES}}` placeholders filled by [`user_text`] and [`image_text`].

use super::PromptVersion;
use crate::model::{dish_json_schema, example_dish, SchemaPolicy};

pub const SYSTEM_INSTRUCTIONS: &str = include_str!("templates/system.txt");
pub const SYSTEM_INSTRUCTIONS_BILINGUAL: &str = include_str!("templates/system_bilingual.txt");
pub const SYSTEM_INSTRUCTIONS_IMAGE: &str = include_str!("templates/system_image.txt");

/// Quantity/unit separation heuristics shared by every prompt
pub const UNIT_RULES: &str = include_str!("templates/unit_rules.txt");

const LEGACY_TEMPLATE: &str = include_str!("templates/legacy.txt");
const TERSE_TEMPLATE: &str = include_str!("templates/terse.txt");
const BILINGUAL_TEMPLATE: &str = include_str!("templates/bilingual.txt");
const CLASSIFIED_TEMPLATE: &str = include_str!("templates/classified.txt");
const IMAGE_TEMPLATE: &str = include_str!("templates/image.txt");
const CLASSIFIED_IMAGE_TEMPLATE: &str = include_str!("templates/classified_image.txt");

pub fn system_instructions(version: PromptVersion) -> &'static str {
    match version {
        PromptVersion::Bilingual => SYSTEM_INSTRUCTIONS_BILINGUAL,
        _ => SYSTEM_INSTRUCTIONS,
    }
}

fn fill(template: &str, description: &str, policy: SchemaPolicy) -> String {
    // serde_json never fails to serialize a Value or a derived struct of strings
    let schema = serde_json::to_string(&dish_json_schema(policy)).unwrap_or_default();
    let example = serde_json::to_string(&example_dish()).unwrap_or_default();

    template
        .replace("{{UNIT_RULES}}", UNIT_RULES.trim_end())
        .replace("{{SCHEMA}}", &schema)
        .replace("{{EXAMPLE}}", &example)
        .replace("{{DESCRIPTION}}", description.trim())
        .trim()
        .to_string()
}

/// User message for a text description
pub fn user_text(version: PromptVersion, description: &str, policy: SchemaPolicy) -> String {
    let template = match version {
        PromptVersion::Legacy => LEGACY_TEMPLATE,
        PromptVersion::Terse => TERSE_TEMPLATE,
        PromptVersion::Bilingual => BILINGUAL_TEMPLATE,
        PromptVersion::Classified => CLASSIFIED_TEMPLATE,
    };
    fill(template, description, policy)
}

/// User message accompanying an image: identify the dish, then list its ingredients.
///
/// The classified version first asks whether the photo shows a dish, a bare
/// ingredient or no food at all; every other version uses the two-step prompt.
pub fn image_text(version: PromptVersion, description: &str, policy: SchemaPolicy) -> String {
    let template = match version {
        PromptVersion::Classified => CLASSIFIED_IMAGE_TEMPLATE,
        _ => IMAGE_TEMPLATE,
    };
    fill(template, description, policy)
}
