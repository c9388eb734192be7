use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single ingredient line of a dish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name, kept in the language the model answered in
    pub name: String,
    /// Numeric literal such as "200" or "0.5", never carries a unit
    pub quantity: String,
    /// Unit token ("g", "ml", "củ", "nhánh", ...) or `None` when unknown
    #[serde(default)]
    pub unit: Option<String>,
}

/// The validated extraction result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dish {
    #[serde(default)]
    pub dish_name: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub notes: Option<Vec<String>>,
}

/// How strict the validator is about empty results.
///
/// Two schema revisions of the dish record exist: the lenient one accepts a
/// record with no dish name and an empty ingredient list, the strict one
/// requires both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    #[default]
    Lenient,
    RequireIngredients,
}

impl SchemaPolicy {
    pub fn requires_ingredients(&self) -> bool {
        matches!(self, SchemaPolicy::RequireIngredients)
    }

    pub fn requires_dish_name(&self) -> bool {
        matches!(self, SchemaPolicy::RequireIngredients)
    }
}

/// JSON Schema of [`Dish`], embedded verbatim in every prompt
pub fn dish_json_schema(policy: SchemaPolicy) -> Value {
    let mut schema = json!({
        "title": "Dish",
        "type": "object",
        "$defs": {
            "Ingredient": {
                "title": "Ingredient",
                "type": "object",
                "properties": {
                    "name": {"type": "string", "minLength": 1, "description": "Tên nguyên liệu"},
                    "quantity": {"type": "string", "minLength": 1, "description": "Định lượng dạng số"},
                    "unit": {"anyOf": [{"type": "string"}, {"type": "null"}], "default": null, "description": "Đơn vị nếu tách được"}
                },
                "required": ["name", "quantity"]
            }
        },
        "properties": {
            "dish_name": {"anyOf": [{"type": "string"}, {"type": "null"}], "default": null},
            "cuisine": {"anyOf": [{"type": "string"}, {"type": "null"}], "default": null},
            "ingredients": {"type": "array", "items": {"$ref": "#/$defs/Ingredient"}, "minItems": 0},
            "notes": {"anyOf": [{"type": "array", "items": {"type": "string"}}, {"type": "null"}], "default": null}
        }
    });

    if policy.requires_ingredients() {
        schema["properties"]["dish_name"] = json!({"type": "string", "minLength": 1});
        schema["properties"]["ingredients"]["minItems"] = json!(1);
        schema["required"] = json!(["dish_name", "ingredients"]);
    }

    schema
}

/// The Phở bò sample used as the few-shot example in prompts
pub fn example_dish() -> Dish {
    let ingredient = |name: &str, quantity: &str, unit: &str| Ingredient {
        name: name.to_string(),
        quantity: quantity.to_string(),
        unit: Some(unit.to_string()),
    };

    Dish {
        dish_name: Some("Phở bò".to_string()),
        cuisine: Some("Vietnamese".to_string()),
        ingredients: vec![
            ingredient("bánh phở", "200", "g"),
            ingredient("thịt bò thăn", "250", "g"),
            ingredient("hành lá", "2", "nhánh"),
            ingredient("quế", "1", "thanh"),
            ingredient("gừng", "1", "củ"),
            ingredient("rau mùi", "1", "ít"),
        ],
        notes: Some(vec!["Định lượng có thể thay đổi theo khẩu vị".to_string()]),
    }
}
