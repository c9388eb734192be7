use log::{debug, error};
use serde_json::{Map, Value};

use crate::error::{ExtractError, FieldViolation};
use crate::json_repair::BraceBalance;
use crate::model::{Dish, SchemaPolicy};

const STRING_OR_NULL: &str = "string or null";
const NON_EMPTY_STRING: &str = "non-empty string";

struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn fail(&mut self, field: impl Into<String>, expected: &str, actual: Option<&Value>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            expected: expected.to_string(),
            actual: actual.cloned(),
        });
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, key: &str) {
        match obj.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            other => self.fail(key, STRING_OR_NULL, other),
        }
    }

    fn non_empty_string(&mut self, obj: &Map<String, Value>, path: &str, key: &str) {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            other => self.fail(format!("{path}{key}"), NON_EMPTY_STRING, other),
        }
    }

    fn ingredient(&mut self, index: usize, item: &Value) {
        let path = format!("ingredients[{index}]");
        let Some(obj) = item.as_object() else {
            self.fail(path, "object", Some(item));
            return;
        };

        let prefix = format!("{path}.");
        self.non_empty_string(obj, &prefix, "name");
        self.non_empty_string(obj, &prefix, "quantity");
        match obj.get("unit") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            other => self.fail(format!("{prefix}unit"), STRING_OR_NULL, other),
        }
    }

    fn dish(&mut self, obj: &Map<String, Value>, policy: SchemaPolicy) {
        if policy.requires_dish_name() {
            self.non_empty_string(obj, "", "dish_name");
        } else {
            self.optional_string(obj, "dish_name");
        }
        self.optional_string(obj, "cuisine");

        match obj.get("ingredients") {
            Some(Value::Array(items)) => {
                if items.is_empty() && policy.requires_ingredients() {
                    self.fail("ingredients", "at least one ingredient", obj.get("ingredients"));
                }
                for (index, item) in items.iter().enumerate() {
                    self.ingredient(index, item);
                }
            }
            None if !policy.requires_ingredients() => {}
            other => self.fail("ingredients", "array of ingredients", other),
        }

        match obj.get("notes") {
            None | Some(Value::Null) => {}
            Some(Value::Array(notes)) => {
                for (index, note) in notes.iter().enumerate() {
                    if !note.is_string() {
                        self.fail(format!("notes[{index}]"), "string", Some(note));
                    }
                }
            }
            other => self.fail("notes", "array of strings or null", other),
        }
    }
}

/// Check an already-parsed value against the dish schema, reporting every mismatch
pub fn check_value(value: &Value, policy: SchemaPolicy) -> Vec<FieldViolation> {
    let mut checker = Checker {
        violations: Vec::new(),
    };
    match value.as_object() {
        Some(obj) => checker.dish(obj, policy),
        None => checker.fail("$", "object", Some(value)),
    }
    checker.violations
}

/// Parse `candidate` and validate it into a [`Dish`].
///
/// Validation is all-or-nothing: no partially valid record is returned.
pub fn validate(candidate: &str, policy: SchemaPolicy) -> Result<Dish, ExtractError> {
    let balance = BraceBalance::of(candidate);
    let value: Value = serde_json::from_str(candidate).map_err(|e| {
        if balance.is_balanced() {
            error!("Candidate is not valid JSON: {}", e);
        } else {
            error!("Candidate is not valid JSON ({}): {}", balance, e);
        }
        ExtractError::MalformedJson {
            message: e.to_string(),
            text: candidate.to_string(),
            balance,
            raw: None,
        }
    })?;

    let violations = check_value(&value, policy);
    if !violations.is_empty() {
        debug!("Schema validation found {} violation(s)", violations.len());
        return Err(ExtractError::SchemaViolation {
            violations,
            text: candidate.to_string(),
            balance,
            raw: None,
        });
    }

    serde_json::from_value(value).map_err(|e| ExtractError::SchemaViolation {
        violations: vec![FieldViolation {
            field: "$".to_string(),
            expected: "dish record".to_string(),
            actual: Some(Value::String(e.to_string())),
        }],
        text: candidate.to_string(),
        balance,
        raw: None,
    })
}
