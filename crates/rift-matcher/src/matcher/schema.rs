//! JSON schema validation for schema patterns and schema bodies.
//!
//! Request values such as headers and path segments always arrive as text,
//! so schema patterns first coerce the text into the JSON type the schema
//! declares (`"1"` becomes `1` under `type: integer`) and then validate.

use super::difference::{error_list, mismatch_because};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A JSON schema with its validator built once.
pub struct CompiledSchema {
    schema: Value,
    validator: Result<jsonschema::Validator, String>,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .field("valid", &self.validator.is_ok())
            .finish()
    }
}

impl CompiledSchema {
    /// Build the validator. An invalid schema does not fail compilation; it
    /// makes every validation fail with the schema error instead.
    pub fn compile(schema: &Value) -> Self {
        let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string());
        if let Err(error) = &validator {
            warn!("Invalid JSON schema {}: {}", schema, error);
        }
        Self {
            schema: schema.clone(),
            validator,
        }
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Why the schema could not be compiled, if it could not.
    pub fn compile_error(&self) -> Option<&str> {
        self.validator.as_ref().err().map(String::as_str)
    }

    pub fn is_array(&self) -> bool {
        declared_types(&self.schema).contains(&"array")
    }

    /// Validate a JSON document, returning one message per violation.
    pub fn validate(&self, instance: &Value) -> Vec<String> {
        match &self.validator {
            Ok(validator) => validator
                .iter_errors(instance)
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("field: \"{path}\" has error: \"{error}\"")
                    }
                })
                .collect(),
            Err(error) => vec![format!("schema is invalid: {error}")],
        }
    }

    /// Validate a single text value after coercing it to the declared type.
    pub fn validate_text(&self, raw: &str) -> Vec<String> {
        self.validate(&coerce(&self.schema, raw))
    }

    /// Validate several text values as one array against an array schema.
    pub fn validate_items(&self, raw: &[&str]) -> Vec<String> {
        let items = self.schema.get("items").unwrap_or(&Value::Null);
        let array = Value::Array(raw.iter().map(|value| coerce(items, value)).collect());
        self.validate(&array)
    }

    pub fn is_valid_text(&self, raw: &str) -> bool {
        self.validate_text(raw).is_empty()
    }

    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.schema).unwrap_or_else(|_| self.schema.to_string())
    }

    /// The `json schema match failed` difference text.
    pub fn failure(&self, found: &str, errors: &[String]) -> String {
        mismatch_because("json schema", &self.pretty(), found, &error_list(errors))
    }
}

/// Types named by the schema's `type` keyword.
pub fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(kind)) => vec![kind.as_str()],
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn is_nullable(schema: &Value) -> bool {
    schema.get("nullable").and_then(Value::as_bool) == Some(true)
        || declared_types(schema).contains(&"null")
}

fn has_string_keywords(schema: &Value) -> bool {
    ["pattern", "minLength", "maxLength", "format"]
        .iter()
        .any(|keyword| schema.get(keyword).is_some())
}

/// Convert a text value into the JSON value the schema expects.
///
/// Text that cannot be converted stays a string so validation reports the
/// type mismatch.
pub fn coerce(schema: &Value, raw: &str) -> Value {
    if raw.is_empty() && is_nullable(schema) {
        return Value::Null;
    }
    let types = declared_types(schema);

    for kind in &types {
        match *kind {
            "integer" => {
                if let Ok(integer) = raw.parse::<i64>() {
                    return Value::from(integer);
                }
            }
            "number" => {
                if let Ok(integer) = raw.parse::<i64>() {
                    return Value::from(integer);
                }
                if let Some(number) = raw
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    return Value::Number(number);
                }
            }
            "boolean" => match raw {
                "true" => return Value::Bool(true),
                "false" => return Value::Bool(false),
                _ => {}
            },
            "null" if raw == "null" => return Value::Null,
            "object" | "array" => {
                if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                    if (*kind == "object" && parsed.is_object())
                        || (*kind == "array" && parsed.is_array())
                    {
                        return parsed;
                    }
                }
            }
            "string" => return Value::String(raw.to_string()),
            _ => {}
        }
    }

    if types.is_empty() && !has_string_keywords(schema) {
        if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
            return parsed;
        }
    }
    Value::String(raw.to_string())
}
