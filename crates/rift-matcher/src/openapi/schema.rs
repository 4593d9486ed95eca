//! OpenAPI 3.0 schema objects to JSON schema.
//!
//! OpenAPI 3.0 schemas are almost JSON schema. The differences that matter
//! for validation are `nullable` and the boolean form of
//! `exclusiveMinimum` / `exclusiveMaximum`; both are rewritten here. Other
//! OpenAPI-only keywords (`discriminator`, `xml`, `example`) are unknown to
//! the validator and ignored by it.

use serde_json::{Map, Value};

const SUBSCHEMA_LISTS: [&str; 3] = ["allOf", "anyOf", "oneOf"];
const SUBSCHEMAS: [&str; 3] = ["not", "additionalProperties", "contains"];

/// Convert a resolved OpenAPI schema into an equivalent JSON schema.
pub fn to_json_schema(schema: &Value) -> Value {
    let Value::Object(object) = schema else {
        return schema.clone();
    };
    let mut converted: Map<String, Value> = Map::with_capacity(object.len());
    for (key, value) in object {
        let value = match key.as_str() {
            "properties" | "patternProperties" => match value {
                Value::Object(properties) => Value::Object(
                    properties
                        .iter()
                        .map(|(name, property)| (name.clone(), to_json_schema(property)))
                        .collect(),
                ),
                other => other.clone(),
            },
            "items" => match value {
                Value::Array(items) => Value::Array(items.iter().map(to_json_schema).collect()),
                other => to_json_schema(other),
            },
            key if SUBSCHEMA_LISTS.contains(&key) => match value {
                Value::Array(schemas) => Value::Array(schemas.iter().map(to_json_schema).collect()),
                other => other.clone(),
            },
            key if SUBSCHEMAS.contains(&key) => to_json_schema(value),
            _ => value.clone(),
        };
        converted.insert(key.clone(), value);
    }

    if let Some(nullable) = converted.remove("nullable") {
        if nullable == Value::Bool(true) {
            make_nullable(&mut converted);
        }
    }
    exclusive_bound(&mut converted, "exclusiveMinimum", "minimum");
    exclusive_bound(&mut converted, "exclusiveMaximum", "maximum");
    Value::Object(converted)
}

/// Mark a schema object nullable in OpenAPI terms, before conversion.
pub fn set_nullable(schema: &mut Value) {
    if let Value::Object(object) = schema {
        object.insert("nullable".to_string(), Value::Bool(true));
    }
}

fn make_nullable(schema: &mut Map<String, Value>) {
    match schema.get_mut("type") {
        Some(Value::String(kind)) if kind != "null" => {
            let kind = kind.clone();
            schema.insert(
                "type".to_string(),
                Value::Array(vec![Value::String(kind), Value::String("null".to_string())]),
            );
        }
        Some(Value::Array(kinds)) if !kinds.contains(&Value::String("null".to_string())) => {
            kinds.push(Value::String("null".to_string()));
        }
        _ => {}
    }
    if let Some(Value::Array(values)) = schema.get_mut("enum") {
        if !values.contains(&Value::Null) {
            values.push(Value::Null);
        }
    }
}

fn exclusive_bound(schema: &mut Map<String, Value>, exclusive: &str, inclusive: &str) {
    match schema.get(exclusive) {
        Some(Value::Bool(true)) => match schema.remove(inclusive) {
            Some(bound) => {
                schema.insert(exclusive.to_string(), bound);
            }
            None => {
                schema.remove(exclusive);
            }
        },
        Some(Value::Bool(false)) => {
            schema.remove(exclusive);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nullable() {
        assert_eq!(
            to_json_schema(&json!({"type": "string", "nullable": true, "enum": ["a", "b"]})),
            json!({"type": ["string", "null"], "enum": ["a", "b", null]})
        );
        assert_eq!(
            to_json_schema(&json!({"type": "integer", "nullable": false})),
            json!({"type": "integer"})
        );
    }

    #[test]
    fn test_exclusive_bounds() {
        assert_eq!(
            to_json_schema(&json!({"type": "number", "minimum": 1, "exclusiveMinimum": true, "maximum": 9, "exclusiveMaximum": false})),
            json!({"type": "number", "exclusiveMinimum": 1, "maximum": 9})
        );
        assert_eq!(
            to_json_schema(&json!({"type": "number", "exclusiveMinimum": 3})),
            json!({"type": "number", "exclusiveMinimum": 3})
        );
    }

    #[test]
    fn test_nested_schemas() {
        let converted = to_json_schema(&json!({
            "type": "object",
            "properties": {"tag": {"type": "string", "nullable": true}},
            "additionalProperties": {"type": "integer", "nullable": true},
            "items": {"type": "boolean", "nullable": true},
            "oneOf": [{"type": "number", "nullable": true}]
        }));
        assert_eq!(converted["properties"]["tag"]["type"], json!(["string", "null"]));
        assert_eq!(converted["additionalProperties"]["type"], json!(["integer", "null"]));
        assert_eq!(converted["items"]["type"], json!(["boolean", "null"]));
        assert_eq!(converted["oneOf"][0]["type"], json!(["number", "null"]));
    }

    #[test]
    fn test_properties_named_like_keywords_are_kept() {
        let converted = to_json_schema(&json!({
            "type": "object",
            "properties": {"nullable": {"type": "boolean"}}
        }));
        assert_eq!(converted["properties"]["nullable"], json!({"type": "boolean"}));
    }
}
