//! Local `$ref` resolution.

use crate::error::SpecError;
use serde_json::{Map, Value};
use tracing::warn;

/// Resolves `#/...` references against one document.
pub struct Resolver<'a> {
    document: &'a Value,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self { document }
    }

    /// Return `value` with every reference replaced by its target.
    ///
    /// Keys next to a `$ref` override the keys of the target. A reference
    /// back into its own chain resolves to `{}`.
    pub fn resolve(&self, value: &Value) -> Result<Value, SpecError> {
        self.resolve_with(value, &mut Vec::new())
    }

    fn resolve_with(&self, value: &Value, chain: &mut Vec<String>) -> Result<Value, SpecError> {
        match value {
            Value::Object(object) => {
                if let Some(Value::String(reference)) = object.get("$ref") {
                    if chain.contains(reference) {
                        warn!("Circular $ref \"{}\" replaced by an empty schema", reference);
                        return Ok(Value::Object(Map::new()));
                    }
                    let target = self
                        .lookup(reference)
                        .ok_or_else(|| SpecError::UnresolvedRef(reference.clone()))?;
                    chain.push(reference.clone());
                    let resolved = self.resolve_with(target, chain);
                    chain.pop();
                    let mut resolved = resolved?;

                    if let Value::Object(target) = &mut resolved {
                        for (key, sibling) in object.iter().filter(|(key, _)| *key != "$ref") {
                            target.insert(key.clone(), self.resolve_with(sibling, chain)?);
                        }
                    }
                    return Ok(resolved);
                }
                let mut resolved = Map::with_capacity(object.len());
                for (key, child) in object {
                    resolved.insert(key.clone(), self.resolve_with(child, chain)?);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_with(item, chain))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    /// Follow a local JSON pointer reference such as `#/components/schemas/Pet`.
    pub fn lookup(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(self.document);
        }
        let mut current = self.document;
        for token in pointer.strip_prefix('/')?.split('/') {
            let token = urlencoding::decode(token).ok()?;
            let token = token.replace("~1", "/").replace("~0", "~");
            current = match current {
                Value::Object(object) => object.get(&token)?,
                Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_resolves_nested_references() {
        let document = json!({
            "components": {
                "schemas": {
                    "Id": {"type": "integer", "minimum": 1},
                    "Pet": {"type": "object", "properties": {"id": {"$ref": "#/components/schemas/Id"}}}
                }
            }
        });
        let resolver = Resolver::new(&document);
        let resolved = resolver.resolve(&json!({"$ref": "#/components/schemas/Pet"})).unwrap();
        assert_eq!(
            resolved,
            json!({"type": "object", "properties": {"id": {"type": "integer", "minimum": 1}}})
        );
    }

    #[test]
    fn test_sibling_keys_override_target() {
        let document = json!({"components": {"schemas": {"Name": {"type": "string", "maxLength": 5}}}});
        let resolved = Resolver::new(&document)
            .resolve(&json!({"$ref": "#/components/schemas/Name", "maxLength": 10}))
            .unwrap();
        assert_eq!(resolved, json!({"type": "string", "maxLength": 10}));
    }

    #[test]
    fn test_escaped_pointer_tokens() {
        let document = json!({"paths": {"/pets/{id}": {"get": {"operationId": "getPet"}}}});
        let resolver = Resolver::new(&document);
        assert_eq!(
            resolver.lookup("#/paths/~1pets~1%7Bid%7D/get/operationId"),
            Some(&json!("getPet"))
        );
    }

    #[test]
    fn test_missing_and_external_references() {
        let document = json!({});
        let resolver = Resolver::new(&document);
        assert_eq!(
            resolver.resolve(&json!({"$ref": "#/components/schemas/Missing"})),
            Err(SpecError::UnresolvedRef("#/components/schemas/Missing".to_string()))
        );
        assert!(matches!(
            resolver.resolve(&json!({"$ref": "other.yaml#/Pet"})),
            Err(SpecError::UnresolvedRef(_))
        ));
    }

    #[test]
    #[traced_test]
    fn test_circular_reference_becomes_empty_schema() {
        let document = json!({
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {"next": {"$ref": "#/components/schemas/Node"}}
            }}}
        });
        let resolved = Resolver::new(&document)
            .resolve(&json!({"$ref": "#/components/schemas/Node"}))
            .unwrap();
        assert_eq!(resolved["properties"]["next"], json!({}));
        assert!(logs_contain("Circular $ref \"#/components/schemas/Node\""));
    }
}
