//! Conversion of XML and form bodies into JSON for schema validation.
//!
//! Conversion is guided by the schema where it can be: a property declared
//! as an array always becomes an array, and leaf text is coerced to the
//! declared type. Without schema guidance leaf text is coerced to boolean,
//! integer or number when it parses as one.

use super::xml::{child_elements, parse, root_element, text_content};
use crate::matcher::schema::{coerce, declared_types};
use crate::model::{MultiValueMap, ParameterStyle};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use sxd_document::dom::Element;

/// Convert an XML document to the JSON value of its document element.
pub fn xml_to_json(text: &str, schema: &Value) -> Result<Value, String> {
    let package = parse(text)?;
    let document = package.as_document();
    let root = root_element(&document).ok_or_else(|| "document element missing".to_string())?;
    Ok(element_to_json(root, schema))
}

fn element_to_json(element: Element<'_>, schema: &Value) -> Value {
    let children = child_elements(element);
    let attributes = element.attributes();
    if children.is_empty() && attributes.is_empty() {
        return leaf(schema, &text_content(element));
    }

    let mut object = Map::new();
    for attribute in attributes {
        let name = attribute.name().local_part();
        object.insert(
            name.to_string(),
            leaf(property_schema(schema, name), attribute.value()),
        );
    }

    let mut grouped: Vec<(String, Vec<Element<'_>>)> = Vec::new();
    for child in children {
        let name = child.name().local_part().to_string();
        match grouped.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, elements)) => elements.push(child),
            None => grouped.push((name, vec![child])),
        }
    }
    for (name, elements) in grouped {
        let property = property_schema(schema, &name);
        let is_array = declared_types(property).contains(&"array");
        let item_schema = if is_array {
            property.get("items").unwrap_or(&Value::Null)
        } else {
            property
        };
        let mut values: Vec<Value> = elements
            .into_iter()
            .map(|child| element_to_json(child, item_schema))
            .collect();
        let value = if values.len() == 1 && !is_array {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        object.insert(name, value);
    }
    Value::Object(object)
}

/// Convert form parameters to a JSON object.
///
/// Values are split by their declared style first; a key with one value
/// becomes a scalar unless the schema declares an array.
pub fn form_to_json(
    parameters: &MultiValueMap,
    schema: &Value,
    styles: &BTreeMap<String, ParameterStyle>,
) -> Value {
    let mut object = Map::new();
    for entry in &parameters.entries {
        let name = entry.name.value.as_text().into_owned();
        let property = property_schema(schema, &name);
        let is_array = declared_types(property).contains(&"array");
        let item_schema = if is_array {
            property.get("items").unwrap_or(&Value::Null)
        } else {
            property
        };

        let mut raw: Vec<String> = Vec::new();
        for value in &entry.values {
            let text = value.value.as_text();
            match styles.get(&name) {
                Some(style) => raw.extend(style.split(&text)),
                None => raw.push(text.into_owned()),
            }
        }
        let mut values: Vec<Value> = raw.iter().map(|value| leaf(item_schema, value)).collect();
        let value = match values.len() {
            1 if !is_array => values.remove(0),
            0 if !is_array => Value::String(String::new()),
            _ => Value::Array(values),
        };
        object.insert(name, value);
    }
    Value::Object(object)
}

fn property_schema<'a>(schema: &'a Value, name: &str) -> &'a Value {
    schema
        .get("properties")
        .and_then(|properties| properties.get(name))
        .unwrap_or(&Value::Null)
}

fn leaf(schema: &Value, text: &str) -> Value {
    if !declared_types(schema).is_empty() {
        return coerce(schema, text);
    }
    if let Ok(value) = text.parse::<bool>() {
        return Value::Bool(value);
    }
    if let Ok(value) = text.parse::<i64>() {
        return Value::from(value);
    }
    if let Some(number) = text
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(number);
    }
    Value::String(text.to_string())
}
