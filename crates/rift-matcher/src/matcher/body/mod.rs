//! Body matching.
//!
//! Dispatch is on the expectation's body kind; the actual body is decoded to
//! text using the charset named by the request's content type, or the
//! configured default.
//!
//! # Module Structure
//!
//! - `json` - JSON document comparison
//! - `xml` - XML parsing, structural comparison and XPath
//! - `xml_schema` - XML Schema validation
//! - `convert` - XML and form bodies to JSON for schema validation

mod convert;
mod json;
mod xml;
mod xml_schema;

pub use convert::{form_to_json, xml_to_json};
pub use xml_schema::XmlSchema;

use super::difference::{error_list, mismatch, mismatch_because, MatchDifference};
use super::multi_value::CompiledMultiValueMap;
use super::pattern::CompiledPattern;
use super::schema::{coerce, CompiledSchema};
use crate::model::{Body, MatchType, MultiValueMap, ParameterStyle, Pattern, RequestBody};
use base64::Engine;
use bytes::Bytes;
use serde_json::Value;
use serde_json_path::JsonPath;
use similar::TextDiff;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
enum CompiledKind {
    Binary(Bytes),
    Json {
        expected: Option<Value>,
        text: String,
        match_type: MatchType,
    },
    JsonSchema {
        schema: Arc<CompiledSchema>,
        parameter_styles: BTreeMap<String, ParameterStyle>,
    },
    JsonPath {
        expression: String,
        path: Result<JsonPath, String>,
    },
    Xml(String),
    XmlSchema {
        source: String,
        schema: Result<XmlSchema, String>,
    },
    XPath(String),
    Regex(CompiledPattern),
    Parameters(CompiledMultiValueMap),
    String {
        value: String,
        sub_string: bool,
    },
}

/// Compiled body matcher.
#[derive(Debug, Clone)]
pub struct CompiledBody {
    source: RequestBody,
    kind: CompiledKind,
    default_charset: String,
}

impl CompiledBody {
    pub fn compile(body: &RequestBody, default_charset: &str) -> Self {
        let kind = match &body.body {
            Body::Binary { bytes, .. } => CompiledKind::Binary(bytes.clone()),
            Body::Json {
                json, match_type, ..
            } => {
                let expected = if json.trim().is_empty() {
                    None
                } else {
                    match serde_json::from_str(json) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            warn!("Invalid JSON body expectation, comparing as text: {}", e);
                            None
                        }
                    }
                };
                CompiledKind::Json {
                    expected,
                    text: json.clone(),
                    match_type: *match_type,
                }
            }
            Body::JsonSchema {
                json_schema,
                parameter_styles,
            } => CompiledKind::JsonSchema {
                schema: Arc::new(CompiledSchema::compile(json_schema)),
                parameter_styles: parameter_styles.clone(),
            },
            Body::JsonPath { json_path } => CompiledKind::JsonPath {
                expression: json_path.clone(),
                path: JsonPath::parse(json_path).map_err(|e| {
                    warn!("Invalid JSON path {:?}: {}", json_path, e);
                    format!("invalid json path: {e}")
                }),
            },
            Body::Xml { xml } => CompiledKind::Xml(xml.clone()),
            Body::XmlSchema { xml_schema } => CompiledKind::XmlSchema {
                source: xml_schema.clone(),
                schema: XmlSchema::parse(xml_schema).map_err(|e| {
                    warn!("Invalid xml schema: {}", e);
                    format!("invalid xml schema: {e}")
                }),
            },
            Body::XPath { xpath } => CompiledKind::XPath(xpath.clone()),
            Body::Regex { regex } => {
                CompiledKind::Regex(CompiledPattern::compile(&Pattern::Regex(regex.clone()), false))
            }
            Body::Parameters { parameters } => {
                CompiledKind::Parameters(CompiledMultiValueMap::compile(parameters, false))
            }
            Body::String {
                string, sub_string, ..
            } => CompiledKind::String {
                value: string.clone(),
                sub_string: *sub_string,
            },
        };
        Self {
            source: body.clone(),
            kind,
            default_charset: default_charset.to_string(),
        }
    }

    pub fn body(&self) -> &RequestBody {
        &self.source
    }

    /// The JSON schema of a `JSON_SCHEMA` body.
    pub fn schema(&self) -> Option<&CompiledSchema> {
        match &self.kind {
            CompiledKind::JsonSchema { schema, .. } => Some(schema),
            _ => None,
        }
    }

    /// Match the actual body.
    ///
    /// `content_type` is the request's `Content-Type`, used for charset
    /// decoding and to pick the conversion before schema validation.
    pub fn matches(
        &self,
        difference: Option<&mut MatchDifference>,
        control_plane: bool,
        content_type: Option<&str>,
        actual: Option<&RequestBody>,
    ) -> bool {
        let actual_not = actual.is_some_and(|actual| actual.not);
        let present = actual.filter(|actual| !actual.body.is_empty());

        if self.source.optional && present.is_none() {
            return !self.source.not ^ actual_not;
        }
        if control_plane && actual.is_some_and(|actual| actual.body == self.source.body) {
            return !self.source.not ^ actual_not;
        }

        // A negated body fails only when the inner body matched, so there is
        // nothing useful to report from the inner evaluation.
        let difference = if self.source.not { None } else { difference };
        let matched = self.matches_body(difference, content_type, present.map(|body| &body.body));
        matched ^ self.source.not ^ actual_not
    }

    fn matches_body(
        &self,
        difference: Option<&mut MatchDifference>,
        content_type: Option<&str>,
        actual: Option<&Body>,
    ) -> bool {
        let text = actual
            .map(|body| self.decode(body, content_type))
            .unwrap_or_default();

        let failure = match &self.kind {
            CompiledKind::Binary(expected) => {
                let bytes = actual.map(Body::raw_bytes).unwrap_or_default();
                if bytes.as_ref() == expected.as_ref() {
                    None
                } else {
                    let engine = base64::engine::general_purpose::STANDARD;
                    Some(mismatch(
                        "binary",
                        &engine.encode(expected),
                        &engine.encode(bytes.as_ref()),
                    ))
                }
            }
            CompiledKind::String { value, sub_string } => {
                let matched = value.is_empty()
                    || if *sub_string {
                        text.contains(value.as_str())
                    } else {
                        text == *value
                    };
                (!matched).then(|| {
                    let kind = if *sub_string { "substring" } else { "string or regex" };
                    mismatch(kind, value, &text)
                })
            }
            CompiledKind::Regex(pattern) => (!pattern.matches_text(&text))
                .then(|| mismatch("string or regex", &pattern.expected_text(), &text)),
            CompiledKind::Json {
                expected,
                text: expected_text,
                match_type,
            } => self.json_failure(expected.as_ref(), expected_text, *match_type, &text),
            CompiledKind::JsonSchema {
                schema,
                parameter_styles,
            } => {
                let errors = match schema_instance(schema.schema(), parameter_styles, content_type, actual, &text) {
                    Ok(instance) => schema.validate(&instance),
                    Err(e) => vec![e],
                };
                (!errors.is_empty()).then(|| schema.failure(&text, &errors))
            }
            CompiledKind::JsonPath { expression, path } => {
                let result = path.as_ref().map_err(Clone::clone).and_then(|path| {
                    let document: Value = serde_json::from_str(&text)
                        .map_err(|e| format!("actual body is not valid json: {e}"))?;
                    if path.query(&document).is_empty() {
                        Err("no match found".to_string())
                    } else {
                        Ok(())
                    }
                });
                result
                    .err()
                    .map(|because| mismatch_because("json path", expression, &text, &because))
            }
            CompiledKind::Xml(expected) => xml::compare(expected, &text)
                .err()
                .map(|because| mismatch_because("xml", expected, &text, &because)),
            CompiledKind::XmlSchema { source, schema } => {
                let errors = match schema {
                    Ok(schema) => schema.validate(&text),
                    Err(e) => vec![e.clone()],
                };
                (!errors.is_empty())
                    .then(|| mismatch_because("xml schema", source, &text, &error_list(&errors)))
            }
            CompiledKind::XPath(expression) => match xml::xpath_matches(expression, &text) {
                Ok(true) => None,
                Ok(false) => Some(mismatch_because(
                    "xpath",
                    expression,
                    &text,
                    "expression did not match",
                )),
                Err(because) => Some(mismatch_because("xpath", expression, &text, &because)),
            },
            CompiledKind::Parameters(matcher) => {
                let parameters = match actual {
                    Some(Body::Parameters { parameters }) => parameters.clone(),
                    _ => MultiValueMap::from_form_urlencoded(&text),
                };
                return matcher.matches(difference, false, &parameters);
            }
        };

        match failure {
            None => true,
            Some(failure) => {
                trace!(kind = self.source.body.kind(), "body did not match");
                if let Some(difference) = difference {
                    difference.add_difference(failure);
                }
                false
            }
        }
    }

    fn json_failure(
        &self,
        expected: Option<&Value>,
        expected_text: &str,
        match_type: MatchType,
        text: &str,
    ) -> Option<String> {
        if expected_text.trim().is_empty() {
            return None;
        }
        let Some(expected) = expected else {
            return (text != expected_text).then(|| mismatch("json", expected_text, text));
        };
        let because = match serde_json::from_str::<Value>(text) {
            Ok(actual) => match json::compare(expected, &actual, match_type) {
                Ok(()) => return None,
                Err(reason) => {
                    let pretty = |value: &Value| {
                        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
                    };
                    format!("{}\n\n{}", reason, diff(&pretty(expected), &pretty(&actual)))
                }
            },
            Err(e) => format!("actual body is not valid json: {e}"),
        };
        Some(mismatch_because("json", expected_text, text, &because))
    }

    /// Body text decoded with the request's charset.
    fn decode(&self, body: &Body, content_type: Option<&str>) -> String {
        match body {
            Body::Binary { bytes, .. } => {
                let charset = content_type
                    .and_then(charset)
                    .unwrap_or_else(|| self.default_charset.to_ascii_lowercase());
                decode_bytes(bytes, &charset)
            }
            other => other.as_text().into_owned(),
        }
    }
}

/// The JSON value validated by a `JSON_SCHEMA` body, converted from XML or
/// form bodies where the content type says so.
fn schema_instance(
    schema: &Value,
    parameter_styles: &BTreeMap<String, ParameterStyle>,
    content_type: Option<&str>,
    actual: Option<&Body>,
    text: &str,
) -> Result<Value, String> {
    let media_type = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(Body::Parameters { parameters }) = actual {
        return Ok(form_to_json(parameters, schema, parameter_styles));
    }
    if media_type == "application/x-www-form-urlencoded" {
        let parameters = MultiValueMap::from_form_urlencoded(text);
        return Ok(form_to_json(&parameters, schema, parameter_styles));
    }
    if media_type.ends_with("/xml") || media_type.ends_with("+xml") {
        return xml_to_json(text, schema);
    }
    Ok(serde_json::from_str(text).unwrap_or_else(|_| coerce(schema, text)))
}

/// Lower-cased `charset` parameter of a content type.
pub fn charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|parameter| {
        let (name, value) = parameter.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

fn decode_bytes(bytes: &[u8], charset: &str) -> String {
    match charset {
        "iso-8859-1" | "latin1" => bytes.iter().map(|byte| char::from(*byte)).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn diff(expected: &str, actual: &str) -> String {
    TextDiff::from_lines(expected, actual)
        .unified_diff()
        .context_radius(2)
        .header("expected", "found")
        .to_string()
}
