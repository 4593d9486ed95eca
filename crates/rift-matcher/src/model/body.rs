//! Request body representations.

use super::{is_false, MultiValueMap, ParameterStyle};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// How an expected JSON document is compared with the actual body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Exact key set and array order.
    Strict,
    /// Expected fields and array elements must be present, extras are ignored
    /// and array order is irrelevant.
    #[default]
    OnlyMatchingFields,
}

/// Body kinds. Exactly one is populated per body.
///
/// ```json
/// { "type": "JSON", "json": "{\"id\": 1}", "matchType": "STRICT" }
/// { "type": "REGEX", "regex": "id=\\d+" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Body {
    Binary {
        #[serde(rename = "base64Bytes", with = "base64_bytes")]
        bytes: Bytes,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    Json {
        #[serde(deserialize_with = "json_text")]
        json: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        charset: Option<String>,
        #[serde(default)]
        match_type: MatchType,
    },
    JsonSchema {
        json_schema: serde_json::Value,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        parameter_styles: BTreeMap<String, ParameterStyle>,
    },
    JsonPath {
        json_path: String,
    },
    Xml {
        xml: String,
    },
    XmlSchema {
        xml_schema: String,
    },
    #[serde(rename = "XPATH")]
    XPath {
        xpath: String,
    },
    Regex {
        regex: String,
    },
    Parameters {
        parameters: MultiValueMap,
    },
    String {
        string: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        sub_string: bool,
    },
}

impl Body {
    pub fn string(value: impl Into<String>) -> Self {
        Body::String {
            string: value.into(),
            content_type: None,
            sub_string: false,
        }
    }

    pub fn sub_string(value: impl Into<String>) -> Self {
        Body::String {
            string: value.into(),
            content_type: None,
            sub_string: true,
        }
    }

    pub fn json(value: impl Into<String>) -> Self {
        Body::Json {
            json: value.into(),
            charset: None,
            match_type: MatchType::OnlyMatchingFields,
        }
    }

    pub fn json_with_match_type(value: impl Into<String>, match_type: MatchType) -> Self {
        Body::Json {
            json: value.into(),
            charset: None,
            match_type,
        }
    }

    pub fn json_schema(schema: serde_json::Value) -> Self {
        Body::JsonSchema {
            json_schema: schema,
            parameter_styles: BTreeMap::new(),
        }
    }

    pub fn json_path(path: impl Into<String>) -> Self {
        Body::JsonPath {
            json_path: path.into(),
        }
    }

    pub fn xml(value: impl Into<String>) -> Self {
        Body::Xml { xml: value.into() }
    }

    pub fn xml_schema(value: impl Into<String>) -> Self {
        Body::XmlSchema {
            xml_schema: value.into(),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Body::XPath {
            xpath: value.into(),
        }
    }

    pub fn regex(value: impl Into<String>) -> Self {
        Body::Regex {
            regex: value.into(),
        }
    }

    pub fn parameters(parameters: MultiValueMap) -> Self {
        Body::Parameters { parameters }
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Body::Binary {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    /// Kind name used in logs and difference reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Binary { .. } => "BINARY",
            Body::Json { .. } => "JSON",
            Body::JsonSchema { .. } => "JSON_SCHEMA",
            Body::JsonPath { .. } => "JSON_PATH",
            Body::Xml { .. } => "XML",
            Body::XmlSchema { .. } => "XML_SCHEMA",
            Body::XPath { .. } => "XPATH",
            Body::Regex { .. } => "REGEX",
            Body::Parameters { .. } => "PARAMETERS",
            Body::String { .. } => "STRING",
        }
    }

    /// Content type carried by the body itself, if any.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Body::Binary { content_type, .. } | Body::String { content_type, .. } => {
                content_type.as_deref()
            }
            _ => None,
        }
    }

    /// Raw bytes of the body.
    pub fn raw_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Body::Binary { bytes, .. } => Cow::Borrowed(bytes.as_ref()),
            other => match other.as_text() {
                Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
                Cow::Owned(text) => Cow::Owned(text.into_bytes()),
            },
        }
    }

    /// Body as text. Binary bodies are decoded as lossy UTF-8; charset-aware
    /// decoding happens in the body matcher.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Body::Binary { bytes, .. } => String::from_utf8_lossy(bytes),
            Body::Json { json, .. } => Cow::Borrowed(json),
            Body::JsonSchema { json_schema, .. } => Cow::Owned(json_schema.to_string()),
            Body::JsonPath { json_path } => Cow::Borrowed(json_path),
            Body::Xml { xml } => Cow::Borrowed(xml),
            Body::XmlSchema { xml_schema } => Cow::Borrowed(xml_schema),
            Body::XPath { xpath } => Cow::Borrowed(xpath),
            Body::Regex { regex } => Cow::Borrowed(regex),
            Body::Parameters { parameters } => Cow::Owned(parameters.to_form_urlencoded()),
            Body::String { string, .. } => Cow::Borrowed(string),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Binary { bytes, .. } => bytes.is_empty(),
            Body::Parameters { parameters } => parameters.is_empty(),
            other => other.as_text().trim().is_empty(),
        }
    }
}

/// A body plus its matching flags.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RequestBody {
    #[serde(flatten)]
    pub body: Body,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
    /// An absent or empty actual body satisfies an optional body matcher.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

impl RequestBody {
    pub fn negated(mut self) -> Self {
        self.not = true;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

impl From<Body> for RequestBody {
    fn from(body: Body) -> Self {
        RequestBody {
            body,
            not: false,
            optional: false,
        }
    }
}

/// JSON bodies may be written as embedded documents or as text.
fn json_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    })
}

mod base64_bytes {
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
