//! Pattern primitive: literal, regular expression or JSON schema.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// The atomic comparison unit used for every request field.
///
/// A bare string deserializes as a literal; the other forms are tagged:
///
/// ```json
/// "GET"
/// { "regex": "/api/v\\d+/.*" }
/// { "schema": { "type": "integer", "minimum": 1 } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "PatternRepr", into = "PatternRepr")]
pub enum Pattern {
    Literal(String),
    Regex(String),
    Schema(serde_json::Value),
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum PatternRepr {
    Plain(String),
    Tagged(TaggedPattern),
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
enum TaggedPattern {
    Literal(String),
    Regex(String),
    Schema(serde_json::Value),
}

impl From<PatternRepr> for Pattern {
    fn from(repr: PatternRepr) -> Self {
        match repr {
            PatternRepr::Plain(value) => Pattern::Literal(value),
            PatternRepr::Tagged(TaggedPattern::Literal(value)) => Pattern::Literal(value),
            PatternRepr::Tagged(TaggedPattern::Regex(value)) => Pattern::Regex(value),
            PatternRepr::Tagged(TaggedPattern::Schema(value)) => Pattern::Schema(value),
        }
    }
}

impl From<Pattern> for PatternRepr {
    fn from(pattern: Pattern) -> Self {
        match pattern {
            Pattern::Literal(value) => PatternRepr::Plain(value),
            Pattern::Regex(value) => PatternRepr::Tagged(TaggedPattern::Regex(value)),
            Pattern::Schema(value) => PatternRepr::Tagged(TaggedPattern::Schema(value)),
        }
    }
}

impl Pattern {
    pub fn literal(value: impl Into<String>) -> Self {
        Pattern::Literal(value.into())
    }

    pub fn regex(value: impl Into<String>) -> Self {
        Pattern::Regex(value.into())
    }

    pub fn schema(value: serde_json::Value) -> Self {
        Pattern::Schema(value)
    }

    /// Textual form of the pattern.
    ///
    /// On the data plane this is the value an incoming request carries: a
    /// request never contains patterns, so whatever it holds is literal text.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Pattern::Literal(value) | Pattern::Regex(value) => Cow::Borrowed(value),
            Pattern::Schema(schema) => Cow::Owned(schema.to_string()),
        }
    }

    /// True for an empty literal or regex.
    pub fn is_blank(&self) -> bool {
        match self {
            Pattern::Literal(value) | Pattern::Regex(value) => value.trim().is_empty(),
            Pattern::Schema(_) => false,
        }
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Pattern::Literal(value.to_string())
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Pattern::Literal(value)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(value) | Pattern::Regex(value) => f.write_str(value),
            Pattern::Schema(schema) => {
                let pretty = serde_json::to_string_pretty(schema).map_err(|_| fmt::Error)?;
                f.write_str(&pretty)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pattern_serde_forms() {
        let literal: Pattern = serde_json::from_str(r#""GET""#).unwrap();
        assert_eq!(literal, Pattern::literal("GET"));

        let regex: Pattern = serde_json::from_str(r#"{"regex": "/api/.*"}"#).unwrap();
        assert_eq!(regex, Pattern::regex("/api/.*"));

        let schema: Pattern =
            serde_json::from_str(r#"{"schema": {"type": "integer", "minimum": 1}}"#).unwrap();
        assert_eq!(
            schema,
            Pattern::schema(json!({"type": "integer", "minimum": 1}))
        );

        let tagged_literal: Pattern = serde_json::from_str(r#"{"literal": "x"}"#).unwrap();
        assert_eq!(tagged_literal, Pattern::literal("x"));
    }

    #[test]
    fn test_pattern_serialize_literal_as_plain_string() {
        let json = serde_json::to_string(&Pattern::literal("POST")).unwrap();
        assert_eq!(json, r#""POST""#);

        let json = serde_json::to_string(&Pattern::regex("P.*")).unwrap();
        assert_eq!(json, r#"{"regex":"P.*"}"#);
    }

    #[test]
    fn test_pattern_from_yaml() {
        let pattern: Pattern = serde_yaml::from_str("regex: \"[a-z]+\"").unwrap();
        assert_eq!(pattern, Pattern::regex("[a-z]+"));
    }

    #[test]
    fn test_as_text_and_blank() {
        assert_eq!(Pattern::regex("a.*").as_text(), "a.*");
        assert_eq!(
            Pattern::schema(json!({"type": "string"})).as_text(),
            r#"{"type":"string"}"#
        );
        assert!(Pattern::literal("  ").is_blank());
        assert!(!Pattern::schema(json!({})).is_blank());
    }
}
