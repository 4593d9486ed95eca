//! Compiled pattern primitives.
//!
//! A [`CompiledPattern`] is the runtime form of a [`Pattern`]: literals keep
//! a pre-lowered copy for case-insensitive fields, regexes are anchored and
//! compiled once, and schemas carry a built validator.

use super::difference::mismatch;
use super::schema::CompiledSchema;
use crate::model::{Nottable, Pattern};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::warn;

/// A string value with pre-computed lowercase for case-insensitive matching.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: String,
    pub lower: String,
}

impl CachedValue {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let lower = value.to_lowercase();
        Self { value, lower }
    }

    #[inline]
    pub fn equals(&self, value: &str, ignore_case: bool) -> bool {
        if ignore_case {
            value.to_lowercase() == self.lower
        } else {
            value == self.value
        }
    }
}

/// Anchor and compile a regex; `None` when the syntax is invalid.
pub fn compile_regex(source: &str, ignore_case: bool) -> Option<Regex> {
    RegexBuilder::new(&format!("^(?:{source})$"))
        .case_insensitive(ignore_case)
        .build()
        .ok()
}

/// Runtime form of a [`Pattern`].
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Literal {
        value: CachedValue,
        ignore_case: bool,
    },
    /// `regex` is `None` when the source does not compile; such a pattern
    /// degrades to literal comparison against its source text.
    Regex {
        source: CachedValue,
        regex: Option<Arc<Regex>>,
        ignore_case: bool,
    },
    Schema(Arc<CompiledSchema>),
}

impl CompiledPattern {
    pub fn compile(pattern: &Pattern, ignore_case: bool) -> Self {
        match pattern {
            Pattern::Literal(value) => CompiledPattern::Literal {
                value: CachedValue::new(value.as_str()),
                ignore_case,
            },
            Pattern::Regex(source) => {
                let regex = compile_regex(source, ignore_case);
                if regex.is_none() {
                    warn!(
                        "Invalid regex {:?}, falling back to literal comparison",
                        source
                    );
                }
                CompiledPattern::Regex {
                    source: CachedValue::new(source.as_str()),
                    regex: regex.map(Arc::new),
                    ignore_case,
                }
            }
            Pattern::Schema(schema) => {
                CompiledPattern::Schema(Arc::new(CompiledSchema::compile(schema)))
            }
        }
    }

    /// Match against concrete text (data plane).
    pub fn matches_text(&self, actual: &str) -> bool {
        match self {
            CompiledPattern::Literal { value, ignore_case } => value.equals(actual, *ignore_case),
            CompiledPattern::Regex {
                source,
                regex,
                ignore_case,
            } => {
                source.equals(actual, *ignore_case)
                    || regex.as_ref().is_some_and(|regex| regex.is_match(actual))
            }
            CompiledPattern::Schema(schema) => schema.is_valid_text(actual),
        }
    }

    /// Match against another pattern (control plane).
    ///
    /// Literal against regex applies the regex in either direction; two
    /// regexes or two schemas only match when they are the same pattern.
    pub fn matches_pattern(&self, actual: &Pattern) -> bool {
        match (self, actual) {
            (CompiledPattern::Literal { .. }, Pattern::Literal(value))
            | (CompiledPattern::Regex { .. }, Pattern::Literal(value))
            | (CompiledPattern::Schema(_), Pattern::Literal(value)) => self.matches_text(value),
            (CompiledPattern::Literal { value, ignore_case }, Pattern::Regex(source)) => {
                value.equals(source, *ignore_case)
                    || compile_regex(source, *ignore_case)
                        .is_some_and(|regex| regex.is_match(&value.value))
            }
            (
                CompiledPattern::Regex {
                    source,
                    ignore_case,
                    ..
                },
                Pattern::Regex(other),
            ) => source.equals(other, *ignore_case),
            (CompiledPattern::Literal { value, .. }, Pattern::Schema(schema)) => {
                CompiledSchema::compile(schema).is_valid_text(&value.value)
            }
            (CompiledPattern::Schema(compiled), Pattern::Schema(schema)) => {
                compiled.schema() == schema
            }
            _ => false,
        }
    }

    pub fn matches(&self, control_plane: bool, actual: &Pattern) -> bool {
        if control_plane {
            self.matches_pattern(actual)
        } else {
            self.matches_text(&actual.as_text())
        }
    }

    pub fn schema(&self) -> Option<&CompiledSchema> {
        match self {
            CompiledPattern::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    /// Expected side as text, for difference reports.
    pub fn expected_text(&self) -> String {
        match self {
            CompiledPattern::Literal { value, .. } => value.value.clone(),
            CompiledPattern::Regex { source, .. } => source.value.clone(),
            CompiledPattern::Schema(schema) => schema.pretty(),
        }
    }

    /// Difference text explaining why `actual` failed this pattern.
    pub fn describe_failure(&self, actual: &str) -> String {
        match self {
            CompiledPattern::Schema(schema) => {
                let errors = schema.validate_text(actual);
                schema.failure(actual, &errors)
            }
            _ => mismatch("string or regex", &self.expected_text(), actual),
        }
    }
}

/// A compiled pattern with its negation flag.
#[derive(Debug, Clone)]
pub struct NottablePattern {
    pub pattern: CompiledPattern,
    pub not: bool,
}

impl NottablePattern {
    pub fn compile(pattern: &Nottable<Pattern>, ignore_case: bool) -> Self {
        Self {
            pattern: CompiledPattern::compile(&pattern.value, ignore_case),
            not: pattern.not,
        }
    }

    /// Both negation flags combine with the inner result by parity.
    pub fn matches(&self, control_plane: bool, actual: &Nottable<Pattern>) -> bool {
        self.pattern.matches(control_plane, &actual.value) ^ self.not ^ actual.not
    }

    pub fn matches_text(&self, actual: &str) -> bool {
        self.pattern.matches_text(actual) ^ self.not
    }

    pub fn expected_text(&self) -> String {
        if self.not {
            format!("!{}", self.pattern.expected_text())
        } else {
            self.pattern.expected_text()
        }
    }

    pub fn describe_failure(&self, actual: &Nottable<Pattern>) -> String {
        let found = if actual.not {
            format!("!{}", actual.value.as_text())
        } else {
            actual.value.as_text().into_owned()
        };
        if self.not || self.pattern.schema().is_none() {
            mismatch("string or regex", &self.expected_text(), &found)
        } else {
            self.pattern.describe_failure(&found)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(pattern: Pattern) -> CompiledPattern {
        CompiledPattern::compile(&pattern, false)
    }

    #[test]
    fn test_literal_case_rules() {
        let sensitive = compile(Pattern::literal("GET"));
        assert!(sensitive.matches_text("GET"));
        assert!(!sensitive.matches_text("get"));

        let insensitive = CompiledPattern::compile(&Pattern::literal("GET"), true);
        assert!(insensitive.matches_text("get"));
    }

    #[test]
    fn test_regex_is_full_string() {
        let pattern = compile(Pattern::regex("/some/.*"));
        assert!(pattern.matches_text("/some/path"));
        assert!(!pattern.matches_text("/prefix/some/path"));
        assert!(!compile(Pattern::regex("abc")).matches_text("xabcx"));
    }

    #[test]
    fn test_invalid_regex_degrades_to_literal() {
        let pattern = compile(Pattern::regex("[unclosed"));
        assert!(pattern.matches_text("[unclosed"));
        assert!(!pattern.matches_text("u"));
    }

    #[test]
    fn test_regex_matches_its_own_source() {
        let pattern = compile(Pattern::regex("a+b"));
        assert!(pattern.matches_text("a+b"));
        assert!(pattern.matches_text("aaab"));
    }

    #[test]
    fn test_schema_pattern() {
        let pattern = compile(Pattern::schema(json!({"type": "integer", "minimum": 1})));
        assert!(pattern.matches_text("1"));
        assert!(!pattern.matches_text("0"));
        assert!(!pattern.matches_text("a"));
    }

    #[test]
    fn test_data_plane_treats_actual_regex_as_text() {
        let pattern = compile(Pattern::literal("abc"));
        assert!(!pattern.matches(false, &Pattern::regex("a.c")));
        assert!(pattern.matches(false, &Pattern::regex("abc")));
    }

    #[test]
    fn test_control_plane_pattern_equality() {
        let regex = compile(Pattern::regex("a.c"));
        assert!(regex.matches(true, &Pattern::regex("a.c")));
        assert!(!regex.matches(true, &Pattern::regex("a.*")));
        assert!(regex.matches(true, &Pattern::literal("abc")));

        let literal = compile(Pattern::literal("abc"));
        assert!(literal.matches(true, &Pattern::regex("a.c")));
        assert!(!literal.matches(true, &Pattern::regex("x.*")));

        let schema = compile(Pattern::schema(json!({"type": "integer"})));
        assert!(schema.matches(true, &Pattern::schema(json!({"type": "integer"}))));
        assert!(!schema.matches(true, &Pattern::schema(json!({"type": "string"}))));
        assert!(schema.matches(true, &Pattern::literal("5")));
    }

    #[test]
    fn test_nottable_parity() {
        let expected = NottablePattern::compile(&Nottable::new(Pattern::literal("HEAD")), true);
        let negated = NottablePattern::compile(&Nottable::negated(Pattern::literal("HEAD")), true);

        assert!(expected.matches(false, &Nottable::new(Pattern::literal("HEAD"))));
        assert!(!negated.matches(false, &Nottable::new(Pattern::literal("HEAD"))));
        assert!(negated.matches(false, &Nottable::negated(Pattern::literal("HEAD"))));
        assert!(negated.matches(false, &Nottable::new(Pattern::literal("GET"))));
    }

    #[test]
    fn test_describe_failure() {
        let pattern = NottablePattern::compile(&Nottable::new(Pattern::literal("GET")), true);
        assert_eq!(
            pattern.describe_failure(&Nottable::new(Pattern::literal("POST"))),
            "  string or regex match failed expected:\n\n    GET\n\n   found:\n\n    POST\n"
        );
    }
}
