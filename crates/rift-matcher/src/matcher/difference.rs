//! Per-request mismatch diagnostics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Request field a difference is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    Method,
    Path,
    PathParameters,
    QueryParameters,
    Headers,
    Cookies,
    Body,
    SslMatches,
    KeepAlive,
    Operation,
    OpenApi,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Method => "method",
            Field::Path => "path",
            Field::PathParameters => "pathParameters",
            Field::QueryParameters => "queryParameters",
            Field::Headers => "headers",
            Field::Cookies => "cookies",
            Field::Body => "body",
            Field::SslMatches => "sslMatches",
            Field::KeepAlive => "keep-alive",
            Field::Operation => "operation",
            Field::OpenApi => "openAPI",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accumulates human-readable mismatch explanations for one match attempt.
///
/// A field that is absent was never recorded as a mismatch cause; that does
/// not mean it matched (evaluation may have stopped earlier).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchDifference {
    #[serde(skip)]
    current: Option<Field>,
    differences: BTreeMap<Field, Vec<String>>,
}

impl MatchDifference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field subsequent [`add_difference`](Self::add_difference) calls record against.
    pub fn current_field(&mut self, field: Field) -> &mut Self {
        self.current = Some(field);
        self
    }

    pub fn field(&self) -> Option<Field> {
        self.current
    }

    /// Record a difference against the current field. Ignored when no field is set.
    pub fn add_difference(&mut self, difference: impl Into<String>) -> &mut Self {
        if let Some(field) = self.current {
            self.add_field_difference(field, difference);
        }
        self
    }

    pub fn add_field_difference(&mut self, field: Field, difference: impl Into<String>) -> &mut Self {
        self.differences
            .entry(field)
            .or_default()
            .push(difference.into());
        self
    }

    pub fn differences(&self, field: Field) -> Option<&[String]> {
        self.differences.get(&field).map(Vec::as_slice)
    }

    pub fn all_differences(&self) -> &BTreeMap<Field, Vec<String>> {
        &self.differences
    }

    /// Append every difference of `other`, keeping duplicates.
    pub fn add_differences(&mut self, other: &MatchDifference) {
        for (field, differences) in &other.differences {
            self.differences
                .entry(*field)
                .or_default()
                .extend(differences.iter().cloned());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }
}

// ============================================================================
// Message formatting
// ============================================================================

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `"  <kind> match failed expected:\n\n    <expected>\n\n   found:\n\n    <found>\n"`
pub fn mismatch(kind: &str, expected: &str, found: &str) -> String {
    format!(
        "  {kind} match failed expected:\n\n{}\n\n   found:\n\n{}\n",
        indent(expected, "    "),
        indent(found, "    ")
    )
}

/// As [`mismatch`], followed by a `failed because:` block.
pub fn mismatch_because(kind: &str, expected: &str, found: &str, because: &str) -> String {
    format!(
        "  {kind} match failed expected:\n\n{}\n\n   found:\n\n{}\n\n   failed because:\n\n{}\n",
        indent(expected, "    "),
        indent(found, "    "),
        indent(because, "    ")
    )
}

/// Render a schema validation error list: `"<n> error(s):\n - <error>"`.
pub fn error_list(errors: &[String]) -> String {
    let mut rendered = format!(
        "{} error{}:",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for error in errors {
        rendered.push_str("\n - ");
        rendered.push_str(error);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_against_current_field() {
        let mut difference = MatchDifference::new();
        difference.add_difference("ignored");
        assert!(difference.is_empty());

        difference.current_field(Field::Method).add_difference("a");
        difference.add_difference("b");
        difference.current_field(Field::Body).add_difference("c");

        assert_eq!(difference.differences(Field::Method).unwrap(), ["a", "b"]);
        assert_eq!(difference.differences(Field::Body).unwrap(), ["c"]);
        assert!(difference.differences(Field::Path).is_none());
    }

    #[test]
    fn test_add_differences_keeps_duplicates() {
        let mut first = MatchDifference::new();
        first.add_field_difference(Field::Method, "x");
        let mut second = MatchDifference::new();
        second.add_field_difference(Field::Method, "x");

        first.add_differences(&second);
        assert_eq!(first.differences(Field::Method).unwrap(), ["x", "x"]);
    }

    #[test]
    fn test_mismatch_format() {
        assert_eq!(
            mismatch("string or regex", "GET", "POST"),
            "  string or regex match failed expected:\n\n    GET\n\n   found:\n\n    POST\n"
        );
    }

    #[test]
    fn test_mismatch_because_indents_multiline() {
        let message = mismatch_because("json schema", "{\n  \"type\" : \"integer\"\n}", "a", "1 error:\n - wrong type");
        assert_eq!(
            message,
            "  json schema match failed expected:\n\n    {\n      \"type\" : \"integer\"\n    }\n\n   found:\n\n    a\n\n   failed because:\n\n    1 error:\n     - wrong type\n"
        );
    }

    #[test]
    fn test_error_list() {
        assert_eq!(error_list(&["a".to_string()]), "1 error:\n - a");
        assert_eq!(
            error_list(&["a".to_string(), "b".to_string()]),
            "2 errors:\n - a\n - b"
        );
    }
}
