//! Path templates with `{name}` placeholders.
//!
//! A template segment holds at most one parameter, optionally surrounded by
//! literal text (`/files/{name}.json`). The parameter expression selects the
//! serialization: `{name}` simple, `{.name}` label, `{;name}` matrix, and a
//! trailing `*` marks it exploded. A style declared on the matching path
//! parameter entry applies when the expression has no operator.

use super::difference::mismatch;
use crate::model::{MultiValueMap, ParameterStyle, Style};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Parameter {
        prefix: String,
        name: String,
        style: Style,
        explode: bool,
        suffix: String,
    },
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// True when `path` contains a parameter expression.
    pub fn is_template(path: &str) -> bool {
        path.split('/').any(|segment| parse_expression(segment).is_some())
    }

    /// Compile `path`; `parameters` supplies declared styles for
    /// expressions without an operator.
    pub fn compile(path: &str, parameters: &MultiValueMap) -> Self {
        let segments = split(path)
            .into_iter()
            .map(|segment| match parse_expression(segment) {
                Some((prefix, expression, suffix)) => {
                    let (mut style, rest) = match expression.as_bytes().first() {
                        Some(b'.') => (Some(Style::Label), &expression[1..]),
                        Some(b';') => (Some(Style::Matrix), &expression[1..]),
                        _ => (None, expression),
                    };
                    let (name, mut explode) = match rest.strip_suffix('*') {
                        Some(name) => (name, true),
                        None => (rest, false),
                    };
                    if style.is_none() {
                        if let Some(declared) = declared_style(parameters, name) {
                            style = Some(declared.style);
                            explode |= declared.explode;
                        }
                    }
                    Segment::Parameter {
                        prefix: prefix.to_string(),
                        name: name.to_string(),
                        style: style.unwrap_or(Style::Simple),
                        explode,
                        suffix: suffix.to_string(),
                    }
                }
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            source: path.to_string(),
            segments,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the parameters, in template order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Parameter { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match `path` against the template and extract the parameter values.
    ///
    /// On failure the error is the difference text explaining why.
    pub fn resolve(&self, path: &str) -> Result<MultiValueMap, String> {
        let actual = split(path);
        if actual.len() != self.segments.len() {
            return Err(format!(
                "  path template expected {} segments but found {}\n\n    {}\n\n   found:\n\n    {}\n",
                self.segments.len(),
                actual.len(),
                self.source,
                path
            ));
        }

        let mut parameters = MultiValueMap::new();
        for (segment, actual) in self.segments.iter().zip(actual) {
            match segment {
                Segment::Literal(expected) => {
                    if !expected.eq_ignore_ascii_case(actual) {
                        return Err(mismatch("string or regex", &self.source, path));
                    }
                }
                Segment::Parameter {
                    prefix,
                    name,
                    style,
                    explode,
                    suffix,
                } => {
                    let values = actual
                        .strip_prefix(prefix.as_str())
                        .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                        .and_then(|raw| extract(name, *style, *explode, raw))
                        .ok_or_else(|| {
                            format!(
                                "  path parameter \"{}\" missing from path \"{}\" for template \"{}\"\n",
                                name, path, self.source
                            )
                        })?;
                    parameters.add(name.as_str(), values);
                }
            }
        }
        Ok(parameters)
    }
}

/// Path segments without the leading slash or a trailing slash.
fn split(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Split a segment into `(prefix, expression, suffix)` around `{...}`.
fn parse_expression(segment: &str) -> Option<(&str, &str, &str)> {
    let open = segment.find('{')?;
    let close = open + segment[open..].find('}')?;
    let expression = &segment[open + 1..close];
    if expression.is_empty() {
        return None;
    }
    Some((&segment[..open], expression, &segment[close + 1..]))
}

fn declared_style(parameters: &MultiValueMap, name: &str) -> Option<ParameterStyle> {
    parameters
        .entries
        .iter()
        .find(|entry| entry.name.value.as_text() == name)
        .and_then(|entry| entry.style)
}

/// Decode one serialized path value into its items.
///
/// Returns `None` when the value is missing or lacks the prefix its style
/// requires.
fn extract(name: &str, style: Style, explode: bool, raw: &str) -> Option<Vec<String>> {
    let items: Vec<&str> = match style {
        Style::Label => {
            let rest = raw.strip_prefix('.')?;
            if explode {
                rest.split('.').collect()
            } else {
                vec![rest]
            }
        }
        Style::Matrix => {
            let rest = raw.strip_prefix(';')?;
            if explode {
                rest.split(';')
                    .map(|item| matrix_value(name, item))
                    .collect::<Option<Vec<_>>>()?
            } else {
                vec![matrix_value(name, rest)?]
            }
        }
        _ => vec![raw],
    };
    if items.iter().all(|item| item.is_empty()) {
        return None;
    }
    Some(
        items
            .into_iter()
            .map(|item| {
                urlencoding::decode(item)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| item.to_string())
            })
            .collect(),
    )
}

fn matrix_value<'a>(name: &str, item: &'a str) -> Option<&'a str> {
    match item.split_once('=') {
        Some((key, value)) if key == name => Some(value),
        None if item == name => Some(""),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KeyMultiValue, Pattern};

    fn values(map: &MultiValueMap, name: &str) -> Vec<String> {
        map.get_ignore_case(name)
            .unwrap_or_default()
            .iter()
            .map(|value| value.value.as_text().into_owned())
            .collect()
    }

    #[test]
    fn test_is_template() {
        assert!(PathTemplate::is_template("/pets/{petId}"));
        assert!(PathTemplate::is_template("/files/{name}.json"));
        assert!(!PathTemplate::is_template("/pets"));
        assert!(!PathTemplate::is_template("/pets/{}"));
    }

    #[test]
    fn test_simple_parameter() {
        let template = PathTemplate::compile("/pets/{petId}", &MultiValueMap::new());
        let parameters = template.resolve("/pets/12").unwrap();
        assert_eq!(values(&parameters, "petId"), vec!["12"]);
        assert_eq!(template.parameter_names(), vec!["petId"]);

        assert!(template.resolve("/pets").is_err());
        assert!(template.resolve("/pets/12/toys").is_err());
        assert!(template.resolve("/cats/12").is_err());
    }

    #[test]
    fn test_segment_count_message() {
        let template = PathTemplate::compile("/somePath/{someParam}", &MultiValueMap::new());
        let error = template.resolve("/somePath").unwrap_err();
        assert!(error.starts_with("  path template expected 2 segments but found 1"));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let template = PathTemplate::compile("/files/{name}.json", &MultiValueMap::new());
        assert_eq!(
            values(&template.resolve("/files/report.json").unwrap(), "name"),
            vec!["report"]
        );
        assert!(template.resolve("/files/report.xml").is_err());
        assert!(template.resolve("/files/.json").is_err());
    }

    #[test]
    fn test_label_style() {
        let template = PathTemplate::compile("/somePath/{.someParam}", &MultiValueMap::new());
        assert_eq!(
            values(&template.resolve("/somePath/.1,2").unwrap(), "someParam"),
            vec!["1,2"]
        );
        assert!(template.resolve("/somePath/1").is_err());

        let exploded = PathTemplate::compile("/somePath/{.someParam*}", &MultiValueMap::new());
        assert_eq!(
            values(&exploded.resolve("/somePath/.1.2.3").unwrap(), "someParam"),
            vec!["1", "2", "3"]
        );
    }

    #[test]
    fn test_matrix_style() {
        let template = PathTemplate::compile("/somePath/{;someParam}", &MultiValueMap::new());
        assert_eq!(
            values(&template.resolve("/somePath/;someParam=1,2").unwrap(), "someParam"),
            vec!["1,2"]
        );

        let exploded = PathTemplate::compile("/somePath/{;someParam*}", &MultiValueMap::new());
        assert_eq!(
            values(
                &exploded
                    .resolve("/somePath/;someParam=1;someParam=2;someParam=3")
                    .unwrap(),
                "someParam"
            ),
            vec!["1", "2", "3"]
        );
        assert!(exploded.resolve("/somePath/;other=1").is_err());
    }

    #[test]
    fn test_declared_style_applies_without_operator() {
        let mut parameters = MultiValueMap::new();
        parameters.push(
            KeyMultiValue::new("id", [Pattern::literal("1")])
                .with_style(ParameterStyle::new(Style::Matrix, true)),
        );
        let template = PathTemplate::compile("/items/{id}", &parameters);
        assert_eq!(
            values(&template.resolve("/items/;id=1;id=2").unwrap(), "id"),
            vec!["1", "2"]
        );
    }

    #[test]
    fn test_values_are_percent_decoded() {
        let template = PathTemplate::compile("/users/{name}", &MultiValueMap::new());
        assert_eq!(
            values(&template.resolve("/users/John%20Doe").unwrap(), "name"),
            vec!["John Doe"]
        );
    }

    #[test]
    fn test_literal_segments_ignore_case_and_trailing_slash() {
        let template = PathTemplate::compile("/Pets/{id}/", &MultiValueMap::new());
        assert!(template.resolve("/pets/1").is_ok());
    }
}
