//! Multi-value map matching for headers, cookies, query and path parameters.

use super::difference::{mismatch_because, MatchDifference};
use super::pattern::NottablePattern;
use crate::model::{KeyMatchStyle, KeyMultiValue, MultiValueMap, Nottable, ParameterStyle, Pattern};
use tracing::trace;

/// Compiled form of a [`KeyMultiValue`].
#[derive(Debug, Clone)]
pub struct CompiledKeyMultiValue {
    pub name: NottablePattern,
    pub values: Vec<NottablePattern>,
    pub optional: bool,
    /// Style used to split actual values; only kept for array schemas so a
    /// scalar value is never split into items.
    pub style: Option<ParameterStyle>,
}

impl CompiledKeyMultiValue {
    pub fn compile(entry: &KeyMultiValue, ignore_key_case: bool) -> Self {
        let values: Vec<NottablePattern> = entry
            .values
            .iter()
            .map(|value| NottablePattern::compile(value, false))
            .collect();
        let splits = values
            .iter()
            .any(|value| value.pattern.schema().is_some_and(|schema| schema.is_array()));
        Self {
            name: NottablePattern::compile(&entry.name, ignore_key_case),
            values,
            optional: entry.optional,
            style: entry.style.filter(|_| splits),
        }
    }
}

/// Subset matcher over a [`MultiValueMap`].
///
/// Extra actual keys and values never cause a failure, and an empty matcher
/// always matches.
#[derive(Debug, Clone)]
pub struct CompiledMultiValueMap {
    entries: Vec<CompiledKeyMultiValue>,
    key_match_style: KeyMatchStyle,
    source: MultiValueMap,
}

impl CompiledMultiValueMap {
    /// `ignore_key_case` is set for header and cookie names.
    pub fn compile(map: &MultiValueMap, ignore_key_case: bool) -> Self {
        Self {
            entries: map
                .entries
                .iter()
                .map(|entry| CompiledKeyMultiValue::compile(entry, ignore_key_case))
                .collect(),
            key_match_style: map.key_match_style,
            source: map.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CompiledKeyMultiValue] {
        &self.entries
    }

    pub fn matches(
        &self,
        difference: Option<&mut MatchDifference>,
        control_plane: bool,
        actual: &MultiValueMap,
    ) -> bool {
        for entry in &self.entries {
            if let Err(reason) = self.entry_matches(entry, control_plane, actual) {
                trace!(key = %entry.name.expected_text(), "multimap entry did not match: {}", reason);
                if let Some(difference) = difference {
                    difference.add_difference(mismatch_because(
                        "multimap subset",
                        &pretty(&self.source),
                        &pretty(actual),
                        &reason,
                    ));
                }
                return false;
            }
        }
        true
    }

    fn entry_matches(
        &self,
        entry: &CompiledKeyMultiValue,
        control_plane: bool,
        actual: &MultiValueMap,
    ) -> Result<(), String> {
        let outcome = self.key_and_values_match(entry, control_plane, actual);
        if entry.name.not {
            match outcome {
                Ok(()) => Err(format!(
                    "key \"{}\" must not be present with matching values",
                    entry.name.pattern.expected_text()
                )),
                Err(_) => Ok(()),
            }
        } else {
            outcome
        }
    }

    fn key_and_values_match(
        &self,
        entry: &CompiledKeyMultiValue,
        control_plane: bool,
        actual: &MultiValueMap,
    ) -> Result<(), String> {
        let key = entry.name.pattern.expected_text();
        let matching: Vec<&KeyMultiValue> = actual
            .entries
            .iter()
            .filter(|candidate| {
                entry.name.pattern.matches(control_plane, &candidate.name.value)
                    ^ candidate.name.not
            })
            .collect();

        if matching.is_empty() {
            return if entry.optional {
                Ok(())
            } else {
                Err(format!("none of the keys matched \"{key}\""))
            };
        }
        if entry.values.is_empty() {
            return Ok(());
        }

        let actual_values = collect_values(&matching, entry.style, control_plane);

        if !control_plane {
            if let [declared] = entry.values.as_slice() {
                if let Some(schema) = declared.pattern.schema().filter(|schema| schema.is_array()) {
                    let texts: Vec<String> = actual_values
                        .iter()
                        .map(|value| value.value.as_text().into_owned())
                        .collect();
                    let items: Vec<&str> = texts.iter().map(String::as_str).collect();
                    let errors = schema.validate_items(&items);
                    return if errors.is_empty() != declared.not {
                        Ok(())
                    } else {
                        Err(schema.failure(&texts.join(","), &errors))
                    };
                }
            }
        }

        match self.key_match_style {
            KeyMatchStyle::SubSet => {
                for declared in &entry.values {
                    let satisfied = if declared.not {
                        actual_values
                            .iter()
                            .all(|value| declared.matches(control_plane, value))
                    } else {
                        actual_values
                            .iter()
                            .any(|value| declared.matches(control_plane, value))
                    };
                    if !satisfied {
                        return Err(value_failure(&key, declared, &actual_values));
                    }
                }
            }
            KeyMatchStyle::MatchingKey => {
                for value in &actual_values {
                    if !entry
                        .values
                        .iter()
                        .any(|declared| declared.matches(control_plane, value))
                    {
                        return Err(value_failure(&key, &entry.values[0], &[value.clone()]));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Actual values of all matching keys, split by the declared style.
///
/// A key without values contributes one empty value. Splitting only happens
/// on the data plane where the values are concrete text.
fn collect_values(
    matching: &[&KeyMultiValue],
    style: Option<ParameterStyle>,
    control_plane: bool,
) -> Vec<Nottable<Pattern>> {
    let mut values = Vec::new();
    for entry in matching {
        if entry.values.is_empty() {
            values.push(Nottable::new(Pattern::literal("")));
            continue;
        }
        for value in &entry.values {
            match style.filter(|_| !control_plane) {
                Some(style) => values.extend(style.split(&value.value.as_text()).into_iter().map(
                    |item| Nottable {
                        value: Pattern::Literal(item),
                        not: value.not,
                    },
                )),
                None => values.push(value.clone()),
            }
        }
    }
    values
}

fn value_failure(key: &str, declared: &NottablePattern, actual: &[Nottable<Pattern>]) -> String {
    match (declared.pattern.schema(), actual.first()) {
        (Some(_), Some(first)) if !declared.not => format!(
            "value for key \"{}\" did not match\n{}",
            key,
            declared.describe_failure(first)
        ),
        _ => format!(
            "no value for key \"{}\" matched \"{}\" in [{}]",
            key,
            declared.expected_text(),
            actual
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn pretty(map: &MultiValueMap) -> String {
    serde_json::to_string_pretty(map).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Field;
    use crate::model::{KeyMultiValue, Style};
    use serde_json::json;

    fn map(entries: &[(&str, &[&str])]) -> MultiValueMap {
        let mut map = MultiValueMap::new();
        for (key, values) in entries {
            map.add(*key, values.iter().copied());
        }
        map
    }

    fn matches(matcher: &MultiValueMap, actual: &MultiValueMap) -> bool {
        CompiledMultiValueMap::compile(matcher, false).matches(None, false, actual)
    }

    #[test]
    fn test_empty_matcher_always_matches() {
        assert!(matches(&MultiValueMap::new(), &MultiValueMap::new()));
        assert!(matches(&MultiValueMap::new(), &map(&[("a", &["1"])])));
    }

    #[test]
    fn test_subset_match() {
        let matcher = map(&[("keyOne", &["keyOne_valueOne"]), ("keyTwo", &["keyTwo_valueOne", "keyTwo_valueTwo"])]);
        let actual = map(&[
            ("keyOne", &["keyOne_valueOne", "other"]),
            ("keyTwo", &["keyTwo_valueTwo", "keyTwo_valueOne"]),
            ("keyThree", &["x"]),
        ]);
        assert!(matches(&matcher, &actual));
        assert!(!matches(&matcher, &map(&[("keyTwo", &["keyTwo_valueOne", "keyTwo_valueTwo"])])));
        assert!(!matches(&matcher, &map(&[("keyOne", &["keyOne_valueOne"]), ("keyTwo", &["keyTwo_valueOne"])])));
    }

    #[test]
    fn test_matching_key_requires_all_values_to_match() {
        let matcher = map(&[("keyOne", &["keyOne_valueOne"])]).with_key_match_style(KeyMatchStyle::MatchingKey);
        assert!(matches(&matcher, &map(&[("keyOne", &["keyOne_valueOne", "keyOne_valueOne"])])));
        assert!(!matches(&matcher, &map(&[("keyOne", &["keyOne_valueOne", "notKeyOne_valueOne"])])));

        let subset = map(&[("keyOne", &["keyOne_valueOne"])]);
        assert!(matches(&subset, &map(&[("keyOne", &["keyOne_valueOne", "notKeyOne_valueOne"])])));
    }

    #[test]
    fn test_schema_values() {
        let mut matcher = MultiValueMap::new().with_key_match_style(KeyMatchStyle::MatchingKey);
        matcher.add("keyOne", [Pattern::schema(json!({"type": "integer"}))]);
        assert!(matches(&matcher, &map(&[("keyOne", &["1", "2", "3"])])));
        assert!(!matches(&matcher, &map(&[("keyOne", &["1", "2", "a"])])));

        let mut subset = MultiValueMap::new();
        subset.add("keyOne", [Pattern::schema(json!({"type": "integer"}))]);
        assert!(matches(&subset, &map(&[("keyOne", &["1", "a", "b"])])));
    }

    #[test]
    fn test_optional_key() {
        let mut matcher = MultiValueMap::new();
        matcher.push(KeyMultiValue::new("keyOne", ["keyOne_valueOne"]).optional(true));
        matcher.add("keyTwo", ["keyTwo_valueOne"]);

        assert!(matches(&matcher, &map(&[("keyTwo", &["keyTwo_valueOne"])])));
        assert!(matches(&matcher, &map(&[("keyOne", &["keyOne_valueOne"]), ("keyTwo", &["keyTwo_valueOne"])])));
        assert!(!matches(&matcher, &map(&[("keyOne", &["other"]), ("keyTwo", &["keyTwo_valueOne"])])));
    }

    #[test]
    fn test_regex_keys_and_case() {
        let mut matcher = MultiValueMap::new();
        matcher.add(Pattern::regex("x-.*"), [Pattern::regex("[0-9]+")]);
        let compiled = CompiledMultiValueMap::compile(&matcher, true);
        assert!(compiled.matches(None, false, &map(&[("X-Request-Id", &["42"])])));
        assert!(!compiled.matches(None, false, &map(&[("X-Request-Id", &["abc"])])));
    }

    #[test]
    fn test_negated_key_and_value() {
        let mut matcher = MultiValueMap::new();
        matcher.push(KeyMultiValue::new(Nottable::negated(Pattern::literal("a")), ["1"]));
        assert!(matches(&matcher, &map(&[("b", &["1"])])));
        assert!(matches(&matcher, &map(&[("a", &["2"])])));
        assert!(!matches(&matcher, &map(&[("a", &["1"])])));

        let mut matcher = MultiValueMap::new();
        matcher.add("a", [Nottable::negated(Pattern::literal("1"))]);
        assert!(matches(&matcher, &map(&[("a", &["2"])])));
        assert!(!matches(&matcher, &map(&[("a", &["1"])])));
    }

    #[test]
    fn test_style_splitting_with_array_schema() {
        let mut matcher = MultiValueMap::new().with_key_match_style(KeyMatchStyle::MatchingKey);
        matcher.push(
            KeyMultiValue::new(
                "ids",
                [Pattern::schema(json!({"type": "array", "items": {"type": "integer", "minimum": 1}}))],
            )
            .with_style(ParameterStyle::new(Style::Form, false)),
        );
        assert!(matches(&matcher, &map(&[("ids", &["1,2,3"])])));
        assert!(!matches(&matcher, &map(&[("ids", &["1,0"])])));
    }

    #[test]
    fn test_scalar_schema_is_not_split() {
        let mut matcher = MultiValueMap::new().with_key_match_style(KeyMatchStyle::MatchingKey);
        matcher.push(
            KeyMultiValue::new("id", [Pattern::schema(json!({"type": "integer", "minimum": 1}))])
                .with_style(ParameterStyle::new(Style::Simple, false)),
        );
        assert!(matches(&matcher, &map(&[("id", &["7"])])));
        assert!(!matches(&matcher, &map(&[("id", &["1,2"])])));
    }

    #[test]
    fn test_difference_recorded() {
        let matcher = map(&[("a", &["1"])]);
        let mut difference = MatchDifference::new();
        difference.current_field(Field::Headers);
        let compiled = CompiledMultiValueMap::compile(&matcher, true);
        assert!(!compiled.matches(Some(&mut difference), false, &map(&[("a", &["2"])])));

        let recorded = difference.differences(Field::Headers).unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].starts_with("  multimap subset match failed expected:"));
        assert!(recorded[0].contains("failed because:"));
    }

    #[test]
    fn test_control_plane_compares_patterns() {
        let mut matcher = MultiValueMap::new();
        matcher.add("a", [Pattern::regex("[0-9]+")]);
        let compiled = CompiledMultiValueMap::compile(&matcher, false);

        let mut same = MultiValueMap::new();
        same.add("a", [Pattern::regex("[0-9]+")]);
        assert!(compiled.matches(None, true, &same));

        let mut different = MultiValueMap::new();
        different.add("a", [Pattern::regex("[a-z]+")]);
        assert!(!compiled.matches(None, true, &different));
    }
}
