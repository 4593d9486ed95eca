//! JSON document comparison for `JSON` bodies.

use crate::model::MatchType;
use assert_json_diff::{assert_json_matches_no_panic, CompareMode, Config, NumericMode};
use serde_json::Value;

/// Compare `actual` against `expected`; the error explains the first
/// disagreement found.
pub fn compare(expected: &Value, actual: &Value, match_type: MatchType) -> Result<(), String> {
    match match_type {
        MatchType::Strict => assert_json_matches_no_panic(
            actual,
            expected,
            Config::new(CompareMode::Strict).numeric_mode(NumericMode::AssumeFloat),
        ),
        MatchType::OnlyMatchingFields => includes(expected, actual, "$"),
    }
}

/// Every expected field and array element must be present in `actual`.
///
/// Array elements may appear in any order and each actual element satisfies
/// at most one expected element.
fn includes(expected: &Value, actual: &Value, path: &str) -> Result<(), String> {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            for (key, expected) in expected {
                let child = format!("{path}.{key}");
                match actual.get(key) {
                    Some(actual) => includes(expected, actual, &child)?,
                    None => return Err(format!("missing field \"{child}\"")),
                }
            }
            Ok(())
        }
        (Value::Array(expected), Value::Array(actual)) => {
            let mut used = vec![false; actual.len()];
            for (index, expected) in expected.iter().enumerate() {
                let found = actual.iter().enumerate().position(|(position, actual)| {
                    !used[position] && includes(expected, actual, path).is_ok()
                });
                match found {
                    Some(position) => used[position] = true,
                    None => {
                        return Err(format!(
                            "no element of \"{path}\" matched expected element {index}: {expected}"
                        ))
                    }
                }
            }
            Ok(())
        }
        (Value::Number(expected), Value::Number(actual)) => {
            if expected == actual || expected.as_f64() == actual.as_f64() {
                Ok(())
            } else {
                Err(format!(
                    "field \"{path}\" expected {expected} but was {actual}"
                ))
            }
        }
        (expected, actual) if expected == actual => Ok(()),
        (expected, actual) => Err(format!(
            "field \"{path}\" expected {expected} but was {actual}"
        )),
    }
}
