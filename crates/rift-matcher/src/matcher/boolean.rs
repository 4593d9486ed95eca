use super::difference::{mismatch, MatchDifference};

/// Tri-state matcher for `keepAlive` and `secure`.
///
/// An absent expectation matches anything. A concrete expectation only
/// matches an equal concrete value, never an absent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanMatcher {
    expected: Option<bool>,
}

impl BooleanMatcher {
    pub fn new(expected: Option<bool>) -> Self {
        Self { expected }
    }

    pub fn matches(&self, difference: Option<&mut MatchDifference>, actual: Option<bool>) -> bool {
        let result = match (self.expected, actual) {
            (None, _) => true,
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
        };
        if !result {
            if let Some(difference) = difference {
                difference.add_difference(mismatch(
                    "boolean",
                    &render(self.expected),
                    &render(actual),
                ));
            }
        }
        result
    }
}

fn render(value: Option<bool>) -> String {
    value.map_or_else(|| "null".to_string(), |value| value.to_string())
}
