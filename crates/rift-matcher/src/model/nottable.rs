//! Negatable value wrapper.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A value with a negation flag.
///
/// Matching a `Nottable` evaluates the inner match and then XORs the result
/// with `not`. Both the expectation side and the matched side can be negated;
/// the flags combine by parity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Nottable<T> {
    pub value: T,
    pub not: bool,
}

impl<T> Nottable<T> {
    pub fn new(value: T) -> Self {
        Self { value, not: false }
    }

    pub fn negated(value: T) -> Self {
        Self { value, not: true }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Nottable<U> {
        Nottable {
            value: f(self.value),
            not: self.not,
        }
    }
}

impl<T> From<T> for Nottable<T> {
    fn from(value: T) -> Self {
        Nottable::new(value)
    }
}

impl From<&str> for Nottable<super::Pattern> {
    fn from(value: &str) -> Self {
        Nottable::new(super::Pattern::from(value))
    }
}

impl From<String> for Nottable<super::Pattern> {
    fn from(value: String) -> Self {
        Nottable::new(super::Pattern::from(value))
    }
}

impl<T: fmt::Display> fmt::Display for Nottable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.not {
            write!(f, "!{}", self.value)
        } else {
            self.value.fmt(f)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NottableRepr<T> {
    Wrapped {
        #[serde(default)]
        not: bool,
        value: T,
    },
    Plain(T),
}

#[derive(Serialize)]
struct NegatedRef<'a, T> {
    not: bool,
    value: &'a T,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nottable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match NottableRepr::deserialize(deserializer)? {
            NottableRepr::Wrapped { not, value } => Nottable { value, not },
            NottableRepr::Plain(value) => Nottable::new(value),
        })
    }
}

impl<T: Serialize> Serialize for Nottable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.not {
            NegatedRef {
                not: true,
                value: &self.value,
            }
            .serialize(serializer)
        } else {
            self.value.serialize(serializer)
        }
    }
}
