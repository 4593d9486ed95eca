//! Serializable expectation and request values.
//!
//! These are plain value objects: they are parsed once when an expectation
//! is registered and never mutated afterwards. Matching happens on the
//! compiled forms in [`crate::matcher`].
//!
//! # Module Structure
//!
//! - `pattern` - literal / regex / JSON schema primitive
//! - `nottable` - negation wrapper
//! - `multi_value` - key to multiple values maps and parameter styles
//! - `body` - the body kinds
//! - `request` - request patterns and OpenAPI definitions

mod body;
mod multi_value;
mod nottable;
mod pattern;
mod request;

pub use body::{Body, MatchType, RequestBody};
pub use multi_value::{KeyMatchStyle, KeyMultiValue, MultiValueMap, ParameterStyle, Style};
pub use nottable::Nottable;
pub use pattern::Pattern;
pub use request::{not, HttpRequest, OpenApiDefinition, RequestDefinition};

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
