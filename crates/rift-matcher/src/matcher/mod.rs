//! Compiled matchers.
//!
//! Everything here is built once from the [`crate::model`] values and then
//! only read. A `matches` call never mutates the matcher; its only side
//! effect is writing into the caller's [`MatchDifference`].
//!
//! Every `matches` takes an explicit `control_plane` flag (or uses the flag
//! of the matcher it was built with). On the data plane the actual side is
//! plain text; on the control plane both sides are patterns and are compared
//! for equality rather than applied to each other.
//!
//! # Module Structure
//!
//! - `pattern` - literal / regex / schema primitives and negation
//! - `schema` - JSON schema validation with text coercion
//! - `multi_value` - subset matching for headers, cookies and parameters
//! - `path_template` - `{name}` path templates and parameter extraction
//! - `body` - body matching by kind
//! - `boolean` - tri-state `keepAlive` / `secure`
//! - `request` - the composite request matcher
//! - `difference` - mismatch diagnostics

pub mod body;
mod boolean;
mod difference;
mod multi_value;
mod path_template;
mod pattern;
mod request;
pub mod schema;

pub use body::CompiledBody;
pub use boolean::BooleanMatcher;
pub use difference::{error_list, mismatch, mismatch_because, Field, MatchDifference};
pub use multi_value::{CompiledKeyMultiValue, CompiledMultiValueMap};
pub use path_template::PathTemplate;
pub use pattern::{compile_regex, CachedValue, CompiledPattern, NottablePattern};
pub use request::HttpRequestMatcher;
pub use schema::CompiledSchema;
