//! OpenAPI driven request matching.
//!
//! An [`OpenApiDefinition`](crate::model::OpenApiDefinition) is loaded,
//! its local `$ref`s resolved and every selected operation compiled into
//! explicit request matchers. The result is an [`OpenApiMatcher`] that
//! matches when any operation does.
//!
//! Only OpenAPI 3 documents are accepted. Constructs the matchers cannot
//! express (`allowReserved`, multipart bodies, per-property `encoding`,
//! object parameter styles) fail compilation instead of matching loosely.
//!
//! # Module Structure
//!
//! - `loader` - URL, file and inline payload loading
//! - `resolver` - local `$ref` resolution
//! - `schema` - OpenAPI schema objects to JSON schema
//! - `security` - security requirements as credential checks
//! - `compiler` - operations to request matchers
//! - `matcher` - OR over the compiled operations

mod compiler;
mod loader;
mod matcher;
mod resolver;
mod schema;
mod security;

pub use compiler::{compile, CompiledOperation};
pub use loader::{load, parse_document};
pub use matcher::OpenApiMatcher;
pub use resolver::Resolver;
pub use schema::to_json_schema;
pub use security::SecurityMatcher;
