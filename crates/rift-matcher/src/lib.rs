//! Rift request matching engine.
//!
//! Decides whether an HTTP request satisfies a mock expectation. An
//! expectation is either an explicit request pattern ([`HttpRequest`]) or
//! an OpenAPI definition whose operations are compiled into request
//! patterns ([`OpenApiDefinition`]).
//!
//! ```
//! use rift_matcher::{Expectation, HttpRequest, MatcherConfig, Pattern};
//!
//! let expectation = Expectation::new(
//!     HttpRequest::new()
//!         .with_method("GET")
//!         .with_path(Pattern::regex("/pets/[0-9]+"))
//!         .into(),
//!     MatcherConfig::default(),
//! )
//! .unwrap();
//!
//! assert!(expectation.matches_request(&HttpRequest::new().with_method("GET").with_path("/pets/1")));
//! assert!(!expectation.matches_request(&HttpRequest::new().with_method("GET").with_path("/pets/x")));
//! ```

// ===== Values =====
pub mod config;
pub mod error;
pub mod model;

// ===== Matching =====
pub mod expectation;
pub mod matcher;
pub mod openapi;

pub use config::MatcherConfig;
pub use error::SpecError;
pub use expectation::{CompiledMatcher, Expectation, Snapshot};
pub use matcher::{Field, HttpRequestMatcher, MatchDifference};
pub use model::{
    not, Body, HttpRequest, KeyMatchStyle, KeyMultiValue, MatchType, MultiValueMap, Nottable,
    OpenApiDefinition, ParameterStyle, Pattern, RequestBody, RequestDefinition, Style,
};
pub use openapi::OpenApiMatcher;
