//! Composite request matcher.
//!
//! Combines the field matchers of one [`HttpRequest`] expectation into a
//! single AND. Fields absent from the expectation are skipped. Negation is
//! applied once at the end: the matcher's own flag, the expectation's `not`
//! and the matched request's `not` combine by parity.

use super::body::CompiledBody;
use super::boolean::BooleanMatcher;
use super::difference::{Field, MatchDifference};
use super::multi_value::CompiledMultiValueMap;
use super::path_template::PathTemplate;
use super::pattern::NottablePattern;
use crate::config::MatcherConfig;
use crate::model::{HttpRequest, MultiValueMap, Nottable, Pattern, RequestDefinition};
use std::sync::Arc;
use tracing::{debug, trace};

/// Order fields are evaluated in.
const FIELDS: [Field; 9] = [
    Field::Method,
    Field::Path,
    Field::Body,
    Field::Headers,
    Field::Cookies,
    Field::PathParameters,
    Field::QueryParameters,
    Field::KeepAlive,
    Field::SslMatches,
];

#[derive(Debug, Clone)]
enum CompiledPath {
    Pattern(NottablePattern),
    Template {
        template: PathTemplate,
        pattern: NottablePattern,
    },
}

/// Compiled form of an [`HttpRequest`] expectation.
#[derive(Debug, Clone)]
pub struct HttpRequestMatcher {
    definition: HttpRequest,
    not: bool,
    control_plane: bool,
    description: String,
    config: Arc<MatcherConfig>,
    method: Option<NottablePattern>,
    path: Option<CompiledPath>,
    path_parameters: CompiledMultiValueMap,
    query_parameters: CompiledMultiValueMap,
    headers: CompiledMultiValueMap,
    cookies: CompiledMultiValueMap,
    body: Option<CompiledBody>,
    keep_alive: BooleanMatcher,
    secure: BooleanMatcher,
}

impl PartialEq for HttpRequestMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
            && self.not == other.not
            && self.control_plane == other.control_plane
            && self.description == other.description
    }
}

impl HttpRequestMatcher {
    pub fn compile(definition: &HttpRequest, config: Arc<MatcherConfig>) -> Self {
        let path = definition.path.as_ref().map(|path| {
            let pattern = NottablePattern::compile(path, true);
            match &path.value {
                Pattern::Literal(text) if PathTemplate::is_template(text) => CompiledPath::Template {
                    template: PathTemplate::compile(text, &definition.path_parameters),
                    pattern,
                },
                _ => CompiledPath::Pattern(pattern),
            }
        });
        Self {
            method: definition
                .method
                .as_ref()
                .map(|method| NottablePattern::compile(method, true)),
            path,
            path_parameters: CompiledMultiValueMap::compile(&definition.path_parameters, false),
            query_parameters: CompiledMultiValueMap::compile(
                &definition.query_string_parameters,
                false,
            ),
            headers: CompiledMultiValueMap::compile(&definition.headers, true),
            cookies: CompiledMultiValueMap::compile(&definition.cookies, true),
            body: definition
                .body
                .as_ref()
                .map(|body| CompiledBody::compile(body, &config.default_charset)),
            keep_alive: BooleanMatcher::new(definition.keep_alive),
            secure: BooleanMatcher::new(definition.secure),
            definition: definition.clone(),
            not: false,
            control_plane: false,
            description: String::new(),
            config,
        }
    }

    /// Negate the whole matcher.
    pub fn with_not(mut self, not: bool) -> Self {
        self.not = not;
        self
    }

    /// Compare patterns with patterns instead of applying them to values.
    pub fn with_control_plane(mut self, control_plane: bool) -> Self {
        self.control_plane = control_plane;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn definition(&self) -> &HttpRequest {
        &self.definition
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_control_plane(&self) -> bool {
        self.control_plane
    }

    /// Match a request definition using this matcher's plane.
    pub fn matches(
        &self,
        difference: Option<&mut MatchDifference>,
        definition: &RequestDefinition,
    ) -> bool {
        self.matches_in(difference, self.control_plane, definition)
    }

    /// Match without collecting differences.
    pub fn matches_request(&self, request: &HttpRequest) -> bool {
        self.matches_http(None, self.control_plane, request)
    }

    /// Match a request definition on an explicit plane. An OpenAPI
    /// definition never matches an explicit request matcher.
    pub fn matches_in(
        &self,
        difference: Option<&mut MatchDifference>,
        control_plane: bool,
        definition: &RequestDefinition,
    ) -> bool {
        match definition {
            RequestDefinition::Http(request) => self.matches_http(difference, control_plane, request),
            RequestDefinition::OpenApi(_) => false,
        }
    }

    pub fn matches_http(
        &self,
        mut difference: Option<&mut MatchDifference>,
        control_plane: bool,
        request: &HttpRequest,
    ) -> bool {
        let parity = self.not ^ self.definition.not ^ request.not;
        // Once negated, a mismatch may still produce an overall match, so
        // every field is evaluated.
        let fail_fast = self.config.fail_fast && !parity;

        let mut extracted: Option<MultiValueMap> = None;
        let mut failures = 0;
        for field in FIELDS {
            if let Some(difference) = difference.as_deref_mut() {
                difference.current_field(field);
            }
            let matched = match field {
                Field::Method => self.method_matches(difference.as_deref_mut(), control_plane, request),
                Field::Path => self.path_matches(
                    difference.as_deref_mut(),
                    control_plane,
                    request,
                    &mut extracted,
                ),
                Field::Body => self.body.as_ref().map_or(true, |body| {
                    body.matches(
                        difference.as_deref_mut(),
                        control_plane,
                        request.content_type().as_deref(),
                        request.body.as_ref(),
                    )
                }),
                Field::Headers => {
                    self.headers
                        .matches(difference.as_deref_mut(), control_plane, &request.headers)
                }
                Field::Cookies => {
                    self.cookies
                        .matches(difference.as_deref_mut(), control_plane, &request.cookies)
                }
                Field::PathParameters => match &extracted {
                    Some(extracted) => {
                        self.path_parameters
                            .matches(difference.as_deref_mut(), false, extracted)
                    }
                    None => self.path_parameters.matches(
                        difference.as_deref_mut(),
                        control_plane,
                        &request.path_parameters,
                    ),
                },
                Field::QueryParameters => self.query_parameters.matches(
                    difference.as_deref_mut(),
                    control_plane,
                    &request.query_string_parameters,
                ),
                Field::KeepAlive => self
                    .keep_alive
                    .matches(difference.as_deref_mut(), request.keep_alive),
                Field::SslMatches => self.secure.matches(difference.as_deref_mut(), request.secure),
                Field::Operation | Field::OpenApi => true,
            };
            if !matched {
                trace!(field = %field, description = %self.description, "field did not match");
                failures += 1;
                if fail_fast {
                    break;
                }
            }
        }

        let result = (failures == 0) ^ parity;
        if !result {
            debug!(
                "request {} did not match expectation {}",
                serde_json::to_string(request).unwrap_or_default(),
                self.description
            );
        }
        result
    }

    fn method_matches(
        &self,
        difference: Option<&mut MatchDifference>,
        control_plane: bool,
        request: &HttpRequest,
    ) -> bool {
        let (Some(expected), Some(actual)) = (&self.method, &request.method) else {
            return true;
        };
        if actual.value.is_blank() || expected.matches(control_plane, actual) {
            return true;
        }
        if let Some(difference) = difference {
            difference.add_difference(expected.describe_failure(actual));
        }
        false
    }

    fn path_matches(
        &self,
        difference: Option<&mut MatchDifference>,
        control_plane: bool,
        request: &HttpRequest,
        extracted: &mut Option<MultiValueMap>,
    ) -> bool {
        let (Some(expected), Some(actual)) = (&self.path, &request.path) else {
            return true;
        };
        if actual.value.is_blank() {
            return true;
        }
        match expected {
            CompiledPath::Pattern(pattern) => {
                if pattern.matches(control_plane, actual) {
                    return true;
                }
                if let Some(difference) = difference {
                    difference.add_difference(pattern.describe_failure(actual));
                }
                false
            }
            CompiledPath::Template { template, pattern } => {
                if control_plane && pattern.matches(true, actual) {
                    return true;
                }
                let resolved = match &actual.value {
                    Pattern::Literal(text) => template.resolve(text),
                    other => Err(pattern.describe_failure(&Nottable::new(other.clone()))),
                };
                let matched = resolved.is_ok() ^ pattern.not ^ actual.not;
                match resolved {
                    Ok(parameters) => *extracted = Some(parameters),
                    Err(reason) if !matched => {
                        if let Some(difference) = difference {
                            difference.add_difference(reason);
                        }
                    }
                    Err(_) => {}
                }
                matched
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{not, Body, KeyMultiValue};
    use serde_json::json;

    fn compile(definition: &HttpRequest) -> HttpRequestMatcher {
        HttpRequestMatcher::compile(definition, Arc::new(MatcherConfig::default()))
    }

    #[test]
    fn test_empty_expectation_matches_everything() {
        let matcher = compile(&HttpRequest::new());
        assert!(matcher.matches_request(&HttpRequest::new()));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/x")));
    }

    #[test]
    fn test_method_and_path() {
        let matcher = compile(&HttpRequest::new().with_method("GET").with_path("/some/path"));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("get").with_path("/some/path")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("POST").with_path("/some/path")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/other")));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("").with_path("/some/path")));
    }

    #[test]
    fn test_regex_path() {
        let matcher = compile(&HttpRequest::new().with_path(Pattern::regex("/some/.*")));
        assert!(matcher.matches_request(&HttpRequest::new().with_path("/some/path")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_path("/other/path")));
    }

    #[test]
    fn test_negation_parity() {
        let head = HttpRequest::new().with_method("HEAD");
        let actual = HttpRequest::new().with_method("HEAD");

        assert!(compile(&head).matches_request(&actual));
        assert!(!compile(&not(head.clone())).matches_request(&actual));
        assert!(compile(&not(head.clone())).with_not(true).matches_request(&actual));
        assert!(compile(&not(head.clone())).matches_request(&not(actual.clone())));
        assert!(!compile(&head).with_not(true).matches_request(&actual));
        assert!(!compile(&head).matches_request(&HttpRequest::new().with_method("GET")));
        assert!(compile(&not(head)).matches_request(&HttpRequest::new().with_method("GET")));
    }

    #[test]
    fn test_negated_field_pattern() {
        let matcher = compile(&HttpRequest::new().with_method(Nottable::negated(Pattern::literal("HEAD"))));
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("HEAD")));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("GET")));
    }

    #[test]
    fn test_keep_alive_and_secure() {
        let matcher = compile(&HttpRequest::new().with_keep_alive(true).with_secure(false));
        assert!(matcher.matches_request(&HttpRequest::new().with_keep_alive(true).with_secure(false)));
        assert!(!matcher.matches_request(&HttpRequest::new().with_keep_alive(false).with_secure(false)));
        assert!(!matcher.matches_request(&HttpRequest::new().with_secure(false)));

        let any = compile(&HttpRequest::new());
        assert!(any.matches_request(&HttpRequest::new().with_keep_alive(false)));
    }

    #[test]
    fn test_path_template_with_parameters() {
        let expectation = HttpRequest::new()
            .with_path("/pets/{petId}")
            .with_path_parameter("petId", Pattern::schema(json!({"type": "integer", "minimum": 1})));
        let matcher = compile(&expectation);
        assert!(matcher.matches_request(&HttpRequest::new().with_path("/pets/1")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_path("/pets/0")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_path("/pets/a")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_path("/pets")));
    }

    #[test]
    fn test_headers_cookies_query_body() {
        let expectation = HttpRequest::new()
            .with_header("X-Trace", Pattern::regex("[0-9]+"))
            .with_cookie("session", "abc")
            .with_query_string_parameter("page", "1")
            .with_body(Body::json(r#"{"a": 1}"#));
        let matcher = compile(&expectation);

        let request = HttpRequest::new()
            .with_header("x-trace", "42")
            .with_header("Accept", "*/*")
            .with_cookie("SESSION", "abc")
            .with_query_string_parameter("page", "1")
            .with_query_string_parameter("size", "10")
            .with_body(Body::string(r#"{"a": 1, "b": 2}"#));
        assert!(matcher.matches_request(&request));

        let wrong_header = HttpRequest::new()
            .with_header("X-Trace", "x")
            .with_cookie("session", "abc")
            .with_query_string_parameter("page", "1")
            .with_body(Body::string(r#"{"a": 1}"#));
        assert!(!matcher.matches_request(&wrong_header));

        let wrong_body = HttpRequest::new()
            .with_header("X-Trace", "1")
            .with_cookie("session", "abc")
            .with_query_string_parameter("page", "1")
            .with_body(Body::string(r#"{"a": 2}"#));
        assert!(!matcher.matches_request(&wrong_body));
    }

    #[test]
    fn test_differences_collected_without_fail_fast() {
        let config = MatcherConfig {
            fail_fast: false,
            ..MatcherConfig::default()
        };
        let matcher = HttpRequestMatcher::compile(
            &HttpRequest::new().with_method("GET").with_path("/a").with_header("X", "1"),
            Arc::new(config),
        );
        let mut difference = MatchDifference::new();
        let request = HttpRequest::new().with_method("POST").with_path("/b");
        assert!(!matcher.matches(Some(&mut difference), &request.into()));

        assert_eq!(
            difference.differences(Field::Method).unwrap(),
            ["  string or regex match failed expected:\n\n    GET\n\n   found:\n\n    POST\n"]
        );
        assert!(difference.differences(Field::Path).is_some());
        assert!(difference.differences(Field::Headers).is_some());
    }

    #[test]
    fn test_fail_fast_stops_at_first_mismatch() {
        let matcher = compile(&HttpRequest::new().with_method("GET").with_path("/a"));
        let mut difference = MatchDifference::new();
        assert!(!matcher.matches(
            Some(&mut difference),
            &HttpRequest::new().with_method("POST").with_path("/b").into()
        ));
        assert!(difference.differences(Field::Method).is_some());
        assert!(difference.differences(Field::Path).is_none());
    }

    #[test]
    fn test_control_plane() {
        let matcher = compile(&HttpRequest::new().with_path(Pattern::regex("/some/.*"))).with_control_plane(true);
        assert!(matcher.matches_request(&HttpRequest::new().with_path(Pattern::regex("/some/.*"))));
        assert!(!matcher.matches_request(&HttpRequest::new().with_path(Pattern::regex("/other/.*"))));
        assert!(matcher.matches_request(&HttpRequest::new().with_path("/some/path")));

        let data_plane = compile(&HttpRequest::new().with_path("/some/path"));
        assert!(!data_plane.matches_request(&HttpRequest::new().with_path(Pattern::regex("/some/.*"))));
    }

    #[test]
    fn test_optional_header_entry() {
        let matcher = compile(
            &HttpRequest::new().with_header_entry(KeyMultiValue::new("X-Opt", ["1"]).optional(true)),
        );
        assert!(matcher.matches_request(&HttpRequest::new()));
        assert!(matcher.matches_request(&HttpRequest::new().with_header("X-Opt", "1")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_header("X-Opt", "2")));
    }
}
