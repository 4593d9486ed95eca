//! Request definitions: explicit request patterns and OpenAPI definitions.

use super::{is_false, Body, KeyMultiValue, MultiValueMap, Nottable, Pattern, RequestBody};
use serde::{Deserialize, Serialize};

/// An HTTP request, used both as an expectation pattern and as the matched
/// request. Every field is optional and independently negatable.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Nottable<Pattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Nottable<Pattern>>,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub path_parameters: MultiValueMap,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub query_string_parameters: MultiValueMap,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub headers: MultiValueMap,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub cookies: MultiValueMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_not(mut self, not: bool) -> Self {
        self.not = not;
        self
    }

    pub fn with_method(mut self, method: impl Into<Nottable<Pattern>>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<Nottable<Pattern>>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_path_parameter<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<Nottable<Pattern>>,
        V: Into<Nottable<Pattern>>,
    {
        self.path_parameters.add(name, [value]);
        self
    }

    pub fn with_query_string_parameter<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<Nottable<Pattern>>,
        V: Into<Nottable<Pattern>>,
    {
        self.query_string_parameters.add(name, [value]);
        self
    }

    pub fn with_header<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<Nottable<Pattern>>,
        V: Into<Nottable<Pattern>>,
    {
        self.headers.add(name, [value]);
        self
    }

    pub fn with_header_entry(mut self, entry: KeyMultiValue) -> Self {
        self.headers.push(entry);
        self
    }

    pub fn with_cookie<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<Nottable<Pattern>>,
        V: Into<Nottable<Pattern>>,
    {
        self.cookies.add(name, [value]);
        self
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// The `Content-Type` header, falling back to the body's own content type.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .first_value_ignore_case("content-type")
            .or_else(|| {
                self.body
                    .as_ref()
                    .and_then(|body| body.body.content_type())
                    .map(str::to_string)
            })
    }

    /// Actual body, if any.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref().map(|body| &body.body)
    }
}

/// Negate a request definition: the expectation matches exactly the
/// requests the un-negated definition would not.
pub fn not(request: HttpRequest) -> HttpRequest {
    request.with_not(true)
}

/// An OpenAPI document reference plus an optional operation filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiDefinition {
    /// Inline JSON/YAML, a file or resource path, or an HTTP(S) URL.
    pub spec_url_or_payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl OpenApiDefinition {
    pub fn new(spec_url_or_payload: impl Into<String>) -> Self {
        Self {
            spec_url_or_payload: spec_url_or_payload.into(),
            operation_id: None,
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }
}

/// What an expectation matches against.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestDefinition {
    OpenApi(OpenApiDefinition),
    Http(HttpRequest),
}

impl From<HttpRequest> for RequestDefinition {
    fn from(request: HttpRequest) -> Self {
        RequestDefinition::Http(request)
    }
}

impl From<OpenApiDefinition> for RequestDefinition {
    fn from(definition: OpenApiDefinition) -> Self {
        RequestDefinition::OpenApi(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Body;

    #[test]
    fn test_builder() {
        let request = HttpRequest::new()
            .with_method("GET")
            .with_path("/some/path")
            .with_header("Content-Type", "application/json")
            .with_query_string_parameter("a", "1")
            .with_query_string_parameter("a", "2")
            .with_body(Body::json(r#"{"a":1}"#))
            .with_keep_alive(true);

        assert_eq!(request.method, Some(Nottable::new(Pattern::literal("GET"))));
        assert_eq!(request.query_string_parameters.entries[0].values.len(), 2);
        assert_eq!(request.content_type().as_deref(), Some("application/json"));
        assert_eq!(request.keep_alive, Some(true));
        assert!(!request.not);
        assert!(not(request).not);
    }

    #[test]
    fn test_request_definition_untagged() {
        let definition: RequestDefinition =
            serde_json::from_str(r#"{"specUrlOrPayload": "petstore.yaml", "operationId": "listPets"}"#)
                .unwrap();
        assert_eq!(
            definition,
            RequestDefinition::OpenApi(
                OpenApiDefinition::new("petstore.yaml").with_operation_id("listPets")
            )
        );

        let definition: RequestDefinition =
            serde_json::from_str(r#"{"method": "GET", "path": "/a", "headers": {"X": "1"}}"#)
                .unwrap();
        match definition {
            RequestDefinition::Http(request) => {
                assert_eq!(request.path, Some(Nottable::new(Pattern::literal("/a"))));
                assert_eq!(request.headers.entries.len(), 1);
            }
            other => panic!("unexpected definition {other:?}"),
        }
    }

    #[test]
    fn test_request_yaml() {
        let request: HttpRequest = serde_yaml::from_str(
            "method:\n  not: true\n  value: HEAD\nsecure: false\nbody:\n  type: STRING\n  string: abc\n",
        )
        .unwrap();
        assert_eq!(request.method, Some(Nottable::negated(Pattern::literal("HEAD"))));
        assert_eq!(request.secure, Some(false));
        assert_eq!(request.body(), Some(&Body::string("abc")));
    }
}
