//! OR over the compiled operations of one OpenAPI definition.

use super::compiler::{self, CompiledOperation};
use crate::config::MatcherConfig;
use crate::error::SpecError;
use crate::matcher::{Field, MatchDifference};
use crate::model::{HttpRequest, OpenApiDefinition, RequestDefinition};
use std::sync::Arc;
use tracing::trace;

/// Matches a request against every operation of an OpenAPI definition.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiMatcher {
    definition: OpenApiDefinition,
    operations: Vec<CompiledOperation>,
    control_plane: bool,
}

impl OpenApiMatcher {
    pub fn compile(
        definition: &OpenApiDefinition,
        config: Arc<MatcherConfig>,
    ) -> Result<Self, SpecError> {
        Ok(Self {
            operations: compiler::compile(definition, config)?,
            definition: definition.clone(),
            control_plane: false,
        })
    }

    pub fn with_control_plane(mut self, control_plane: bool) -> Self {
        self.control_plane = control_plane;
        self
    }

    pub fn definition(&self) -> &OpenApiDefinition {
        &self.definition
    }

    pub fn operations(&self) -> &[CompiledOperation] {
        &self.operations
    }

    pub fn is_control_plane(&self) -> bool {
        self.control_plane
    }

    pub fn matches_request(&self, request: &HttpRequest) -> bool {
        self.matches_in(None, self.control_plane, &RequestDefinition::Http(request.clone()))
    }

    pub fn matches(
        &self,
        difference: Option<&mut MatchDifference>,
        definition: &RequestDefinition,
    ) -> bool {
        self.matches_in(difference, self.control_plane, definition)
    }

    /// True when any operation matches.
    ///
    /// Each operation records into its own [`MatchDifference`]; all of them
    /// are appended to the caller's, followed by one OPERATION entry per
    /// failed operation and an OPENAPI summary.
    pub fn matches_in(
        &self,
        mut difference: Option<&mut MatchDifference>,
        control_plane: bool,
        definition: &RequestDefinition,
    ) -> bool {
        let request = match definition {
            RequestDefinition::OpenApi(other) => return *other == self.definition,
            RequestDefinition::Http(request) => request,
        };
        if self.operations.is_empty() {
            return true;
        }

        for operation in &self.operations {
            let mut single = difference.as_ref().map(|_| MatchDifference::new());
            let matched = operation
                .matcher
                .matches_http(single.as_mut(), control_plane, request)
                && (control_plane || operation.security.matches(single.as_mut(), request));

            if let (Some(difference), Some(single)) = (difference.as_deref_mut(), &single) {
                difference.add_differences(single);
                if !matched {
                    difference.add_field_difference(
                        Field::Operation,
                        format!("  {} did not match", operation.summary()),
                    );
                }
            }
            if matched {
                trace!("request matched {}", operation.matcher.description());
                return true;
            }
        }

        if let Some(difference) = difference {
            difference.add_field_difference(
                Field::OpenApi,
                format!(
                    "  request did not match any of the {} operations in the OpenAPI definition",
                    self.operations.len()
                ),
            );
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"{
        "openapi": "3.0.0",
        "paths": {
            "/pets": {
                "get": {"operationId": "listPets"},
                "post": {"operationId": "createPet"}
            },
            "/somePath/{someParam}": {
                "get": {
                    "operationId": "getSome",
                    "parameters": [{"name": "someParam", "in": "path", "required": true,
                                    "schema": {"type": "integer", "minimum": 1}}]
                }
            }
        }
    }"#;

    fn compile(definition: &OpenApiDefinition) -> OpenApiMatcher {
        OpenApiMatcher::compile(definition, Arc::new(MatcherConfig::default())).unwrap()
    }

    #[test]
    fn test_any_operation_matches() {
        let matcher = compile(&OpenApiDefinition::new(SPEC));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/pets")));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("POST").with_path("/pets")));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/somePath/1")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/somePath/0")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/somePath/a")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/somePath")));
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("DELETE").with_path("/pets")));
    }

    #[test]
    fn test_differences_aggregate_all_operations() {
        let matcher = compile(&OpenApiDefinition::new(SPEC));
        let mut difference = MatchDifference::new();
        let request: RequestDefinition = HttpRequest::new().with_method("DELETE").with_path("/pets").into();
        assert!(!matcher.matches(Some(&mut difference), &request));

        assert_eq!(difference.differences(Field::Method).unwrap().len(), 3);
        assert_eq!(
            difference.differences(Field::Operation).unwrap(),
            [
                "  operation \"listPets\" method \"GET\" path \"/pets\" did not match",
                "  operation \"createPet\" method \"POST\" path \"/pets\" did not match",
                "  operation \"getSome\" method \"GET\" path \"/somePath/{someParam}\" did not match",
            ]
        );
        assert_eq!(difference.differences(Field::OpenApi).unwrap().len(), 1);
    }

    #[test]
    fn test_operation_filter() {
        let matcher = compile(&OpenApiDefinition::new(SPEC).with_operation_id("createPet"));
        assert_eq!(matcher.operations().len(), 1);
        assert!(!matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/pets")));
        assert!(matcher.matches_request(&HttpRequest::new().with_method("POST").with_path("/pets")));
    }

    #[test]
    fn test_definitions_compare_by_equality() {
        let definition = OpenApiDefinition::new(SPEC).with_operation_id("listPets");
        let matcher = compile(&definition).with_control_plane(true);
        assert!(matcher.matches(None, &definition.clone().into()));
        assert!(!matcher.matches(None, &OpenApiDefinition::new(SPEC).into()));

        let data_plane = compile(&definition);
        assert!(data_plane.matches(None, &definition.into()));
        assert!(!data_plane.matches(None, &OpenApiDefinition::new(SPEC).into()));
    }

    #[test]
    fn test_blank_spec_matches_everything() {
        let matcher = compile(&OpenApiDefinition::new(""));
        assert!(matcher.operations().is_empty());
        assert!(matcher.matches_request(&HttpRequest::new().with_method("GET").with_path("/anything")));
    }
}
