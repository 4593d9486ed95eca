//! Error types for OpenAPI spec loading and compilation.
//!
//! Matching itself never fails: a mismatch is a `false` result plus optional
//! entries in a [`MatchDifference`](crate::matcher::MatchDifference). Only
//! building a matcher from an OpenAPI definition can fail, and every such
//! failure renders with the `"Unable to load API spec, "` prefix.

use thiserror::Error;

/// Prefix carried by every spec compilation error message.
pub const SPEC_LOAD_ERROR: &str = "Unable to load API spec";

/// Failure while loading or compiling an OpenAPI definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpecError {
    /// The API spec could not be read from a file or fetched from a URL.
    #[error("Unable to load API spec, {0}")]
    Load(String),

    /// The API spec text is not valid JSON/YAML or not an OpenAPI 3 document.
    #[error("Unable to load API spec, {0}")]
    Parse(String),

    /// A `$ref` points at something that does not exist in the document.
    #[error("Unable to load API spec, unable to resolve $ref \"{0}\"")]
    UnresolvedRef(String),

    #[error("Unable to load API spec, allowReserved field is not supported on parameters, found on operation: \"{operation_id}\" method: \"{method}\" parameter: \"{parameter}\" in: \"{location}\"")]
    AllowReserved {
        operation_id: String,
        method: String,
        parameter: String,
        location: String,
    },

    #[error("Unable to load API spec, {style} style is not supported on {location} parameters, found on operation: \"{operation_id}\" method: \"{method}\" parameter: \"{parameter}\"")]
    UnsupportedStyle {
        operation_id: String,
        method: String,
        parameter: String,
        location: String,
        style: String,
    },

    #[error("Unable to load API spec, multipart form data is not supported on requestBody, found on operation: \"{operation_id}\" method: \"{method}\"")]
    MultipartBody {
        operation_id: String,
        method: String,
    },

    #[error("Unable to load API spec, encoding is not supported on requestBody, found on operation: \"{operation_id}\" method: \"{method}\"")]
    BodyEncoding {
        operation_id: String,
        method: String,
    },

    #[error("Unable to load API spec, operationId \"{0}\" not found")]
    UnknownOperation(String),

    /// Structurally invalid content, e.g. a schema the validator rejects.
    #[error("Unable to load API spec, {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for SpecError {
    fn from(err: serde_json::Error) -> Self {
        SpecError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for SpecError {
    fn from(err: serde_yaml::Error) -> Self {
        SpecError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_prefix() {
        let errors = vec![
            SpecError::Load("file not found".to_string()),
            SpecError::UnresolvedRef("#/components/schemas/Missing".to_string()),
            SpecError::UnknownOperation("listPets".to_string()),
            SpecError::MultipartBody {
                operation_id: "upload".to_string(),
                method: "POST".to_string(),
            },
        ];
        for error in errors {
            assert!(error.to_string().starts_with("Unable to load API spec, "));
        }
    }

    #[test]
    fn test_allow_reserved_message() {
        let error = SpecError::AllowReserved {
            operation_id: "listPets".to_string(),
            method: "GET".to_string(),
            parameter: "limit".to_string(),
            location: "query".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unable to load API spec, allowReserved field is not supported on parameters, found on operation: \"listPets\" method: \"GET\" parameter: \"limit\" in: \"query\""
        );
    }

    #[test]
    fn test_parse_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let spec_error: SpecError = err.into();
        assert!(matches!(spec_error, SpecError::Parse(_)));
    }
}
