//! Security requirements as credential checks.
//!
//! Each scheme becomes a check on one header, query parameter or cookie:
//! `apiKey` requires a non-empty value under its name, `http` requires
//! `Authorization: <scheme> <credentials>` and `oauth2` / `openIdConnect`
//! require a bearer token. Scopes are not enforced.
//!
//! Alternative requirements combine with OR and the schemes inside one
//! requirement with AND. A credential that is sent must always be well
//! formed, but the "at least one requirement satisfied" check only applies
//! when every credential lives in the same location. When schemes are
//! spread over headers, cookies and query parameters each location stays
//! optional, so a request without any credential matches.

use super::resolver::Resolver;
use crate::error::SpecError;
use crate::matcher::{compile_regex, mismatch_because, Field, MatchDifference};
use crate::model::{HttpRequest, MultiValueMap};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Where a credential is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Location {
    Header,
    Query,
    Cookie,
}

impl Location {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "header" => Some(Location::Header),
            "query" => Some(Location::Query),
            "cookie" => Some(Location::Cookie),
            _ => None,
        }
    }

    fn field(&self) -> Field {
        match self {
            Location::Header => Field::Headers,
            Location::Query => Field::QueryParameters,
            Location::Cookie => Field::Cookies,
        }
    }

    fn values<'a>(&self, request: &'a HttpRequest) -> &'a MultiValueMap {
        match self {
            Location::Header => &request.headers,
            Location::Query => &request.query_string_parameters,
            Location::Cookie => &request.cookies,
        }
    }

    fn ignore_case(&self) -> bool {
        !matches!(self, Location::Query)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Location::Header => "header",
            Location::Query => "query",
            Location::Cookie => "cookie",
        })
    }
}

/// One credential check compiled from a security scheme.
#[derive(Debug, Clone)]
struct Check {
    location: Location,
    name: String,
    source: String,
    regex: Arc<Regex>,
}

impl Check {
    fn new(location: Location, name: &str, source: String) -> Option<Self> {
        let regex = compile_regex(&source, true)?;
        Some(Self {
            location,
            name: name.to_string(),
            source,
            regex: Arc::new(regex),
        })
    }

    fn same_key(&self, other: &Check) -> bool {
        self.location == other.location
            && if self.location.ignore_case() {
                self.name.eq_ignore_ascii_case(&other.name)
            } else {
                self.name == other.name
            }
    }

    fn actual_values(&self, request: &HttpRequest) -> Option<Vec<String>> {
        let ignore_case = self.location.ignore_case();
        let mut found = false;
        let mut values = Vec::new();
        for entry in &self.location.values(request).entries {
            let name = entry.name.value.as_text();
            let same = if ignore_case {
                name.eq_ignore_ascii_case(&self.name)
            } else {
                name == self.name
            };
            if same {
                found = true;
                if entry.values.is_empty() {
                    values.push(String::new());
                }
                values.extend(entry.values.iter().map(|value| value.value.as_text().into_owned()));
            }
        }
        found.then_some(values)
    }

    fn satisfied_by(&self, request: &HttpRequest) -> bool {
        self.actual_values(request)
            .is_some_and(|values| values.iter().any(|value| self.regex.is_match(value)))
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\" matching \"{}\"", self.location, self.name, self.source)
    }
}

/// Compiled `security` requirements of one operation.
#[derive(Debug, Clone, Default)]
pub struct SecurityMatcher {
    requirements: Vec<Vec<Check>>,
}

impl PartialEq for SecurityMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.describe() == other.describe()
    }
}

impl SecurityMatcher {
    /// Compile a `security` array against `components.securitySchemes`.
    pub fn compile(
        document: &Value,
        resolver: &Resolver<'_>,
        security: Option<&Value>,
    ) -> Result<Self, SpecError> {
        let Some(Value::Array(requirements)) = security else {
            return Ok(Self::default());
        };
        let schemes = document
            .pointer("/components/securitySchemes")
            .cloned()
            .unwrap_or(Value::Null);

        let mut compiled = Vec::with_capacity(requirements.len());
        for requirement in requirements {
            let Value::Object(requirement) = requirement else {
                continue;
            };
            let mut checks = Vec::new();
            for name in requirement.keys() {
                let Some(scheme) = schemes.get(name) else {
                    warn!("Security scheme \"{}\" is not defined in components", name);
                    continue;
                };
                let scheme = resolver.resolve(scheme)?;
                checks.extend(compile_scheme(name, &scheme));
            }
            compiled.push(checks);
        }
        Ok(Self {
            requirements: compiled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    fn describe(&self) -> String {
        let requirements: Vec<String> = self
            .requirements
            .iter()
            .map(|checks| {
                checks
                    .iter()
                    .map(Check::to_string)
                    .collect::<Vec<_>>()
                    .join(" and ")
            })
            .collect();
        requirements.join(" or ")
    }

    pub fn matches(&self, difference: Option<&mut MatchDifference>, request: &HttpRequest) -> bool {
        match self.check(request) {
            Ok(()) => true,
            Err((location, found, reason)) => {
                if let Some(difference) = difference {
                    difference.add_field_difference(
                        location.field(),
                        mismatch_because("security scheme", &self.describe(), &found, &reason),
                    );
                }
                false
            }
        }
    }

    fn check(&self, request: &HttpRequest) -> Result<(), (Location, String, String)> {
        if self.requirements.is_empty() {
            return Ok(());
        }
        let checks: Vec<&Check> = self.requirements.iter().flatten().collect();

        // Credentials that are sent must fit one of the schemes using their key.
        for (index, check) in checks.iter().enumerate() {
            if checks[..index].iter().any(|earlier| earlier.same_key(check)) {
                continue;
            }
            let Some(values) = check.actual_values(request) else {
                continue;
            };
            let patterns: Vec<&&Check> = checks.iter().filter(|other| other.same_key(check)).collect();
            if let Some(value) = values
                .iter()
                .find(|value| !patterns.iter().any(|pattern| pattern.regex.is_match(value)))
            {
                return Err((
                    check.location,
                    value.clone(),
                    format!("{} \"{}\" has an invalid value", check.location, check.name),
                ));
            }
        }

        if self.requirements.iter().any(Vec::is_empty) {
            return Ok(());
        }
        let Some(location) = checks.first().map(|check| check.location) else {
            return Ok(());
        };
        if checks.iter().any(|check| check.location != location) {
            return Ok(());
        }
        if self
            .requirements
            .iter()
            .any(|checks| checks.iter().all(|check| check.satisfied_by(request)))
        {
            Ok(())
        } else {
            Err((
                location,
                String::new(),
                "no security requirement is satisfied".to_string(),
            ))
        }
    }
}

fn compile_scheme(name: &str, scheme: &Value) -> Option<Check> {
    let kind = scheme.get("type").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "apiKey" => {
            let key = scheme.get("name").and_then(Value::as_str).unwrap_or_default();
            let location = scheme
                .get("in")
                .and_then(Value::as_str)
                .and_then(Location::parse);
            match location {
                Some(location) if !key.is_empty() => Check::new(location, key, ".+".to_string()),
                _ => {
                    warn!("Security scheme \"{}\" has no usable name or location", name);
                    None
                }
            }
        }
        "http" => {
            let scheme = scheme
                .get("scheme")
                .and_then(Value::as_str)
                .unwrap_or("basic");
            Check::new(
                Location::Header,
                "Authorization",
                format!("{} .+", regex::escape(scheme)),
            )
        }
        "oauth2" | "openIdConnect" => {
            Check::new(Location::Header, "Authorization", "bearer .+".to_string())
        }
        other => {
            warn!("Security scheme \"{}\" has unsupported type \"{}\"", name, other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(schemes: Value, security: Value) -> SecurityMatcher {
        let document = json!({"components": {"securitySchemes": schemes}});
        let resolver = Resolver::new(&document);
        SecurityMatcher::compile(&document, &resolver, Some(&security)).unwrap()
    }

    #[test]
    fn test_no_requirements_match_everything() {
        let matcher = compile(json!({}), json!([]));
        assert!(matcher.is_empty());
        assert!(matcher.matches(None, &HttpRequest::new()));
    }

    #[test]
    fn test_single_location_requires_credentials() {
        let matcher = compile(
            json!({
                "BasicAuth": {"type": "http", "scheme": "basic"},
                "BearerAuth": {"type": "http", "scheme": "bearer"}
            }),
            json!([{"BasicAuth": []}, {"BearerAuth": []}]),
        );
        assert!(!matcher.matches(None, &HttpRequest::new()));
        assert!(matcher.matches(None, &HttpRequest::new().with_header("Authorization", "Basic dXNlcjpwYXNz")));
        assert!(matcher.matches(None, &HttpRequest::new().with_header("authorization", "bearer abc")));
        assert!(!matcher.matches(None, &HttpRequest::new().with_header("Authorization", "Digest abc")));
    }

    #[test]
    fn test_mixed_locations_keep_each_optional() {
        let matcher = compile(
            json!({
                "BasicAuth": {"type": "http", "scheme": "basic"},
                "SessionCookie": {"type": "apiKey", "in": "cookie", "name": "session"},
                "ApiKeyAuth": {"type": "apiKey", "in": "query", "name": "api_key"}
            }),
            json!([{"BasicAuth": []}, {"SessionCookie": []}, {"ApiKeyAuth": []}]),
        );
        assert!(matcher.matches(None, &HttpRequest::new()));
        assert!(matcher.matches(None, &HttpRequest::new().with_query_string_parameter("api_key", "k")));
        assert!(!matcher.matches(None, &HttpRequest::new().with_query_string_parameter("api_key", "")));

        let mut difference = MatchDifference::new();
        assert!(!matcher.matches(
            Some(&mut difference),
            &HttpRequest::new().with_header("Authorization", "bearer")
        ));
        let headers = difference.differences(Field::Headers).unwrap();
        assert!(headers[0].starts_with("  security scheme match failed expected:"));
    }

    #[test]
    fn test_and_within_requirement() {
        let matcher = compile(
            json!({
                "Key": {"type": "apiKey", "in": "header", "name": "X-Key"},
                "Tenant": {"type": "apiKey", "in": "header", "name": "X-Tenant"}
            }),
            json!([{"Key": [], "Tenant": []}]),
        );
        assert!(!matcher.matches(None, &HttpRequest::new().with_header("X-Key", "1")));
        assert!(matcher.matches(
            None,
            &HttpRequest::new().with_header("X-Key", "1").with_header("X-Tenant", "a")
        ));
    }

    #[test]
    fn test_empty_requirement_makes_security_optional() {
        let matcher = compile(
            json!({"OAuth": {"type": "oauth2", "flows": {}}}),
            json!([{}, {"OAuth": ["read"]}]),
        );
        assert!(matcher.matches(None, &HttpRequest::new()));
        assert!(!matcher.matches(None, &HttpRequest::new().with_header("Authorization", "basic x")));
    }

    #[test]
    fn test_unknown_scheme_type_is_skipped() {
        let matcher = compile(
            json!({"Tls": {"type": "mutualTLS"}}),
            json!([{"Tls": []}]),
        );
        assert!(matcher.matches(None, &HttpRequest::new()));
    }
}
