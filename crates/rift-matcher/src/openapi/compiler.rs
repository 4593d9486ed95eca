//! OpenAPI operations to request matchers.
//!
//! Every operation compiles to one [`HttpRequestMatcher`] per request body
//! media type (or a single one without a body), plus the operation's
//! [`SecurityMatcher`]. Paths keep document order and operations within a
//! path are ordered by method name, so compiling the same document twice
//! always yields the same list.

use super::loader;
use super::resolver::Resolver;
use super::schema::{set_nullable, to_json_schema};
use super::security::SecurityMatcher;
use crate::config::MatcherConfig;
use crate::error::SpecError;
use crate::matcher::{CompiledSchema, HttpRequestMatcher};
use crate::model::{
    Body, HttpRequest, KeyMatchStyle, KeyMultiValue, Nottable, OpenApiDefinition, ParameterStyle,
    Pattern, RequestBody, Style,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const CONTENT_TYPE: &str = "Content-Type";

/// One compiled operation and media type.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOperation {
    pub operation_id: String,
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub matcher: HttpRequestMatcher,
    pub security: SecurityMatcher,
}

impl CompiledOperation {
    /// `operation "<id>" method "<METHOD>" path "<path>"[ content-type "<type>"]`
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "operation \"{}\" method \"{}\" path \"{}\"",
            self.operation_id, self.method, self.path
        );
        if let Some(content_type) = &self.content_type {
            summary.push_str(&format!(" content-type \"{content_type}\""));
        }
        summary
    }
}

/// Load and compile an OpenAPI definition.
///
/// A blank spec compiles to no operations. An operation id that selects
/// nothing is an error.
pub fn compile(
    definition: &OpenApiDefinition,
    config: Arc<MatcherConfig>,
) -> Result<Vec<CompiledOperation>, SpecError> {
    if definition.spec_url_or_payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document = loader::load(&definition.spec_url_or_payload, &config)?;
    let operation_filter = definition
        .operation_id
        .as_deref()
        .filter(|id| !id.trim().is_empty());

    let compiler = Compiler {
        document: &document,
        resolver: Resolver::new(&document),
        config,
    };
    let operations = compiler.compile_operations(operation_filter)?;

    if let Some(operation_id) = operation_filter {
        if operations.is_empty() {
            return Err(SpecError::UnknownOperation(operation_id.to_string()));
        }
    }
    debug!(
        "Compiled {} request matchers from OpenAPI definition",
        operations.len()
    );
    Ok(operations)
}

struct Compiler<'a> {
    document: &'a Value,
    resolver: Resolver<'a>,
    config: Arc<MatcherConfig>,
}

/// Location-independent facts about the operation being compiled.
struct OperationContext<'o> {
    operation_id: &'o str,
    method: String,
}

impl Compiler<'_> {
    fn compile_operations(&self, filter: Option<&str>) -> Result<Vec<CompiledOperation>, SpecError> {
        let mut compiled = Vec::new();
        let Some(Value::Object(paths)) = self.document.get("paths") else {
            return Ok(compiled);
        };
        for (path, path_item) in paths {
            let path_item = self.resolver.resolve(path_item)?;
            let mut methods: Vec<&str> = METHODS
                .iter()
                .copied()
                .filter(|method| path_item.get(*method).is_some_and(Value::is_object))
                .collect();
            methods.sort_by_key(|method| method.to_ascii_uppercase());

            for method in methods {
                let operation = &path_item[method];
                let operation_id = operation
                    .get("operationId")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if filter.is_some_and(|filter| filter != operation_id) {
                    continue;
                }
                let context = OperationContext {
                    operation_id,
                    method: method.to_ascii_uppercase(),
                };
                compiled.extend(self.compile_operation(&context, path, &path_item, operation)?);
            }
        }
        Ok(compiled)
    }

    fn compile_operation(
        &self,
        context: &OperationContext<'_>,
        path: &str,
        path_item: &Value,
        operation: &Value,
    ) -> Result<Vec<CompiledOperation>, SpecError> {
        let full_path = format!("{}{}", self.server_prefix(path_item, operation), path);
        let mut request = HttpRequest::new()
            .with_method(context.method.as_str())
            .with_path(full_path.as_str());
        request.query_string_parameters = request
            .query_string_parameters
            .with_key_match_style(KeyMatchStyle::MatchingKey);
        request.headers = request.headers.with_key_match_style(KeyMatchStyle::MatchingKey);
        request.cookies = request.cookies.with_key_match_style(KeyMatchStyle::MatchingKey);

        for parameter in self.merged_parameters(path_item, operation)? {
            self.add_parameter(context, &mut request, &parameter)?;
        }

        let security = SecurityMatcher::compile(
            self.document,
            &self.resolver,
            operation.get("security").or_else(|| self.document.get("security")),
        )?;

        let body = match operation.get("requestBody") {
            Some(body) => Some(self.resolver.resolve(body)?),
            None => None,
        };
        let content = body
            .as_ref()
            .and_then(|body| body.get("content"))
            .and_then(Value::as_object)
            .filter(|content| !content.is_empty());

        let Some(content) = content else {
            return Ok(vec![self.finish(context, &full_path, request, None, security)]);
        };
        let required = body
            .as_ref()
            .and_then(|body| body.get("required"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut compiled = Vec::with_capacity(content.len());
        for (content_type, media_type) in content {
            let mut request = request.clone();
            self.add_body(context, &mut request, content, content_type, media_type, required)?;
            compiled.push(self.finish(
                context,
                &full_path,
                request,
                Some(content_type.clone()),
                security.clone(),
            ));
        }
        Ok(compiled)
    }

    fn finish(
        &self,
        context: &OperationContext<'_>,
        path: &str,
        request: HttpRequest,
        content_type: Option<String>,
        security: SecurityMatcher,
    ) -> CompiledOperation {
        let mut description = format!("for swagger operation \"{}\"", context.operation_id);
        if let Some(content_type) = &content_type {
            description.push_str(&format!(" content-type \"{content_type}\""));
        }
        CompiledOperation {
            operation_id: context.operation_id.to_string(),
            method: context.method.clone(),
            path: path.to_string(),
            content_type,
            matcher: HttpRequestMatcher::compile(&request, self.config.clone())
                .with_description(description),
            security,
        }
    }

    /// Path-level parameters overridden by operation-level ones with the
    /// same name and location.
    fn merged_parameters(&self, path_item: &Value, operation: &Value) -> Result<Vec<Value>, SpecError> {
        let mut merged: Vec<Value> = Vec::new();
        for parameters in [path_item.get("parameters"), operation.get("parameters")]
            .into_iter()
            .flatten()
        {
            let Value::Array(parameters) = parameters else {
                continue;
            };
            for parameter in parameters {
                let parameter = self.resolver.resolve(parameter)?;
                let key = |value: &Value| {
                    (
                        value.get("name").cloned().unwrap_or(Value::Null),
                        value.get("in").cloned().unwrap_or(Value::Null),
                    )
                };
                let parameter_key = key(&parameter);
                match merged.iter_mut().find(|existing| key(existing) == parameter_key) {
                    Some(existing) => *existing = parameter,
                    None => merged.push(parameter),
                }
            }
        }
        Ok(merged)
    }

    fn add_parameter(
        &self,
        context: &OperationContext<'_>,
        request: &mut HttpRequest,
        parameter: &Value,
    ) -> Result<(), SpecError> {
        let name = parameter.get("name").and_then(Value::as_str).unwrap_or_default();
        let location = parameter.get("in").and_then(Value::as_str).unwrap_or_default();

        if flag(parameter, "allowReserved") {
            return Err(SpecError::AllowReserved {
                operation_id: context.operation_id.to_string(),
                method: context.method.clone(),
                parameter: name.to_string(),
                location: location.to_string(),
            });
        }

        let schema = parameter.get("schema").cloned().or_else(|| {
            parameter
                .get("content")
                .and_then(Value::as_object)
                .and_then(|content| content.values().next())
                .and_then(|media_type| media_type.get("schema"))
                .cloned()
        });
        let Some(mut schema) = schema else {
            debug!("Parameter \"{}\" in \"{}\" has no schema and is ignored", name, location);
            return Ok(());
        };

        if flag(parameter, "allowEmptyValue") {
            set_nullable(&mut schema);
        }
        let schema = to_json_schema(&schema);
        let compiled = CompiledSchema::compile(&schema);
        if let Some(error) = compiled.compile_error() {
            return Err(SpecError::Invalid(format!(
                "invalid schema for parameter \"{name}\" in \"{location}\" on operation \"{}\": {error}",
                context.operation_id
            )));
        }

        let style = self.parameter_style(context, parameter, name, location)?;
        let required = location == "path" || flag(parameter, "required");
        let mut entry = KeyMultiValue::new(name, [Pattern::schema(schema)]).optional(!required);
        if location == "path" || compiled.is_array() {
            entry = entry.with_style(style);
        }

        match location {
            "path" => request.path_parameters.push(entry),
            "query" => request.query_string_parameters.push(entry),
            "header" => request.headers.push(entry),
            "cookie" => request.cookies.push(entry),
            other => warn!(
                "Unknown location \"{}\" for parameter \"{}\" on operation \"{}\", expected \"query\", \"header\", \"path\" or \"cookie\"",
                other, name, context.operation_id
            ),
        }
        Ok(())
    }

    fn parameter_style(
        &self,
        context: &OperationContext<'_>,
        parameter: &Value,
        name: &str,
        location: &str,
    ) -> Result<ParameterStyle, SpecError> {
        let declared = parameter.get("style").and_then(Value::as_str);
        let style = match declared {
            Some(declared) => Style::parse(declared),
            None if matches!(location, "query" | "cookie") => Some(Style::Form),
            None => Some(Style::Simple),
        };
        let supported = match (style, location) {
            (Some(Style::DeepObject), _) | (None, _) => false,
            (Some(Style::Label | Style::Matrix), location) => location == "path",
            (Some(Style::Form | Style::SpaceDelimited | Style::PipeDelimited), "path") => false,
            _ => true,
        };
        match style {
            Some(style) if supported => {
                let explode = parameter
                    .get("explode")
                    .and_then(Value::as_bool)
                    .unwrap_or(style == Style::Form);
                Ok(ParameterStyle::new(style, explode))
            }
            _ => Err(SpecError::UnsupportedStyle {
                operation_id: context.operation_id.to_string(),
                method: context.method.clone(),
                parameter: name.to_string(),
                location: location.to_string(),
                style: declared.unwrap_or_default().to_string(),
            }),
        }
    }

    fn add_body(
        &self,
        context: &OperationContext<'_>,
        request: &mut HttpRequest,
        content: &Map<String, Value>,
        content_type: &str,
        media_type: &Value,
        required: bool,
    ) -> Result<(), SpecError> {
        if content_type
            .to_ascii_lowercase()
            .starts_with("multipart/form-data")
        {
            return Err(SpecError::MultipartBody {
                operation_id: context.operation_id.to_string(),
                method: context.method.clone(),
            });
        }
        if media_type.get("encoding").is_some() {
            return Err(SpecError::BodyEncoding {
                operation_id: context.operation_id.to_string(),
                method: context.method.clone(),
            });
        }

        if content_type != "*/*" && required {
            // Content type parameters such as charset must not break matching.
            let source = format!("{}.*", media_range_regex(content_type));
            request
                .headers
                .push(KeyMultiValue::new(CONTENT_TYPE, [Pattern::regex(source)]));
        }
        if content_type.contains('*') {
            // A wildcard only serves content types no exact entry covers.
            let exact: Vec<String> = content
                .keys()
                .filter(|other| !other.contains('*'))
                .map(|other| format!("{}.*", media_range_regex(other)))
                .collect();
            if !exact.is_empty() {
                request.headers.push(
                    KeyMultiValue::new(
                        CONTENT_TYPE,
                        [Nottable::negated(Pattern::regex(exact.join("|")))],
                    )
                    .optional(true),
                );
            }
        }

        if let Some(schema) = media_type.get("schema") {
            let schema = to_json_schema(schema);
            if let Some(error) = CompiledSchema::compile(&schema).compile_error() {
                return Err(SpecError::Invalid(format!(
                    "invalid requestBody schema for content-type \"{content_type}\" on operation \"{}\": {error}",
                    context.operation_id
                )));
            }
            request.body = Some(RequestBody::from(Body::json_schema(schema)).optional(!required));
        }
        Ok(())
    }

    /// Path of the effective server URL, normalized to `/base` or empty.
    fn server_prefix(&self, path_item: &Value, operation: &Value) -> String {
        let server = [operation, path_item, self.document]
            .iter()
            .filter_map(|level| level.get("servers").and_then(Value::as_array))
            .find(|servers| !servers.is_empty())
            .and_then(|servers| servers.first());
        let Some(server) = server else {
            return String::new();
        };
        let mut url = server
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(Value::Object(variables)) = server.get("variables") {
            for (name, variable) in variables {
                let default = variable.get("default").and_then(Value::as_str).unwrap_or_default();
                url = url.replace(&format!("{{{name}}}"), default);
            }
        }

        let path = match url.find("://") {
            Some(index) => {
                let rest = &url[index + 3..];
                rest.find('/').map_or("", |slash| &rest[slash..])
            }
            None => url.as_str(),
        };
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            String::new()
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }
}

fn flag(value: &Value, name: &str) -> bool {
    value.get(name).and_then(Value::as_bool).unwrap_or(false)
}

/// Escape a media type for a regex, letting `*` match anything.
fn media_range_regex(content_type: &str) -> String {
    regex::escape(content_type).replace(r"\*", ".*")
}
