//! Loading OpenAPI documents from URLs, files or inline payloads.

use crate::config::MatcherConfig;
use crate::error::SpecError;
use serde_json::Value;
use tracing::debug;

/// Read the document named by `location` and parse it.
///
/// `location` is an `http(s)://` URL, a `file:` URL, a path ending in
/// `.json`, `.yaml` or `.yml` (searched in the configured spec search paths,
/// then the current directory), or the JSON/YAML document itself.
pub fn load(location: &str, config: &MatcherConfig) -> Result<Value, SpecError> {
    let location = location.trim();
    let text = if location.starts_with("http://") || location.starts_with("https://") {
        fetch(location)?
    } else if let Some(path) = location.strip_prefix("file:") {
        let path = path.strip_prefix("//").unwrap_or(path);
        read(path)?
    } else if is_path(location) {
        read_from_search_paths(location, config)?
    } else {
        location.to_string()
    };
    parse_document(&text)
}

fn is_path(location: &str) -> bool {
    !location.contains('\n')
        && [".json", ".yaml", ".yml"]
            .iter()
            .any(|extension| location.to_ascii_lowercase().ends_with(extension))
}

fn fetch(url: &str) -> Result<String, SpecError> {
    debug!("Fetching OpenAPI spec from {}", url);
    reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(|e| SpecError::Load(format!("unable to fetch \"{url}\": {e}")))
}

fn read(path: &str) -> Result<String, SpecError> {
    std::fs::read_to_string(path)
        .map_err(|e| SpecError::Load(format!("unable to read \"{path}\": {e}")))
}

fn read_from_search_paths(location: &str, config: &MatcherConfig) -> Result<String, SpecError> {
    let candidates = config.spec_candidates(location);
    match candidates.iter().find(|candidate| candidate.is_file()) {
        Some(path) => {
            debug!("Loading OpenAPI spec from {}", path.display());
            read(&path.to_string_lossy())
        }
        None => Err(SpecError::Load(format!(
            "unable to find \"{}\", searched: [{}]",
            location,
            candidates
                .iter()
                .map(|candidate| candidate.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Parse JSON or YAML text into an OpenAPI 3 document.
pub fn parse_document(text: &str) -> Result<Value, SpecError> {
    let trimmed = text.trim_start();
    let document: Value = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        serde_yaml::from_str(trimmed)?
    };
    if !document.is_object() {
        return Err(SpecError::Parse(
            "document is not a JSON or YAML object".to_string(),
        ));
    }
    match document.get("openapi").and_then(Value::as_str) {
        Some(version) if version.starts_with("3.") => Ok(document),
        Some(version) => Err(SpecError::Parse(format!(
            "unsupported OpenAPI version \"{version}\""
        ))),
        None if document.get("swagger").is_some() => Err(SpecError::Parse(
            "swagger 2.0 documents are not supported, convert to OpenAPI 3".to_string(),
        )),
        None => Err(SpecError::Parse(
            "attribute openapi is missing".to_string(),
        )),
    }
}
