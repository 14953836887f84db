// Input validation utilities
//
// Field paths are dotted (`starExamples.0.situation.where-and-when-did-this-experience-occur`);
// snapshots are JSON, so a path is resolved through a JSON pointer.

use anyhow::Result;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn field_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Segments: identifiers, kebab-case question keys, or array indices.
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*(\.[A-Za-z0-9_-]+)*$")
            .unwrap_or_else(|e| panic!("field path regex failed to compile: {e}"))
    })
}

/// True when `path` is a well-formed dotted field path.
pub fn is_valid_field_path(path: &str) -> bool {
    field_path_re().is_match(path)
}

/// Convert a dotted field path to an RFC 6901 JSON pointer.
pub fn field_path_to_pointer(path: &str) -> String {
    let mut pointer = String::with_capacity(path.len() + 1);
    for segment in path.split('.') {
        pointer.push('/');
        pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    pointer
}

/// Resolve a dotted field path inside a snapshot.
pub fn resolve_field<'a>(snapshot: &'a Value, path: &str) -> Option<&'a Value> {
    if !is_valid_field_path(path) {
        return None;
    }
    snapshot.pointer(&field_path_to_pointer(path))
}

/// A value counts as answered when it is present and not blank.
pub fn is_answered(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => true,
    }
}

/// Validate an API base URL (absolute http/https URL with a host).
pub fn validate_base_url(raw: &str) -> Result<url::Url> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(anyhow::anyhow!("API base URL cannot be empty"));
    }

    let parsed =
        url::Url::parse(s).map_err(|e| anyhow::anyhow!("API base URL is invalid: {}", e))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(anyhow::anyhow!(
            "API base URL must use http or https (got '{}')",
            parsed.scheme()
        ));
    }

    if parsed.host_str().map(|h| h.is_empty()).unwrap_or(true) {
        return Err(anyhow::anyhow!("API base URL must include a host"));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_paths_accept_question_keys_and_indices() {
        assert!(is_valid_field_path("roleName"));
        assert!(is_valid_field_path(
            "starExamples.1.situation.where-and-when-did-this-experience-occur"
        ));
        assert!(!is_valid_field_path(""));
        assert!(!is_valid_field_path("roleName."));
        assert!(!is_valid_field_path("role name"));
        assert!(!is_valid_field_path("../etc/passwd"));
    }

    #[test]
    fn resolve_walks_objects_and_arrays() {
        let snapshot = json!({
            "starExamples": [
                { "action": { "steps": [ { "what": "x" } ] } }
            ]
        });
        let steps = resolve_field(&snapshot, "starExamples.0.action.steps");
        assert!(matches!(steps, Some(Value::Array(a)) if a.len() == 1));
        assert!(resolve_field(&snapshot, "starExamples.1.action.steps").is_none());
    }

    #[test]
    fn blank_values_are_unanswered() {
        assert!(!is_answered(None));
        assert!(!is_answered(Some(&Value::Null)));
        assert!(!is_answered(Some(&json!("   "))));
        assert!(!is_answered(Some(&json!([]))));
        assert!(!is_answered(Some(&json!({}))));
        assert!(is_answered(Some(&json!("Data Analyst"))));
        assert!(is_answered(Some(&json!(650))));
        assert!(is_answered(Some(&json!(true))));
    }

    #[test]
    fn base_url_requires_http_scheme_and_host() {
        assert!(validate_base_url("http://localhost:3000").is_ok());
        assert!(validate_base_url("https://pitch.example.com/").is_ok());
        assert!(validate_base_url("").is_err());
        assert!(validate_base_url("ftp://example.com").is_err());
        assert!(validate_base_url("not a url").is_err());
    }
}
