// API response models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSaveResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationTriggerResponse {
    pub request_id: String,
}

/// Result of one status check. `done=false` while the job is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Hard failure reported by the job itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationStatus {
    pub fn pending() -> Self {
        Self {
            done: false,
            result: None,
            error: None,
        }
    }

    pub fn completed(result: impl Into<String>) -> Self {
        Self {
            done: true,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            done: true,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Generic failure body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn describe(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_missing_fields() {
        let s: GenerationStatus = serde_json::from_str(r#"{"done":false}"#).unwrap();
        assert_eq!(s, GenerationStatus::pending());

        let s: GenerationStatus =
            serde_json::from_str(r#"{"done":true,"result":"Dear panel"}"#).unwrap();
        assert_eq!(s.result.as_deref(), Some("Dear panel"));
    }

    #[test]
    fn trigger_response_uses_camel_case() {
        let r: GenerationTriggerResponse =
            serde_json::from_str(r#"{"requestId":"exec-42"}"#).unwrap();
        assert_eq!(r.request_id, "exec-42");
    }

    #[test]
    fn error_body_prefers_error_field() {
        let b: ErrorBody = serde_json::from_str(r#"{"error":"bad","message":"m"}"#).unwrap();
        assert_eq!(b.describe().as_deref(), Some("bad"));
        let b: ErrorBody = serde_json::from_str(r#"{"message":" "}"#).unwrap();
        assert_eq!(b.describe(), None);
    }
}
