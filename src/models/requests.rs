// API request models (wire format of the draft and generation endpoints)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted record state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSaveRequest {
    /// Absent on the first save of a session (create).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub step: u32,
    pub status: DraftStatus,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSubmitRequest {
    pub status: DraftStatus,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Value>,
}

/// Word allocation handed to the generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordBudget {
    pub intro: u32,
    pub conclusion: u32,
    pub per_example: u32,
}

impl WordBudget {
    /// 10% intro, 10% conclusion, remaining 80% split evenly across STAR examples.
    pub fn split(word_limit: u32, examples: u32) -> Self {
        let limit = f64::from(word_limit);
        let examples = examples.max(1);
        Self {
            intro: (limit * 0.10).round() as u32,
            conclusion: (limit * 0.10).round() as u32,
            per_example: ((limit * 0.80) / f64::from(examples)).round() as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationTriggerRequest {
    /// Workflow version keyed by STAR example count ("v1.2", "v1.3", ...).
    pub workflow_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_budget: Option<WordBudget>,
    pub data: Value,
}

impl GenerationTriggerRequest {
    pub fn from_snapshot(data: Value, repeat_count: u32) -> Self {
        let word_budget = data
            .get("pitchWordLimit")
            .and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
            })
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .map(|limit| WordBudget::split(limit, repeat_count));

        Self {
            workflow_label: workflow_label(repeat_count),
            word_budget,
            data,
        }
    }
}

pub fn workflow_label(repeat_count: u32) -> String {
    format!("v1.{}", repeat_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn word_budget_matches_pitch_split() {
        let budget = WordBudget::split(500, 2);
        assert_eq!(budget.intro, 50);
        assert_eq!(budget.conclusion, 50);
        assert_eq!(budget.per_example, 200);

        let budget = WordBudget::split(650, 3);
        assert_eq!(budget.intro, 65);
        assert_eq!(budget.per_example, 173);
    }

    #[test]
    fn trigger_request_reads_word_limit_from_snapshot() {
        let req = GenerationTriggerRequest::from_snapshot(json!({ "pitchWordLimit": "650" }), 2);
        assert_eq!(req.workflow_label, "v1.2");
        assert_eq!(req.word_budget.map(|b| b.per_example), Some(260));

        let req = GenerationTriggerRequest::from_snapshot(json!({}), 4);
        assert_eq!(req.workflow_label, "v1.4");
        assert!(req.word_budget.is_none());
    }

    #[test]
    fn create_save_omits_id() {
        let req = DraftSaveRequest {
            id: None,
            step: 6,
            status: DraftStatus::Draft,
            data: json!({}),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["status"], "draft");
        assert_eq!(json["step"], 6);
    }
}
