// In-process draft store + scripted generation service.
//
// Used by the smoke runner and by tests. Status checks follow a script (pending N times, then
// a result or a failure) and every call is counted so tests can assert exact call numbers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::{DraftStore, GenerationService};
use crate::error::BackendError;
use crate::models::requests::{DraftStatus, GenerationTriggerRequest};
use crate::models::responses::GenerationStatus;

#[derive(Debug, Clone)]
pub struct DraftRecord {
    pub data: Value,
    pub step: u32,
    pub status: DraftStatus,
    pub rating: Option<u8>,
    pub rating_reason: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

/// One scripted answer to `check_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusStep {
    Pending,
    Done(String),
    /// The job reports a hard failure.
    JobFailed(String),
    /// The status call itself errors.
    CallFailed(String),
}

#[derive(Default)]
struct Script {
    queue: VecDeque<StatusStep>,
    /// Answer once the queue is empty.
    fallback: Option<StatusStep>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    drafts: Mutex<HashMap<String, DraftRecord>>,
    script: Mutex<Script>,
    last_trigger: Mutex<Option<GenerationTriggerRequest>>,
    save_delay: Mutex<Option<Duration>>,

    failing_saves: AtomicU32,
    failing_submits: AtomicU32,
    failing_feedback: AtomicU32,
    failing_triggers: AtomicU32,

    pub save_calls: AtomicU32,
    pub create_calls: AtomicU32,
    pub submit_calls: AtomicU32,
    pub feedback_calls: AtomicU32,
    pub trigger_calls: AtomicU32,
    pub status_calls: AtomicU32,

    in_flight_saves: AtomicUsize,
    pub max_in_flight_saves: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `pending` pending answers followed by a finished pitch.
    pub fn completes_after(pending: usize, result: impl Into<String>) -> Self {
        let backend = Self::new();
        backend.script_status(
            std::iter::repeat(StatusStep::Pending)
                .take(pending)
                .chain(std::iter::once(StatusStep::Done(result.into()))),
        );
        backend
    }

    pub fn script_status(&self, steps: impl IntoIterator<Item = StatusStep>) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.queue.extend(steps);
    }

    pub fn set_status_fallback(&self, step: StatusStep) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.fallback = Some(step);
    }

    pub fn set_save_delay(&self, delay: Duration) {
        *self.save_delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    pub fn fail_next_saves(&self, n: u32) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_submits(&self, n: u32) {
        self.failing_submits.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_feedback(&self, n: u32) {
        self.failing_feedback.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_triggers(&self, n: u32) {
        self.failing_triggers.store(n, Ordering::SeqCst);
    }

    pub fn draft(&self, id: &str) -> Option<DraftRecord> {
        self.drafts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last_trigger(&self) -> Option<GenerationTriggerRequest> {
        self.last_trigger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DraftStore for InMemoryBackend {
    async fn save_draft(
        &self,
        snapshot: &Value,
        id: Option<&str>,
        step: u32,
    ) -> Result<String, BackendError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight_saves.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_saves
            .fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = *self.save_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if Self::take_failure(&self.failing_saves) {
            Err(BackendError::Transport("connection reset".to_string()))
        } else {
            let mut drafts = self.drafts.lock().unwrap_or_else(|e| e.into_inner());
            let id = match id {
                Some(id) if drafts.contains_key(id) => id.to_string(),
                Some(id) => {
                    self.in_flight_saves.fetch_sub(1, Ordering::SeqCst);
                    return Err(BackendError::NotFound(id.to_string()));
                }
                None => {
                    self.create_calls.fetch_add(1, Ordering::SeqCst);
                    Uuid::new_v4().to_string()
                }
            };
            drafts.insert(
                id.clone(),
                DraftRecord {
                    data: snapshot.clone(),
                    step,
                    status: DraftStatus::Draft,
                    rating: None,
                    rating_reason: None,
                    updated_at: Utc::now(),
                },
            );
            Ok(id)
        };

        self.in_flight_saves.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn submit_final(&self, snapshot: &Value, id: &str) -> Result<(), BackendError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_submits) {
            return Err(BackendError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        let mut drafts = self.drafts.lock().unwrap_or_else(|e| e.into_inner());
        let record = drafts
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        record.data = snapshot.clone();
        record.status = DraftStatus::Final;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn patch_feedback(
        &self,
        id: &str,
        rating: u8,
        reason: Option<&Value>,
    ) -> Result<(), BackendError> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_feedback) {
            return Err(BackendError::Transport("timed out".to_string()));
        }
        let mut drafts = self.drafts.lock().unwrap_or_else(|e| e.into_inner());
        let record = drafts
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        record.rating = Some(rating);
        record.rating_reason = reason.cloned();
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl GenerationService for InMemoryBackend {
    async fn trigger(&self, request: &GenerationTriggerRequest) -> Result<String, BackendError> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_triggers) {
            return Err(BackendError::Status {
                status: 500,
                body: "workflow unavailable".to_string(),
            });
        }
        *self.last_trigger.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        Ok(format!("exec-{}", Uuid::new_v4().simple()))
    }

    async fn check_status(&self, _request_id: &str) -> Result<GenerationStatus, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script
                .queue
                .pop_front()
                .or_else(|| script.fallback.clone())
                .unwrap_or(StatusStep::Pending)
        };
        match step {
            StatusStep::Pending => Ok(GenerationStatus::pending()),
            StatusStep::Done(result) => Ok(GenerationStatus::completed(result)),
            StatusStep::JobFailed(message) => Ok(GenerationStatus::failed(message)),
            StatusStep::CallFailed(message) => Err(BackendError::Transport(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_then_update_keeps_one_record() {
        let backend = InMemoryBackend::new();
        let id = backend
            .save_draft(&json!({ "roleName": "A" }), None, 2)
            .await
            .unwrap();
        let same = backend
            .save_draft(&json!({ "roleName": "B" }), Some(&id), 3)
            .await
            .unwrap();
        assert_eq!(id, same);
        assert_eq!(backend.draft_count(), 1);
        assert_eq!(InMemoryBackend::count(&backend.create_calls), 1);
        let record = backend.draft(&id).unwrap();
        assert_eq!(record.data["roleName"], "B");
        assert_eq!(record.step, 3);
    }

    #[tokio::test]
    async fn update_of_unknown_record_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend
            .save_draft(&json!({}), Some("missing"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn scripted_status_then_fallback() {
        let backend = InMemoryBackend::completes_after(2, "Dear panel");
        assert!(!backend.check_status("r").await.unwrap().done);
        assert!(!backend.check_status("r").await.unwrap().done);
        let done = backend.check_status("r").await.unwrap();
        assert_eq!(done.result.as_deref(), Some("Dear panel"));
        // Exhausted script without fallback keeps answering pending.
        assert!(!backend.check_status("r").await.unwrap().done);
        assert_eq!(InMemoryBackend::count(&backend.status_calls), 4);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let backend = InMemoryBackend::new();
        backend.fail_next_saves(1);
        assert!(backend.save_draft(&json!({}), None, 1).await.is_err());
        assert!(backend.save_draft(&json!({}), None, 1).await.is_ok());
    }
}
