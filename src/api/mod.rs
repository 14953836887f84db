// External collaborators of the wizard core.
//
// The core only needs two contracts: a draft store (create/update, final submit, feedback)
// and a generation service (trigger + status check). `http` talks to the real backend,
// `memory` is a scripted in-process implementation for tests and smoke runs.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::models::requests::GenerationTriggerRequest;
use crate::models::responses::GenerationStatus;

#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Create (`id == None`) or update a draft. Returns the record identity.
    async fn save_draft(
        &self,
        snapshot: &Value,
        id: Option<&str>,
        step: u32,
    ) -> Result<String, BackendError>;

    /// Mark the record as final.
    async fn submit_final(&self, snapshot: &Value, id: &str) -> Result<(), BackendError>;

    /// Attach a post-hoc rating to a final record.
    async fn patch_feedback(
        &self,
        id: &str,
        rating: u8,
        reason: Option<&Value>,
    ) -> Result<(), BackendError>;
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Start one generation job. Callers must not double-fire per attempt.
    async fn trigger(&self, request: &GenerationTriggerRequest) -> Result<String, BackendError>;

    /// Safe to call repeatedly; `done=false` while pending.
    async fn check_status(&self, request_id: &str) -> Result<GenerationStatus, BackendError>;
}
